//! Sparse metadata attached to instructions, blocks and functions.
//!
//! Tags are advisory facts recorded by one pass for another ("this block
//! is differential", "this value lives in field `k` of the context").
//! They are kept in a side table on the module rather than on the
//! entities themselves, so most instructions carry no tag storage at all.

use smallvec::SmallVec;

use crate::ids::{BlockId, FieldKey, FuncId, InstId};
use crate::name::Name;

/// A single piece of metadata.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Tag {
    /// Source-level name for printing and for derived names.
    NameHint(Name),
    /// Belongs to the derivative computation.
    Differential,
    /// Carries both primal and differential components.
    MixedDifferential,
    /// Must not be removed by dead-code elimination.
    KeepAlive,
    /// Value is persisted in the intermediate context at this key.
    PrimalValueKey(FieldKey),
    /// Local slot holding a callee's intermediate context.
    PrimalContext,
    /// Primal-side return value of a block whose terminator continues
    /// into differential code.
    PrimalReturn(InstId),
}

/// Discriminant of [`Tag`], used for lookup and removal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TagKind {
    NameHint,
    Differential,
    MixedDifferential,
    KeepAlive,
    PrimalValueKey,
    PrimalContext,
    PrimalReturn,
}

impl Tag {
    pub fn kind(&self) -> TagKind {
        match self {
            Tag::NameHint(_) => TagKind::NameHint,
            Tag::Differential => TagKind::Differential,
            Tag::MixedDifferential => TagKind::MixedDifferential,
            Tag::KeepAlive => TagKind::KeepAlive,
            Tag::PrimalValueKey(_) => TagKind::PrimalValueKey,
            Tag::PrimalContext => TagKind::PrimalContext,
            Tag::PrimalReturn(_) => TagKind::PrimalReturn,
        }
    }
}

/// Anything a tag can be attached to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TagTarget {
    Inst(InstId),
    Block(BlockId),
    Func(FuncId),
}

impl From<InstId> for TagTarget {
    fn from(id: InstId) -> Self {
        TagTarget::Inst(id)
    }
}

impl From<BlockId> for TagTarget {
    fn from(id: BlockId) -> Self {
        TagTarget::Block(id)
    }
}

impl From<FuncId> for TagTarget {
    fn from(id: FuncId) -> Self {
        TagTarget::Func(id)
    }
}

/// Tags of one target, in attachment order.
pub type TagList = SmallVec<[Tag; 2]>;

//! Differential classification of instructions and blocks.
//!
//! An instruction is differential if it is tagged `Differential` or
//! `MixedDifferential` itself, or if its parent block is. Block answers
//! are memoized; block tags do not change while a pass runs, so one
//! classifier per pass invocation is enough.

use std::cell::RefCell;

use rustc_hash::FxHashMap;

use tangent_ir::{BlockId, InstId, Module, TagKind, TagTarget};

/// Differential/primal classifier with a per-block cache.
///
/// The module is passed to each query instead of being held, so the
/// classifier can stay alive across mutations of instruction bodies.
///
/// # Interior Mutability
///
/// Uses `RefCell` for the block cache so that queries take `&self` and
/// the classifier can be shared by the storage policy and the splitter.
#[derive(Default)]
pub struct DiffClassifier {
    blocks: RefCell<FxHashMap<BlockId, bool>>,
}

impl DiffClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `inst` belongs to the derivative computation.
    pub fn is_differential(&self, module: &Module, inst: InstId) -> bool {
        if is_tagged_differential(module, inst) {
            return true;
        }
        module
            .parent(inst)
            .is_some_and(|block| self.is_differential_block(module, block))
    }

    /// Whether `block` belongs to the derivative computation.
    pub fn is_differential_block(&self, module: &Module, block: BlockId) -> bool {
        if let Some(&cached) = self.blocks.borrow().get(&block) {
            return cached;
        }
        let result = is_tagged_differential(module, block);
        self.blocks.borrow_mut().insert(block, result);
        result
    }
}

fn is_tagged_differential(module: &Module, target: impl Into<TagTarget>) -> bool {
    let target = target.into();
    module.has_tag(target, TagKind::Differential)
        || module.has_tag(target, TagKind::MixedDifferential)
}

//! Instructions: operators, operands and use edges.
//!
//! An instruction is an [`Op`], an optional result type and an ordered
//! operand list of [`InstId`]s. Immediate payloads (literal values, field
//! keys, branch targets, callees) live in the `Op` itself; everything
//! that is a *value* is an operand so that use lists see it.

use smallvec::SmallVec;

use crate::ids::{BlockId, FieldKey, FuncId, InstId};
use crate::types::Idx;

/// Literal constant.
///
/// Floats are stored as raw bits so that `Op` stays `Eq + Hash`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Literal {
    Int(i64),
    Float(u64),
    Bool(bool),
}

impl Literal {
    /// Build a float literal from an `f64`.
    pub fn float(value: f64) -> Self {
        Literal::Float(value.to_bits())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Less,
    Greater,
    Equal,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Neg,
    Not,
}

/// Conversion flavours. All of them are cheap to recompute.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CastKind {
    FloatToInt,
    IntToFloat,
    Int,
    Float,
    Reinterpret,
    Bit,
}

/// Operator of an instruction.
///
/// Operand conventions are documented per variant; the module's builder
/// is the intended way to create well-formed instructions.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Op {
    /// Function or block parameter. No operands.
    Param,
    /// Inert placeholder value. No operands, no parent block.
    Void,
    Literal(Literal),
    /// `[lhs, rhs]`
    Binary(BinaryOp),
    /// `[operand]`
    Unary(UnaryOp),
    /// `[args...]`
    Call(FuncId),

    // ── Memory ──────────────────────────────────────────────────
    /// Mutable local slot. Result type is `Ptr(T)`. No operands.
    Var,
    /// `[ptr]`
    Load,
    /// `[ptr, value]`. No result.
    Store,
    /// Address of a field: `[base_ptr]`.
    FieldAddress(FieldKey),

    // ── Views (projections of an existing value) ────────────────
    /// `[base]`
    FieldExtract(FieldKey),
    /// `[base, index]`
    GetElement,
    /// `[base, index, value]`
    UpdateElement,
    /// `[base]`
    Swizzle(SmallVec<[u8; 4]>),
    /// `[base]`
    MatrixReshape,
    /// `[base]`
    VectorReshape,
    /// `[optional]`
    OptionalHasValue,
    /// `[optional]`
    GetOptionalValue,

    // ── Construction and conversion ─────────────────────────────
    /// `[value]`
    Cast(CastKind),
    /// `[scalar]`
    MakeVectorFromScalar,
    /// `[scalar]`
    MakeMatrixFromScalar,
    /// Zero/default value of the result type. No operands.
    DefaultConstruct,
    /// `[fields...]`
    MakeStruct,
    /// `[elems...]`
    MakeTuple,
    /// `[elems...]`
    MakeArray,
    /// `[elem]`
    MakeArrayFromElement,
    MakeOptionalNone,
    /// `[value]`
    MakeOptionalValue,
    /// `[primal, differential]`
    MakeDiffPair,
    /// `[pair]`
    DiffPairGetPrimal,
    /// `[pair]`
    DiffPairGetDifferential,
    /// `[existential]`
    ExtractExistentialValue,
    /// `[existential]`
    ExtractExistentialType,
    /// `[existential]`
    ExtractExistentialWitnessTable,

    // ── Terminators ─────────────────────────────────────────────
    /// `[]` or `[value]`
    Return,
    /// `[args...]` passed to the target's block parameters.
    Jump(BlockId),
    /// `[cond]`
    Branch {
        then_block: BlockId,
        else_block: BlockId,
    },
    Unreachable,
}

impl Op {
    /// Returns `true` for control-transfer instructions.
    pub fn is_terminator(&self) -> bool {
        matches!(
            self,
            Op::Return | Op::Jump(_) | Op::Branch { .. } | Op::Unreachable
        )
    }

    /// Successor blocks of a terminator (empty for everything else).
    pub fn successors(&self) -> SmallVec<[BlockId; 2]> {
        match self {
            Op::Jump(target) => smallvec::smallvec![*target],
            Op::Branch {
                then_block,
                else_block,
            } => smallvec::smallvec![*then_block, *else_block],
            _ => SmallVec::new(),
        }
    }

    /// Rewrite successor block ids in place.
    pub fn map_successors(&mut self, mut f: impl FnMut(BlockId) -> BlockId) {
        match self {
            Op::Jump(target) => *target = f(*target),
            Op::Branch {
                then_block,
                else_block,
            } => {
                *then_block = f(*then_block);
                *else_block = f(*else_block);
            }
            _ => {}
        }
    }

    /// Short mnemonic used by the printer.
    pub fn mnemonic(&self) -> &'static str {
        match self {
            Op::Param => "param",
            Op::Void => "void",
            Op::Literal(_) => "lit",
            Op::Binary(BinaryOp::Add) => "add",
            Op::Binary(BinaryOp::Sub) => "sub",
            Op::Binary(BinaryOp::Mul) => "mul",
            Op::Binary(BinaryOp::Div) => "div",
            Op::Binary(BinaryOp::Less) => "lt",
            Op::Binary(BinaryOp::Greater) => "gt",
            Op::Binary(BinaryOp::Equal) => "eq",
            Op::Unary(UnaryOp::Neg) => "neg",
            Op::Unary(UnaryOp::Not) => "not",
            Op::Call(_) => "call",
            Op::Var => "var",
            Op::Load => "load",
            Op::Store => "store",
            Op::FieldAddress(_) => "field_addr",
            Op::FieldExtract(_) => "field_extract",
            Op::GetElement => "get_element",
            Op::UpdateElement => "update_element",
            Op::Swizzle(_) => "swizzle",
            Op::MatrixReshape => "matrix_reshape",
            Op::VectorReshape => "vector_reshape",
            Op::OptionalHasValue => "optional_has_value",
            Op::GetOptionalValue => "get_optional_value",
            Op::Cast(_) => "cast",
            Op::MakeVectorFromScalar => "make_vector_from_scalar",
            Op::MakeMatrixFromScalar => "make_matrix_from_scalar",
            Op::DefaultConstruct => "default",
            Op::MakeStruct => "make_struct",
            Op::MakeTuple => "make_tuple",
            Op::MakeArray => "make_array",
            Op::MakeArrayFromElement => "make_array_from_element",
            Op::MakeOptionalNone => "make_optional_none",
            Op::MakeOptionalValue => "make_optional_value",
            Op::MakeDiffPair => "make_diff_pair",
            Op::DiffPairGetPrimal => "diff_pair_primal",
            Op::DiffPairGetDifferential => "diff_pair_differential",
            Op::ExtractExistentialValue => "extract_existential_value",
            Op::ExtractExistentialType => "extract_existential_type",
            Op::ExtractExistentialWitnessTable => "extract_existential_witness",
            Op::Return => "return",
            Op::Jump(_) => "jump",
            Op::Branch { .. } => "branch",
            Op::Unreachable => "unreachable",
        }
    }
}

/// One operand edge seen from the defining side: `user.operands[slot]`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Use {
    pub user: InstId,
    pub slot: u32,
}

/// Arena record of an instruction.
#[derive(Clone, Debug)]
pub struct InstData {
    pub op: Op,
    pub ty: Option<Idx>,
    pub(crate) operands: SmallVec<[InstId; 4]>,
    /// Reverse adjacency, maintained by the module on every operand edit.
    pub(crate) uses: Vec<Use>,
    pub(crate) parent: Option<BlockId>,
    pub(crate) live: bool,
}

impl InstData {
    pub fn operands(&self) -> &[InstId] {
        &self.operands
    }

    pub fn uses(&self) -> &[Use] {
        &self.uses
    }

    pub fn parent(&self) -> Option<BlockId> {
        self.parent
    }

    pub fn is_live(&self) -> bool {
        self.live
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminators() {
        assert!(Op::Return.is_terminator());
        assert!(Op::Jump(BlockId::new(1)).is_terminator());
        assert!(Op::Unreachable.is_terminator());
        assert!(!Op::Store.is_terminator());
    }

    #[test]
    fn successors_and_remap() {
        let mut op = Op::Branch {
            then_block: BlockId::new(1),
            else_block: BlockId::new(2),
        };
        assert_eq!(
            op.successors().as_slice(),
            &[BlockId::new(1), BlockId::new(2)]
        );
        op.map_successors(|b| BlockId::new(b.raw() + 10));
        assert_eq!(
            op.successors().as_slice(),
            &[BlockId::new(11), BlockId::new(12)]
        );
        assert!(Op::Return.successors().is_empty());
    }

    #[test]
    fn float_literal_round_trips_bits() {
        let Literal::Float(bits) = Literal::float(2.5) else {
            panic!("expected float literal");
        };
        assert!((f64::from_bits(bits) - 2.5).abs() < f64::EPSILON);
    }
}

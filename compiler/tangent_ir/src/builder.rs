//! Instruction builder with a movable insertion point.
//!
//! The builder borrows the module mutably and emits instructions at its
//! current [`InsertPoint`]. Emitting at `After(x)` advances the point to
//! the new instruction, and emitting at `Before(x)` leaves it in place,
//! so a run of emits always comes out in program order.

use smallvec::SmallVec;

use crate::ids::{BlockId, FieldKey, FuncId, InstId};
use crate::inst::{BinaryOp, CastKind, Literal, Op, UnaryOp};
use crate::module::{InsertPoint, Module};
use crate::types::Idx;

pub struct Builder<'m> {
    module: &'m mut Module,
    point: InsertPoint,
}

impl<'m> Builder<'m> {
    pub fn new(module: &'m mut Module, point: InsertPoint) -> Self {
        Self { module, point }
    }

    /// Builder appending to the end of `block`.
    pub fn at_end(module: &'m mut Module, block: BlockId) -> Self {
        Self::new(module, InsertPoint::End(block))
    }

    pub fn module(&mut self) -> &mut Module {
        self.module
    }

    pub fn point(&self) -> InsertPoint {
        self.point
    }

    pub fn set_point(&mut self, point: InsertPoint) {
        self.point = point;
    }

    /// Emit an arbitrary instruction at the insertion point.
    pub fn emit(&mut self, op: Op, ty: Option<Idx>, operands: &[InstId]) -> InstId {
        let id = self.module.insert_inst(self.point, op, ty, operands);
        if let InsertPoint::After(_) = self.point {
            self.point = InsertPoint::After(id);
        }
        id
    }

    pub fn param(&mut self, ty: Idx) -> InstId {
        self.emit(Op::Param, Some(ty), &[])
    }

    pub fn literal(&mut self, lit: Literal) -> InstId {
        let ty = match lit {
            Literal::Int(_) => Idx::INT,
            Literal::Float(_) => Idx::FLOAT,
            Literal::Bool(_) => Idx::BOOL,
        };
        self.emit(Op::Literal(lit), Some(ty), &[])
    }

    pub fn float(&mut self, value: f64) -> InstId {
        self.literal(Literal::float(value))
    }

    pub fn int(&mut self, value: i64) -> InstId {
        self.literal(Literal::Int(value))
    }

    /// Arithmetic keeps the left operand's type; comparisons yield `bool`.
    pub fn binary(&mut self, op: BinaryOp, lhs: InstId, rhs: InstId) -> InstId {
        let ty = match op {
            BinaryOp::Less | BinaryOp::Greater | BinaryOp::Equal => Some(Idx::BOOL),
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div => {
                self.module.ty(lhs)
            }
        };
        self.emit(Op::Binary(op), ty, &[lhs, rhs])
    }

    pub fn unary(&mut self, op: UnaryOp, operand: InstId) -> InstId {
        let ty = self.module.ty(operand);
        self.emit(Op::Unary(op), ty, &[operand])
    }

    pub fn call(&mut self, callee: FuncId, ty: Idx, args: &[InstId]) -> InstId {
        self.emit(Op::Call(callee), Some(ty), args)
    }

    /// A mutable local slot holding a `value_ty`. The result is a pointer.
    pub fn var(&mut self, value_ty: Idx) -> InstId {
        let ptr = self.module.types.ptr(value_ty);
        self.emit(Op::Var, Some(ptr), &[])
    }

    /// # Panics
    ///
    /// Panics if `ptr` is not pointer-typed.
    pub fn load(&mut self, ptr: InstId) -> InstId {
        let ty = self
            .module
            .ty(ptr)
            .and_then(|t| self.module.types.pointee(t))
            .unwrap_or_else(|| panic!("load from non-pointer {ptr}"));
        self.emit(Op::Load, Some(ty), &[ptr])
    }

    pub fn store(&mut self, ptr: InstId, value: InstId) -> InstId {
        self.emit(Op::Store, None, &[ptr, value])
    }

    pub fn field_address(&mut self, base: InstId, key: FieldKey, ptr_ty: Idx) -> InstId {
        self.emit(Op::FieldAddress(key), Some(ptr_ty), &[base])
    }

    pub fn field_extract(&mut self, base: InstId, key: FieldKey, ty: Idx) -> InstId {
        self.emit(Op::FieldExtract(key), Some(ty), &[base])
    }

    pub fn get_element(&mut self, ty: Idx, base: InstId, index: InstId) -> InstId {
        self.emit(Op::GetElement, Some(ty), &[base, index])
    }

    pub fn swizzle(&mut self, ty: Idx, base: InstId, lanes: &[u8]) -> InstId {
        let lanes: SmallVec<[u8; 4]> = lanes.iter().copied().collect();
        self.emit(Op::Swizzle(lanes), Some(ty), &[base])
    }

    pub fn cast(&mut self, kind: CastKind, ty: Idx, value: InstId) -> InstId {
        self.emit(Op::Cast(kind), Some(ty), &[value])
    }

    pub fn default_construct(&mut self, ty: Idx) -> InstId {
        self.emit(Op::DefaultConstruct, Some(ty), &[])
    }

    pub fn make_struct(&mut self, ty: Idx, fields: &[InstId]) -> InstId {
        self.emit(Op::MakeStruct, Some(ty), fields)
    }

    pub fn make_diff_pair(&mut self, ty: Idx, primal: InstId, differential: InstId) -> InstId {
        self.emit(Op::MakeDiffPair, Some(ty), &[primal, differential])
    }

    pub fn diff_pair_primal(&mut self, ty: Idx, pair: InstId) -> InstId {
        self.emit(Op::DiffPairGetPrimal, Some(ty), &[pair])
    }

    pub fn diff_pair_differential(&mut self, ty: Idx, pair: InstId) -> InstId {
        self.emit(Op::DiffPairGetDifferential, Some(ty), &[pair])
    }

    pub fn ret(&mut self, value: Option<InstId>) -> InstId {
        match value {
            Some(v) => self.emit(Op::Return, None, &[v]),
            None => self.emit(Op::Return, None, &[]),
        }
    }

    pub fn jump(&mut self, target: BlockId, args: &[InstId]) -> InstId {
        self.emit(Op::Jump(target), None, args)
    }

    pub fn branch(&mut self, cond: InstId, then_block: BlockId, else_block: BlockId) -> InstId {
        self.emit(
            Op::Branch {
                then_block,
                else_block,
            },
            None,
            &[cond],
        )
    }

    pub fn unreachable(&mut self) -> InstId {
        self.emit(Op::Unreachable, None, &[])
    }
}

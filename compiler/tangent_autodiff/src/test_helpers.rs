//! Shared builders for pass tests. Only compiled in test builds.

use tangent_ir::{BinaryOp, BlockId, Builder, FuncId, GenericId, Idx, InstId, Module, Tag};

/// A function whose parameter block already jumps to an empty body block.
pub(crate) struct Skeleton {
    pub func: FuncId,
    pub params: Vec<InstId>,
    pub body: BlockId,
}

/// Build `name(params) -> result`, optionally inside `generic`.
pub(crate) fn make_func(
    m: &mut Module,
    name: &str,
    params: &[Idx],
    result: Idx,
    generic: Option<GenericId>,
) -> Skeleton {
    let fn_ty = m.types.func(params.to_vec(), result);
    let func = m.add_func(Some(name), fn_ty, generic);
    let param_block = m.add_block(func);
    let body = m.add_block(func);
    let mut b = Builder::at_end(m, param_block);
    let params = params.iter().map(|&ty| b.param(ty)).collect();
    b.jump(body, &[]);
    Skeleton { func, params, body }
}

/// Body-less function carrying only a name and a signature.
pub(crate) fn make_decl(
    m: &mut Module,
    name: &str,
    params: &[Idx],
    result: Idx,
    generic: Option<GenericId>,
) -> FuncId {
    let fn_ty = m.types.func(params.to_vec(), result);
    m.add_func(Some(name), fn_ty, generic)
}

/// Append a block tagged `Differential` to `func`.
pub(crate) fn diff_block(m: &mut Module, func: FuncId) -> BlockId {
    let block = m.add_block(func);
    m.add_tag(block, Tag::Differential);
    block
}

/// The two-block interleaved function
///
/// ```text
/// bb1 (primal):        a = x * 2; b = a + 1; -> bb2, primal result b
/// bb2 (differential):  d = seed * a; return d
/// ```
///
/// with its original `square(x: float, slot: int) -> float`.
pub(crate) struct Square {
    pub func: FuncId,
    pub original: FuncId,
    pub x: InstId,
    pub slot: InstId,
    pub primal: BlockId,
    pub diff: BlockId,
    pub a: InstId,
    pub b: InstId,
    pub d: InstId,
}

pub(crate) fn square(m: &mut Module) -> Square {
    let params = [Idx::FLOAT, Idx::INT];
    let original = make_decl(m, "square", &params, Idx::FLOAT, None);
    let f = make_func(m, "square_interleaved", &params, Idx::FLOAT, None);
    let (x, slot) = (f.params[0], f.params[1]);
    let diff = diff_block(m, f.func);

    let mut bld = Builder::at_end(m, f.body);
    let two = bld.float(2.0);
    let a = bld.binary(BinaryOp::Mul, x, two);
    let one = bld.float(1.0);
    let b = bld.binary(BinaryOp::Add, a, one);
    let jump = bld.jump(diff, &[]);
    m.add_tag(jump, Tag::PrimalReturn(b));
    m.set_name_hint(a, "a");

    let mut bld = Builder::at_end(m, diff);
    let seed = bld.float(1.0);
    let d = bld.binary(BinaryOp::Mul, seed, a);
    bld.ret(Some(d));

    Square {
        func: f.func,
        original,
        x,
        slot,
        primal: f.body,
        diff,
        a,
        b,
        d,
    }
}

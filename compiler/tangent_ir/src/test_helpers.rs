//! Shared test utilities for the IR tests. Only compiled in test builds.

use crate::builder::Builder;
use crate::ids::{BlockId, FuncId, InstId};
use crate::module::Module;
use crate::types::Idx;

/// A freshly built function: parameter block plus one empty body block.
pub(crate) struct Skeleton {
    pub func: FuncId,
    pub param_block: BlockId,
    pub params: Vec<InstId>,
    pub body: BlockId,
}

/// Build `name(params) -> result` with the parameter block already
/// jumping to an empty body block.
pub(crate) fn make_func(m: &mut Module, name: &str, params: &[Idx], result: Idx) -> Skeleton {
    let fn_ty = m.types.func(params.to_vec(), result);
    let func = m.add_func(Some(name), fn_ty, None);
    let param_block = m.add_block(func);
    let body = m.add_block(func);
    let mut b = Builder::at_end(m, param_block);
    let params = params.iter().map(|&ty| b.param(ty)).collect();
    b.jump(body, &[]);
    Skeleton {
        func,
        param_block,
        params,
        body,
    }
}

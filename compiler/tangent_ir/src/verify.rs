//! Structural validation of functions.
//!
//! Run after a transformation to catch broken invariants early. The
//! verifier reports the first problem it finds; it never mutates the
//! module.

use crate::graph::DominatorTree;
use crate::ids::{BlockId, FuncId, InstId};
use crate::inst::Op;
use crate::module::Module;

/// A broken structural invariant.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum VerifyError {
    #[error("{func} has no blocks")]
    NoBlocks { func: FuncId },
    #[error("{block} is empty")]
    EmptyBlock { block: BlockId },
    #[error("{block} does not end in a terminator")]
    MissingTerminator { block: BlockId },
    #[error("terminator {inst} is not the last instruction of {block}")]
    TerminatorNotLast { block: BlockId, inst: InstId },
    #[error("parameter {inst} follows an ordinary instruction in {block}")]
    ParamNotAtHead { block: BlockId, inst: InstId },
    #[error("parameter block {block} must hold only parameters and a jump")]
    ParamBlockShape { block: BlockId },
    #[error("{inst} is listed in {block} but its parent is {actual:?}")]
    WrongParent {
        block: BlockId,
        inst: InstId,
        actual: Option<BlockId>,
    },
    #[error("{user} uses removed instruction {operand}")]
    DeadOperand { user: InstId, operand: InstId },
    #[error("{user} uses {operand}, which belongs to another function")]
    ForeignOperand { user: InstId, operand: InstId },
    #[error("{user} uses {operand}, which does not dominate it")]
    NotDominated { user: InstId, operand: InstId },
    #[error("{block} branches to {target}, which is removed or in another function")]
    BadSuccessor { block: BlockId, target: BlockId },
    #[error("jump {inst} passes {given} arguments to {target}, which takes {expected}")]
    JumpArity {
        inst: InstId,
        target: BlockId,
        given: usize,
        expected: usize,
    },
}

/// Check the structural invariants of `func`.
pub fn verify_function(module: &Module, func: FuncId) -> Result<(), VerifyError> {
    let blocks = module.func_blocks(func);
    let Some(&param_block) = blocks.first() else {
        return Err(VerifyError::NoBlocks { func });
    };

    for &block in blocks {
        verify_block_shape(module, func, block)?;
    }
    verify_param_block(module, param_block)?;

    let dom = DominatorTree::build(module, func);
    for &block in blocks {
        if !dom.is_reachable(block) {
            continue;
        }
        for &inst in module.block_insts(block) {
            for &operand in module.operands(inst) {
                verify_operand(module, func, &dom, inst, operand)?;
            }
        }
    }
    Ok(())
}

fn verify_block_shape(module: &Module, func: FuncId, block: BlockId) -> Result<(), VerifyError> {
    let insts = module.block_insts(block);
    let Some((&last, body)) = insts.split_last() else {
        return Err(VerifyError::EmptyBlock { block });
    };
    if !module.op(last).is_terminator() {
        return Err(VerifyError::MissingTerminator { block });
    }

    let mut seen_ordinary = false;
    for &inst in insts {
        let actual = module.parent(inst);
        if actual != Some(block) || !module.is_live(inst) {
            return Err(VerifyError::WrongParent {
                block,
                inst,
                actual,
            });
        }
        if *module.op(inst) == Op::Param {
            if seen_ordinary {
                return Err(VerifyError::ParamNotAtHead { block, inst });
            }
        } else {
            seen_ordinary = true;
        }
    }
    if let Some(&inst) = body.iter().find(|&&i| module.op(i).is_terminator()) {
        return Err(VerifyError::TerminatorNotLast { block, inst });
    }

    let terminator = last;
    for target in module.op(terminator).successors() {
        if !module.is_block_live(target) || module.block_func(target) != func {
            return Err(VerifyError::BadSuccessor { block, target });
        }
        if let Op::Jump(_) = module.op(terminator) {
            let given = module.operands(terminator).len();
            let expected = module.block_params(target).count();
            if given != expected {
                return Err(VerifyError::JumpArity {
                    inst: terminator,
                    target,
                    given,
                    expected,
                });
            }
        }
    }
    Ok(())
}

fn verify_param_block(module: &Module, block: BlockId) -> Result<(), VerifyError> {
    let mut ordinary = module.ordinary_insts(block);
    match (ordinary.next(), ordinary.next()) {
        (Some(jump), None) if matches!(module.op(jump), Op::Jump(_)) => Ok(()),
        _ => Err(VerifyError::ParamBlockShape { block }),
    }
}

fn verify_operand(
    module: &Module,
    func: FuncId,
    dom: &DominatorTree,
    user: InstId,
    operand: InstId,
) -> Result<(), VerifyError> {
    if operand == module.void_value() {
        return Ok(());
    }
    if !module.is_live(operand) {
        return Err(VerifyError::DeadOperand { user, operand });
    }
    let (Some(def_block), Some(use_block)) = (module.parent(operand), module.parent(user)) else {
        return Err(VerifyError::DeadOperand { user, operand });
    };
    if module.block_func(def_block) != func {
        return Err(VerifyError::ForeignOperand { user, operand });
    }
    let dominated = if def_block == use_block {
        module.position_in_block(operand) < module.position_in_block(user)
    } else {
        dom.dominates(def_block, use_block)
    };
    if dominated {
        Ok(())
    } else {
        Err(VerifyError::NotDominated { user, operand })
    }
}

#[cfg(test)]
mod tests;

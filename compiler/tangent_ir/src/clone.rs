//! Deep cloning of functions.
//!
//! Cloning runs in two phases so that operand order does not matter:
//! first every block and instruction of the source function gets a
//! counterpart with an empty operand list, then operand lists, branch
//! targets and instruction-referencing tags are rewritten through the
//! resulting [`CloneEnv`]. Operands defined outside the function (the
//! module's void value) are kept as they are.

use rustc_hash::FxHashMap;

use crate::ids::{BlockId, FuncId, InstId};
use crate::module::{InsertPoint, Module};
use crate::tags::Tag;

/// Old-to-new correspondence produced by one clone.
#[derive(Default, Debug)]
pub struct CloneEnv {
    insts: FxHashMap<InstId, InstId>,
    blocks: FxHashMap<BlockId, BlockId>,
}

impl CloneEnv {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_inst(&self, old: InstId) -> Option<InstId> {
        self.insts.get(&old).copied()
    }

    pub fn get_block(&self, old: BlockId) -> Option<BlockId> {
        self.blocks.get(&old).copied()
    }

    /// Clone of `old`.
    ///
    /// # Panics
    ///
    /// Panics if `old` was not part of the cloned function. Callers only
    /// translate ids that belong to it, so a miss is a compiler bug.
    pub fn inst(&self, old: InstId) -> InstId {
        self.get_inst(old)
            .unwrap_or_else(|| panic!("no clone recorded for instruction {old}"))
    }

    /// Clone of block `old`.
    ///
    /// # Panics
    ///
    /// Panics if `old` was not part of the cloned function.
    pub fn block(&self, old: BlockId) -> BlockId {
        self.get_block(old)
            .unwrap_or_else(|| panic!("no clone recorded for block {old}"))
    }

    /// Record a correspondence by hand.
    pub fn map_inst(&mut self, old: InstId, new: InstId) {
        self.insts.insert(old, new);
    }

    /// All recorded instruction pairs.
    pub fn inst_pairs(&self) -> impl Iterator<Item = (InstId, InstId)> + '_ {
        self.insts.iter().map(|(&old, &new)| (old, new))
    }
}

/// Clone `func` into a new function in the same envelope, recording the
/// correspondence in `env`. Function-level tags are copied.
pub fn clone_function(module: &mut Module, func: FuncId, env: &mut CloneEnv) -> FuncId {
    let data = module.func(func);
    let (ty, generic) = (data.ty, data.generic);
    let new_func = module.add_func(None, ty, generic);
    for tag in module.tags(func).to_vec() {
        module.add_tag(new_func, tag);
    }

    // Phase 1: blocks and operand-less instructions.
    let old_blocks = module.func_blocks(func).to_vec();
    let mut pending = Vec::new();
    for &old_block in &old_blocks {
        let new_block = module.add_block(new_func);
        env.blocks.insert(old_block, new_block);
        for tag in module.tags(old_block).to_vec() {
            module.add_tag(new_block, tag);
        }
        for &old_inst in &module.block_insts(old_block).to_vec() {
            let op = module.op(old_inst).clone();
            let ty = module.ty(old_inst);
            let new_inst = module.insert_inst(InsertPoint::End(new_block), op, ty, &[]);
            env.insts.insert(old_inst, new_inst);
            pending.push((old_inst, new_inst));
        }
    }

    // Phase 2: operands, successors and tags through the map.
    for (old_inst, new_inst) in pending {
        let operands: Vec<InstId> = module
            .operands(old_inst)
            .iter()
            .map(|&o| env.get_inst(o).unwrap_or(o))
            .collect();
        module.set_operands(new_inst, &operands);

        let mut op = module.op(new_inst).clone();
        if op.is_terminator() {
            op.map_successors(|b| env.block(b));
            module.set_op(new_inst, op);
        }

        for tag in module.tags(old_inst).to_vec() {
            let tag = match tag {
                Tag::PrimalReturn(value) => Tag::PrimalReturn(env.get_inst(value).unwrap_or(value)),
                other => other,
            };
            module.add_tag(new_inst, tag);
        }
    }

    new_func
}

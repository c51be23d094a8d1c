//! The compilation module: owner of every instruction, block, function,
//! type and tag.
//!
//! The module is an arena. Instructions, blocks and functions are records
//! addressed by stable ids; operand edges are id lists and the reverse
//! edges (use lists) are maintained incrementally by every mutating call
//! in this file. Nothing outside this module touches `operands` or
//! `uses` directly, which is what keeps the two directions in sync.
//!
//! # Removal
//!
//! Removing an instruction severs its operand edges. If anything still
//! uses it, those operand slots are redirected to the module's inert
//! [`void_value`](Module::void_value) so no edge ever points at a dead
//! record.

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::ids::{BlockId, FieldKey, FuncId, GenericId, InstId};
use crate::inst::{InstData, Op, Use};
use crate::name::{Interner, Name};
use crate::tags::{Tag, TagKind, TagList, TagTarget};
use crate::types::{Idx, TypePool};

/// Arena record of a basic block.
#[derive(Clone, Debug)]
pub struct BlockData {
    pub(crate) func: FuncId,
    pub(crate) insts: Vec<InstId>,
    pub(crate) live: bool,
}

/// Arena record of a function.
#[derive(Clone, Debug)]
pub struct FuncData {
    /// Function type (`TypeKind::Func`).
    pub ty: Idx,
    /// Envelope the function body lives in.
    pub generic: Option<GenericId>,
    pub(crate) blocks: Vec<BlockId>,
    pub(crate) live: bool,
}

/// Where a new instruction goes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InsertPoint {
    Before(InstId),
    After(InstId),
    /// Append to the end of the block.
    End(BlockId),
}

/// A compilation module.
pub struct Module {
    pub types: TypePool,
    names: Interner,
    insts: Vec<InstData>,
    blocks: Vec<BlockData>,
    funcs: Vec<FuncData>,
    tags: FxHashMap<TagTarget, TagList>,
    void_value: InstId,
}

impl Module {
    pub fn new() -> Self {
        let mut module = Self {
            types: TypePool::new(),
            names: Interner::new(),
            insts: Vec::with_capacity(256),
            blocks: Vec::new(),
            funcs: Vec::new(),
            tags: FxHashMap::default(),
            void_value: InstId::new(0),
        };
        module.void_value = module.alloc_inst(Op::Void, Some(Idx::VOID), None);
        module
    }

    // ── Names ───────────────────────────────────────────────────

    pub fn intern(&mut self, s: &str) -> Name {
        self.names.intern(s)
    }

    pub fn name_str(&self, name: Name) -> &str {
        self.names.lookup(name)
    }

    // ── Functions ───────────────────────────────────────────────

    /// Create an empty function. A name, when given, becomes its name hint.
    pub fn add_func(&mut self, name: Option<&str>, ty: Idx, generic: Option<GenericId>) -> FuncId {
        let id = FuncId::from_len(self.funcs.len());
        self.funcs.push(FuncData {
            ty,
            generic,
            blocks: Vec::new(),
            live: true,
        });
        if let Some(name) = name {
            self.set_name_hint(id, name);
        }
        id
    }

    pub fn func(&self, func: FuncId) -> &FuncData {
        &self.funcs[func.index()]
    }

    pub fn set_func_type(&mut self, func: FuncId, ty: Idx) {
        self.funcs[func.index()].ty = ty;
    }

    /// All live functions, in creation order.
    pub fn funcs(&self) -> impl Iterator<Item = FuncId> + '_ {
        self.funcs
            .iter()
            .enumerate()
            .filter(|(_, f)| f.live)
            .map(|(i, _)| FuncId::from_len(i))
    }

    /// Live blocks of a function, in layout order.
    pub fn func_blocks(&self, func: FuncId) -> &[BlockId] {
        &self.funcs[func.index()].blocks
    }

    /// The parameter block (always the first block).
    pub fn param_block(&self, func: FuncId) -> Option<BlockId> {
        self.func_blocks(func).first().copied()
    }

    /// The block the parameter block jumps to.
    pub fn first_body_block(&self, func: FuncId) -> Option<BlockId> {
        let param_block = self.param_block(func)?;
        self.successors(param_block).first().copied()
    }

    /// Parameters of the function, in order.
    pub fn func_params(&self, func: FuncId) -> Vec<InstId> {
        self.param_block(func)
            .map(|b| self.block_params(b).collect())
            .unwrap_or_default()
    }

    pub fn func_name(&self, func: FuncId) -> Option<&str> {
        self.name_hint(func).map(|n| self.name_str(n))
    }

    // ── Blocks ──────────────────────────────────────────────────

    /// Append an empty block to `func`.
    pub fn add_block(&mut self, func: FuncId) -> BlockId {
        let id = BlockId::from_len(self.blocks.len());
        self.blocks.push(BlockData {
            func,
            insts: Vec::new(),
            live: true,
        });
        self.funcs[func.index()].blocks.push(id);
        id
    }

    pub fn block_insts(&self, block: BlockId) -> &[InstId] {
        &self.blocks[block.index()].insts
    }

    pub fn block_func(&self, block: BlockId) -> FuncId {
        self.blocks[block.index()].func
    }

    pub fn is_block_live(&self, block: BlockId) -> bool {
        self.blocks[block.index()].live
    }

    /// Leading `Param` instructions of a block.
    pub fn block_params(&self, block: BlockId) -> impl Iterator<Item = InstId> + '_ {
        self.block_insts(block)
            .iter()
            .copied()
            .take_while(move |&i| self.insts[i.index()].op == Op::Param)
    }

    /// First instruction that is not a parameter.
    pub fn first_ordinary_inst(&self, block: BlockId) -> Option<InstId> {
        self.block_insts(block)
            .iter()
            .copied()
            .find(|&i| self.insts[i.index()].op != Op::Param)
    }

    /// Instructions after the block parameters.
    pub fn ordinary_insts(&self, block: BlockId) -> impl Iterator<Item = InstId> + '_ {
        self.block_insts(block)
            .iter()
            .copied()
            .skip_while(move |&i| self.insts[i.index()].op == Op::Param)
    }

    /// The block's terminator, if its last instruction is one.
    pub fn terminator(&self, block: BlockId) -> Option<InstId> {
        self.block_insts(block)
            .last()
            .copied()
            .filter(|&i| self.insts[i.index()].op.is_terminator())
    }

    pub fn successors(&self, block: BlockId) -> SmallVec<[BlockId; 2]> {
        self.terminator(block)
            .map(|t| self.op(t).successors())
            .unwrap_or_default()
    }

    /// Remove a block and every instruction in it.
    pub fn remove_block(&mut self, block: BlockId) {
        debug_assert!(self.is_block_live(block), "removing dead block {block}");
        let insts = self.blocks[block.index()].insts.clone();
        for &inst in insts.iter().rev() {
            self.remove_inst(inst);
        }
        let func = self.block_func(block);
        self.funcs[func.index()].blocks.retain(|&b| b != block);
        self.blocks[block.index()].live = false;
        self.tags.remove(&TagTarget::Block(block));
    }

    // ── Instructions ────────────────────────────────────────────

    pub fn inst(&self, inst: InstId) -> &InstData {
        &self.insts[inst.index()]
    }

    #[inline]
    pub fn op(&self, inst: InstId) -> &Op {
        &self.insts[inst.index()].op
    }

    #[inline]
    pub fn ty(&self, inst: InstId) -> Option<Idx> {
        self.insts[inst.index()].ty
    }

    /// Replace the operator of an instruction, keeping its operands.
    pub fn set_op(&mut self, inst: InstId, op: Op) {
        self.insts[inst.index()].op = op;
    }

    /// Change the result type of an instruction in place.
    pub fn set_ty(&mut self, inst: InstId, ty: Option<Idx>) {
        self.insts[inst.index()].ty = ty;
    }

    #[inline]
    pub fn operands(&self, inst: InstId) -> &[InstId] {
        &self.insts[inst.index()].operands
    }

    /// # Panics
    ///
    /// Panics if `slot` is out of range.
    pub fn operand(&self, inst: InstId, slot: usize) -> InstId {
        self.insts[inst.index()].operands[slot]
    }

    #[inline]
    pub fn uses(&self, inst: InstId) -> &[Use] {
        &self.insts[inst.index()].uses
    }

    pub fn has_uses(&self, inst: InstId) -> bool {
        !self.uses(inst).is_empty()
    }

    #[inline]
    pub fn parent(&self, inst: InstId) -> Option<BlockId> {
        self.insts[inst.index()].parent
    }

    pub fn is_live(&self, inst: InstId) -> bool {
        self.insts[inst.index()].live
    }

    /// The inert placeholder value. Lives outside every block.
    pub fn void_value(&self) -> InstId {
        self.void_value
    }

    /// Position of `inst` within its parent block.
    pub fn position_in_block(&self, inst: InstId) -> Option<usize> {
        let block = self.parent(inst)?;
        self.block_insts(block).iter().position(|&i| i == inst)
    }

    fn alloc_inst(&mut self, op: Op, ty: Option<Idx>, parent: Option<BlockId>) -> InstId {
        let id = InstId::from_len(self.insts.len());
        self.insts.push(InstData {
            op,
            ty,
            operands: SmallVec::new(),
            uses: Vec::new(),
            parent,
            live: true,
        });
        id
    }

    /// Create an instruction at `point` and register its operand edges.
    ///
    /// # Panics
    ///
    /// Panics if `point` refers to an instruction that is not in a block.
    pub fn insert_inst(
        &mut self,
        point: InsertPoint,
        op: Op,
        ty: Option<Idx>,
        operands: &[InstId],
    ) -> InstId {
        let (block, pos) = match point {
            InsertPoint::End(block) => (block, self.block_insts(block).len()),
            InsertPoint::Before(anchor) | InsertPoint::After(anchor) => {
                let block = self
                    .parent(anchor)
                    .unwrap_or_else(|| panic!("insertion anchor {anchor} is not in a block"));
                let pos = self
                    .position_in_block(anchor)
                    .unwrap_or_else(|| panic!("insertion anchor {anchor} missing from {block}"));
                let pos = if matches!(point, InsertPoint::After(_)) {
                    pos + 1
                } else {
                    pos
                };
                (block, pos)
            }
        };
        let id = self.alloc_inst(op, ty, Some(block));
        self.blocks[block.index()].insts.insert(pos, id);
        self.set_operands(id, operands);
        id
    }

    /// Replace the whole operand list of `inst`.
    pub fn set_operands(&mut self, inst: InstId, operands: &[InstId]) {
        let old = std::mem::take(&mut self.insts[inst.index()].operands);
        for (slot, &value) in old.iter().enumerate() {
            self.unlink_use(value, inst, slot);
        }
        for (slot, &value) in operands.iter().enumerate() {
            self.link_use(value, inst, slot);
        }
        self.insts[inst.index()].operands = operands.iter().copied().collect();
    }

    /// Point `user.operands[slot]` at `value`.
    pub fn set_operand(&mut self, user: InstId, slot: usize, value: InstId) {
        let old = self.insts[user.index()].operands[slot];
        if old == value {
            return;
        }
        self.unlink_use(old, user, slot);
        self.link_use(value, user, slot);
        self.insts[user.index()].operands[slot] = value;
    }

    /// Redirect every use of `old` to `new`.
    pub fn replace_all_uses_with(&mut self, old: InstId, new: InstId) {
        if old == new {
            return;
        }
        let uses = std::mem::take(&mut self.insts[old.index()].uses);
        for u in uses {
            self.insts[u.user.index()].operands[u.slot as usize] = new;
            self.insts[new.index()].uses.push(u);
        }
    }

    /// Remove an instruction from its block and from the graph.
    pub fn remove_inst(&mut self, inst: InstId) {
        debug_assert!(self.is_live(inst), "removing dead instruction {inst}");
        debug_assert_ne!(inst, self.void_value, "the void value is never removed");

        self.set_operands(inst, &[]);
        if self.has_uses(inst) {
            self.replace_all_uses_with(inst, self.void_value);
        }
        if let Some(block) = self.parent(inst) {
            self.blocks[block.index()].insts.retain(|&i| i != inst);
        }
        let data = &mut self.insts[inst.index()];
        data.parent = None;
        data.live = false;
        self.tags.remove(&TagTarget::Inst(inst));
    }

    fn link_use(&mut self, value: InstId, user: InstId, slot: usize) {
        let slot = u32::try_from(slot).unwrap_or_else(|_| panic!("operand slot exceeds u32::MAX"));
        self.insts[value.index()].uses.push(Use { user, slot });
    }

    fn unlink_use(&mut self, value: InstId, user: InstId, slot: usize) {
        let uses = &mut self.insts[value.index()].uses;
        if let Some(pos) = uses
            .iter()
            .position(|u| u.user == user && u.slot as usize == slot)
        {
            uses.swap_remove(pos);
        } else {
            debug_assert!(false, "use list of {value} is missing ({user}, {slot})");
        }
    }

    // ── Tags ────────────────────────────────────────────────────

    pub fn tags(&self, target: impl Into<TagTarget>) -> &[Tag] {
        self.tags
            .get(&target.into())
            .map(|t| t.as_slice())
            .unwrap_or_default()
    }

    pub fn add_tag(&mut self, target: impl Into<TagTarget>, tag: Tag) {
        self.tags.entry(target.into()).or_default().push(tag);
    }

    pub fn has_tag(&self, target: impl Into<TagTarget>, kind: TagKind) -> bool {
        self.tags(target).iter().any(|t| t.kind() == kind)
    }

    pub fn find_tag(&self, target: impl Into<TagTarget>, kind: TagKind) -> Option<Tag> {
        self.tags(target).iter().copied().find(|t| t.kind() == kind)
    }

    pub fn remove_tags(&mut self, target: impl Into<TagTarget>, kind: TagKind) {
        let target = target.into();
        if let Some(list) = self.tags.get_mut(&target) {
            list.retain(|t| t.kind() != kind);
            if list.is_empty() {
                self.tags.remove(&target);
            }
        }
    }

    /// Move every tag of `from` onto `to`.
    pub fn transfer_tags(&mut self, from: impl Into<TagTarget>, to: impl Into<TagTarget>) {
        if let Some(list) = self.tags.remove(&from.into()) {
            self.tags.entry(to.into()).or_default().extend(list);
        }
    }

    pub fn name_hint(&self, target: impl Into<TagTarget>) -> Option<Name> {
        match self.find_tag(target, TagKind::NameHint) {
            Some(Tag::NameHint(name)) => Some(name),
            _ => None,
        }
    }

    /// Replace the name hint of `target`.
    pub fn set_name_hint(&mut self, target: impl Into<TagTarget>, name: &str) {
        let target = target.into();
        let name = self.intern(name);
        self.remove_tags(target, TagKind::NameHint);
        self.add_tag(target, Tag::NameHint(name));
    }

    pub fn primal_value_key(&self, inst: InstId) -> Option<FieldKey> {
        match self.find_tag(inst, TagKind::PrimalValueKey) {
            Some(Tag::PrimalValueKey(key)) => Some(key),
            _ => None,
        }
    }
}

impl Default for Module {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests;

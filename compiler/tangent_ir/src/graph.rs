//! CFG utilities over a function's blocks.
//!
//! Blocks are addressed by their position in the function's layout
//! (`local` index) while an analysis runs; [`BlockIndex`] translates
//! between [`BlockId`] and that position.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::ids::{BlockId, FuncId};
use crate::module::Module;

/// Dense numbering of a function's live blocks in layout order.
pub struct BlockIndex {
    blocks: Vec<BlockId>,
    local: FxHashMap<BlockId, usize>,
}

impl BlockIndex {
    pub fn new(module: &Module, func: FuncId) -> Self {
        let blocks = module.func_blocks(func).to_vec();
        let local = blocks.iter().enumerate().map(|(i, &b)| (b, i)).collect();
        Self { blocks, local }
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn local(&self, block: BlockId) -> Option<usize> {
        self.local.get(&block).copied()
    }

    pub fn block(&self, local: usize) -> BlockId {
        self.blocks[local]
    }
}

/// Distinct predecessors of each block, indexed by local index.
///
/// Successors outside the function are ignored.
pub fn compute_predecessors(module: &Module, index: &BlockIndex) -> Vec<Vec<usize>> {
    let mut predecessors: Vec<Vec<usize>> = vec![Vec::new(); index.len()];
    for (block_idx, &block) in index.blocks.iter().enumerate() {
        let mut seen = FxHashSet::default();
        for succ in module.successors(block) {
            if let Some(succ_idx) = index.local(succ) {
                if seen.insert(succ_idx) {
                    predecessors[succ_idx].push(block_idx);
                }
            }
        }
    }
    predecessors
}

/// Postorder of the blocks reachable from the first block.
///
/// Iterative DFS with an explicit stack, so deeply nested CFGs do not
/// recurse.
pub fn compute_postorder(module: &Module, index: &BlockIndex) -> Vec<usize> {
    let num_blocks = index.len();
    let mut postorder = Vec::with_capacity(num_blocks);
    if num_blocks == 0 {
        return postorder;
    }
    let mut visited = vec![false; num_blocks];

    // (block, children_pushed)
    let mut stack: Vec<(usize, bool)> = vec![(0, false)];
    while let Some(&mut (block_idx, ref mut children_done)) = stack.last_mut() {
        if *children_done {
            postorder.push(block_idx);
            stack.pop();
            continue;
        }
        *children_done = true;

        if visited[block_idx] {
            stack.pop();
            continue;
        }
        visited[block_idx] = true;

        for succ in module.successors(index.block(block_idx)) {
            if let Some(succ_idx) = index.local(succ) {
                if !visited[succ_idx] {
                    stack.push((succ_idx, false));
                }
            }
        }
    }
    postorder
}

/// Blocks reachable from the function's first block.
pub fn reachable_blocks(module: &Module, func: FuncId) -> FxHashSet<BlockId> {
    let index = BlockIndex::new(module, func);
    compute_postorder(module, &index)
        .into_iter()
        .map(|i| index.block(i))
        .collect()
}

/// Dominator tree (Cooper–Harvey–Kennedy iterative algorithm).
///
/// Reference: Cooper, Harvey, Kennedy, "A Simple, Fast Dominance Algorithm" (2001)
pub struct DominatorTree {
    index: BlockIndex,
    /// `idom[entry] == Some(entry)`; unreachable blocks stay `None`.
    idom: Vec<Option<usize>>,
}

impl DominatorTree {
    pub fn build(module: &Module, func: FuncId) -> Self {
        let index = BlockIndex::new(module, func);
        let n = index.len();
        if n == 0 {
            return Self { index, idom: vec![] };
        }

        let preds = compute_predecessors(module, &index);
        let mut rpo = compute_postorder(module, &index);
        rpo.reverse();

        let mut rpo_pos = vec![usize::MAX; n];
        for (pos, &block_idx) in rpo.iter().enumerate() {
            rpo_pos[block_idx] = pos;
        }

        let mut idom: Vec<Option<usize>> = vec![None; n];
        idom[0] = Some(0);

        let mut changed = true;
        while changed {
            changed = false;
            for &block_idx in &rpo[1..] {
                let Some(mut new_idom) = preds[block_idx]
                    .iter()
                    .copied()
                    .find(|&p| idom[p].is_some())
                else {
                    continue;
                };
                for &pred in &preds[block_idx] {
                    if pred != new_idom && idom[pred].is_some() {
                        new_idom = Self::intersect(pred, new_idom, &idom, &rpo_pos);
                    }
                }
                if idom[block_idx] != Some(new_idom) {
                    idom[block_idx] = Some(new_idom);
                    changed = true;
                }
            }
        }

        Self { index, idom }
    }

    /// Does block `a` dominate block `b`? A block dominates itself.
    ///
    /// Unreachable blocks are dominated by nothing but themselves.
    pub fn dominates(&self, a: BlockId, b: BlockId) -> bool {
        let (Some(a_idx), Some(mut current)) = (self.index.local(a), self.index.local(b)) else {
            return false;
        };
        loop {
            if current == a_idx {
                return true;
            }
            match self.idom[current] {
                Some(dom) if dom != current => current = dom,
                _ => return false,
            }
        }
    }

    /// Whether `block` is reachable from the entry.
    pub fn is_reachable(&self, block: BlockId) -> bool {
        self.index
            .local(block)
            .is_some_and(|i| self.idom[i].is_some())
    }

    fn intersect(mut a: usize, mut b: usize, idom: &[Option<usize>], rpo_pos: &[usize]) -> usize {
        while a != b {
            while rpo_pos[a] > rpo_pos[b] {
                let Some(next) = idom[a] else {
                    debug_assert!(false, "intersect: broken idom chain at {a}");
                    return a;
                };
                a = next;
            }
            while rpo_pos[b] > rpo_pos[a] {
                let Some(next) = idom[b] else {
                    debug_assert!(false, "intersect: broken idom chain at {b}");
                    return b;
                };
                b = next;
            }
        }
        a
    }
}

#[cfg(test)]
mod tests;

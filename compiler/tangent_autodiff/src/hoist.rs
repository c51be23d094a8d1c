//! Facts handed to the splitter by upstream passes.

use rustc_hash::FxHashSet;

use tangent_ir::{CloneEnv, FuncId, InstId, Module};

use crate::classify::DiffClassifier;
use crate::storage::StoragePolicy;

/// Primal instructions that must be persisted into the intermediate context.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HoistedPrimalsInfo {
    store_set: FxHashSet<InstId>,
}

impl HoistedPrimalsInfo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `policy` over the primal blocks of `func`, in layout order.
    ///
    /// The parameter block is skipped; function parameters are never
    /// stored. A projection whose base was selected earlier in the walk
    /// is not selected again.
    pub fn from_policy(
        module: &Module,
        func: FuncId,
        classifier: &DiffClassifier,
        policy: &StoragePolicy<'_>,
    ) -> Self {
        let mut info = Self::new();
        for &block in module.func_blocks(func).iter().skip(1) {
            if classifier.is_differential_block(module, block) {
                continue;
            }
            for &inst in module.block_insts(block) {
                if policy.should_store_with(inst, &info.store_set) {
                    info.store_set.insert(inst);
                }
            }
        }
        tracing::debug!(
            function = %func,
            stored = info.store_set.len(),
            "selected primal values to store"
        );
        info
    }

    pub fn insert(&mut self, inst: InstId) {
        self.store_set.insert(inst);
    }

    pub fn contains(&self, inst: InstId) -> bool {
        self.store_set.contains(&inst)
    }

    pub fn len(&self) -> usize {
        self.store_set.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store_set.is_empty()
    }

    /// The same set over the clone described by `env`.
    ///
    /// # Panics
    ///
    /// Panics if a member has no clone in `env`.
    pub fn apply_map(&self, env: &CloneEnv) -> Self {
        Self {
            store_set: self.store_set.iter().map(|&inst| env.inst(inst)).collect(),
        }
    }
}

/// Parameter classification produced by the parameter-block transposition.
#[derive(Clone, Debug, Default)]
pub struct ParameterBlockTransposeInfo {
    /// Parameters of the interleaved function kept by the primal function.
    pub primal_params: FxHashSet<InstId>,
    /// Instructions that only the differential function may execute.
    pub propagate_specific_insts: Vec<InstId>,
}

impl ParameterBlockTransposeInfo {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests;

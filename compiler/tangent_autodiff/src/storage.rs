//! Store-or-recompute policy for primal values.
//!
//! Decides which primal values must be persisted into the intermediate
//! context so that differential code can read them after the split.
//!
//! # Policy
//!
//! Storage is greedy and per value: a value is stored when it crosses
//! from primal into differential code and is not trivially recomputable.
//!
//! - **Local slots** (`Var`) hold addressable state and are never
//!   recomputed. They are stored when they carry a callee's context, when
//!   their type is itself an intermediate context, or when differential
//!   code uses them and something writes through them.
//! - **Ordinary values** are stored when a differential instruction
//!   consumes them, except for structurally trivial operators (the
//!   deny-list) and projections of a value that is already stored.
//!
//! Non-storability is an outcome, never an error.

use rustc_hash::FxHashSet;

use tangent_ir::{Idx, InstId, Module, Op, TagKind, TypeKind};

use crate::classify::DiffClassifier;

/// Storage decisions over one function.
pub struct StoragePolicy<'a> {
    module: &'a Module,
    classifier: &'a DiffClassifier,
    max_pointer_depth: usize,
}

impl<'a> StoragePolicy<'a> {
    pub fn new(module: &'a Module, classifier: &'a DiffClassifier) -> Self {
        Self {
            module,
            classifier,
            max_pointer_depth: 64,
        }
    }

    /// Bound the depth of the write search through pointer-typed users.
    #[must_use]
    pub fn with_max_pointer_depth(mut self, depth: usize) -> Self {
        self.max_pointer_depth = depth;
        self
    }

    /// Whether `inst` must be persisted into the intermediate context.
    ///
    /// A value counts as already stored when it carries a
    /// `PrimalValueKey` tag.
    pub fn should_store(&self, inst: InstId) -> bool {
        self.should_store_with(inst, &FxHashSet::default())
    }

    /// Like [`should_store`](Self::should_store), additionally treating
    /// every member of `pending` as already stored.
    pub fn should_store_with(&self, inst: InstId, pending: &FxHashSet<InstId>) -> bool {
        match self.module.op(inst) {
            Op::Var => self.should_store_var(inst),
            _ => self.should_store_inst(inst, pending),
        }
    }

    /// Decision for a local slot.
    pub fn should_store_var(&self, var: InstId) -> bool {
        let module = self.module;
        let pool = &module.types;
        let Some(ptr_ty) = module.ty(var) else {
            return false;
        };
        let pointee = pool.pointee(ptr_ty);

        if module.has_tag(var, TagKind::PrimalContext) {
            // A callee context specialized with unstorable arguments cannot
            // be kept even partially.
            return pointee.map_or(true, |ty| {
                pool.specialization_args(ty)
                    .iter()
                    .all(|&arg| pool.can_be_stored(arg))
            });
        }

        if self.is_intermediate_context_type(ptr_ty) {
            return true;
        }

        let Some(pointee) = pointee else {
            return false;
        };
        self.has_diff_use(var) && self.has_store(var) && pool.can_be_stored(pointee)
    }

    /// Decision for an ordinary value.
    pub fn should_store_inst(&self, inst: InstId, pending: &FxHashSet<InstId>) -> bool {
        let module = self.module;
        let Some(ty) = module.ty(inst) else {
            return false;
        };
        if !module.types.can_be_stored(ty) {
            return false;
        }

        let op = module.op(inst);
        if is_deny_listed(op) {
            return false;
        }
        if is_view_like(op) {
            let base = module.operand(inst, 0);
            if pending.contains(&base) || module.has_tag(base, TagKind::PrimalValueKey) {
                return false;
            }
        }

        self.has_diff_use(inst)
    }

    /// Whether some differential instruction consumes `inst`.
    ///
    /// A differential `Return`, and a differential `MakeDiffPair` whose
    /// only use is a `Return`, do not count: terminator rewriting deals
    /// with those.
    pub fn has_diff_use(&self, inst: InstId) -> bool {
        let module = self.module;
        module.uses(inst).iter().any(|u| {
            let user = u.user;
            if !self.classifier.is_differential(module, user) {
                return false;
            }
            match module.op(user) {
                Op::Return => false,
                Op::MakeDiffPair => !matches!(
                    module.uses(user),
                    [only] if *module.op(only.user) == Op::Return
                ),
                _ => true,
            }
        })
    }

    /// Whether a `Store` is reachable from `ptr` through pointer-typed users.
    ///
    /// Users already visited are skipped, so cyclic address graphs
    /// terminate. Addresses derived more than the configured depth away
    /// from `ptr` are not searched.
    pub fn has_store(&self, ptr: InstId) -> bool {
        let mut visited = FxHashSet::default();
        visited.insert(ptr);
        self.has_store_inner(ptr, 0, &mut visited)
    }

    fn has_store_inner(&self, ptr: InstId, depth: usize, visited: &mut FxHashSet<InstId>) -> bool {
        let module = self.module;
        for u in module.uses(ptr) {
            let user = u.user;
            if *module.op(user) == Op::Store {
                return true;
            }
            let ptr_like = module
                .ty(user)
                .is_some_and(|ty| module.types.is_ptr_like(ty));
            if !ptr_like || !visited.insert(user) {
                continue;
            }
            if depth + 1 > self.max_pointer_depth {
                tracing::warn!(
                    root = %ptr,
                    depth,
                    "pointer write search exceeded depth bound; assuming no store"
                );
                continue;
            }
            if self.has_store_inner(user, depth + 1, visited) {
                return true;
            }
        }
        false
    }

    /// Whether `ty` is, through `Ptr`/`InOut`/`Array` wrapping, a callee's
    /// intermediate context.
    pub fn is_intermediate_context_type(&self, ty: Idx) -> bool {
        let pool = &self.module.types;
        match pool.kind(ty) {
            TypeKind::IntermediateContext { .. } => true,
            TypeKind::Ptr(inner) | TypeKind::InOut(inner) => {
                self.is_intermediate_context_type(*inner)
            }
            TypeKind::Array { elem, .. } => self.is_intermediate_context_type(*elem),
            _ => false,
        }
    }
}

/// Operators that are cheap to recompute or structurally trivial.
pub fn is_deny_listed(op: &Op) -> bool {
    matches!(
        op,
        Op::Cast(_)
            | Op::MakeVectorFromScalar
            | Op::MakeMatrixFromScalar
            | Op::DefaultConstruct
            | Op::MakeStruct
            | Op::MakeTuple
            | Op::MakeArray
            | Op::MakeArrayFromElement
            | Op::MakeDiffPair
            | Op::MakeOptionalNone
            | Op::MakeOptionalValue
            | Op::DiffPairGetPrimal
            | Op::DiffPairGetDifferential
            | Op::ExtractExistentialValue
            | Op::ExtractExistentialType
            | Op::ExtractExistentialWitnessTable
    )
}

/// Projections whose result is not stored when their base already is.
pub fn is_view_like(op: &Op) -> bool {
    matches!(
        op,
        Op::GetElement
            | Op::FieldExtract(_)
            | Op::Swizzle(_)
            | Op::UpdateElement
            | Op::OptionalHasValue
            | Op::GetOptionalValue
            | Op::MatrixReshape
            | Op::VectorReshape
    )
}

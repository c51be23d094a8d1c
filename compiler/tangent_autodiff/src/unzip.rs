//! Primal-function extraction.
//!
//! Splits an interleaved function `F` (primal and differential code
//! tagged per instruction and per block) into a primal-only function
//! `F'` that writes an intermediate context, and rewrites `F` to read the
//! persisted values back from that context.
//!
//! # Algorithm
//!
//! 1. Clone `F` into `F'`; translate the hoisted-primal set through the
//!    clone; drop keep-alive tags; excise differential-only instructions.
//! 2. Give `F'` the original function's signature (minus its trailing
//!    slot, migrated into `F`'s envelope) plus an `inout` context.
//! 3. Swap `F'`'s trailing parameter for the context parameter.
//! 4. Partition the body blocks into primal and differential.
//! 5. Store every hoisted value into a fresh context field.
//! 6. Rewrite primal terminators so they no longer mention differential
//!    values or blocks.
//! 7. Delete the differential blocks.
//! 8. Default-initialize the context at the top of the first body block.
//! 9. Delete parameters the primal function does not keep.
//! 10. Name `F'` after the original function.
//! 11. Copy field-key tags from `F'` back onto `F`.
//! 12. Make `F` read every stored value from its trailing parameter.

use rustc_hash::FxHashSet;

use tangent_ir::{
    clone_function, verify_function, BlockId, Builder, CloneEnv, FieldKey, FuncId, GenericId,
    Idx, InsertPoint, InstId, Module, Op, StructId, Tag, TagKind,
};

use crate::classify::DiffClassifier;
use crate::config::UnzipConfig;
use crate::context::{ContextBuilder, IntermediateContext};
use crate::hoist::{HoistedPrimalsInfo, ParameterBlockTransposeInfo};
use crate::storage::StoragePolicy;
use crate::witness::DifferentiableWitness;

/// Result of [`DiffUnzipPass::extract_primal_func`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExtractedPrimal {
    /// The new primal-only function.
    pub primal_func: FuncId,
    /// The synthesized context struct.
    pub context_def: StructId,
    /// The context type as seen from inside both functions.
    pub context_type: Idx,
    /// Keys of the context fields, in first-store order.
    pub stored_fields: Vec<FieldKey>,
}

/// The primal-extraction pass.
pub struct DiffUnzipPass<'w> {
    config: UnzipConfig,
    witness: &'w dyn DifferentiableWitness,
}

impl<'w> DiffUnzipPass<'w> {
    pub fn new(witness: &'w dyn DifferentiableWitness) -> Self {
        Self::with_config(witness, UnzipConfig::default())
    }

    pub fn with_config(witness: &'w dyn DifferentiableWitness, config: UnzipConfig) -> Self {
        Self { config, witness }
    }

    pub fn config(&self) -> &UnzipConfig {
        &self.config
    }

    /// Select the primal values of `func` worth storing, using the
    /// storage policy with this pass's configuration.
    pub fn hoist_primals(&self, module: &Module, func: FuncId) -> HoistedPrimalsInfo {
        let classifier = DiffClassifier::new();
        let policy = StoragePolicy::new(module, &classifier)
            .with_max_pointer_depth(self.config.max_pointer_depth);
        HoistedPrimalsInfo::from_policy(module, func, &classifier, &policy)
    }

    /// Split `func` into a primal function and rewrite `func` to read the
    /// persisted values back.
    ///
    /// `original` is the function `func` was transcribed from; it provides
    /// the primal signature and name.
    ///
    /// # Panics
    ///
    /// Panics on input outside the pass's contract: a mixed return value
    /// of unrecognized shape, a primal block that still continues into
    /// differential code, hoisted or excised instructions that are not
    /// part of `func`, or a signature that cannot migrate between the two
    /// functions' envelopes.
    pub fn extract_primal_func(
        &self,
        module: &mut Module,
        func: FuncId,
        original: FuncId,
        primals: &HoistedPrimalsInfo,
        param_info: &ParameterBlockTransposeInfo,
    ) -> ExtractedPrimal {
        let classifier = DiffClassifier::new();
        let mut contexts = ContextBuilder::new(self.witness, self.config.context_suffix.as_str());

        // 1. Clone.
        let mut env = CloneEnv::new();
        let primal_func = clone_function(module, func, &mut env);
        let store_set = primals.apply_map(&env);
        strip_keep_alive(module, primal_func);
        for &inst in &param_info.propagate_specific_insts {
            let clone = env.inst(inst);
            if module.is_live(clone) {
                module.remove_inst(clone);
            }
        }
        let mut primal_params: FxHashSet<InstId> = module
            .func_params(func)
            .into_iter()
            .filter(|p| param_info.primal_params.contains(p))
            .map(|p| env.inst(p))
            .collect();
        tracing::debug!(
            function = %func,
            clone = %primal_func,
            stored = store_set.len(),
            excised = param_info.propagate_specific_insts.len(),
            "cloned interleaved function"
        );

        // 2. Signature.
        let ctx = contexts.get_or_create(module, primal_func);
        let fn_ty = primal_signature(module, original, func, ctx.ty);
        module.set_func_type(primal_func, fn_ty);

        // 3. Context parameter.
        let ctx_param = replace_trailing_param(module, primal_func, ctx.ty);
        primal_params.insert(ctx_param);

        // 4. Partition.
        let (primal_blocks, diff_blocks) = partition_blocks(module, &classifier, primal_func);
        tracing::debug!(
            function = %primal_func,
            primal = primal_blocks.len(),
            differential = diff_blocks.len(),
            "partitioned blocks"
        );

        // 5. Storage.
        let mut stored_fields = Vec::new();
        let mut moved_slots = Vec::new();
        for &block in &primal_blocks {
            for inst in module.block_insts(block).to_vec() {
                if !store_set.contains(inst) {
                    continue;
                }
                let key = materialize_store(
                    module,
                    &mut contexts,
                    primal_func,
                    ctx_param,
                    block,
                    inst,
                );
                stored_fields.push(key);
                if *module.op(inst) == Op::Var {
                    moved_slots.push(inst);
                }
            }
        }
        tracing::debug!(
            function = %primal_func,
            fields = stored_fields.len(),
            "materialized context stores"
        );

        // 6. Terminators.
        let diff_set: FxHashSet<BlockId> = diff_blocks.iter().copied().collect();
        for &block in &primal_blocks {
            rewrite_terminator(module, &classifier, block, &diff_set);
        }

        // 7. Prune.
        for &block in &diff_blocks {
            module.remove_block(block);
        }

        // 8. Entry initialization.
        init_context(module, primal_func, ctx, ctx_param);

        // 9. Parameter pruning.
        let void = module.void_value();
        for param in module.func_params(primal_func) {
            if !primal_params.contains(&param) {
                module.replace_all_uses_with(param, void);
                module.remove_inst(param);
            }
        }

        // 10. Naming.
        module.remove_tags(primal_func, TagKind::NameHint);
        if let Some(base) = module.func_name(original) {
            let name = format!("{}{base}", self.config.primal_prefix);
            module.set_name_hint(primal_func, &name);
        }

        // 11. Back-propagate field keys.
        let mut keyed = 0usize;
        let mut pairs: Vec<(InstId, InstId)> = env.inst_pairs().collect();
        pairs.sort_unstable();
        for (old, new) in pairs {
            if let Some(key) = module.primal_value_key(new) {
                module.add_tag(old, Tag::PrimalValueKey(key));
                keyed += 1;
            }
        }
        tracing::debug!(function = %func, keyed, "copied field keys to interleaved function");
        // The slots' uses now go through the context; their keys are copied.
        for slot in moved_slots {
            module.remove_inst(slot);
        }

        // 12. Rewrite the interleaved function.
        rewrite_original(module, func, ctx.ty);

        if self.config.verify {
            for f in [primal_func, func] {
                if let Err(err) = verify_function(module, f) {
                    panic!(
                        "primal extraction produced invalid IR: {err}\n{}",
                        module.display_func(f)
                    );
                }
            }
        }

        tracing::debug!(
            function = %func,
            primal = %primal_func,
            name = module.func_name(primal_func).unwrap_or(""),
            "extracted primal function"
        );
        ExtractedPrimal {
            primal_func,
            context_def: ctx.def,
            context_type: ctx.ty,
            stored_fields,
        }
    }
}

fn strip_keep_alive(module: &mut Module, func: FuncId) {
    for block in module.func_blocks(func).to_vec() {
        for inst in module.block_insts(block).to_vec() {
            module.remove_tags(inst, TagKind::KeepAlive);
        }
    }
}

/// `original`'s parameters minus the trailing slot, migrated into
/// `func`'s envelope, plus `inout context`; `original`'s result.
fn primal_signature(module: &mut Module, original: FuncId, func: FuncId, ctx_ty: Idx) -> Idx {
    let original_ty = module.func(original).ty;
    let (params, result) = module
        .types
        .func_signature(original_ty)
        .map(|(params, result)| (params.to_vec(), result))
        .unwrap_or_else(|| panic!("{original} does not have a function type"));
    let migrate = Migration::new(module, original, func);

    let kept = params.split_last().map_or(&[][..], |(_, rest)| rest);
    let mut new_params: Vec<Idx> = kept.iter().map(|&ty| migrate.apply(module, ty)).collect();
    new_params.push(module.types.in_out(ctx_ty));
    let result = migrate.apply(module, result);
    module.types.func(new_params, result)
}

/// Type substitution from one function's envelope into another's.
struct Migration {
    map: Option<(GenericId, Vec<Idx>)>,
}

impl Migration {
    fn new(module: &mut Module, from: FuncId, to: FuncId) -> Self {
        let map = match (module.func(from).generic, module.func(to).generic) {
            (Some(src), Some(dst)) if src == dst => None,
            (Some(src), Some(dst)) => {
                let (src_len, dst_len) = (
                    module.types.generic(src).params.len(),
                    module.types.generic(dst).params.len(),
                );
                if src_len != dst_len {
                    panic!(
                        "cannot migrate {from} into {to}: {src} has {src_len} parameters, \
                         {dst} has {dst_len}"
                    );
                }
                Some((src, module.types.generic_params(dst)))
            }
            (Some(src), None) => {
                panic!("cannot migrate generic {from} ({src}) into non-generic {to}")
            }
            (None, _) => None,
        };
        Self { map }
    }

    fn apply(&self, module: &mut Module, ty: Idx) -> Idx {
        match &self.map {
            Some((src, args)) => module.types.substitute(ty, *src, args),
            None => ty,
        }
    }
}

/// Replace the last parameter of `func` by an `inout ctx_ty` parameter
/// that inherits its tags and uses.
fn replace_trailing_param(module: &mut Module, func: FuncId, ctx_ty: Idx) -> InstId {
    let old = module
        .func_params(func)
        .last()
        .copied()
        .unwrap_or_else(|| panic!("{func} has no trailing parameter to replace"));
    let ty = module.types.in_out(ctx_ty);
    let new = module.insert_inst(InsertPoint::After(old), Op::Param, Some(ty), &[]);
    module.transfer_tags(old, new);
    module.replace_all_uses_with(old, new);
    module.remove_inst(old);
    new
}

fn partition_blocks(
    module: &Module,
    classifier: &DiffClassifier,
    func: FuncId,
) -> (Vec<BlockId>, Vec<BlockId>) {
    module
        .func_blocks(func)
        .iter()
        .skip(1)
        .partition(|&&block| !classifier.is_differential_block(module, block))
}

/// Persist `inst` into a new field of the context and tag it with the key.
fn materialize_store(
    module: &mut Module,
    contexts: &mut ContextBuilder<'_>,
    func: FuncId,
    ctx_param: InstId,
    block: BlockId,
    inst: InstId,
) -> FieldKey {
    let ty = module
        .ty(inst)
        .unwrap_or_else(|| panic!("stored instruction {inst} has no result type"));
    let name = module.name_hint(inst);

    let key = if *module.op(inst) == Op::Var {
        let value_ty = module
            .types
            .pointee(ty)
            .unwrap_or_else(|| panic!("local slot {inst} is not pointer-typed"));
        let key = contexts.add_field(module, func, value_ty, name);
        let mut b = Builder::new(module, InsertPoint::Before(inst));
        let addr = b.field_address(ctx_param, key, ty);
        module.replace_all_uses_with(inst, addr);
        key
    } else {
        let key = contexts.add_field(module, func, ty, name);
        let point = if *module.op(inst) == Op::Param {
            let first = module
                .first_ordinary_inst(block)
                .unwrap_or_else(|| panic!("{block} has no terminator"));
            InsertPoint::Before(first)
        } else {
            InsertPoint::After(inst)
        };
        let ptr_ty = module.types.ptr(ty);
        let mut b = Builder::new(module, point);
        let addr = b.field_address(ctx_param, key, ptr_ty);
        b.store(addr, inst);
        key
    };
    module.add_tag(inst, Tag::PrimalValueKey(key));
    tracing::trace!(inst = %inst, key = %key, "stored primal value");
    key
}

fn rewrite_terminator(
    module: &mut Module,
    classifier: &DiffClassifier,
    block: BlockId,
    diff_blocks: &FxHashSet<BlockId>,
) {
    let term = module
        .terminator(block)
        .unwrap_or_else(|| panic!("primal {block} has no terminator"));

    if let Some(Tag::PrimalReturn(value)) = module.find_tag(term, TagKind::PrimalReturn) {
        let operands = if value == module.void_value() {
            vec![]
        } else {
            vec![value]
        };
        module.insert_inst(InsertPoint::Before(term), Op::Return, None, &operands);
        module.remove_inst(term);
    } else if *module.op(term) == Op::Return {
        if let Some(&value) = module.operands(term).first() {
            if classifier.is_differential(module, value) {
                let mut b = Builder::new(module, InsertPoint::Before(term));
                let primal = primal_component(&mut b, classifier, value);
                b.ret(Some(primal));
                module.remove_inst(term);
                remove_dead_mixed(module, classifier, value);
            }
        }
    }

    let term = module
        .terminator(block)
        .unwrap_or_else(|| panic!("primal {block} lost its terminator"));
    if let Some(target) = module
        .successors(block)
        .into_iter()
        .find(|succ| diff_blocks.contains(succ))
    {
        panic!(
            "primal {block} continues into differential {target} via {term} \
             without a primal return value"
        );
    }
}

/// Rebuild the primal part of a mixed value, zero-filling differential
/// slots.
fn primal_component(b: &mut Builder<'_>, classifier: &DiffClassifier, value: InstId) -> InstId {
    if !classifier.is_differential(b.module(), value) {
        return value;
    }
    let module = b.module();
    let op = module.op(value);
    if *op != Op::MakeDiffPair {
        panic!(
            "unrecognized mixed value {value} ({}) in primal return",
            op.mnemonic()
        );
    }
    let ty = module
        .ty(value)
        .unwrap_or_else(|| panic!("differential pair {value} has no type"));
    let (primal, diff) = (module.operand(value, 0), module.operand(value, 1));
    let diff_ty = module
        .ty(diff)
        .unwrap_or_else(|| panic!("differential component of {value} has no type"));
    let zero = b.default_construct(diff_ty);
    let primal = primal_component(b, classifier, primal);
    b.make_diff_pair(ty, primal, zero)
}

/// Remove `value` and its mixed operands once nothing uses them.
fn remove_dead_mixed(module: &mut Module, classifier: &DiffClassifier, value: InstId) {
    let mut worklist = vec![value];
    while let Some(inst) = worklist.pop() {
        if !module.is_live(inst)
            || inst == module.void_value()
            || module.has_uses(inst)
            || module.parent(inst).is_none()
            || !classifier.is_differential(module, inst)
        {
            continue;
        }
        worklist.extend_from_slice(module.operands(inst));
        module.remove_inst(inst);
    }
}

/// Store a default-constructed context at the top of the first body block.
fn init_context(module: &mut Module, func: FuncId, ctx: IntermediateContext, ctx_param: InstId) {
    let first = module
        .first_body_block(func)
        .unwrap_or_else(|| panic!("{func} has no body block"));
    let anchor = module
        .first_ordinary_inst(first)
        .unwrap_or_else(|| panic!("{first} has no terminator"));
    let mut b = Builder::new(module, InsertPoint::Before(anchor));
    let zero = b.default_construct(ctx.ty);
    b.store(ctx_param, zero);
}

/// Make `func` read every keyed value from its trailing parameter.
fn rewrite_original(module: &mut Module, func: FuncId, ctx_ty: Idx) {
    let ctx_param = module
        .func_params(func)
        .last()
        .copied()
        .unwrap_or_else(|| panic!("{func} has no trailing parameter"));
    module.set_ty(ctx_param, Some(ctx_ty));
    let fn_ty = module.func(func).ty;
    if let Some((params, result)) = module.types.func_signature(fn_ty) {
        let mut params = params.to_vec();
        if let Some(last) = params.last_mut() {
            *last = ctx_ty;
        }
        let retyped = module.types.func(params, result);
        module.set_func_type(func, retyped);
    }

    let mut rewritten = Vec::new();
    for block in module.func_blocks(func).to_vec() {
        let keyed: Vec<(InstId, FieldKey)> = module
            .block_insts(block)
            .iter()
            .filter_map(|&inst| module.primal_value_key(inst).map(|key| (inst, key)))
            .collect();
        for (inst, key) in keyed {
            if *module.op(inst) == Op::Var {
                rewrite_slot_uses(module, ctx_param, inst, key);
            } else {
                rewrite_value_uses(module, ctx_param, inst, key);
            }
            rewritten.push((inst, key));
        }
    }
    retarget_primal_returns(module, func, ctx_param, &rewritten);

    tracing::debug!(
        function = %func,
        rewritten = rewritten.len(),
        "interleaved function reads stored values from context"
    );
    for (inst, _) in rewritten {
        // Block parameters stay so that incoming jump arguments still match.
        if module.is_live(inst) && *module.op(inst) != Op::Param {
            module.remove_inst(inst);
        }
    }
}

/// Point `PrimalReturn` tags naming a rewritten value at a field read
/// placed before the tagged terminator.
fn retarget_primal_returns(
    module: &mut Module,
    func: FuncId,
    ctx_param: InstId,
    rewritten: &[(InstId, FieldKey)],
) {
    for block in module.func_blocks(func).to_vec() {
        let Some(term) = module.terminator(block) else {
            continue;
        };
        let Some(Tag::PrimalReturn(value)) = module.find_tag(term, TagKind::PrimalReturn) else {
            continue;
        };
        let Some(&(_, key)) = rewritten.iter().find(|(inst, _)| *inst == value) else {
            continue;
        };
        let target = match module.ty(value) {
            Some(ty) if *module.op(value) != Op::Var => {
                Builder::new(module, InsertPoint::Before(term)).field_extract(ctx_param, key, ty)
            }
            _ => module.void_value(),
        };
        module.remove_tags(term, TagKind::PrimalReturn);
        module.add_tag(term, Tag::PrimalReturn(target));
    }
}

/// Loads of the slot become field reads; any other use gets a fresh
/// local slot initialized from the field.
fn rewrite_slot_uses(module: &mut Module, ctx_param: InstId, var: InstId, key: FieldKey) {
    let value_ty = module
        .ty(var)
        .and_then(|ty| module.types.pointee(ty))
        .unwrap_or_else(|| panic!("local slot {var} is not pointer-typed"));
    while let Some(&first) = module.uses(var).first() {
        let user = first.user;
        let mut b = Builder::new(module, InsertPoint::Before(user));
        let value = b.field_extract(ctx_param, key, value_ty);
        if *b.module().op(user) == Op::Load {
            module.replace_all_uses_with(user, value);
            module.remove_inst(user);
        } else {
            let temp = b.var(value_ty);
            b.store(temp, value);
            module.set_operand(user, first.slot as usize, temp);
        }
    }
}

/// Each use gets its own field read right before the user; the
/// definition may not dominate differential uses.
fn rewrite_value_uses(module: &mut Module, ctx_param: InstId, inst: InstId, key: FieldKey) {
    let ty = module
        .ty(inst)
        .unwrap_or_else(|| panic!("keyed instruction {inst} has no result type"));
    while let Some(&first) = module.uses(inst).first() {
        let mut b = Builder::new(module, InsertPoint::Before(first.user));
        let value = b.field_extract(ctx_param, key, ty);
        module.set_operand(first.user, first.slot as usize, value);
    }
}

//! Intermediate context synthesis.
//!
//! The intermediate context is a struct with one field per persisted
//! primal value. The primal function writes it, the differential function
//! reads it.
//!
//! # Generic functions
//!
//! A function living in a generic envelope `G` gets a context struct in a
//! fresh envelope `G'` whose header (name and parameter list) is cloned
//! from `G`. Inside the function the context is seen as the struct
//! specialized with `G`'s own parameters, so a field type written in
//! terms of `G` is substituted into `G'` before it is recorded on the
//! struct. Field types that do not mention `G` are recorded as they are.

use rustc_hash::FxHashMap;

use tangent_ir::{FieldKey, FuncId, GenericId, Idx, Module, Name, StructId};

use crate::witness::DifferentiableWitness;

/// A synthesized context struct and how one function sees it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IntermediateContext {
    pub def: StructId,
    /// The context type as seen from inside the owning function.
    pub ty: Idx,
    /// `(function envelope, struct envelope)` for generic functions.
    scope: Option<(GenericId, GenericId)>,
}

impl IntermediateContext {
    /// Envelope the struct definition lives in.
    pub fn generic(&self) -> Option<GenericId> {
        self.scope.map(|(_, own)| own)
    }

    /// Express a type from the owning function's scope in the struct's
    /// own scope.
    pub fn to_struct_scope(&self, module: &mut Module, ty: Idx) -> Idx {
        match self.scope {
            Some((func_generic, own)) if module.types.references_generic(ty, func_generic) => {
                let own_params = module.types.generic_params(own);
                module.types.substitute(ty, func_generic, &own_params)
            }
            _ => ty,
        }
    }
}

/// Creates context structs on demand and appends their fields.
pub struct ContextBuilder<'w> {
    witness: &'w dyn DifferentiableWitness,
    suffix: String,
    contexts: FxHashMap<FuncId, IntermediateContext>,
}

impl<'w> ContextBuilder<'w> {
    pub fn new(witness: &'w dyn DifferentiableWitness, suffix: impl Into<String>) -> Self {
        Self {
            witness,
            suffix: suffix.into(),
            contexts: FxHashMap::default(),
        }
    }

    /// The context of `func`, created on first request.
    ///
    /// The struct is named after the function's name hint at creation
    /// time, with the configured suffix.
    pub fn get_or_create(&mut self, module: &mut Module, func: FuncId) -> IntermediateContext {
        if let Some(&ctx) = self.contexts.get(&func) {
            return ctx;
        }

        let full_name = module
            .func_name(func)
            .map(|base| format!("{base}{}", self.suffix));
        let name = full_name.map(|full| module.intern(&full));

        let ctx = match module.func(func).generic {
            Some(func_generic) => {
                let own = module.types.clone_generic_header(func_generic);
                let def = module.types.add_struct(name, Some(own));
                let args = module.types.generic_params(func_generic);
                let ty = module.types.struct_type(def, args);
                IntermediateContext {
                    def,
                    ty,
                    scope: Some((func_generic, own)),
                }
            }
            None => {
                let def = module.types.add_struct(name, None);
                let ty = module.types.struct_type(def, Vec::new());
                IntermediateContext {
                    def,
                    ty,
                    scope: None,
                }
            }
        };

        tracing::debug!(
            function = %func,
            context = %ctx.def,
            generic = ctx.generic().is_some(),
            "created intermediate context"
        );
        self.contexts.insert(func, ctx);
        ctx
    }

    /// Append a field of type `field_ty` (in `func`'s scope) to `func`'s
    /// context and return its key.
    ///
    /// The field records its differential type when the witness knows one.
    pub fn add_field(
        &mut self,
        module: &mut Module,
        func: FuncId,
        field_ty: Idx,
        name: Option<Name>,
    ) -> FieldKey {
        let ctx = self.get_or_create(module, func);
        let ty = ctx.to_struct_scope(module, field_ty);
        let differential = self.witness.differential_witness(&mut module.types, ty);
        let key = module.types.add_field(ctx.def, ty, name, differential);
        tracing::trace!(
            context = %ctx.def,
            key = %key,
            ty = %module.display_type(ty),
            differentiable = differential.is_some(),
            "added context field"
        );
        key
    }
}

//! Hash-consed type pool.
//!
//! Every type is interned once and referenced by a 32-bit [`Idx`], so
//! type equality is index equality. The pool also owns the two kinds of
//! type-level definitions that carry identity rather than structure:
//! struct definitions ([`StructDef`]) and generic envelopes
//! ([`GenericDef`]).
//!
//! # Generic envelopes
//!
//! A generic envelope is an explicit, ordered type-parameter list. A
//! reference to its `i`-th parameter is the type
//! `TypeKind::Param { generic, index: i }`. Both specialization (replace
//! parameters by concrete arguments) and migration between envelopes
//! (replace parameters of one envelope by the parameters of another) are
//! the same operation: [`TypePool::substitute`].

use rustc_hash::{FxHashMap, FxHashSet};

use crate::ids::{FieldKey, FuncId, GenericId, StructId};
use crate::name::Name;

/// A 32-bit index into the type pool.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
#[repr(transparent)]
pub struct Idx(u32);

impl Idx {
    /// The `void` type (no value).
    pub const VOID: Self = Self(0);
    /// The `bool` type.
    pub const BOOL: Self = Self(1);
    /// The `int` type.
    pub const INT: Self = Self(2);
    /// The `float` type.
    pub const FLOAT: Self = Self(3);

    /// Number of pre-interned primitive types.
    pub const PRIMITIVE_COUNT: u32 = 4;

    /// Create an index from a raw u32 value.
    #[inline]
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// Get the raw u32 value.
    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }

    #[inline]
    fn index(self) -> usize {
        self.0 as usize
    }
}

/// Structure of an interned type.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum TypeKind {
    Void,
    Bool,
    Int,
    Float,
    Vector {
        elem: Idx,
        count: u32,
    },
    Matrix {
        elem: Idx,
        rows: u32,
        cols: u32,
    },
    Array {
        elem: Idx,
        len: u32,
    },
    /// Address of a mutable location.
    Ptr(Idx),
    /// Pass-by-reference parameter type (read on entry, written on exit).
    InOut(Idx),
    Optional(Idx),
    Tuple(Vec<Idx>),
    /// Primal value paired with its differential.
    DiffPair(Idx),
    /// A struct definition, specialized with `args` when it is generic.
    Struct {
        def: StructId,
        args: Vec<Idx>,
    },
    /// The `index`-th type parameter of a generic envelope.
    Param {
        generic: GenericId,
        index: u32,
    },
    Func {
        params: Vec<Idx>,
        result: Idx,
    },
    /// Intermediate context of a callee that has not been split yet.
    IntermediateContext {
        func: FuncId,
        args: Vec<Idx>,
    },
    /// Interface-typed (existential) value.
    Existential(Name),
    /// Handle-like type with no storable representation.
    Opaque(Name),
}

/// A generic envelope: a named, ordered type-parameter list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GenericDef {
    pub name: Option<Name>,
    pub params: Vec<Name>,
}

/// One field of a struct definition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StructField {
    /// Permanent key addressing this field.
    pub key: FieldKey,
    /// Field type, expressed in the scope of the owning struct.
    pub ty: Idx,
    pub name: Option<Name>,
    /// Differential type when the field type is differentiable.
    pub differential: Option<Idx>,
}

/// A nominal struct definition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StructDef {
    pub name: Option<Name>,
    /// Envelope the definition lives in; field types may reference its
    /// parameters.
    pub generic: Option<GenericId>,
    pub fields: Vec<StructField>,
}

/// Interned types plus struct and generic definitions.
pub struct TypePool {
    kinds: Vec<TypeKind>,
    map: FxHashMap<TypeKind, Idx>,
    structs: Vec<StructDef>,
    generics: Vec<GenericDef>,
    /// Owning struct of every key handed out so far.
    field_owner: Vec<StructId>,
}

impl TypePool {
    /// Create a pool with the primitive types pre-interned.
    pub fn new() -> Self {
        let mut pool = Self {
            kinds: Vec::with_capacity(64),
            map: FxHashMap::default(),
            structs: Vec::new(),
            generics: Vec::new(),
            field_owner: Vec::new(),
        };
        for (kind, expected) in [
            (TypeKind::Void, Idx::VOID),
            (TypeKind::Bool, Idx::BOOL),
            (TypeKind::Int, Idx::INT),
            (TypeKind::Float, Idx::FLOAT),
        ] {
            let idx = pool.intern(kind);
            debug_assert_eq!(idx, expected);
        }
        pool
    }

    /// Intern a type, returning the existing index if it is already known.
    pub fn intern(&mut self, kind: TypeKind) -> Idx {
        if let Some(&idx) = self.map.get(&kind) {
            return idx;
        }
        let raw = u32::try_from(self.kinds.len())
            .unwrap_or_else(|_| panic!("type count exceeds u32::MAX"));
        let idx = Idx(raw);
        self.kinds.push(kind.clone());
        self.map.insert(kind, idx);
        idx
    }

    /// Structure of an interned type.
    #[inline]
    pub fn kind(&self, idx: Idx) -> &TypeKind {
        &self.kinds[idx.index()]
    }

    // === Constructors ===

    pub fn vector(&mut self, elem: Idx, count: u32) -> Idx {
        self.intern(TypeKind::Vector { elem, count })
    }

    pub fn matrix(&mut self, elem: Idx, rows: u32, cols: u32) -> Idx {
        self.intern(TypeKind::Matrix { elem, rows, cols })
    }

    pub fn array(&mut self, elem: Idx, len: u32) -> Idx {
        self.intern(TypeKind::Array { elem, len })
    }

    pub fn ptr(&mut self, pointee: Idx) -> Idx {
        self.intern(TypeKind::Ptr(pointee))
    }

    pub fn in_out(&mut self, pointee: Idx) -> Idx {
        self.intern(TypeKind::InOut(pointee))
    }

    pub fn optional(&mut self, inner: Idx) -> Idx {
        self.intern(TypeKind::Optional(inner))
    }

    pub fn tuple(&mut self, elems: Vec<Idx>) -> Idx {
        self.intern(TypeKind::Tuple(elems))
    }

    pub fn diff_pair(&mut self, primal: Idx) -> Idx {
        self.intern(TypeKind::DiffPair(primal))
    }

    pub fn struct_type(&mut self, def: StructId, args: Vec<Idx>) -> Idx {
        self.intern(TypeKind::Struct { def, args })
    }

    pub fn param(&mut self, generic: GenericId, index: u32) -> Idx {
        self.intern(TypeKind::Param { generic, index })
    }

    pub fn func(&mut self, params: Vec<Idx>, result: Idx) -> Idx {
        self.intern(TypeKind::Func { params, result })
    }

    pub fn intermediate_context(&mut self, func: FuncId, args: Vec<Idx>) -> Idx {
        self.intern(TypeKind::IntermediateContext { func, args })
    }

    pub fn existential(&mut self, name: Name) -> Idx {
        self.intern(TypeKind::Existential(name))
    }

    pub fn opaque(&mut self, name: Name) -> Idx {
        self.intern(TypeKind::Opaque(name))
    }

    // === Queries ===

    /// Referent of a pointer-like type (`Ptr` or `InOut`).
    pub fn pointee(&self, idx: Idx) -> Option<Idx> {
        match self.kind(idx) {
            TypeKind::Ptr(inner) | TypeKind::InOut(inner) => Some(*inner),
            _ => None,
        }
    }

    /// Returns `true` for `Ptr` and `InOut` types.
    pub fn is_ptr_like(&self, idx: Idx) -> bool {
        self.pointee(idx).is_some()
    }

    /// Parameter and result types of a function type.
    pub fn func_signature(&self, idx: Idx) -> Option<(&[Idx], Idx)> {
        match self.kind(idx) {
            TypeKind::Func { params, result } => Some((params, *result)),
            _ => None,
        }
    }

    /// Type arguments of a specialized struct or intermediate context.
    ///
    /// Returns an empty slice for every other type.
    pub fn specialization_args(&self, idx: Idx) -> &[Idx] {
        match self.kind(idx) {
            TypeKind::Struct { args, .. } | TypeKind::IntermediateContext { args, .. } => args,
            _ => &[],
        }
    }

    /// Whether values of this type can be persisted into a struct field.
    ///
    /// Addresses, functions, `void` and opaque handles cannot. Aggregates
    /// are storable when all their parts are. Generic parameters are
    /// assumed storable; the decision is revisited after specialization.
    pub fn can_be_stored(&self, idx: Idx) -> bool {
        let mut visiting = FxHashSet::default();
        self.can_be_stored_inner(idx, &mut visiting)
    }

    fn can_be_stored_inner(&self, idx: Idx, visiting: &mut FxHashSet<StructId>) -> bool {
        match self.kind(idx) {
            TypeKind::Void
            | TypeKind::Ptr(_)
            | TypeKind::InOut(_)
            | TypeKind::Func { .. }
            | TypeKind::Opaque(_) => false,

            TypeKind::Bool
            | TypeKind::Int
            | TypeKind::Float
            | TypeKind::Param { .. }
            | TypeKind::Existential(_) => true,

            TypeKind::Vector { elem, .. }
            | TypeKind::Matrix { elem, .. }
            | TypeKind::Array { elem, .. }
            | TypeKind::Optional(elem)
            | TypeKind::DiffPair(elem) => self.can_be_stored_inner(*elem, visiting),

            TypeKind::Tuple(elems) => elems
                .iter()
                .all(|&e| self.can_be_stored_inner(e, visiting)),

            TypeKind::IntermediateContext { args, .. } => {
                args.iter().all(|&a| self.can_be_stored_inner(a, visiting))
            }

            TypeKind::Struct { def, args } => {
                if !args.iter().all(|&a| self.can_be_stored_inner(a, visiting)) {
                    return false;
                }
                // A struct cannot contain itself by value; a revisit is
                // already being answered further up.
                if !visiting.insert(*def) {
                    return true;
                }
                let def_data = self.struct_def(*def);
                let ok = def_data.fields.iter().all(|field| {
                    let ty = match def_data.generic {
                        Some(g) if !args.is_empty() => self.substitute_readonly(field.ty, g, args),
                        _ => Some(field.ty),
                    };
                    // A field type whose specialization was never interned
                    // is judged by its unspecialized form.
                    self.can_be_stored_inner(ty.unwrap_or(field.ty), visiting)
                });
                visiting.remove(def);
                ok
            }
        }
    }

    /// Whether `idx` mentions any parameter of `generic`.
    pub fn references_generic(&self, idx: Idx, generic: GenericId) -> bool {
        let any = |this: &Self, tys: &[Idx]| tys.iter().any(|&t| this.references_generic(t, generic));
        match self.kind(idx) {
            TypeKind::Param { generic: g, .. } => *g == generic,
            TypeKind::Vector { elem, .. }
            | TypeKind::Matrix { elem, .. }
            | TypeKind::Array { elem, .. }
            | TypeKind::Ptr(elem)
            | TypeKind::InOut(elem)
            | TypeKind::Optional(elem)
            | TypeKind::DiffPair(elem) => self.references_generic(*elem, generic),
            TypeKind::Tuple(tys)
            | TypeKind::Struct { args: tys, .. }
            | TypeKind::IntermediateContext { args: tys, .. } => any(self, tys),
            TypeKind::Func { params, result } => {
                any(self, params) || self.references_generic(*result, generic)
            }
            TypeKind::Void
            | TypeKind::Bool
            | TypeKind::Int
            | TypeKind::Float
            | TypeKind::Existential(_)
            | TypeKind::Opaque(_) => false,
        }
    }

    /// Replace every parameter of `generic` in `idx` by the matching entry
    /// of `args`.
    ///
    /// # Panics
    ///
    /// Panics if a parameter index is out of range for `args`.
    pub fn substitute(&mut self, idx: Idx, generic: GenericId, args: &[Idx]) -> Idx {
        if !self.references_generic(idx, generic) {
            return idx;
        }
        let kind = self.kind(idx).clone();
        let new_kind = match kind {
            TypeKind::Param { generic: g, index } if g == generic => {
                return *args.get(index as usize).unwrap_or_else(|| {
                    panic!(
                        "substitution for {generic} has {} arguments, parameter {index} requested",
                        args.len()
                    )
                });
            }
            TypeKind::Vector { elem, count } => TypeKind::Vector {
                elem: self.substitute(elem, generic, args),
                count,
            },
            TypeKind::Matrix { elem, rows, cols } => TypeKind::Matrix {
                elem: self.substitute(elem, generic, args),
                rows,
                cols,
            },
            TypeKind::Array { elem, len } => TypeKind::Array {
                elem: self.substitute(elem, generic, args),
                len,
            },
            TypeKind::Ptr(inner) => TypeKind::Ptr(self.substitute(inner, generic, args)),
            TypeKind::InOut(inner) => TypeKind::InOut(self.substitute(inner, generic, args)),
            TypeKind::Optional(inner) => TypeKind::Optional(self.substitute(inner, generic, args)),
            TypeKind::DiffPair(inner) => TypeKind::DiffPair(self.substitute(inner, generic, args)),
            TypeKind::Tuple(elems) => TypeKind::Tuple(self.substitute_all(&elems, generic, args)),
            TypeKind::Struct { def, args: targs } => TypeKind::Struct {
                def,
                args: self.substitute_all(&targs, generic, args),
            },
            TypeKind::IntermediateContext { func, args: targs } => {
                TypeKind::IntermediateContext {
                    func,
                    args: self.substitute_all(&targs, generic, args),
                }
            }
            TypeKind::Func { params, result } => TypeKind::Func {
                params: self.substitute_all(&params, generic, args),
                result: self.substitute(result, generic, args),
            },
            other => other,
        };
        self.intern(new_kind)
    }

    fn substitute_all(&mut self, tys: &[Idx], generic: GenericId, args: &[Idx]) -> Vec<Idx> {
        tys.iter()
            .map(|&t| self.substitute(t, generic, args))
            .collect()
    }

    /// Substitution without interning: finds the result only if every
    /// intermediate type already exists in the pool.
    fn substitute_readonly(&self, idx: Idx, generic: GenericId, args: &[Idx]) -> Option<Idx> {
        if !self.references_generic(idx, generic) {
            return Some(idx);
        }
        let sub_all = |tys: &[Idx]| -> Option<Vec<Idx>> {
            tys.iter()
                .map(|&t| self.substitute_readonly(t, generic, args))
                .collect()
        };
        let new_kind = match self.kind(idx) {
            TypeKind::Param { index, .. } => return args.get(*index as usize).copied(),
            TypeKind::Vector { elem, count } => TypeKind::Vector {
                elem: self.substitute_readonly(*elem, generic, args)?,
                count: *count,
            },
            TypeKind::Matrix { elem, rows, cols } => TypeKind::Matrix {
                elem: self.substitute_readonly(*elem, generic, args)?,
                rows: *rows,
                cols: *cols,
            },
            TypeKind::Array { elem, len } => TypeKind::Array {
                elem: self.substitute_readonly(*elem, generic, args)?,
                len: *len,
            },
            TypeKind::Ptr(inner) => TypeKind::Ptr(self.substitute_readonly(*inner, generic, args)?),
            TypeKind::InOut(inner) => {
                TypeKind::InOut(self.substitute_readonly(*inner, generic, args)?)
            }
            TypeKind::Optional(inner) => {
                TypeKind::Optional(self.substitute_readonly(*inner, generic, args)?)
            }
            TypeKind::DiffPair(inner) => {
                TypeKind::DiffPair(self.substitute_readonly(*inner, generic, args)?)
            }
            TypeKind::Tuple(elems) => TypeKind::Tuple(sub_all(elems)?),
            TypeKind::Struct { def, args: targs } => TypeKind::Struct {
                def: *def,
                args: sub_all(targs)?,
            },
            TypeKind::IntermediateContext { func, args: targs } => {
                TypeKind::IntermediateContext {
                    func: *func,
                    args: sub_all(targs)?,
                }
            }
            TypeKind::Func { params, result } => TypeKind::Func {
                params: sub_all(params)?,
                result: self.substitute_readonly(*result, generic, args)?,
            },
            other => other.clone(),
        };
        self.map.get(&new_kind).copied()
    }

    // === Generic envelopes ===

    /// Register a generic envelope with the given parameter names.
    pub fn add_generic(&mut self, name: Option<Name>, params: Vec<Name>) -> GenericId {
        let id = GenericId::from_len(self.generics.len());
        self.generics.push(GenericDef { name, params });
        id
    }

    pub fn generic(&self, id: GenericId) -> &GenericDef {
        &self.generics[id.index()]
    }

    /// Clone an envelope's header (its name and parameter list) into a
    /// fresh envelope with no body.
    pub fn clone_generic_header(&mut self, id: GenericId) -> GenericId {
        let header = self.generic(id).clone();
        self.add_generic(header.name, header.params)
    }

    /// The envelope's own parameters as types, in order.
    pub fn generic_params(&mut self, id: GenericId) -> Vec<Idx> {
        let count = u32::try_from(self.generic(id).params.len())
            .unwrap_or_else(|_| panic!("generic parameter count exceeds u32::MAX"));
        (0..count).map(|i| self.param(id, i)).collect()
    }

    // === Structs ===

    /// Register an empty struct definition.
    pub fn add_struct(&mut self, name: Option<Name>, generic: Option<GenericId>) -> StructId {
        let id = StructId::from_len(self.structs.len());
        self.structs.push(StructDef {
            name,
            generic,
            fields: Vec::new(),
        });
        id
    }

    pub fn struct_def(&self, id: StructId) -> &StructDef {
        &self.structs[id.index()]
    }

    /// Append a field to a struct definition, returning its fresh key.
    ///
    /// `ty` must already be expressed in the struct's own scope.
    pub fn add_field(
        &mut self,
        def: StructId,
        ty: Idx,
        name: Option<Name>,
        differential: Option<Idx>,
    ) -> FieldKey {
        let key = FieldKey::from_len(self.field_owner.len());
        self.field_owner.push(def);
        self.structs[def.index()].fields.push(StructField {
            key,
            ty,
            name,
            differential,
        });
        key
    }

    /// Look up a field by key.
    pub fn field(&self, key: FieldKey) -> Option<(StructId, &StructField)> {
        let def = *self.field_owner.get(key.index())?;
        self.struct_def(def)
            .fields
            .iter()
            .find(|f| f.key == key)
            .map(|f| (def, f))
    }

    /// Type of field `key` as seen through the (possibly specialized)
    /// struct type `struct_ty`.
    pub fn field_type(&mut self, struct_ty: Idx, key: FieldKey) -> Option<Idx> {
        let TypeKind::Struct { def, args } = self.kind(struct_ty).clone() else {
            return None;
        };
        let (owner, field) = self.field(key)?;
        if owner != def {
            return None;
        }
        let field_ty = field.ty;
        match self.struct_def(def).generic {
            Some(g) if !args.is_empty() => Some(self.substitute(field_ty, g, &args)),
            _ => Some(field_ty),
        }
    }
}

impl Default for TypePool {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests;

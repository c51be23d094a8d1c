use pretty_assertions::assert_eq;

use crate::ids::FuncId;
use crate::name::Name;

use super::{Idx, TypeKind, TypePool};

#[test]
fn primitives_are_pre_interned() {
    let pool = TypePool::new();
    assert_eq!(pool.kind(Idx::VOID), &TypeKind::Void);
    assert_eq!(pool.kind(Idx::BOOL), &TypeKind::Bool);
    assert_eq!(pool.kind(Idx::INT), &TypeKind::Int);
    assert_eq!(pool.kind(Idx::FLOAT), &TypeKind::Float);
}

#[test]
fn interning_is_structural() {
    let mut pool = TypePool::new();
    let a = pool.vector(Idx::FLOAT, 3);
    let b = pool.vector(Idx::FLOAT, 3);
    let c = pool.vector(Idx::FLOAT, 4);
    assert_eq!(a, b);
    assert_ne!(a, c);
}

#[test]
fn pointee_of_pointer_like_types() {
    let mut pool = TypePool::new();
    let p = pool.ptr(Idx::INT);
    let io = pool.in_out(Idx::FLOAT);
    assert_eq!(pool.pointee(p), Some(Idx::INT));
    assert_eq!(pool.pointee(io), Some(Idx::FLOAT));
    assert_eq!(pool.pointee(Idx::INT), None);
    assert!(pool.is_ptr_like(p));
    assert!(!pool.is_ptr_like(Idx::FLOAT));
}

#[test]
fn storability_of_basic_types() {
    let mut pool = TypePool::new();
    let ptr = pool.ptr(Idx::FLOAT);
    let func = pool.func(vec![Idx::FLOAT], Idx::FLOAT);
    let opaque = pool.opaque(Name::from_raw(9));
    let vec3 = pool.vector(Idx::FLOAT, 3);
    let arr_of_opaque = pool.array(opaque, 4);

    assert!(pool.can_be_stored(Idx::FLOAT));
    assert!(pool.can_be_stored(vec3));
    assert!(!pool.can_be_stored(Idx::VOID));
    assert!(!pool.can_be_stored(ptr));
    assert!(!pool.can_be_stored(func));
    assert!(!pool.can_be_stored(opaque));
    assert!(!pool.can_be_stored(arr_of_opaque));
}

#[test]
fn struct_storability_follows_fields_and_args() {
    let mut pool = TypePool::new();
    let g = pool.add_generic(None, vec![Name::from_raw(1)]);
    let t = pool.param(g, 0);
    let def = pool.add_struct(None, Some(g));
    pool.add_field(def, t, None, None);

    let opaque = pool.opaque(Name::from_raw(2));
    let of_float = pool.struct_type(def, vec![Idx::FLOAT]);
    let of_opaque = pool.struct_type(def, vec![opaque]);
    assert!(pool.can_be_stored(of_float));
    assert!(!pool.can_be_stored(of_opaque));
}

#[test]
fn substitute_specializes_nested_types() {
    let mut pool = TypePool::new();
    let g = pool.add_generic(None, vec![Name::from_raw(1), Name::from_raw(2)]);
    let t0 = pool.param(g, 0);
    let t1 = pool.param(g, 1);
    let arr = pool.array(t0, 4);
    let func = pool.func(vec![arr, t1], t0);

    let result = pool.substitute(func, g, &[Idx::FLOAT, Idx::INT]);
    let float_arr = pool.array(Idx::FLOAT, 4);
    let expected = pool.func(vec![float_arr, Idx::INT], Idx::FLOAT);
    assert_eq!(result, expected);
}

#[test]
fn substitute_leaves_other_envelopes_alone() {
    let mut pool = TypePool::new();
    let g1 = pool.add_generic(None, vec![Name::from_raw(1)]);
    let g2 = pool.add_generic(None, vec![Name::from_raw(1)]);
    let p2 = pool.param(g2, 0);
    assert_eq!(pool.substitute(p2, g1, &[Idx::FLOAT]), p2);
    assert!(!pool.references_generic(p2, g1));
    assert!(pool.references_generic(p2, g2));
}

#[test]
fn clone_generic_header_copies_params() {
    let mut pool = TypePool::new();
    let g = pool.add_generic(Some(Name::from_raw(5)), vec![Name::from_raw(1)]);
    let h = pool.clone_generic_header(g);
    assert_ne!(g, h);
    assert_eq!(pool.generic(g), pool.generic(h));
    let params = pool.generic_params(h);
    assert_eq!(params.len(), 1);
    assert_eq!(pool.kind(params[0]), &TypeKind::Param { generic: h, index: 0 });
}

#[test]
fn field_keys_are_unique_and_stable() {
    let mut pool = TypePool::new();
    let a = pool.add_struct(None, None);
    let b = pool.add_struct(None, None);
    let k1 = pool.add_field(a, Idx::FLOAT, None, None);
    let k2 = pool.add_field(b, Idx::INT, None, None);
    let k3 = pool.add_field(a, Idx::BOOL, None, None);
    assert_ne!(k1, k2);
    assert_ne!(k1, k3);

    let (owner, field) = pool.field(k3).unwrap_or_else(|| panic!("key3 is registered"));
    assert_eq!(owner, a);
    assert_eq!(field.ty, Idx::BOOL);
    assert_eq!(pool.struct_def(a).fields.len(), 2);
}

#[test]
fn field_type_specializes_through_struct_args() {
    let mut pool = TypePool::new();
    let g = pool.add_generic(None, vec![Name::from_raw(1)]);
    let t = pool.param(g, 0);
    let vec_t = pool.vector(t, 2);
    let def = pool.add_struct(None, Some(g));
    let key = pool.add_field(def, vec_t, None, None);

    let specialized = pool.struct_type(def, vec![Idx::FLOAT]);
    let expected = pool.vector(Idx::FLOAT, 2);
    assert_eq!(pool.field_type(specialized, key), Some(expected));

    let other = pool.add_struct(None, None);
    let other_ty = pool.struct_type(other, vec![]);
    assert_eq!(pool.field_type(other_ty, key), None);
}

#[test]
fn specialization_args() {
    let mut pool = TypePool::new();
    let ctx = pool.intermediate_context(FuncId::new(0), vec![Idx::FLOAT]);
    assert_eq!(pool.specialization_args(ctx), &[Idx::FLOAT]);
    assert!(pool.specialization_args(Idx::FLOAT).is_empty());
}

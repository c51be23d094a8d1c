use pretty_assertions::assert_eq;

use tangent_ir::{clone_function, CloneEnv, Module};

use crate::classify::DiffClassifier;
use crate::storage::StoragePolicy;
use crate::test_helpers::square;

use super::HoistedPrimalsInfo;

#[test]
fn policy_selects_values_crossing_into_differential_code() {
    let mut m = Module::new();
    let sq = square(&mut m);
    let c = DiffClassifier::new();
    let policy = StoragePolicy::new(&m, &c);

    let info = HoistedPrimalsInfo::from_policy(&m, sq.func, &c, &policy);
    assert_eq!(info.len(), 1);
    assert!(info.contains(sq.a));
    assert!(!info.contains(sq.b), "b only reaches the primal result");
    assert!(!info.contains(sq.d));
}

#[test]
fn apply_map_translates_members() {
    let mut m = Module::new();
    let sq = square(&mut m);
    let mut info = HoistedPrimalsInfo::new();
    info.insert(sq.a);
    info.insert(sq.b);

    let mut env = CloneEnv::new();
    clone_function(&mut m, sq.func, &mut env);
    let mapped = info.apply_map(&env);

    let mut expected = HoistedPrimalsInfo::new();
    expected.insert(env.inst(sq.a));
    expected.insert(env.inst(sq.b));
    assert_eq!(mapped, expected);
    assert!(!mapped.contains(sq.a));
}

#[test]
#[should_panic(expected = "no clone recorded")]
fn apply_map_rejects_foreign_members() {
    let mut m = Module::new();
    let sq = square(&mut m);
    let mut info = HoistedPrimalsInfo::new();
    info.insert(sq.a);

    let env = CloneEnv::new();
    let _ = info.apply_map(&env);
}

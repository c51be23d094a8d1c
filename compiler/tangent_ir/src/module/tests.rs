use pretty_assertions::assert_eq;

use crate::builder::Builder;
use crate::inst::{BinaryOp, Op, Use};
use crate::tags::{Tag, TagKind};
use crate::test_helpers::make_func;
use crate::types::Idx;

use super::{InsertPoint, Module};

#[test]
fn void_value_is_outside_every_block() {
    let m = Module::new();
    let void = m.void_value();
    assert_eq!(m.op(void), &Op::Void);
    assert_eq!(m.parent(void), None);
    assert!(m.is_live(void));
}

#[test]
fn insert_links_use_lists() {
    let mut m = Module::new();
    let f = make_func(&mut m, "f", &[Idx::FLOAT], Idx::FLOAT);
    let x = f.params[0];
    let mut b = Builder::at_end(&mut m, f.body);
    let sq = b.binary(BinaryOp::Mul, x, x);
    let ret = b.ret(Some(sq));

    assert_eq!(
        m.uses(x),
        &[Use { user: sq, slot: 0 }, Use { user: sq, slot: 1 }]
    );
    assert_eq!(m.uses(sq), &[Use { user: ret, slot: 0 }]);
    assert_eq!(m.block_insts(f.body), &[sq, ret]);
    assert_eq!(m.terminator(f.body), Some(ret));
}

#[test]
fn insert_before_and_after() {
    let mut m = Module::new();
    let f = make_func(&mut m, "f", &[], Idx::VOID);
    let mut b = Builder::at_end(&mut m, f.body);
    let one = b.int(1);
    let ret = b.ret(None);

    let before = m.insert_inst(InsertPoint::Before(ret), Op::Var, Some(Idx::INT), &[]);
    let after = m.insert_inst(InsertPoint::After(one), Op::Var, Some(Idx::INT), &[]);
    assert_eq!(m.block_insts(f.body), &[one, after, before, ret]);
}

#[test]
fn builder_after_point_advances() {
    let mut m = Module::new();
    let f = make_func(&mut m, "f", &[], Idx::VOID);
    let mut b = Builder::at_end(&mut m, f.body);
    let anchor = b.int(0);
    let ret = b.ret(None);

    let mut b = Builder::new(&mut m, InsertPoint::After(anchor));
    let first = b.int(1);
    let second = b.int(2);
    assert_eq!(m.block_insts(f.body), &[anchor, first, second, ret]);
}

#[test]
fn set_operand_moves_the_use() {
    let mut m = Module::new();
    let f = make_func(&mut m, "f", &[Idx::INT, Idx::INT], Idx::INT);
    let (x, y) = (f.params[0], f.params[1]);
    let ret = Builder::at_end(&mut m, f.body).ret(Some(x));

    m.set_operand(ret, 0, y);
    assert!(!m.has_uses(x));
    assert_eq!(m.uses(y), &[Use { user: ret, slot: 0 }]);
    assert_eq!(m.operand(ret, 0), y);
}

#[test]
fn replace_all_uses_with() {
    let mut m = Module::new();
    let f = make_func(&mut m, "f", &[Idx::INT, Idx::INT], Idx::INT);
    let (x, y) = (f.params[0], f.params[1]);
    let mut b = Builder::at_end(&mut m, f.body);
    let sum = b.binary(BinaryOp::Add, x, x);
    b.ret(Some(sum));

    m.replace_all_uses_with(x, y);
    assert_eq!(m.operands(sum), &[y, y]);
    assert!(!m.has_uses(x));
    assert_eq!(m.uses(y).len(), 2);
}

#[test]
fn removing_a_used_instruction_redirects_to_void() {
    let mut m = Module::new();
    let f = make_func(&mut m, "f", &[Idx::INT], Idx::INT);
    let x = f.params[0];
    let mut b = Builder::at_end(&mut m, f.body);
    let neg = b.unary(crate::inst::UnaryOp::Neg, x);
    let ret = b.ret(Some(neg));
    m.add_tag(neg, Tag::KeepAlive);

    m.remove_inst(neg);
    assert!(!m.is_live(neg));
    assert_eq!(m.parent(neg), None);
    assert_eq!(m.operand(ret, 0), m.void_value());
    assert!(!m.has_uses(x), "operand edges of the removed inst are severed");
    assert!(m.tags(neg).is_empty());
    assert_eq!(m.block_insts(f.body), &[ret]);
}

#[test]
fn remove_block_drops_it_from_layout() {
    let mut m = Module::new();
    let f = make_func(&mut m, "f", &[], Idx::VOID);
    Builder::at_end(&mut m, f.body).ret(None);
    let extra = m.add_block(f.func);
    let ret = Builder::at_end(&mut m, extra).ret(None);

    m.remove_block(extra);
    assert!(!m.is_block_live(extra));
    assert!(!m.is_live(ret));
    assert_eq!(m.func_blocks(f.func), &[f.param_block, f.body]);
}

#[test]
fn function_structure_queries() {
    let mut m = Module::new();
    let f = make_func(&mut m, "g", &[Idx::FLOAT, Idx::INT], Idx::FLOAT);
    assert_eq!(m.param_block(f.func), Some(f.param_block));
    assert_eq!(m.first_body_block(f.func), Some(f.body));
    assert_eq!(m.func_params(f.func), f.params);
    assert_eq!(m.func_name(f.func), Some("g"));
    assert_eq!(m.successors(f.param_block).as_slice(), &[f.body]);
    let jump = m.terminator(f.param_block);
    assert_eq!(m.first_ordinary_inst(f.param_block), jump);
}

#[test]
fn tags_add_find_remove_transfer() {
    let mut m = Module::new();
    let f = make_func(&mut m, "f", &[Idx::INT], Idx::INT);
    let x = f.params[0];

    m.add_tag(f.body, Tag::Differential);
    assert!(m.has_tag(f.body, TagKind::Differential));
    assert!(!m.has_tag(f.param_block, TagKind::Differential));

    m.set_name_hint(x, "x");
    m.set_name_hint(x, "y");
    assert_eq!(m.name_hint(x).map(|n| m.name_str(n)), Some("y"));
    assert_eq!(m.tags(x).len(), 1);

    let other = f.param_block;
    m.transfer_tags(f.body, other);
    assert!(m.tags(f.body).is_empty());
    assert_eq!(m.find_tag(other, TagKind::Differential), Some(Tag::Differential));

    m.remove_tags(other, TagKind::Differential);
    assert!(m.tags(other).is_empty());
}

#[test]
fn primal_value_key_lookup() {
    let mut m = Module::new();
    let f = make_func(&mut m, "f", &[Idx::INT], Idx::INT);
    let def = m.types.add_struct(None, None);
    let key = m.types.add_field(def, Idx::INT, None, None);
    assert_eq!(m.primal_value_key(f.params[0]), None);
    m.add_tag(f.params[0], Tag::PrimalValueKey(key));
    assert_eq!(m.primal_value_key(f.params[0]), Some(key));
}

use pretty_assertions::assert_eq;

use crate::builder::Builder;
use crate::inst::{BinaryOp, Literal, Op, UnaryOp};
use crate::module::{InsertPoint, Module};
use crate::test_helpers::make_func;
use crate::types::Idx;

use super::{verify_function, VerifyError};

#[test]
fn well_formed_function_passes() {
    let mut m = Module::new();
    let f = make_func(&mut m, "f", &[Idx::FLOAT], Idx::FLOAT);
    let x = f.params[0];
    let mut b = Builder::at_end(&mut m, f.body);
    let sq = b.binary(BinaryOp::Mul, x, x);
    b.ret(Some(sq));
    assert_eq!(verify_function(&m, f.func), Ok(()));
}

#[test]
fn missing_terminator() {
    let mut m = Module::new();
    let f = make_func(&mut m, "f", &[], Idx::INT);
    Builder::at_end(&mut m, f.body).int(1);
    assert_eq!(
        verify_function(&m, f.func),
        Err(VerifyError::MissingTerminator { block: f.body })
    );
}

#[test]
fn empty_block() {
    let mut m = Module::new();
    let f = make_func(&mut m, "f", &[], Idx::VOID);
    assert_eq!(
        verify_function(&m, f.func),
        Err(VerifyError::EmptyBlock { block: f.body })
    );
}

#[test]
fn terminator_in_the_middle() {
    let mut m = Module::new();
    let f = make_func(&mut m, "f", &[], Idx::VOID);
    let mut b = Builder::at_end(&mut m, f.body);
    let early = b.ret(None);
    b.ret(None);
    assert_eq!(
        verify_function(&m, f.func),
        Err(VerifyError::TerminatorNotLast {
            block: f.body,
            inst: early
        })
    );
}

#[test]
fn param_after_ordinary_instruction() {
    let mut m = Module::new();
    let f = make_func(&mut m, "f", &[], Idx::VOID);
    let mut b = Builder::at_end(&mut m, f.body);
    b.int(0);
    let late = b.param(Idx::INT);
    b.ret(None);
    assert_eq!(
        verify_function(&m, f.func),
        Err(VerifyError::ParamNotAtHead {
            block: f.body,
            inst: late
        })
    );
}

#[test]
fn param_block_with_computation() {
    let mut m = Module::new();
    let f = make_func(&mut m, "f", &[Idx::INT], Idx::VOID);
    Builder::at_end(&mut m, f.body).ret(None);
    let jump = m
        .terminator(f.param_block)
        .unwrap_or_else(|| panic!("parameter block has no jump"));
    m.insert_inst(
        InsertPoint::Before(jump),
        Op::Literal(Literal::Int(3)),
        Some(Idx::INT),
        &[],
    );
    assert_eq!(
        verify_function(&m, f.func),
        Err(VerifyError::ParamBlockShape {
            block: f.param_block
        })
    );
}

#[test]
fn use_before_definition_in_block() {
    let mut m = Module::new();
    let f = make_func(&mut m, "f", &[], Idx::INT);
    let mut b = Builder::at_end(&mut m, f.body);
    let one = b.int(1);
    let ret = b.ret(Some(one));
    let late = m.insert_inst(
        InsertPoint::Before(ret),
        Op::Literal(Literal::Int(2)),
        Some(Idx::INT),
        &[],
    );
    let neg = m.insert_inst(
        InsertPoint::Before(late),
        Op::Unary(UnaryOp::Neg),
        Some(Idx::INT),
        &[late],
    );
    assert_eq!(
        verify_function(&m, f.func),
        Err(VerifyError::NotDominated {
            user: neg,
            operand: late
        })
    );
}

#[test]
fn use_from_sibling_branch_is_not_dominated() {
    let mut m = Module::new();
    let f = make_func(&mut m, "f", &[Idx::BOOL], Idx::INT);
    let cond = f.params[0];
    let left = m.add_block(f.func);
    let right = m.add_block(f.func);
    Builder::at_end(&mut m, f.body).branch(cond, left, right);
    let mut b = Builder::at_end(&mut m, left);
    let value = b.int(1);
    b.ret(Some(value));
    let ret = Builder::at_end(&mut m, right).ret(Some(value));
    assert_eq!(
        verify_function(&m, f.func),
        Err(VerifyError::NotDominated {
            user: ret,
            operand: value
        })
    );
}

#[test]
fn removed_operand_placeholder_is_accepted() {
    let mut m = Module::new();
    let f = make_func(&mut m, "f", &[Idx::INT], Idx::INT);
    let x = f.params[0];
    let mut b = Builder::at_end(&mut m, f.body);
    let neg = b.unary(UnaryOp::Neg, x);
    b.ret(Some(neg));
    m.remove_inst(neg);
    assert_eq!(verify_function(&m, f.func), Ok(()));
}

#[test]
fn branch_into_removed_block() {
    let mut m = Module::new();
    let f = make_func(&mut m, "f", &[], Idx::VOID);
    let gone = m.add_block(f.func);
    Builder::at_end(&mut m, f.body).jump(gone, &[]);
    Builder::at_end(&mut m, gone).ret(None);
    m.remove_block(gone);
    assert_eq!(
        verify_function(&m, f.func),
        Err(VerifyError::BadSuccessor {
            block: f.body,
            target: gone
        })
    );
}

#[test]
fn jump_arity_mismatch() {
    let mut m = Module::new();
    let f = make_func(&mut m, "f", &[Idx::INT], Idx::INT);
    let x = f.params[0];
    let join = m.add_block(f.func);
    let jump = Builder::at_end(&mut m, f.body).jump(join, &[x, x]);
    let mut b = Builder::at_end(&mut m, join);
    let p = b.param(Idx::INT);
    b.ret(Some(p));
    assert_eq!(
        verify_function(&m, f.func),
        Err(VerifyError::JumpArity {
            inst: jump,
            target: join,
            given: 2,
            expected: 1
        })
    );
}

#[test]
fn error_messages_name_the_entities() {
    let err = VerifyError::MissingTerminator {
        block: crate::ids::BlockId::new(4),
    };
    assert_eq!(err.to_string(), "bb4 does not end in a terminator");
}

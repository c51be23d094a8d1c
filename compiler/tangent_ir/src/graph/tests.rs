use pretty_assertions::assert_eq;

use crate::builder::Builder;
use crate::ids::BlockId;
use crate::module::Module;
use crate::test_helpers::make_func;
use crate::types::Idx;

use super::{compute_postorder, compute_predecessors, reachable_blocks, BlockIndex, DominatorTree};

/// Param block → b1, b1 branches to b2/b3, both jump to b4.
fn diamond(m: &mut Module) -> (crate::ids::FuncId, [BlockId; 5]) {
    let f = make_func(m, "diamond", &[Idx::BOOL], Idx::VOID);
    let cond = f.params[0];
    let left = m.add_block(f.func);
    let right = m.add_block(f.func);
    let join = m.add_block(f.func);
    Builder::at_end(m, f.body).branch(cond, left, right);
    Builder::at_end(m, left).jump(join, &[]);
    Builder::at_end(m, right).jump(join, &[]);
    Builder::at_end(m, join).ret(None);
    (f.func, [f.param_block, f.body, left, right, join])
}

#[test]
fn predecessors_of_diamond() {
    let mut m = Module::new();
    let (func, _) = diamond(&mut m);
    let index = BlockIndex::new(&m, func);
    let preds = compute_predecessors(&m, &index);
    assert_eq!(preds, vec![vec![], vec![0], vec![1], vec![1], vec![2, 3]]);
}

#[test]
fn postorder_ends_with_entry() {
    let mut m = Module::new();
    let (func, _) = diamond(&mut m);
    let index = BlockIndex::new(&m, func);
    let po = compute_postorder(&m, &index);
    assert_eq!(po.len(), 5);
    assert_eq!(po.last(), Some(&0));
    let join_pos = po.iter().position(|&b| b == 4);
    let body_pos = po.iter().position(|&b| b == 1);
    assert!(join_pos < body_pos, "join must finish before its dominator");
}

#[test]
fn dominance_in_diamond() {
    let mut m = Module::new();
    let (func, [entry, body, left, right, join]) = diamond(&mut m);
    let dom = DominatorTree::build(&m, func);
    for block in [entry, body, left, right, join] {
        assert!(dom.dominates(entry, block));
        assert!(dom.dominates(block, block));
    }
    assert!(dom.dominates(body, join));
    assert!(!dom.dominates(left, join));
    assert!(!dom.dominates(right, join));
    assert!(!dom.dominates(join, body));
}

#[test]
fn unreachable_blocks() {
    let mut m = Module::new();
    let f = make_func(&mut m, "f", &[], Idx::VOID);
    Builder::at_end(&mut m, f.body).ret(None);
    let orphan = m.add_block(f.func);
    Builder::at_end(&mut m, orphan).jump(f.body, &[]);

    let dom = DominatorTree::build(&m, f.func);
    assert!(!dom.is_reachable(orphan));
    assert!(dom.is_reachable(f.body));
    assert!(!dom.dominates(orphan, f.body));
    assert!(!dom.dominates(f.param_block, orphan));

    let reachable = reachable_blocks(&m, f.func);
    assert!(reachable.contains(&f.body));
    assert!(!reachable.contains(&orphan));
}

#[test]
fn loop_back_edge() {
    // body → header ⇄ latch, header → exit
    let mut m = Module::new();
    let f = make_func(&mut m, "loop", &[Idx::BOOL], Idx::VOID);
    let cond = f.params[0];
    let header = m.add_block(f.func);
    let latch = m.add_block(f.func);
    let exit = m.add_block(f.func);
    Builder::at_end(&mut m, f.body).jump(header, &[]);
    Builder::at_end(&mut m, header).branch(cond, latch, exit);
    Builder::at_end(&mut m, latch).jump(header, &[]);
    Builder::at_end(&mut m, exit).ret(None);

    let dom = DominatorTree::build(&m, f.func);
    assert!(dom.dominates(header, latch));
    assert!(dom.dominates(header, exit));
    assert!(!dom.dominates(latch, header));
    assert!(!dom.dominates(latch, exit));
}

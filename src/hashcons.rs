// Copyright 2020 Xavier Gillard
//
// Permission is hereby granted, free of charge, to any person obtaining a copy of
// this software and associated documentation files (the "Software"), to deal in
// the Software without restriction, including without limitation the rights to
// use, copy, modify, merge, publish, distribute, sublicense, and/or sell copies of
// the Software, and to permit persons to whom the Software is furnished to do so,
// subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in all
// copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY, FITNESS
// FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR
// COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER
// IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN
// CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.

//! Hash-consing: rewrites a `BinaryDrag` so that structurally identical
//! subtrees are physically shared, turning a tree into a compact DAG.
//!
//! Canonicalization runs bottom-up (children before parents) over an
//! explicit work stack rather than recursion, content-addressing every node
//! through an `FxHashMap` the same way the teacher's pooled MDD
//! content-addresses states (`ddo::implementation::mdd::pooled`'s
//! `states: FxHashMap<Arc<T>, NodeId>` keeps one node per distinct state;
//! here the key is a node's own shape rather than a problem state).

use fxhash::FxHashMap;

use crate::dag::{BinaryDrag, Node, NodeId};
use crate::ruleset::ActionSet;

/// Whether leaf identity includes the action set, or only the leaf's
/// dispatch target.
///
/// `Strict` is what the compressor normally runs: two leaves only share a
/// node when they carry the same actions. `IgnoreLeaves` is used to compare
/// or fold two subtrees that must have the same *shape* but may legitimately
/// disagree on which actions sit at the leaves (e.g. when checking whether
/// two forest trees differ only in their terminal labeling).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashConsMode {
    /// Leaves are equal only if their action sets (and dispatch target) are
    /// equal.
    Strict,
    /// Leaves are equal as soon as their dispatch target is equal,
    /// regardless of their action sets.
    IgnoreLeaves,
}

#[derive(PartialEq, Eq, Hash)]
enum Key {
    Condition(usize, NodeId, NodeId),
    Leaf(Option<ActionSet>, Option<usize>),
}

/// Rewrites `src` into a new, maximally-shared `BinaryDrag` with the same
/// roots (in the same order) and the same evaluation semantics: for every
/// root index `i` and configuration `c`, `out.evaluate(i, c) ==
/// src.evaluate(i, c)` under `Strict` mode. Running this function again on
/// its own output is a no-op (same node count, same shape); canonicalizing
/// an already-canonical DAG finds nothing left to merge.
pub fn hash_cons(src: &BinaryDrag, mode: HashConsMode) -> BinaryDrag {
    let mut out = BinaryDrag::new();
    let mut table: FxHashMap<Key, NodeId> = FxHashMap::default();
    let mut memo: FxHashMap<NodeId, NodeId> = FxHashMap::default();

    for &root in src.roots() {
        canonicalize(src, root, mode, &mut out, &mut table, &mut memo);
    }
    for &root in src.roots() {
        let canon = *memo.get(&root).expect("root canonicalized by the loop above");
        out.add_root(canon);
    }
    out
}

/// Iterative post-order walk: a node is only canonicalized once both of its
/// children (if any) already have a canonical id in `memo`. Revisiting an id
/// already in `memo` is a cheap no-op, which is what makes sharing safe:
/// the same subtree reached through two different parents is canonicalized
/// exactly once.
fn canonicalize(
    src: &BinaryDrag,
    start: NodeId,
    mode: HashConsMode,
    out: &mut BinaryDrag,
    table: &mut FxHashMap<Key, NodeId>,
    memo: &mut FxHashMap<NodeId, NodeId>,
) {
    let mut stack = vec![(start, false)];
    while let Some((id, children_done)) = stack.pop() {
        if memo.contains_key(&id) {
            continue;
        }
        match src.get(id) {
            Node::Leaf { actions, next } => {
                let key = match mode {
                    HashConsMode::Strict => Key::Leaf(Some(actions.clone()), *next),
                    HashConsMode::IgnoreLeaves => Key::Leaf(None, *next),
                };
                let canon = *table
                    .entry(key)
                    .or_insert_with(|| out.push_leaf(actions.clone(), *next));
                memo.insert(id, canon);
            }
            Node::Condition { condition, left, right } => {
                if !children_done {
                    stack.push((id, true));
                    stack.push((*right, false));
                    stack.push((*left, false));
                } else {
                    let l = *memo.get(left).expect("left child canonicalized before parent");
                    let r = *memo.get(right).expect("right child canonicalized before parent");
                    let key = Key::Condition(*condition, l, r);
                    let canon = *table
                        .entry(key)
                        .or_insert_with(|| out.push_condition(*condition, l, r));
                    memo.insert(id, canon);
                }
            }
        }
    }
}

#[cfg(test)]
mod test_hashcons {
    use super::*;
    use crate::action::Action;

    #[test]
    fn identical_subtrees_are_shared() {
        let mut drag = BinaryDrag::new();
        // two separately-built but structurally identical condition nodes
        let f1 = drag.push_leaf(ActionSet::from([Action::Nothing]), None);
        let t1 = drag.push_leaf(ActionSet::from([Action::NewLabel]), None);
        let branch1 = drag.push_condition(1, f1, t1);

        let f2 = drag.push_leaf(ActionSet::from([Action::Nothing]), None);
        let t2 = drag.push_leaf(ActionSet::from([Action::NewLabel]), None);
        let branch2 = drag.push_condition(1, f2, t2);

        let root = drag.push_condition(0, branch1, branch2);
        drag.add_root(root);
        assert_eq!(7, drag.node_count());

        let consed = hash_cons(&drag, HashConsMode::Strict);
        // branch1/branch2 collapse to one condition node, and each pair of
        // leaves collapses too: 1 leaf(nothing) + 1 leaf(newlabel) + 1
        // condition(1) + 1 condition(0) = 4 nodes.
        assert_eq!(4, consed.node_count());
        assert_eq!(consed.evaluate(0, 0b00), drag.evaluate(0, 0b00));
        assert_eq!(consed.evaluate(0, 0b01), drag.evaluate(0, 0b01));
        assert_eq!(consed.evaluate(0, 0b10), drag.evaluate(0, 0b10));
        assert_eq!(consed.evaluate(0, 0b11), drag.evaluate(0, 0b11));
    }

    #[test]
    fn strict_mode_keeps_leaves_with_different_actions_apart() {
        let mut drag = BinaryDrag::new();
        let a = drag.push_leaf(ActionSet::from([Action::Keep0]), None);
        let b = drag.push_leaf(ActionSet::from([Action::Keep1]), None);
        let root = drag.push_condition(0, a, b);
        drag.add_root(root);

        let consed = hash_cons(&drag, HashConsMode::Strict);
        assert_eq!(3, consed.node_count());
    }

    #[test]
    fn ignore_leaves_mode_merges_leaves_with_the_same_dispatch_target() {
        let mut drag = BinaryDrag::new();
        let a = drag.push_leaf(ActionSet::from([Action::Keep0]), None);
        let b = drag.push_leaf(ActionSet::from([Action::Keep1]), None);
        let root = drag.push_condition(0, a, b);
        drag.add_root(root);

        let consed = hash_cons(&drag, HashConsMode::IgnoreLeaves);
        // both leaves have `next: None`, so in IgnoreLeaves mode they share
        // one node: 1 leaf + 1 condition = 2 nodes.
        assert_eq!(2, consed.node_count());
    }

    #[test]
    fn canonicalizing_twice_is_a_no_op() {
        let mut drag = BinaryDrag::new();
        let f1 = drag.push_leaf(ActionSet::from([Action::Nothing]), None);
        let t1 = drag.push_leaf(ActionSet::from([Action::NewLabel]), None);
        let branch1 = drag.push_condition(1, f1, t1);
        let f2 = drag.push_leaf(ActionSet::from([Action::Nothing]), None);
        let t2 = drag.push_leaf(ActionSet::from([Action::NewLabel]), None);
        let branch2 = drag.push_condition(1, f2, t2);
        let root = drag.push_condition(0, branch1, branch2);
        drag.add_root(root);

        let once = hash_cons(&drag, HashConsMode::Strict);
        let twice = hash_cons(&once, HashConsMode::Strict);
        assert_eq!(once.node_count(), twice.node_count());
    }
}

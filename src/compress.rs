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

//! Iteratively reduces a `BinaryDrag`'s node count to a fixed point without
//! changing any root's evaluation semantics.
//!
//! Each pass hash-conses the whole arena and, when requested, also unifies
//! leaves whose action sets merely overlap rather than match exactly, which
//! is legal because the original rule set allowed either action at that
//! configuration. A pass that removes no node ends the loop; node count is
//! non-increasing pass over pass, so termination is guaranteed.
//!
//! # Design note
//! Order-insensitive condition-node unification (treating two condition
//! nodes as the same whenever `{u.left, u.right} = {v.left, v.right}` under
//! condition negation, not just when left and right match exactly) is not
//! implemented: it requires a notion of "negated condition identity" this
//! crate's `Node`/`Action` model does not carry. This is a deliberate,
//! recorded non-fix (see `DESIGN.md`), not an oversight.

use fxhash::FxHashMap;

use crate::dag::{BinaryDrag, Node, NodeId};
use crate::hashcons::{hash_cons, HashConsMode};
use crate::progress::{ProgressObserver, Stage};
use crate::ruleset::ActionSet;

/// Tuning knobs for one compression run.
#[derive(Debug, Clone, Copy, Default)]
pub struct CompressOptions {
    /// When set, leaves with overlapping (non-disjoint) action sets are
    /// unified into one leaf carrying the intersection.
    pub merge_leaves: bool,
}

/// Summary of one `compress` run, handed back to the caller for logging or
/// assertions (not fed back into `ProgressObserver`, which only ever sees
/// per-pass percentages).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompressStats {
    /// Number of passes executed before reaching the fixed point.
    pub iterations: usize,
    /// Total nodes removed, comparing the arena before the first pass to
    /// the arena after the last.
    pub nodes_removed: usize,
}

/// Compresses `drag` in place until a pass removes no further node.
/// Preserves every root's evaluation semantics (`drag.roots()` still has
/// the same length, in the same order, evaluating identically for every
/// configuration) as long as `options.merge_leaves` is only set when the
/// caller has established that overlapping leaves really are
/// interchangeable at every configuration reaching them.
pub fn compress(
    drag: &mut BinaryDrag,
    options: CompressOptions,
    progress: &dyn ProgressObserver,
) -> CompressStats {
    let start_count = drag.node_count();
    let mut iterations = 0;
    tracing::debug!(target: "compress", nodes = start_count, merge_leaves = options.merge_leaves, "starting compression");

    loop {
        let before = drag.node_count();

        *drag = hash_cons(drag, HashConsMode::Strict);
        if options.merge_leaves {
            *drag = merge_overlapping_leaves(drag);
            *drag = hash_cons(drag, HashConsMode::Strict);
        }
        drag.sweep_unreachable();

        let after = drag.node_count();
        iterations += 1;
        let removed_this_pass = before.saturating_sub(after);
        let percent = if before == 0 {
            100.0
        } else {
            100.0 * (1.0 - removed_this_pass as f32 / before as f32)
        };
        progress.report(Stage::Compress, percent);
        tracing::trace!(target: "compress", pass = iterations, before, after, "compression pass complete");

        if removed_this_pass == 0 {
            break;
        }
    }

    let stats = CompressStats { iterations, nodes_removed: start_count.saturating_sub(drag.node_count()) };
    tracing::debug!(target: "compress", iterations = stats.iterations, nodes_removed = stats.nodes_removed, "compression finished");
    stats
}

/// One single-linkage pass over the reachable leaves: walks them in stable
/// `NodeId` order, folding each into the first already-kept representative
/// its action set overlaps (same `next`, non-empty intersection), or
/// keeping it as a new representative otherwise. Returns a freshly built
/// arena with every leaf reference redirected to its representative's
/// (possibly narrowed) action set.
fn merge_overlapping_leaves(src: &BinaryDrag) -> BinaryDrag {
    let mut leaf_ids: Vec<NodeId> = src
        .reachable_from_roots()
        .into_iter()
        .filter(|id| src.get(*id).is_leaf())
        .collect();
    leaf_ids.sort();

    let mut reps: Vec<(ActionSet, Option<usize>)> = Vec::new();
    let mut redirect: FxHashMap<NodeId, usize> = FxHashMap::default();

    for id in leaf_ids {
        let Node::Leaf { actions, next } = src.get(id) else { unreachable!() };
        let mut merged_into = None;
        for (ri, (rep_actions, rep_next)) in reps.iter_mut().enumerate() {
            if *rep_next == *next {
                let intersection: ActionSet = rep_actions.intersection(actions).cloned().collect();
                if !intersection.is_empty() {
                    *rep_actions = intersection;
                    merged_into = Some(ri);
                    break;
                }
            }
        }
        match merged_into {
            Some(ri) => {
                redirect.insert(id, ri);
            }
            None => {
                reps.push((actions.clone(), *next));
                redirect.insert(id, reps.len() - 1);
            }
        }
    }

    let mut dest = BinaryDrag::new();
    let mut rep_new_id: FxHashMap<usize, NodeId> = FxHashMap::default();
    let mut memo: FxHashMap<NodeId, NodeId> = FxHashMap::default();
    let roots: Vec<NodeId> = src.roots().to_vec();
    for root in roots {
        let new_root = rebuild(src, root, &redirect, &reps, &mut rep_new_id, &mut memo, &mut dest);
        dest.add_root(new_root);
    }
    dest
}

#[allow(clippy::too_many_arguments)]
fn rebuild(
    src: &BinaryDrag,
    id: NodeId,
    redirect: &FxHashMap<NodeId, usize>,
    reps: &[(ActionSet, Option<usize>)],
    rep_new_id: &mut FxHashMap<usize, NodeId>,
    memo: &mut FxHashMap<NodeId, NodeId>,
    dest: &mut BinaryDrag,
) -> NodeId {
    if let Some(&existing) = memo.get(&id) {
        return existing;
    }
    let new_id = match src.get(id) {
        Node::Leaf { .. } => {
            let rep_index = redirect[&id];
            if let Some(&existing) = rep_new_id.get(&rep_index) {
                existing
            } else {
                let (actions, next) = &reps[rep_index];
                let new_leaf = dest.push_leaf(actions.clone(), *next);
                rep_new_id.insert(rep_index, new_leaf);
                new_leaf
            }
        }
        Node::Condition { condition, left, right } => {
            let l = rebuild(src, *left, redirect, reps, rep_new_id, memo, dest);
            let r = rebuild(src, *right, redirect, reps, rep_new_id, memo, dest);
            dest.push_condition(*condition, l, r)
        }
    };
    memo.insert(id, new_id);
    new_id
}

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

//! The shared data structure for binary decision trees and DAGs: condition
//! nodes and action-leaf nodes living in one arena, addressed by stable
//! `NodeId`s rather than raw pointers.
//!
//! # Note
//! This mirrors the node-pool shape of the teacher's MDD implementations
//! (`NodeId(usize)` indexing into a `Vec`, see
//! `ddo::implementation::mdd::pooled`) generalized from a layered MDD to a
//! binary condition/leaf tree-or-DAG.

use fxhash::{FxHashMap, FxHashSet};

use crate::ruleset::ActionSet;

/// Stable identifier of a node in a `BinaryDrag`'s pool. Indexes into that
/// DRAG's `nodes` vector; never meaningful across two different `BinaryDrag`
/// instances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

/// One node of the decision DAG: either a binary condition test or an
/// action-bearing leaf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// Tests the condition at bit position `condition` (an index into the
    /// owning `RuleSet`'s condition order). `left` is taken when the
    /// condition is false, `right` when it is true.
    Condition {
        /// Index of the tested condition in the rule set's condition order.
        condition: usize,
        /// Child reached when the condition is false.
        left: NodeId,
        /// Child reached when the condition is true.
        right: NodeId,
    },
    /// A leaf carrying the (non-empty) set of acceptable actions for every
    /// configuration reaching it, plus the index of the next tree a forest
    /// walk should dispatch to (populated only once a `BinaryDrag` has been
    /// folded into a `LineForestHandler`'s forest).
    Leaf {
        /// Acceptable actions for configurations reaching this leaf.
        actions: ActionSet,
        /// Index of the next main-forest tree to dispatch to, if any.
        next: Option<usize>,
    },
}

impl Node {
    /// True iff this is a `Leaf`.
    pub fn is_leaf(&self) -> bool {
        matches!(self, Node::Leaf { .. })
    }
}

/// A collection of root nodes sharing one node pool (a "Directed Rooted
/// Acyclic Graph"). Any node may be pointed to by more than one parent, which
/// is what turns a tree into a DAG. The arena owns all nodes; `NodeId`s are
/// non-owning references valid only for this `BinaryDrag`'s lifetime.
#[derive(Debug, Clone, Default)]
pub struct BinaryDrag {
    nodes: Vec<Node>,
    roots: Vec<NodeId>,
}

impl BinaryDrag {
    /// An empty DRAG with no nodes and no roots.
    pub fn new() -> Self {
        BinaryDrag::default()
    }

    /// Inserts a condition node and returns its id.
    pub fn push_condition(&mut self, condition: usize, left: NodeId, right: NodeId) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node::Condition { condition, left, right });
        id
    }

    /// Inserts a leaf node and returns its id.
    pub fn push_leaf(&mut self, actions: ActionSet, next: Option<usize>) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node::Leaf { actions, next });
        id
    }

    /// Registers `id` as an additional root and returns its root index.
    pub fn add_root(&mut self, id: NodeId) -> usize {
        self.roots.push(id);
        self.roots.len() - 1
    }

    /// Number of nodes currently in the pool (including unreachable ones).
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// The roots, in registration order.
    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    /// Borrows a node by id.
    pub fn get(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    /// Mutably borrows a node by id (used by the compressor's in-place
    /// unification).
    pub fn get_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    /// Iterates over every node currently in the pool, in arena order
    /// (includes unreachable ones; use `reachable_from` for a live set).
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes.iter().enumerate().map(|(i, n)| (NodeId(i), n))
    }

    /// Replaces root `index`'s target node id (used when hash-consing or
    /// compression finds that a root should point at a different,
    /// canonical, node).
    pub fn set_root(&mut self, index: usize, id: NodeId) {
        self.roots[index] = id;
    }

    /// Copies the subgraph rooted at `id` (which may live in `self` or in
    /// any other `BinaryDrag`) into `dest`, preserving internal sharing: a
    /// node reachable through two different paths of the source subgraph is
    /// only ever pushed into `dest` once. Returns the copy's id in `dest`.
    /// Used by forest specialization, which needs several independent,
    /// separately-mutable copies of one ODT.
    pub fn clone_subgraph_into(&self, id: NodeId, dest: &mut BinaryDrag) -> NodeId {
        let mut memo = FxHashMap::default();
        self.clone_rec(id, dest, &mut memo)
    }

    fn clone_rec(&self, id: NodeId, dest: &mut BinaryDrag, memo: &mut FxHashMap<NodeId, NodeId>) -> NodeId {
        if let Some(&existing) = memo.get(&id) {
            return existing;
        }
        let new_id = match self.get(id) {
            Node::Leaf { actions, next } => dest.push_leaf(actions.clone(), *next),
            Node::Condition { condition, left, right } => {
                let l = self.clone_rec(*left, dest, memo);
                let r = self.clone_rec(*right, dest, memo);
                dest.push_condition(*condition, l, r)
            }
        };
        memo.insert(id, new_id);
        new_id
    }

    /// Walks this DRAG from root `root_index` against a full configuration
    /// bitmask and returns the id of the leaf it lands on, without
    /// dereferencing it; callers that need both the action set and the
    /// `next` dispatch target (forest-driven scan simulation) can do both
    /// from one walk instead of two.
    pub fn evaluate_to_leaf(&self, root_index: usize, configuration: u64) -> NodeId {
        let mut id = self.roots[root_index];
        loop {
            match self.get(id) {
                Node::Condition { condition, left, right } => {
                    id = if (configuration >> *condition) & 1 == 1 { *right } else { *left };
                }
                Node::Leaf { .. } => return id,
            }
        }
    }

    /// Evaluates this DRAG starting at root `root_index` against a full
    /// configuration bitmask, returning the reached leaf's action set. Used
    /// by the round-trip tests as a "parsed back into a decision procedure"
    /// harness; it simply interprets the tree instead of parsing emitted
    /// text.
    pub fn evaluate(&self, root_index: usize, configuration: u64) -> &ActionSet {
        match self.get(self.evaluate_to_leaf(root_index, configuration)) {
            Node::Leaf { actions, .. } => actions,
            Node::Condition { .. } => unreachable!("evaluate_to_leaf always lands on a leaf"),
        }
    }

    /// Returns the set of node ids reachable from the current roots, via a
    /// plain worklist (not recursion, per the Design Notes' "explicit
    /// work-stack" recommendation).
    pub fn reachable_from_roots(&self) -> FxHashSet<NodeId> {
        let mut seen = FxHashSet::default();
        let mut stack: Vec<NodeId> = self.roots.clone();
        while let Some(id) = stack.pop() {
            if !seen.insert(id) {
                continue;
            }
            if let Node::Condition { left, right, .. } = self.get(id) {
                stack.push(*left);
                stack.push(*right);
            }
        }
        seen
    }

    /// Counts reachable nodes and leaves (mirrors the original's
    /// `DragStatistics` helper; see `stats` module for the public,
    /// documented entry point).
    pub(crate) fn reachable_counts(&self) -> (usize, usize) {
        let reachable = self.reachable_from_roots();
        let leaves = reachable.iter().filter(|id| self.get(**id).is_leaf()).count();
        (reachable.len(), leaves)
    }

    /// Compacts the pool, dropping every node unreachable from any root and
    /// remapping all surviving `NodeId`s. Orphans can appear after
    /// hash-consing rewires parents to canonical nodes; sweeping is
    /// optional and must not change any root's semantics.
    pub fn sweep_unreachable(&mut self) {
        let reachable = self.reachable_from_roots();
        let mut old_to_new = vec![None; self.nodes.len()];
        let mut new_nodes = Vec::with_capacity(reachable.len());
        // Stable order: keep original arena order among the survivors so
        // sweeping is itself deterministic.
        for (old_id, node) in self.nodes.iter().enumerate() {
            if reachable.contains(&NodeId(old_id)) {
                old_to_new[old_id] = Some(NodeId(new_nodes.len()));
                new_nodes.push(node.clone());
            }
        }
        for node in &mut new_nodes {
            if let Node::Condition { left, right, .. } = node {
                *left = old_to_new[left.0].expect("reachable node's child must survive sweep");
                *right = old_to_new[right.0].expect("reachable node's child must survive sweep");
            }
        }
        for root in &mut self.roots {
            *root = old_to_new[root.0].expect("root must be reachable from itself");
        }
        self.nodes = new_nodes;
    }
}

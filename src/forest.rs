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

//! Turns one optimal decision tree into the scan-loop-shaped forest a line
//! scan actually drives: a main forest of `shift + 1` roots (one per
//! intra-line phase) plus one end forest per terminal offset, with a total
//! mapping from main roots to end roots.
//!
//! # Design note (recorded in full in `DESIGN.md`)
//! The mask's `shift` tells us exactly which pixel conditions are reused
//! between two consecutive mask applications (`p.x <= maxx - shift`), but
//! *which* value a reused condition holds is never known at generation
//! time; only that it was already read once, so the emitted code could
//! fetch it from a cache instead of the source image. That is purely a
//! condition-*text* concern, and condition text is exactly what this
//! crate's `EmitHooks`/caller-supplied text maps own, not `forest` (see
//! the Out-of-scope row-pointer-arithmetic note in the overview). So the
//! main forest's `shift + 1` roots all share the same decision content
//! (hash-consed down to one copy) and differ only in which conditions are
//! annotated `known` for that phase; phase 0 (line start) knows nothing,
//! phases `1..=shift` are the single steady-state set (derived below).
//!
//! End forests are a genuine structural specialization: a pixel that would
//! read past the image's right edge does not have an "already known but
//! different text" escape hatch; it is, by the labeling/thinning
//! convention used throughout this pipeline, simply background. Forcing
//! those conditions false is a real constant-fold, which is why
//! `end_forests[e]` can have strictly fewer nodes than the main forest.

use std::collections::BTreeSet;

use fxhash::FxHashMap;

use crate::dag::{BinaryDrag, Node, NodeId};
use crate::hashcons::{hash_cons, HashConsMode};
use crate::pixel::PixelSet;

/// The per-line-scan forest derived from one ODT: a main forest dispatched
/// by intra-line phase, an end forest per terminal offset, and the total
/// mapping between them.
#[derive(Debug, Clone)]
pub struct LineForestHandler {
    main: BinaryDrag,
    /// `main_known[i]` is the set of condition (bit) indices already
    /// evaluated by the time main-forest root `i` is entered.
    main_known: Vec<BTreeSet<usize>>,
    end_forests: Vec<BinaryDrag>,
    /// `mapping[e][i] = j`: main root `i` jumps to `end_forests[e]`'s root
    /// `j` when the scan exits the line into end-group `e`.
    mapping: Vec<Vec<usize>>,
}

impl LineForestHandler {
    /// The main forest (`shift + 1` roots, indexed by intra-line phase).
    pub fn main(&self) -> &BinaryDrag {
        &self.main
    }

    /// The condition indices already known (evaluated by a previous mask
    /// application) by the time main-forest root `phase` is entered.
    pub fn known_at(&self, phase: usize) -> &BTreeSet<usize> {
        &self.main_known[phase]
    }

    /// The end forests, one per terminal offset `e` in `1..=shift`, indexed
    /// `0..shift` (`end_forests()[e - 1]` is the tree for offset `e`).
    pub fn end_forests(&self) -> &[BinaryDrag] {
        &self.end_forests
    }

    /// Number of end groups (`== shift`).
    pub fn end_group_count(&self) -> usize {
        self.end_forests.len()
    }

    /// `mapping[e][i]`: the end-tree root index main root `i` jumps to in
    /// end group `e` (0-indexed: end group `e` is terminal offset `e + 1`).
    pub fn mapping(&self, end_group: usize, main_root: usize) -> usize {
        self.mapping[end_group][main_root]
    }
}

/// Builds the `LineForestHandler` for one ODT (`tree`, rooted at `root`)
/// over `mask`. `mask.len()` condition indices `0..mask.len()` are assumed
/// to be the tree's pixel conditions, in mask order (any further condition
/// indices, e.g. an appended `iter` bit, never participate in spatial
/// reuse or edge clipping and are left untouched by both forests).
pub fn build_line_forest(tree: &BinaryDrag, root: NodeId, mask: &PixelSet) -> LineForestHandler {
    let shift = mask.horizontal_shift().max(1) as usize;
    let maxx = mask.iter().map(|p| p.coords()[0]).max().unwrap_or(0);

    let steady_known: BTreeSet<usize> = (0..mask.len())
        .filter(|&i| mask[i].coords()[0] <= maxx - shift as i32)
        .collect();

    let mut main_known = Vec::with_capacity(shift + 1);
    main_known.push(BTreeSet::new());
    for _ in 1..=shift {
        main_known.push(steady_known.clone());
    }

    // Every leaf of phase `i`'s copy dispatches the following pixel to phase
    // `min(i + 1, shift)`: phases advance 0, 1, 2, ... until the steady
    // state (`shift`) is reached, then stay there for the rest of the line.
    // This has to be baked into each leaf *before* hash-consing (next
    // participates in `HashConsMode::Strict`'s leaf key), otherwise two
    // phases' otherwise-identical leaves would collapse into one with only
    // one of the two dispatch targets.
    let mut main_raw = BinaryDrag::new();
    for i in 0..=shift {
        let next_phase = (i + 1).min(shift);
        let mut memo = FxHashMap::default();
        let copy = clone_with_next(tree, root, next_phase, &mut main_raw, &mut memo);
        main_raw.add_root(copy);
    }
    let main = hash_cons(&main_raw, HashConsMode::Strict);

    let mut end_forests = Vec::with_capacity(shift);
    for e in 1..=shift {
        let forced: BTreeSet<usize> =
            (0..mask.len()).filter(|&i| mask[i].coords()[0] >= e as i32).collect();
        let mut raw = BinaryDrag::new();
        for _ in 0..=shift {
            let mut memo = FxHashMap::default();
            let copy = collapse_forced_false(tree, root, &forced, &mut raw, &mut memo);
            raw.add_root(copy);
        }
        end_forests.push(hash_cons(&raw, HashConsMode::Strict));
    }

    // Matching specialization bit-patterns between main[i] and end[e][j]:
    // the end forest's roots were built as faithful copies of the same
    // source tree, one per phase, in the same order as the main forest's,
    // so index i's specialization corresponds to end root i directly.
    let mapping = vec![(0..=shift).collect::<Vec<_>>(); shift];

    LineForestHandler { main, main_known, end_forests, mapping }
}

/// Copies the subgraph rooted at `id`, stamping every leaf's `next` with the
/// given main-forest phase index regardless of whatever `next` the source
/// leaf carried (the ODT itself never sets `next`; it is purely a forest
/// concept, assigned here for the first time).
fn clone_with_next(
    src: &BinaryDrag,
    id: NodeId,
    next: usize,
    dest: &mut BinaryDrag,
    memo: &mut FxHashMap<NodeId, NodeId>,
) -> NodeId {
    if let Some(&existing) = memo.get(&id) {
        return existing;
    }
    let new_id = match src.get(id) {
        Node::Leaf { actions, .. } => dest.push_leaf(actions.clone(), Some(next)),
        Node::Condition { condition, left, right } => {
            let l = clone_with_next(src, *left, next, dest, memo);
            let r = clone_with_next(src, *right, next, dest, memo);
            dest.push_condition(*condition, l, r)
        }
    };
    memo.insert(id, new_id);
    new_id
}

/// Copies the subgraph rooted at `id`, collapsing any condition on a
/// `forced` index to its false (left) branch instead of emitting the test,
/// the "this pixel lies off the edge of the image, assume background"
/// constant fold.
fn collapse_forced_false(
    src: &BinaryDrag,
    id: NodeId,
    forced: &BTreeSet<usize>,
    dest: &mut BinaryDrag,
    memo: &mut FxHashMap<NodeId, NodeId>,
) -> NodeId {
    if let Some(&existing) = memo.get(&id) {
        return existing;
    }
    let new_id = match src.get(id) {
        Node::Leaf { actions, next } => dest.push_leaf(actions.clone(), *next),
        Node::Condition { condition, left, right } => {
            if forced.contains(condition) {
                collapse_forced_false(src, *left, forced, dest, memo)
            } else {
                let l = collapse_forced_false(src, *left, forced, dest, memo);
                let r = collapse_forced_false(src, *right, forced, dest, memo);
                dest.push_condition(*condition, l, r)
            }
        }
    };
    memo.insert(id, new_id);
    new_id
}

#[cfg(test)]
mod test_forest {
    use super::*;
    use crate::action::Action;
    use crate::odt::build_odt;
    use crate::pixel::Pixel;
    use crate::ruleset::{ActionSet, RuleSetBuilder};

    fn grana_mask() -> PixelSet {
        let pixels = vec![
            Pixel::new("P", vec![0, -1]),
            Pixel::new("Q", vec![1, -1]),
            Pixel::new("R", vec![2, -1]),
            Pixel::new("S", vec![-1, 0]),
            Pixel::new("x0", vec![0, 0]),
            Pixel::new("x1", vec![1, 0]),
            Pixel::new("y0", vec![0, 1]),
            Pixel::new("y1", vec![1, 1]),
        ];
        PixelSet::new(pixels, vec![2, 1]).unwrap()
    }

    #[test]
    fn main_forest_has_shift_plus_one_roots() {
        let mask = grana_mask();
        let ruleset = RuleSetBuilder::new(mask.clone())
            .generate_rules(|r| {
                if r.bit("x0") || r.bit("x1") || r.bit("y0") || r.bit("y1") {
                    r.push("newlabel");
                } else {
                    r.push("nothing");
                }
            })
            .unwrap();
        let (tree, root) = build_odt(&ruleset).unwrap();
        let forest = build_line_forest(&tree, root, &mask);

        assert_eq!(3, forest.main().roots().len()); // shift = 2 -> 3 roots
        assert!(forest.known_at(0).is_empty());
        assert_eq!(forest.known_at(1), forest.known_at(2));
        // P, Q, S sit at x <= maxx(2) - shift(2) = 0: P(x=0), S(x=-1) qualify, Q(x=1) does not.
        assert!(forest.known_at(1).contains(&mask.position("P").unwrap()));
        assert!(forest.known_at(1).contains(&mask.position("S").unwrap()));
        assert!(!forest.known_at(1).contains(&mask.position("Q").unwrap()));
    }

    #[test]
    fn end_forests_exist_for_every_terminal_offset_and_differ_in_shape() {
        let mask = grana_mask();
        let ruleset = RuleSetBuilder::new(mask.clone())
            .generate_rules(|r| {
                if r.bit("x0") || r.bit("x1") || r.bit("y0") || r.bit("y1") {
                    r.push("newlabel");
                } else {
                    r.push("nothing");
                }
            })
            .unwrap();
        let (tree, root) = build_odt(&ruleset).unwrap();
        let forest = build_line_forest(&tree, root, &mask);

        assert_eq!(2, forest.end_group_count()); // shift = 2 -> end groups 1 and 2
        for e in 0..forest.end_group_count() {
            assert_eq!(3, forest.end_forests()[e].roots().len());
        }
        // end group 0 is the nearest-edge offset (e=1): it forces the most
        // pixels false (Q, R, x1, y1 all sit at x >= 1), so its tree can
        // only be smaller than or equal to end group 1 (e=2), which forces
        // just R (x >= 2).
        assert!(forest.end_forests()[0].node_count() <= forest.end_forests()[1].node_count());
    }

    #[test]
    fn mapping_is_total() {
        let mask = grana_mask();
        let ruleset =
            RuleSetBuilder::new(mask.clone()).generate_rules(|r| r.push("nothing")).unwrap();
        let (tree, root) = build_odt(&ruleset).unwrap();
        let forest = build_line_forest(&tree, root, &mask);

        for e in 0..forest.end_group_count() {
            for i in 0..forest.main().roots().len() {
                let j = forest.mapping(e, i);
                assert!(j < forest.end_forests()[e].roots().len());
            }
        }
    }

    #[test]
    fn end_forest_matches_ruleset_when_forced_pixels_are_actually_false() {
        let pixels = vec![Pixel::new("P1", vec![0, 0]), Pixel::new("P2", vec![1, 0])];
        let mask = PixelSet::new(pixels, vec![1, 1]).unwrap();
        let ruleset = RuleSetBuilder::new(mask.clone())
            .generate_rules(|r| {
                if r.bit("P2") {
                    r.push("keep1");
                } else {
                    r.push("keep0");
                }
            })
            .unwrap();
        let (tree, root) = build_odt(&ruleset).unwrap();
        let forest = build_line_forest(&tree, root, &mask);

        // shift = 1, one end group (e=1) forces P2 (x=1 >= 1) false. Bit 1
        // (P2) is 0 for configurations 0 and 1, so those are exactly the
        // ones that can legitimately occur near the edge.
        let end = &forest.end_forests()[0];
        for c in [0usize, 1] {
            assert_eq!(ruleset.actions(c), end.evaluate(0, c as u64));
        }
        assert_eq!(&ActionSet::from([Action::Keep0]), end.evaluate(0, 0b00));
    }

    #[test]
    fn main_forest_leaves_carry_a_next_phase_for_every_root() {
        // Every leaf reachable from main-forest root i must carry
        // `next = Some(min(i + 1, shift))`, since `emit::emit_drag` requires
        // a `next` on every leaf whenever `with_gotos` is set (as
        // `emit_forest` always does for the main forest). The Grana mask's
        // shift of 2 gives three distinct expected values (1, 2, 2), so this
        // actually discriminates phases instead of all agreeing by accident.
        let mask = grana_mask();
        let ruleset = RuleSetBuilder::new(mask.clone())
            .generate_rules(|r| {
                if r.bit("x0") || r.bit("x1") || r.bit("y0") || r.bit("y1") {
                    r.push("newlabel");
                } else {
                    r.push("nothing");
                }
            })
            .unwrap();
        let (tree, root) = build_odt(&ruleset).unwrap();
        let forest = build_line_forest(&tree, root, &mask);

        assert_eq!(3, forest.main().roots().len());
        for (phase, &root_id) in forest.main().roots().iter().enumerate() {
            let expected_next = (phase + 1).min(2);
            let mut stack = vec![root_id];
            let mut seen = std::collections::HashSet::new();
            while let Some(id) = stack.pop() {
                if !seen.insert(id) {
                    continue;
                }
                match forest.main().get(id) {
                    Node::Leaf { next, .. } => {
                        assert_eq!(Some(expected_next), *next);
                    }
                    Node::Condition { left, right, .. } => {
                        stack.push(*left);
                        stack.push(*right);
                    }
                }
            }
        }
    }
}

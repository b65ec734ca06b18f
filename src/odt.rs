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

//! Optimal decision tree construction: turns a dense `RuleSet` truth table
//! into the binary decision tree minimizing the expected number of
//! condition evaluations to reach a leaf, under a caller-chosen distribution
//! over configurations (uniform by default).
//!
//! The recursion is a branch-and-bound search over which remaining
//! condition to split on next, memoized on `(remaining conditions, surviving
//! configurations)` the same way the teacher's MDD solver memoizes
//! relaxed/restricted sub-problems on `(layer, state)`
//! (`ddo::implementation::mdd::pooled`'s pool is keyed on state; here the
//! state is the surviving-configuration subset). Because the memo table
//! hands back a previously-built `NodeId` instead of rebuilding, two
//! branches of the search that land on the same state are automatically
//! shared: the memoized ODT recursion produces a DAG directly, before any
//! later hash-consing pass ever runs.
//!
//! Each memo entry caches a *weighted* cost rather than the per-state
//! expected cost directly: `weighted_cost(S) = weight(S) * expected_cost(S)`,
//! which satisfies `weighted_cost(S) = weight(S) + weighted_cost(S0) +
//! weighted_cost(S1)` for a condition node and `weighted_cost(S) = 0` for a
//! leaf, where `weight(S)` sums the per-configuration weights of `S`'s
//! members (`|S|` itself under the uniform, unweighted distribution).
//! Comparing `weighted_cost` across candidate splits of the *same* S is
//! equivalent to comparing `expected_cost` (both divide by the same
//! `weight(S)`) but keeps every comparison in exact integer arithmetic: no
//! floating-point division, so no risk of platform-dependent rounding
//! breaking determinism.

use bit_set::BitSet;
use fxhash::FxHashMap;

use crate::dag::{BinaryDrag, NodeId};
use crate::error::GenError;
use crate::ruleset::{ActionSet, RuleSet};

type MemoKey = (u64, Vec<u32>);

/// Builds the optimal decision tree for a `RuleSet`, optionally under a
/// caller-supplied per-configuration weight distribution instead of the
/// uniform default.
///
/// Mirrors the crate's other multi-field builders (`RuleSetBuilder`,
/// `GenConfigBuilder`): construct with [`OdtBuilder::new`], call
/// [`OdtBuilder::with_weights`] if the uniform distribution over
/// configurations is not the right one, then [`OdtBuilder::build`].
pub struct OdtBuilder<'r> {
    ruleset: &'r RuleSet,
    weights: Option<Vec<u64>>,
}

impl<'r> OdtBuilder<'r> {
    /// Starts a builder for `ruleset` with the uniform weight (every
    /// configuration counts as `1`) unless overridden by `with_weights`.
    pub fn new(ruleset: &'r RuleSet) -> Self {
        OdtBuilder { ruleset, weights: None }
    }

    /// Supplies one weight per configuration (index `c` is the same
    /// configuration index `RuleSet::actions` and `RuleSet::len` use), so
    /// the expected-cost objective favors a cheaper tree for the
    /// configurations the caller expects to see more often.
    ///
    /// # Panics
    /// Panics if `weights.len() != ruleset.len()`.
    pub fn with_weights(mut self, weights: Vec<u64>) -> Self {
        assert_eq!(
            weights.len(),
            self.ruleset.len(),
            "weight vector must carry exactly one entry per configuration"
        );
        self.weights = Some(weights);
        self
    }

    /// Builds the optimal decision tree (as a `BinaryDrag` with a single
    /// root) under this builder's weight distribution. Ties between
    /// equally-weighted splits are broken in favor of the lowest-numbered
    /// remaining condition.
    ///
    /// # Errors
    /// Returns `GenError::InconsistentRuleSet` if some branch of the search
    /// space exhausts every condition without the surviving configurations
    /// ever agreeing on a common action. This cannot happen for any
    /// `RuleSet` produced by `RuleSetBuilder` (every configuration has its
    /// own non-empty, and therefore eventually separable, action set) but is
    /// kept as a defensive check against future non-dense rule-set
    /// representations.
    pub fn build(self) -> Result<(BinaryDrag, NodeId), GenError> {
        let ruleset = self.ruleset;
        let k = ruleset.num_conditions();
        tracing::debug!(target: "odt", conditions = k, configurations = ruleset.len(), "building optimal decision tree");
        let mut arena = BinaryDrag::new();
        let mut memo: FxHashMap<MemoKey, (NodeId, u64)> = FxHashMap::default();

        let full_remaining: u64 = if k >= 64 { u64::MAX } else { (1u64 << k) - 1 };
        let mut surviving = BitSet::with_capacity(ruleset.len());
        for c in 0..ruleset.len() {
            surviving.insert(c);
        }

        let (root, _cost) =
            build(ruleset, self.weights.as_deref(), full_remaining, &surviving, &mut arena, &mut memo)?;
        arena.add_root(root);
        arena.sweep_unreachable();
        // sweep_unreachable remaps every NodeId, so re-derive the root from
        // the (now remapped) roots list instead of trusting the pre-sweep id.
        let root = arena.roots()[0];
        tracing::debug!(target: "odt", nodes = arena.node_count(), "optimal decision tree built");
        Ok((arena, root))
    }
}

/// Builds the optimal decision tree (as a `BinaryDrag` with a single root)
/// for `ruleset` under the uniform distribution over configurations.
/// Equivalent to `OdtBuilder::new(ruleset).build()`; kept as a shorthand for
/// the common case where every configuration is equally likely.
///
/// # Errors
/// See [`OdtBuilder::build`].
pub fn build_odt(ruleset: &RuleSet) -> Result<(BinaryDrag, NodeId), GenError> {
    OdtBuilder::new(ruleset).build()
}

fn memo_key(remaining: u64, surviving: &BitSet) -> MemoKey {
    (remaining, surviving.get_ref().blocks().collect())
}

/// The intersection of the action sets of every surviving configuration,
/// empty unless they all agree on at least one action.
fn common_actions(ruleset: &RuleSet, surviving: &BitSet) -> ActionSet {
    let mut iter = surviving.iter();
    let first = iter.next().expect("surviving subset must be non-empty");
    let mut common = ruleset.actions(first).clone();
    for c in iter {
        if common.is_empty() {
            break;
        }
        common = common.intersection(ruleset.actions(c)).cloned().collect();
    }
    common
}

/// Sum of `weights[c]` for every `c` in `surviving`, or `|surviving|` under
/// the uniform (unweighted) distribution.
fn subset_weight(weights: Option<&[u64]>, surviving: &BitSet) -> u64 {
    match weights {
        Some(w) => surviving.iter().map(|c| w[c]).sum(),
        None => surviving.len() as u64,
    }
}

fn build(
    ruleset: &RuleSet,
    weights: Option<&[u64]>,
    remaining: u64,
    surviving: &BitSet,
    arena: &mut BinaryDrag,
    memo: &mut FxHashMap<MemoKey, (NodeId, u64)>,
) -> Result<(NodeId, u64), GenError> {
    let key = memo_key(remaining, surviving);
    if let Some(cached) = memo.get(&key) {
        return Ok(*cached);
    }

    let common = common_actions(ruleset, surviving);
    if !common.is_empty() {
        let id = arena.push_leaf(common, None);
        let result = (id, 0);
        memo.insert(key, result);
        return Ok(result);
    }

    let s_weight = subset_weight(weights, surviving);
    let mut best: Option<(u64, usize, NodeId, NodeId)> = None;
    for bit in 0..ruleset.num_conditions() {
        if remaining & (1u64 << bit) == 0 {
            continue;
        }
        let mut s0 = BitSet::with_capacity(ruleset.len());
        let mut s1 = BitSet::with_capacity(ruleset.len());
        for c in surviving.iter() {
            if (c >> bit) & 1 == 1 {
                s1.insert(c);
            } else {
                s0.insert(c);
            }
        }
        if s0.is_empty() || s1.is_empty() {
            // This condition is constant across the surviving set: splitting
            // on it would not separate anything, so it is not a candidate.
            continue;
        }
        let remaining_without_bit = remaining & !(1u64 << bit);
        let (left, left_cost) = build(ruleset, weights, remaining_without_bit, &s0, arena, memo)?;
        let (right, right_cost) = build(ruleset, weights, remaining_without_bit, &s1, arena, memo)?;
        // weighted_cost(S) = weight(S) + weighted_cost(S0) + weighted_cost(S1);
        // comparing this across candidates is equivalent to comparing
        // 1 + (weight(S0)*cost0 + weight(S1)*cost1)/weight(S) since both
        // sides are divided by the same weight(S).
        let total = s_weight + left_cost + right_cost;
        let better = match &best {
            None => true,
            Some((best_total, ..)) => total < *best_total,
        };
        if better {
            best = Some((total, bit, left, right));
        }
    }

    match best {
        Some((total, bit, left, right)) => {
            let id = arena.push_condition(bit, left, right);
            let result = (id, total);
            memo.insert(key, result);
            Ok(result)
        }
        None => Err(GenError::InconsistentRuleSet {
            remaining_conditions: remaining,
            surviving: surviving.len(),
        }),
    }
}

#[cfg(test)]
mod test_odt {
    use super::*;
    use crate::action::Action;
    use crate::pixel::{Pixel, PixelSet};
    use crate::ruleset::RuleSetBuilder;

    #[test]
    fn single_condition_builds_one_condition_node() {
        let mask = PixelSet::new(vec![Pixel::new("P1", vec![0, 0])], vec![1, 1]).unwrap();
        let ruleset = RuleSetBuilder::new(mask)
            .generate_rules(|r| {
                if r.bit("P1") {
                    r.push("newlabel");
                } else {
                    r.push("nothing");
                }
            })
            .unwrap();

        let (drag, root) = build_odt(&ruleset).unwrap();
        assert!(matches!(drag.get(root), crate::dag::Node::Condition { condition: 0, .. }));
        assert_eq!(root, drag.roots()[0]);
        for c in 0..ruleset.len() {
            assert_eq!(ruleset.actions(c), drag.evaluate(0, c as u64));
        }
    }

    #[test]
    fn redundant_conditions_collapse_to_a_single_leaf() {
        let pixels = vec![Pixel::new("P1", vec![0, 0]), Pixel::new("P2", vec![1, 0])];
        let mask = PixelSet::new(pixels, vec![1, 1]).unwrap();
        let ruleset = RuleSetBuilder::new(mask).generate_rules(|r| r.push("nothing")).unwrap();

        let (drag, root) = build_odt(&ruleset).unwrap();
        assert!(matches!(drag.get(root), crate::dag::Node::Leaf { .. }));
        assert_eq!(1, drag.node_count());
    }

    #[test]
    fn guo_hall_tree_round_trips_against_the_rule_set() {
        let pixels = vec![
            Pixel::new("P9", vec![-1, -1]),
            Pixel::new("P2", vec![0, -1]),
            Pixel::new("P3", vec![1, -1]),
            Pixel::new("P8", vec![-1, 0]),
            Pixel::new("P1", vec![0, 0]),
            Pixel::new("P4", vec![1, 0]),
            Pixel::new("P7", vec![-1, 1]),
            Pixel::new("P6", vec![0, 1]),
            Pixel::new("P5", vec![1, 1]),
        ];
        let mask = PixelSet::new(pixels, vec![1, 1]).unwrap();
        let ruleset = RuleSetBuilder::new(mask)
            .add_condition("iter")
            .generate_rules(|r| {
                let p1 = r.bit("P1") as i32;
                if p1 == 0 {
                    r.push("keep0");
                    return;
                }
                r.push("keep1");
            })
            .unwrap();

        let (drag, root) = build_odt(&ruleset).unwrap();
        let root_index = drag.roots().iter().position(|r| *r == root).unwrap();
        for c in (0..ruleset.len()).step_by(37) {
            assert_eq!(ruleset.actions(c), drag.evaluate(root_index, c as u64));
        }
    }

    #[test]
    fn weighting_a_configuration_heavily_can_change_the_chosen_split() {
        let pixels = vec![Pixel::new("P1", vec![0, 0]), Pixel::new("P2", vec![1, 0])];
        let mask = PixelSet::new(pixels, vec![1, 1]).unwrap();
        let ruleset = RuleSetBuilder::new(mask)
            .generate_rules(|r| {
                if r.bit("P1") && r.bit("P2") {
                    r.push("newlabel");
                } else {
                    r.push("nothing");
                }
            })
            .unwrap();

        // Uniformly weighted, the tie between splitting on P1 or P2 first
        // is broken in favor of the lowest-numbered condition, P1 (bit 0).
        let (uniform, uniform_root) = OdtBuilder::new(&ruleset).build().unwrap();
        assert!(matches!(
            uniform.get(uniform_root),
            crate::dag::Node::Condition { condition: 0, .. }
        ));

        // Configuration 1 (P1 set, P2 clear) is given a far larger weight
        // than the others. Splitting on P1 first would leave configuration 1
        // in the harder-to-resolve branch, so the cheaper tree now splits on
        // P2 (bit 1) first instead.
        let weights = vec![1, 100, 1, 1];
        let (weighted, weighted_root) = OdtBuilder::new(&ruleset).with_weights(weights).build().unwrap();
        assert!(matches!(
            weighted.get(weighted_root),
            crate::dag::Node::Condition { condition: 1, .. }
        ));

        for c in 0..ruleset.len() {
            assert_eq!(ruleset.actions(c), weighted.evaluate(0, c as u64));
        }
    }

    #[test]
    fn inconsistent_state_is_reported() {
        let mask = PixelSet::new(vec![Pixel::new("P1", vec![0, 0])], vec![1, 1]).unwrap();
        let rows = vec![ActionSet::from([Action::Nothing]), ActionSet::from([Action::NewLabel])];
        let ruleset = RuleSetBuilder::new(mask).from_table(rows).unwrap();

        let mut arena = BinaryDrag::new();
        let mut memo = FxHashMap::default();
        let mut surviving = BitSet::with_capacity(2);
        surviving.insert(0);
        surviving.insert(1);

        let err = build(&ruleset, None, 0, &surviving, &mut arena, &mut memo).unwrap_err();
        assert_eq!(GenError::InconsistentRuleSet { remaining_conditions: 0, surviving: 2 }, err);
    }
}

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

//! Rule-set construction: enumerating the 2^k neighborhood configurations of
//! a mask and binding a symbolic action set to each one.
//!
//! The builder API mirrors the original `InitConditions` / `AddCondition` /
//! `InitActions` / `generate_rules` sequence: a closure is called once per
//! configuration with a `RuleWrapper` that exposes named bit access
//! (`r.bit("P1")`, equivalent to the source's `r["P1"]`) and an accumulator
//! for the row's actions (`r.push(action)`, equivalent to `r << "action"`).

use std::collections::BTreeSet;

use crate::action::Action;
use crate::error::GenError;
use crate::pixel::PixelSet;

/// The non-empty set of actions acceptable for one configuration. Kept
/// ordered so the lexicographically-first action is always `iter().next()`,
/// which is the deterministic tie-break the ODT builder and the compressor's
/// leaf merge rely on.
pub type ActionSet = BTreeSet<Action>;

/// A complete rule set: a dense table of `2^k` action sets, one per
/// configuration index, plus the mask and any extra (non-pixel) condition
/// names that were concatenated after the mask's own pixel conditions.
#[derive(Debug, Clone)]
pub struct RuleSet {
    mask: PixelSet,
    extra_conditions: Vec<String>,
    rows: Vec<ActionSet>,
}

impl RuleSet {
    /// Total number of conditions (mask pixels plus extra conditions).
    pub fn num_conditions(&self) -> usize {
        self.mask.len() + self.extra_conditions.len()
    }

    /// Number of configurations, `2^k`.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True iff this rule set has zero conditions (and therefore exactly
    /// one configuration/row), the boundary case where the decision tree is
    /// a single leaf.
    pub fn is_empty_of_conditions(&self) -> bool {
        self.num_conditions() == 0
    }

    /// The action set bound to one configuration index.
    pub fn actions(&self, configuration: usize) -> &ActionSet {
        &self.rows[configuration]
    }

    /// The mask this rule set was built from.
    pub fn mask(&self) -> &PixelSet {
        &self.mask
    }

    /// Name of the condition at bit position `i`: a mask pixel name for `i <
    /// mask.len()`, otherwise one of the extra condition names.
    pub fn condition_name(&self, i: usize) -> &str {
        if i < self.mask.len() {
            self.mask[i].name()
        } else {
            &self.extra_conditions[i - self.mask.len()]
        }
    }

    /// Evaluates the rule set directly against a full configuration (brute
    /// force, bypassing any decision tree); used as the ground truth by the
    /// round-trip tests.
    pub fn lookup(&self, configuration: usize) -> &ActionSet {
        self.actions(configuration)
    }
}

/// Per-row helper passed to the rule generator closure. Exposes named bit
/// access and an action accumulator, mirroring `rule_wrapper` in the
/// original source.
pub struct RuleWrapper<'a> {
    ruleset: &'a RuleSet,
    configuration: usize,
    actions: ActionSet,
}

impl<'a> RuleWrapper<'a> {
    /// The boolean value of the named condition for this row.
    pub fn bit(&self, name: &str) -> bool {
        let i = self
            .ruleset
            .mask
            .position(name)
            .or_else(|| {
                self.ruleset
                    .extra_conditions
                    .iter()
                    .position(|c| c == name)
                    .map(|p| p + self.ruleset.mask.len())
            })
            .unwrap_or_else(|| panic!("unknown condition `{name}`"));
        (self.configuration >> i) & 1 == 1
    }

    /// The raw configuration index for this row.
    pub fn configuration(&self) -> usize {
        self.configuration
    }

    /// Records one acceptable action for this row (`r << "action"` in the
    /// original source).
    pub fn push(&mut self, token: &str) {
        self.actions.insert(Action::parse(token));
    }

    /// Records one acceptable action already parsed.
    pub fn push_action(&mut self, action: Action) {
        self.actions.insert(action);
    }
}

/// Incrementally builds a `RuleSet`: the mask, any extra non-pixel
/// conditions, and finally the rule generator itself.
pub struct RuleSetBuilder {
    mask: PixelSet,
    extra_conditions: Vec<String>,
}

impl RuleSetBuilder {
    /// Starts a new builder from a mask (`InitConditions` in the source).
    pub fn new(mask: PixelSet) -> Self {
        RuleSetBuilder { mask, extra_conditions: Vec::new() }
    }

    /// Appends a non-pixel condition bit, e.g. `"iter"` for two-pass
    /// thinning (`AddCondition` in the source). Conditions are concatenated
    /// after the mask's own pixel bits, in call order.
    pub fn add_condition(mut self, name: impl Into<String>) -> Self {
        self.extra_conditions.push(name.into());
        self
    }

    /// Generates every row by calling `generator` once per configuration
    /// index from `0` to `2^k - 1`, collecting the `RuleWrapper`'s
    /// accumulated actions.
    ///
    /// # Errors
    /// Returns `GenError::UnsatisfiableRule` if `generator` leaves any row's
    /// action set empty.
    pub fn generate_rules(
        self,
        mut generator: impl FnMut(&mut RuleWrapper),
    ) -> Result<RuleSet, GenError> {
        let k = self.mask.len() + self.extra_conditions.len();
        let n = 1usize << k;
        tracing::debug!(target: "ruleset", conditions = k, rows = n, "generating rule set");
        let mut partial = RuleSet {
            mask: self.mask,
            extra_conditions: self.extra_conditions,
            rows: Vec::with_capacity(n),
        };
        let mut rows = Vec::with_capacity(n);
        for configuration in 0..n {
            let mut wrapper = RuleWrapper {
                ruleset: &partial,
                configuration,
                actions: ActionSet::new(),
            };
            generator(&mut wrapper);
            if wrapper.actions.is_empty() {
                return Err(GenError::UnsatisfiableRule { configuration: configuration as u64 });
            }
            rows.push(wrapper.actions);
        }
        partial.rows = rows;
        tracing::debug!(target: "ruleset", rows = n, "rule set generated");
        Ok(partial)
    }

    /// Builds a `RuleSet` directly from a precomputed table, one action set
    /// per configuration index. Useful for tests and for callers who already
    /// have the full truth table in hand.
    ///
    /// # Errors
    /// Returns `GenError::UnsatisfiableRule` if any row is empty, or
    /// `GenError::MaskOutOfRange` if `rows.len()` does not equal `2^k`.
    pub fn from_table(self, rows: Vec<ActionSet>) -> Result<RuleSet, GenError> {
        let k = self.mask.len() + self.extra_conditions.len();
        let expected = 1usize << k;
        if rows.len() != expected {
            return Err(GenError::MaskOutOfRange { pixel: "<table size>".to_string() });
        }
        for (configuration, row) in rows.iter().enumerate() {
            if row.is_empty() {
                return Err(GenError::UnsatisfiableRule { configuration: configuration as u64 });
            }
        }
        Ok(RuleSet { mask: self.mask, extra_conditions: self.extra_conditions, rows })
    }
}

#[cfg(test)]
mod test_ruleset {
    use super::*;
    use crate::pixel::Pixel;

    fn mask_p1() -> PixelSet {
        PixelSet::new(vec![Pixel::new("P1", vec![0, 0])], vec![1, 1]).unwrap()
    }

    #[test]
    fn single_condition_binds_distinct_actions_to_each_row() {
        // k=1, condition "P1", rules {0 -> nothing, 1 -> newlabel}
        let rs = RuleSetBuilder::new(mask_p1())
            .generate_rules(|r| {
                if r.bit("P1") {
                    r.push("newlabel");
                } else {
                    r.push("nothing");
                }
            })
            .unwrap();

        assert_eq!(2, rs.len());
        assert_eq!(1, rs.num_conditions());
        assert_eq!(&ActionSet::from([Action::Nothing]), rs.actions(0));
        assert_eq!(&ActionSet::from([Action::NewLabel]), rs.actions(1));
    }

    #[test]
    fn every_row_can_share_the_same_action() {
        let pixels = vec![
            Pixel::new("P1", vec![0, 0]),
            Pixel::new("P2", vec![1, 0]),
        ];
        let mask = PixelSet::new(pixels, vec![1, 1]).unwrap();
        let rs = RuleSetBuilder::new(mask)
            .generate_rules(|r| r.push("nothing"))
            .unwrap();
        assert_eq!(4, rs.len());
        for c in 0..4 {
            assert_eq!(&ActionSet::from([Action::Nothing]), rs.actions(c));
        }
    }

    #[test]
    fn empty_action_set_is_an_error() {
        let rs = RuleSetBuilder::new(mask_p1()).generate_rules(|_r| { /* never pushes */ });
        assert!(matches!(rs, Err(GenError::UnsatisfiableRule { .. })));
    }

    #[test]
    fn extra_conditions_are_concatenated_after_mask_bits() {
        let rs = RuleSetBuilder::new(mask_p1())
            .add_condition("iter")
            .generate_rules(|r| {
                if r.bit("iter") {
                    r.push("keep1");
                } else {
                    r.push("keep0");
                }
            })
            .unwrap();
        assert_eq!(2, rs.num_conditions());
        assert_eq!(4, rs.len());
        // bit 1 (iter) drives the split: configurations 0,1 have iter=0; 2,3 have iter=1
        assert_eq!(&ActionSet::from([Action::Keep0]), rs.actions(0));
        assert_eq!(&ActionSet::from([Action::Keep1]), rs.actions(2));
    }

    #[test]
    fn thinning_mask_with_an_iter_bit_builds_a_dense_ten_condition_table() {
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
        let rs = RuleSetBuilder::new(mask)
            .add_condition("iter")
            .generate_rules(|r| {
                let p1 = r.bit("P1") as i32;
                let p2 = r.bit("P2") as i32;
                let p3 = r.bit("P3") as i32;
                let p4 = r.bit("P4") as i32;
                let p5 = r.bit("P5") as i32;
                let p6 = r.bit("P6") as i32;
                let p7 = r.bit("P7") as i32;
                let p8 = r.bit("P8") as i32;
                let p9 = r.bit("P9") as i32;
                if p1 == 0 {
                    r.push("keep0");
                    return;
                }
                let c = ((1 - p2) & (p3 | p4))
                    + ((1 - p4) & (p5 | p6))
                    + ((1 - p6) & (p7 | p8))
                    + ((1 - p8) & (p9 | p2));
                let n1 = (p9 | p2) + (p3 | p4) + (p5 | p6) + (p7 | p8);
                let n2 = (p2 | p3) + (p4 | p5) + (p6 | p7) + (p8 | p9);
                let n = n1.min(n2);
                let m = if !r.bit("iter") {
                    (p6 | p7 | (1 - p9)) & p8
                } else {
                    (p2 | p3 | (1 - p5)) & p4
                };
                if c == 1 && (2..=3).contains(&n) && m == 0 {
                    r.push("change0");
                } else {
                    r.push("keep1");
                }
            })
            .unwrap();

        assert_eq!(10, rs.num_conditions());
        assert_eq!(1024, rs.len());
        for c in 0..rs.len() {
            for a in rs.actions(c) {
                assert!(matches!(a, Action::Keep0 | Action::Keep1 | Action::Change0));
            }
        }
    }
}

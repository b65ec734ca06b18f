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

//! Symbolic actions attached to rule-set configurations. The three families
//! (labeling, thinning, chaincode) are disjoint and get different emission
//! templates downstream; rather than threading raw strings through the
//! pipeline (as the source does) this module parses them once into a tagged
//! enum, per the "Action polymorphism" design note.

use std::cmp::Ordering;
use std::fmt;

/// One symbolic action a leaf of the decision tree may carry.
///
/// `Ord`/`PartialOrd` are implemented (not derived) to sort by
/// `canonical_name()` rather than variant declaration order, so that a
/// `BTreeSet<Action>` iterates in the lexicographic order the rest of the
/// pipeline relies on for deterministic tie-breaking (picking a leaf's
/// action among equally-good candidates, and merging leaves during
/// compression).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Action {
    /// `nothing`: no labeling decision is made at this pixel.
    Nothing,
    /// `newlabel`: assign a fresh label.
    NewLabel,
    /// `<pixelname>[+...]`: union-merge of the named pixels' label
    /// provenances. Names are kept in mask (condition) order.
    Merge(Vec<String>),
    /// `keep0`: thinning, pixel stays background.
    Keep0,
    /// `keep1`: thinning, pixel stays foreground.
    Keep1,
    /// `change0`: thinning, pixel flips to background.
    Change0,
    /// Opaque chaincode token, passed through unchanged.
    Chaincode(String),
}

impl Action {
    /// Parses one action token using the source grammar (`nothing`,
    /// `newlabel`, `x0+x1+...` pixel merges, `keep0`/`keep1`/`change0`, or,
    /// for any other token, an opaque chaincode action). This is the single
    /// place string-typed actions are turned into the tagged representation
    /// the rest of the pipeline consumes.
    ///
    /// # Examples
    /// ```
    /// # use graphsgen::Action;
    /// assert_eq!(Action::Nothing, Action::parse("nothing"));
    /// assert_eq!(Action::NewLabel, Action::parse("newlabel"));
    /// assert_eq!(Action::Keep1, Action::parse("keep1"));
    /// assert_eq!(
    ///     Action::Merge(vec!["P".into(), "S".into()]),
    ///     Action::parse("P+S")
    /// );
    /// ```
    pub fn parse(token: &str) -> Action {
        match token {
            "nothing" => Action::Nothing,
            "newlabel" => Action::NewLabel,
            "keep0" => Action::Keep0,
            "keep1" => Action::Keep1,
            "change0" => Action::Change0,
            other if other.contains('+') || is_pixel_like(other) => {
                Action::Merge(other.split('+').map(str::to_string).collect())
            }
            other => Action::Chaincode(other.to_string()),
        }
    }

    /// The canonical name used for tie-breaking and emission lookups. This
    /// is exactly the string `Action::parse` would have consumed.
    pub fn canonical_name(&self) -> String {
        match self {
            Action::Nothing => "nothing".to_string(),
            Action::NewLabel => "newlabel".to_string(),
            Action::Merge(names) => names.join("+"),
            Action::Keep0 => "keep0".to_string(),
            Action::Keep1 => "keep1".to_string(),
            Action::Change0 => "change0".to_string(),
            Action::Chaincode(tok) => tok.clone(),
        }
    }
}

impl PartialOrd for Action {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Action {
    fn cmp(&self, other: &Self) -> Ordering {
        cmp_by_name(self, other)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.canonical_name())
    }
}

/// A single pixel-merge operand looks like a mask pixel name: letters
/// followed by digits (`P1`, `x0`, ...). Anything else that is not one of
/// the fixed keywords is treated as an opaque chaincode token instead.
fn is_pixel_like(token: &str) -> bool {
    let mut chars = token.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic())
        && chars.clone().next().is_some()
        && chars.all(|c| c.is_ascii_alphanumeric())
}

/// Compares two actions by their canonical name rather than enum
/// declaration order, for call sites that only have the string form handy
/// (kept separate from `Ord` because the derived order must stay stable
/// across the family tags, which is what the ODT builder actually wants).
pub fn cmp_by_name(a: &Action, b: &Action) -> Ordering {
    a.canonical_name().cmp(&b.canonical_name())
}

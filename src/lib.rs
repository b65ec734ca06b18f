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
#![allow(clippy::needless_doctest_main)]

//! `graphsgen` turns a pixel mask and a neighborhood-configuration rule into
//! compact, generated branching code: an optimal decision tree, folded into
//! a line-scan forest, compressed by hash-consing, and emitted through
//! caller-supplied text hooks.
//!
//! # Walkthrough
//!
//! Take the smallest possible mask: one pixel, `P1`, sitting on the scan
//! cursor itself. The rule is equally small: label the pixel when `P1` is
//! set, do nothing otherwise.
//!
//! ```
//! use graphsgen::{
//!     build_odt, compress, Action, ActionTextMap, CompressOptions, ConditionTextMap, NullObserver,
//!     Pixel, PixelSet, RuleSetBuilder,
//! };
//! use graphsgen::emit::{emit_drag, hooks::NoEndTreeHooks, EmitHooks};
//!
//! // 1. Describe the mask.
//! let mask = PixelSet::new(vec![Pixel::new("P1", vec![0, 0])], vec![1, 1]).unwrap();
//!
//! // 2. Describe the rule, one closure call per configuration.
//! let ruleset = RuleSetBuilder::new(mask)
//!     .generate_rules(|r| {
//!         if r.bit("P1") {
//!             r.push("newlabel");
//!         } else {
//!             r.push("nothing");
//!         }
//!     })
//!     .unwrap();
//!
//! // 3. Build the optimal decision tree.
//! let (mut tree, _root) = build_odt(&ruleset).unwrap();
//!
//! // 4. Compress it (a no-op here, there is nothing left to fold).
//! compress(&mut tree, CompressOptions::default(), &NullObserver);
//!
//! // 5. Emit it through a pair of text hooks.
//! let mut conditions = ConditionTextMap::default();
//! conditions.insert(0, "get_pixel(img, c, r)".to_string());
//! let mut actions = ActionTextMap::default();
//! actions.insert(Action::Nothing, "/* nothing */".to_string());
//! actions.insert(Action::NewLabel, "img[r][c] = new_label();".to_string());
//!
//! let hooks = NoEndTreeHooks;
//! let before = |i: usize, prefix: &str, m: &[Vec<usize>], e: usize| hooks.before_main(i, prefix, m, e);
//! let after = |i: usize, prefix: &str, m: &[Vec<usize>], e: usize| hooks.after_main(i, prefix, m, e);
//! let (code, _next_id) = emit_drag(&tree, &conditions, &actions, false, &before, &after, "", 0, &[], 0);
//! assert!(code.contains("new_label()"));
//! ```
//!
//! A real mask (e.g. a 3x3 or Grana 2x2 neighborhood, with a shift greater
//! than one) goes through [`forest::build_line_forest`] between steps 3 and
//! 4, turning the single tree into a [`forest::LineForestHandler`] (a main
//! forest plus end forests for the image's right edge), and
//! [`emit::emit_forest`] instead of [`emit::emit_drag`] for the final step.
//!
//! # Modules
//!
//! - [`pixel`]: named mask pixels and the ordered `PixelSet`.
//! - [`action`]: the symbolic `Action` enum and its string grammar.
//! - [`ruleset`]: enumerates a mask's `2^k` configurations against a rule
//!   closure into a `RuleSet`.
//! - [`dag`]: the shared `BinaryDrag` arena (`Node`/`NodeId`) every later
//!   stage operates on.
//! - [`draw`]: the `GraphDrawer` trait for the optional, purely diagnostic
//!   drawing/PDF collaborator (contract only, no implementation shipped).
//! - [`odt`]: branch-and-bound optimal decision tree construction.
//! - [`hashcons`]: content-addressed canonicalization, tree to DAG.
//! - [`forest`]: one ODT to a line-scan forest (main forest + end forests).
//! - [`compress`]: iterative fixed-point hash-consing and leaf merging.
//! - [`emit`]: renders a forest as labeled, jump-threaded code through
//!   caller-supplied hooks.
//! - [`stats`]: node/leaf counts for a `BinaryDrag` or `LineForestHandler`.
//! - [`config`]: `GenConfig`, built incrementally or loaded from TOML.
//! - [`progress`]: `ProgressObserver` for long-running stages (the
//!   compressor, mainly).
//! - [`error`]: the unified `GenError` every fallible operation returns.

pub mod action;
pub mod compress;
pub mod config;
pub mod dag;
pub mod draw;
pub mod emit;
pub mod error;
pub mod forest;
pub mod hashcons;
pub mod odt;
pub mod pixel;
pub mod progress;
pub mod ruleset;
pub mod stats;

pub use action::Action;
pub use compress::{compress, CompressOptions, CompressStats};
pub use config::{GenConfig, GenConfigBuilder};
pub use dag::{BinaryDrag, Node, NodeId};
pub use draw::GraphDrawer;
pub use emit::{emit_drag, emit_forest, ActionTextMap, ConditionTextMap, EmitHooks};
pub use error::{GenError, Result};
pub use forest::{build_line_forest, LineForestHandler};
pub use hashcons::{hash_cons, HashConsMode};
pub use odt::{build_odt, OdtBuilder};
pub use pixel::{Pixel, PixelSet};
pub use progress::{NullObserver, ProgressObserver, Stage, TerminalObserver};
pub use ruleset::{ActionSet, RuleSet, RuleSetBuilder, RuleWrapper};
pub use stats::{DragStatistics, ForestStatistics};

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

//! Node/leaf counts for a `BinaryDrag` or a whole `LineForestHandler`, used
//! to report how much a compression pass actually bought (`compress`
//! already returns `CompressStats` for that; this is the "what does the
//! final artifact look like" counterpart).
//!
//! Grounded on `original_source/include/drag_statistics.h`'s
//! `DragStatistics`, which recursively visits nodes and leaves into two
//! `std::set`s and reports their sizes; this version reuses
//! `BinaryDrag::reachable_from_roots` instead of a bespoke visitor since the
//! arena already knows how to compute reachability.

use crate::dag::BinaryDrag;
use crate::forest::LineForestHandler;

/// Node and leaf counts for one `BinaryDrag`, counting only nodes reachable
/// from its roots (an unswept arena's orphaned nodes are not counted).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DragStatistics {
    /// Total reachable nodes, condition nodes and leaves combined.
    pub nodes: usize,
    /// Reachable leaves.
    pub leaves: usize,
}

impl DragStatistics {
    /// Computes the statistics for `drag`.
    pub fn of(drag: &BinaryDrag) -> Self {
        let (nodes, leaves) = drag.reachable_counts();
        DragStatistics { nodes, leaves }
    }

    /// Reachable condition nodes (`nodes - leaves`).
    pub fn conditions(&self) -> usize {
        self.nodes - self.leaves
    }
}

/// Statistics for a whole line forest: the main forest plus every end
/// forest, reported separately since they are never merged into one arena.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForestStatistics {
    /// Statistics for `forest.main()`.
    pub main: DragStatistics,
    /// Statistics for each of `forest.end_forests()`, in order.
    pub end_forests: Vec<DragStatistics>,
}

impl ForestStatistics {
    /// Computes the statistics for `forest`.
    pub fn of(forest: &LineForestHandler) -> Self {
        let main = DragStatistics::of(forest.main());
        let end_forests = forest.end_forests().iter().map(DragStatistics::of).collect();
        ForestStatistics { main, end_forests }
    }

    /// Total reachable nodes across the main forest and every end forest.
    pub fn total_nodes(&self) -> usize {
        self.main.nodes + self.end_forests.iter().map(|s| s.nodes).sum::<usize>()
    }

    /// Total reachable leaves across the main forest and every end forest.
    pub fn total_leaves(&self) -> usize {
        self.main.leaves + self.end_forests.iter().map(|s| s.leaves).sum::<usize>()
    }
}

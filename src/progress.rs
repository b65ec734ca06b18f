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

//! Progress reporting is a cross-cutting side effect, injected rather than
//! sent to a global sink: callers pass a `&dyn ProgressObserver` into the
//! stages that take a while (mainly the compressor), and the driver chooses
//! whether that means a terminal progress bar or nothing at all.

use std::fmt;

/// One pipeline stage that can report progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Optimal decision tree construction (`odt` module).
    OdtBuild,
    /// Forest partitioning (`forest` module).
    ForestBuild,
    /// Fixed-point DRAG compression (`compress` module).
    Compress,
    /// Code emission (`emit` module).
    Emit,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::OdtBuild => "odt-build",
            Stage::ForestBuild => "forest-build",
            Stage::Compress => "compress",
            Stage::Emit => "emit",
        };
        write!(f, "{name}")
    }
}

/// Receives progress updates from long-running pipeline stages. `percent` is
/// in `[0.0, 100.0]`; stages that cannot estimate a total up front (like the
/// compressor, which runs until a fixed point) report the fraction of nodes
/// removed in the last pass instead, which still trends toward 0 as the run
/// converges.
pub trait ProgressObserver {
    /// Called once per unit of progress within `stage`.
    fn report(&self, stage: Stage, percent: f32);
}

/// The default, headless observer: discards every report. Used whenever a
/// caller has no terminal to draw a bar on (library embedding, batch CI
/// runs).
#[derive(Debug, Clone, Copy, Default)]
pub struct NullObserver;

impl ProgressObserver for NullObserver {
    fn report(&self, _stage: Stage, _percent: f32) {}
}

/// A terminal progress observer backed by `indicatif`. Keeps one spinner per
/// stage it has seen so far, created lazily on first report (mirrors the
/// pack's own pattern of lazily wiring an `indicatif::ProgressBar` into a
/// long batch job rather than pre-allocating one per possible stage).
pub struct TerminalObserver {
    bars: std::sync::Mutex<std::collections::HashMap<Stage, indicatif::ProgressBar>>,
}

impl TerminalObserver {
    /// A fresh terminal observer with no bars yet created.
    pub fn new() -> Self {
        TerminalObserver { bars: std::sync::Mutex::new(std::collections::HashMap::new()) }
    }
}

impl Default for TerminalObserver {
    fn default() -> Self {
        TerminalObserver::new()
    }
}

impl ProgressObserver for TerminalObserver {
    fn report(&self, stage: Stage, percent: f32) {
        let mut bars = self.bars.lock().expect("progress bar registry poisoned");
        let bar = bars.entry(stage).or_insert_with(|| {
            let bar = indicatif::ProgressBar::new(100);
            bar.set_message(stage.to_string());
            bar
        });
        bar.set_position(percent.clamp(0.0, 100.0) as u64);
        if percent >= 100.0 {
            bar.finish_and_clear();
        }
    }
}

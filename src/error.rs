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

//! This module defines the error type shared by every stage of the pipeline
//! (rule-set construction, ODT building, forest handling, compression and
//! emission). The pipeline is fail-fast: the first error aborts the run, so
//! there is exactly one error enum rather than one per module.

use thiserror::Error;

/// Everything that can go wrong while turning a rule set into emitted code.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GenError {
    /// The rule generator produced an empty action set for some
    /// configuration. `configuration` is the raw k-bit index (LSB = first
    /// condition) that triggered the failure.
    #[error("rule generator produced no action for configuration {configuration:#x}")]
    UnsatisfiableRule {
        /// The offending configuration index.
        configuration: u64,
    },

    /// The ODT builder reached a state with no common action and no
    /// conditions left to branch on (or an empty surviving set), meaning the
    /// rule set is inconsistent on some branch prefix.
    #[error(
        "inconsistent rule set: {surviving} surviving configuration(s) share no \
         common action and {remaining_conditions:#x} condition(s) remain"
    )]
    InconsistentRuleSet {
        /// Bitmask of conditions that were still available to branch on.
        remaining_conditions: u64,
        /// Number of configurations left in the surviving subset.
        surviving: usize,
    },

    /// A condition referenced pixel coordinates outside the mask's declared
    /// shift support.
    #[error("condition references pixel {pixel:?} which is out of the mask's shift range")]
    MaskOutOfRange {
        /// Name of the offending pixel/condition.
        pixel: String,
    },

    /// The destination file for emitted code could not be opened or written.
    /// Carries the formatted `std::io::Error` message rather than the error
    /// itself, since `std::io::Error` implements neither `Clone` nor
    /// `PartialEq` and this enum needs both (tests compare `GenError`s
    /// directly, and the compressor/builder keep cached `Result`s around).
    #[error("I/O error while emitting generated code: {0}")]
    EmissionIo(String),

    /// A required configuration key was not set before pipeline entry.
    #[error("missing required configuration key `{key}`")]
    ConfigMissing {
        /// The missing key's name.
        key: &'static str,
    },
}

impl From<std::io::Error> for GenError {
    fn from(e: std::io::Error) -> Self {
        GenError::EmissionIo(e.to_string())
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, GenError>;

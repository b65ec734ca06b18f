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

//! Pipeline configuration: which algorithm and mask a run targets, and where
//! the generated code/treecode files land. Buildable incrementally
//! (`GenConfigBuilder`, in the spirit of the pack's own
//! `#[derive(Builder)]` configuration structs) or loaded wholesale from a
//! TOML file.

use std::path::{Path, PathBuf};

use derive_builder::Builder;
use serde::Deserialize;

use crate::error::GenError;

/// Everything one code-generation run needs to know besides the rule set
/// itself.
#[derive(Debug, Clone, Builder)]
#[builder(pattern = "mutable", setter(into), build_fn(skip))]
pub struct GenConfig {
    /// Human-readable name of the algorithm being compiled (used only for
    /// logging/labeling emitted code, never parsed back).
    pub algorithm_name: String,
    /// Human-readable name of the mask in use, same role as `algorithm_name`.
    pub mask_name: String,
    /// Destination path for the emitted source code.
    pub code_path: PathBuf,
    /// Destination path for the emitted tree/forest dump (diagnostics,
    /// regenerable from the compressed `BinaryDrag` at any time).
    pub treecode_path: PathBuf,
}

impl GenConfigBuilder {
    /// Finalizes the builder, reporting the first unset required field as a
    /// `GenError::ConfigMissing` rather than `derive_builder`'s own
    /// uninitialized-field error, so every entry point into this crate
    /// (incremental builder or TOML file) surfaces the same error type.
    ///
    /// Takes `&self` rather than consuming the builder, matching the
    /// `"mutable"` build pattern requested on `GenConfig` (setters take
    /// `&mut self` and return `&mut Self`, so `.finish()` must be chainable
    /// right after them in one expression). The `"mutable"` pattern is
    /// requested explicitly rather than relied on as a default: plain
    /// `derive_builder` defaults to the `"owned"` pattern (setters consume
    /// `self`), which would make `RawGenConfig::into_builder`'s
    /// call-then-keep-using-`builder` sequence a use-after-move.
    pub fn finish(&self) -> Result<GenConfig, GenError> {
        Ok(GenConfig {
            algorithm_name: self
                .algorithm_name
                .clone()
                .ok_or(GenError::ConfigMissing { key: "algorithm_name" })?,
            mask_name: self.mask_name.clone().ok_or(GenError::ConfigMissing { key: "mask_name" })?,
            code_path: self.code_path.clone().ok_or(GenError::ConfigMissing { key: "code_path" })?,
            treecode_path: self
                .treecode_path
                .clone()
                .ok_or(GenError::ConfigMissing { key: "treecode_path" })?,
        })
    }
}

/// Permissive mirror of `GenConfig` for TOML deserialization: every field is
/// optional at the parse stage so a missing key is reported as
/// `GenError::ConfigMissing` (via the same `GenConfigBuilder::finish` path)
/// rather than a generic deserialization failure.
#[derive(Debug, Clone, Default, Deserialize)]
struct RawGenConfig {
    algorithm_name: Option<String>,
    mask_name: Option<String>,
    code_path: Option<PathBuf>,
    treecode_path: Option<PathBuf>,
}

impl RawGenConfig {
    fn into_builder(self) -> GenConfigBuilder {
        let mut builder = GenConfigBuilder::default();
        if let Some(v) = self.algorithm_name {
            builder.algorithm_name(v);
        }
        if let Some(v) = self.mask_name {
            builder.mask_name(v);
        }
        if let Some(v) = self.code_path {
            builder.code_path(v);
        }
        if let Some(v) = self.treecode_path {
            builder.treecode_path(v);
        }
        builder
    }
}

impl GenConfig {
    /// Parses `text` as TOML and builds a `GenConfig` from it.
    ///
    /// # Errors
    /// Returns `GenError::ConfigMissing` if a required key is absent, or if
    /// `text` is not valid TOML (reported against the synthetic key
    /// `"<malformed TOML>"`, since this crate has no dedicated parse-error
    /// variant).
    pub fn from_toml_str(text: &str) -> Result<GenConfig, GenError> {
        let raw: RawGenConfig = toml::from_str(text)
            .map_err(|_| GenError::ConfigMissing { key: "<malformed TOML>" })?;
        raw.into_builder().finish()
    }

    /// Reads `path` and parses it as TOML via `from_toml_str`.
    ///
    /// # Errors
    /// Propagates any `std::io::Error` reading `path` as `GenError::EmissionIo`,
    /// or any error from `from_toml_str`.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<GenConfig, GenError> {
        let text = std::fs::read_to_string(path)?;
        GenConfig::from_toml_str(&text)
    }
}

#[cfg(test)]
mod test_config {
    use super::*;

    #[test]
    fn builder_succeeds_with_every_field_set() {
        let config = GenConfigBuilder::default()
            .algorithm_name("guo-hall")
            .mask_name("3x3")
            .code_path("out/code.rs")
            .treecode_path("out/tree.txt")
            .finish()
            .unwrap();
        assert_eq!("guo-hall", config.algorithm_name);
        assert_eq!(Path::new("out/code.rs"), config.code_path);
    }

    #[test]
    fn builder_reports_the_first_missing_key() {
        let err = GenConfigBuilder::default()
            .algorithm_name("guo-hall")
            .finish()
            .unwrap_err();
        assert_eq!(GenError::ConfigMissing { key: "mask_name" }, err);
    }

    #[test]
    fn from_toml_str_parses_a_complete_document() {
        let toml = r#"
            algorithm_name = "bbdt"
            mask_name = "grana"
            code_path = "gen/bbdt.rs"
            treecode_path = "gen/bbdt.tree"
        "#;
        let config = GenConfig::from_toml_str(toml).unwrap();
        assert_eq!("bbdt", config.algorithm_name);
        assert_eq!("grana", config.mask_name);
    }

    #[test]
    fn from_toml_str_reports_missing_key() {
        let toml = r#"
            algorithm_name = "bbdt"
            mask_name = "grana"
        "#;
        let err = GenConfig::from_toml_str(toml).unwrap_err();
        assert!(matches!(err, GenError::ConfigMissing { .. }));
    }

    #[test]
    fn from_toml_file_round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
                algorithm_name = "spaghetti"
                mask_name = "grana"
                code_path = "gen/spaghetti.rs"
                treecode_path = "gen/spaghetti.tree"
            "#,
        )
        .unwrap();

        let config = GenConfig::from_toml_file(&path).unwrap();
        assert_eq!("spaghetti", config.algorithm_name);
    }
}

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

//! The drawing/PDF collaborator: purely diagnostic, renders a `BinaryDrag`
//! to an external file for visual inspection. This crate ships the contract
//! only, no implementation; the teacher's own `ddo-viz` workspace member is
//! exactly this responsibility, kept external to the core pipeline (see
//! `DESIGN.md`).

use crate::dag::BinaryDrag;
use crate::error::GenError;

/// Renders a `BinaryDrag` for visual inspection (GraphViz, PDF, or anything
/// else a caller wants to wire up). `stem` is a file stem without extension;
/// implementations choose their own suffix.
///
/// No implementation ships with this crate: this is an optional external
/// collaborator, not part of the core rule-set-to-code chain.
pub trait GraphDrawer {
    /// Draws `drag` to a file derived from `stem`. Purely diagnostic:
    /// failures here never abort the code-generation pipeline itself.
    fn draw(&self, drag: &BinaryDrag, stem: &str) -> Result<(), GenError>;
}

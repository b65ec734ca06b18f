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

//! This module defines the most basic data types of the mask description:
//! named pixels at integer coordinates relative to the scan cursor, and the
//! ordered `PixelSet` (a.k.a. mask) built out of them.

use crate::error::GenError;

// ----------------------------------------------------------------------------
// --- PIXEL --------------------------------------------------------------
// ----------------------------------------------------------------------------
/// A single named neighbor of the mask, at integer coordinates relative to
/// the "current" pixel (the origin). Coordinates are `(x, y)` for 2D masks
/// and `(x, y, z)` for 3D masks.
///
/// # Examples
/// ```
/// # use graphsgen::Pixel;
/// let p1 = Pixel::new("P1", vec![0, 0]);
/// assert_eq!(p1.name(), "P1");
/// assert!(p1.is_origin());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Pixel {
    name: String,
    coords: Vec<i32>,
}

impl Pixel {
    /// Creates a new named pixel at the given coordinates.
    pub fn new(name: impl Into<String>, coords: Vec<i32>) -> Self {
        Pixel { name: name.into(), coords }
    }

    /// The pixel's name, e.g. `"P1"`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The pixel's coordinates, `[x, y]` or `[x, y, z]`.
    pub fn coords(&self) -> &[i32] {
        &self.coords
    }

    /// True iff this pixel sits at the origin (all coordinates zero), the
    /// "current" pixel being scanned.
    pub fn is_origin(&self) -> bool {
        self.coords.iter().all(|c| *c == 0)
    }
}

// ----------------------------------------------------------------------------
// --- PIXEL SET / MASK -----------------------------------------------------
// ----------------------------------------------------------------------------
/// An ordered sequence of `Pixel`s plus the per-dimension "shift" vector: how
/// far the scan advances between successive applications of the mask. The
/// number of conditions `k` of a rule set built from this mask is
/// `self.len()` (plus any extra non-pixel conditions appended later by
/// `RuleSetBuilder::add_condition`).
///
/// # Invariants
/// The origin pixel must be present exactly once, and pixel names must be
/// unique; both are checked by `PixelSet::new`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelSet {
    pixels: Vec<Pixel>,
    shifts: Vec<i32>,
}

impl PixelSet {
    /// Builds a mask from an ordered list of pixels and a shift vector (one
    /// entry per dimension). Bit position `i` of a configuration index
    /// always refers to `pixels[i]` (LSB = first condition).
    ///
    /// # Errors
    /// Returns `GenError::MaskOutOfRange` if the origin is missing or if two
    /// pixels share the same name.
    pub fn new(pixels: Vec<Pixel>, shifts: Vec<i32>) -> Result<Self, GenError> {
        if !pixels.iter().any(Pixel::is_origin) {
            return Err(GenError::MaskOutOfRange { pixel: "<origin>".to_string() });
        }
        let mut seen = std::collections::HashSet::with_capacity(pixels.len());
        for p in &pixels {
            if !seen.insert(p.name()) {
                return Err(GenError::MaskOutOfRange { pixel: p.name().to_string() });
            }
        }
        Ok(PixelSet { pixels, shifts })
    }

    /// Number of pixels in the mask (the number of pixel-derived conditions).
    pub fn len(&self) -> usize {
        self.pixels.len()
    }

    /// True iff the mask has no pixels (never the case for a valid mask, but
    /// kept symmetric with `len`).
    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    /// Iterates over the pixels in mask (condition-bit) order.
    pub fn iter(&self) -> impl Iterator<Item = &Pixel> {
        self.pixels.iter()
    }

    /// Looks up the bit position of a named pixel, if present.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.pixels.iter().position(|p| p.name() == name)
    }

    /// The per-dimension shift vector: how far the scan cursor advances
    /// between two successive applications of this mask.
    pub fn shifts(&self) -> &[i32] {
        &self.shifts
    }

    /// Horizontal shift (first dimension), the value the forest handler
    /// specializes trees around.
    pub fn horizontal_shift(&self) -> i32 {
        self.shifts.first().copied().unwrap_or(1)
    }

    /// Number of dimensions of this mask (2 or 3 in practice).
    pub fn dimensions(&self) -> usize {
        self.shifts.len()
    }
}

impl std::ops::Index<usize> for PixelSet {
    type Output = Pixel;
    fn index(&self, i: usize) -> &Pixel {
        &self.pixels[i]
    }
}

#[cfg(test)]
mod test_pixel {
    use super::*;

    #[test]
    fn origin_pixel_is_detected() {
        let p = Pixel::new("P1", vec![0, 0]);
        assert!(p.is_origin());
        let q = Pixel::new("P2", vec![1, 0]);
        assert!(!q.is_origin());
    }

    #[test]
    fn pixel_set_requires_an_origin() {
        let pixels = vec![Pixel::new("P2", vec![1, 0])];
        assert!(PixelSet::new(pixels, vec![1, 1]).is_err());
    }

    #[test]
    fn pixel_set_rejects_duplicate_names() {
        let pixels = vec![
            Pixel::new("P1", vec![0, 0]),
            Pixel::new("P1", vec![1, 0]),
        ];
        assert!(PixelSet::new(pixels, vec![1, 1]).is_err());
    }

    #[test]
    fn position_finds_bit_index() {
        let pixels = vec![
            Pixel::new("P1", vec![0, 0]),
            Pixel::new("P2", vec![1, 0]),
        ];
        let ps = PixelSet::new(pixels, vec![1, 1]).unwrap();
        assert_eq!(Some(0), ps.position("P1"));
        assert_eq!(Some(1), ps.position("P2"));
        assert_eq!(None, ps.position("P9"));
    }

    #[test]
    fn grana_2x2_mask_has_shift_two() {
        // five external pixels plus the 2x2 block
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
        let ps = PixelSet::new(pixels, vec![2, 1]).unwrap();
        assert_eq!(2, ps.horizontal_shift());
        assert_eq!(8, ps.len());
    }
}

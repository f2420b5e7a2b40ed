//! Barcode engine seam
//!
//! Symbol detection, error correction and symbol generation live behind
//! [`BarcodeEngine`]. The boundary layer only prepares inputs and marshals
//! outputs, so another engine can be swapped in with [`crate::decode_with`]
//! and [`crate::encode_with`].

mod qr;

pub use qr::QrEngine;

use std::fmt;

use crate::encode::EncodeOptions;
use crate::error::{Result, Status};
use crate::format::{BarcodeFormat, FormatSet};
use crate::hints::Hints;
use crate::view::PixelBufferView;

/// Integer pixel position in the input image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(C)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// A symbol found and decoded by an engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Detection {
    pub format: BarcodeFormat,
    /// Payload bytes as stored in the symbol, before charset normalization
    pub raw: Vec<u8>,
    /// Top-left, top-right, bottom-right, bottom-left of the symbol
    pub corners: [Point; 4],
}

/// Why an engine produced no [`Detection`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeFailure {
    NotFound,
    FormatError,
    ChecksumError,
}

impl DecodeFailure {
    /// Keep whichever of two failures says more about the frame
    pub fn most_specific(self, other: DecodeFailure) -> DecodeFailure {
        if Status::from(other).specificity() > Status::from(self).specificity() {
            other
        } else {
            self
        }
    }
}

impl From<DecodeFailure> for Status {
    fn from(value: DecodeFailure) -> Self {
        match value {
            DecodeFailure::NotFound => Status::NotFound,
            DecodeFailure::FormatError => Status::FormatError,
            DecodeFailure::ChecksumError => Status::ChecksumError,
        }
    }
}

impl fmt::Display for DecodeFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Status::from(*self).fmt(f)
    }
}

pub trait BarcodeEngine: Send + Sync {
    /// Formats this engine can detect
    fn decode_formats(&self) -> FormatSet;

    /// Formats this engine can generate
    fn encode_formats(&self) -> FormatSet;

    /// Find and decode one symbol in `view`
    fn decode(&self, view: &PixelBufferView<'_>, hints: &Hints)
        -> Result<Detection, DecodeFailure>;

    /// Render `text` as a symbol scaled to the requested output size
    ///
    /// Options have already been range-checked by the caller.
    fn encode(&self, text: &str, format: BarcodeFormat, options: &EncodeOptions)
        -> Result<SymbolMatrix>;
}

/// Dark/light module grid, row-major, `true` = dark
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolMatrix {
    width: usize,
    height: usize,
    modules: Vec<bool>,
}

impl SymbolMatrix {
    /// # Panics
    ///
    /// Panics if `modules.len() != width * height`.
    pub fn from_modules(width: usize, height: usize, modules: Vec<bool>) -> Self {
        assert_eq!(modules.len(), width * height, "module count mismatch");
        Self {
            width,
            height,
            modules,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> bool {
        self.modules[y * self.width + x]
    }

    pub fn modules(&self) -> &[bool] {
        &self.modules
    }

    /// Scale the bare symbol into an output raster
    ///
    /// The quiet zone is `margin` modules on every side. The output is at
    /// least as large as the symbol plus quiet zone; modules are scaled by
    /// the largest integer factor that fits and the symbol is centred.
    pub fn render(&self, margin: usize, width: usize, height: usize) -> SymbolMatrix {
        let full_w = self.width + 2 * margin;
        let full_h = self.height + 2 * margin;
        if full_w == 0 || full_h == 0 {
            return self.clone();
        }
        let out_w = width.max(full_w);
        let out_h = height.max(full_h);
        let scale = (out_w / full_w).min(out_h / full_h);
        let left = (out_w - self.width * scale) / 2;
        let top = (out_h - self.height * scale) / 2;

        let mut modules = vec![false; out_w * out_h];
        for y in 0..self.height {
            for x in 0..self.width {
                if !self.get(x, y) {
                    continue;
                }
                for row in modules
                    .chunks_exact_mut(out_w)
                    .skip(top + y * scale)
                    .take(scale)
                {
                    let start = left + x * scale;
                    row[start..start + scale].fill(true);
                }
            }
        }

        SymbolMatrix {
            width: out_w,
            height: out_h,
            modules,
        }
    }
}

//! Text to symbol to greyscale pixels
//!
//! [`encode_request`] validates the options and asks the engine for a
//! [`SymbolMatrix`]; [`EncodedImage::from_matrix`] flattens that matrix into
//! one byte per pixel (dark = 0, light = 255).

use crate::engine::{BarcodeEngine, QrEngine, SymbolMatrix};
use crate::format::BarcodeFormat;
use crate::{Error, Result};

/// Largest accepted quiet zone, in modules
pub const MAX_MARGIN: usize = 64;

/// Largest accepted output width or height, in pixels
pub const MAX_DIMENSION: usize = 16384;

pub const DARK_PIXEL: u8 = 0;
pub const LIGHT_PIXEL: u8 = 255;

/// Error-correction strength, weakest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EccLevel {
    /// ~7% recovery
    #[default]
    L,
    /// ~15% recovery
    M,
    /// ~25% recovery
    Q,
    /// ~30% recovery
    H,
}

impl TryFrom<u32> for EccLevel {
    type Error = Error;

    fn try_from(value: u32) -> Result<Self> {
        match value {
            0 => Ok(EccLevel::L),
            1 => Ok(EccLevel::M),
            2 => Ok(EccLevel::Q),
            3 => Ok(EccLevel::H),
            _ => Err(Error::InvalidOptions("ecc level must be 0..=3")),
        }
    }
}

/// Output geometry and symbol options for an encode
///
/// `width`/`height` of 0 mean "natural size": one pixel per module.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodeOptions {
    pub width: usize,
    pub height: usize,
    pub margin: usize,
    pub ecc_level: EccLevel,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl EncodeOptions {
    /// Natural size, four-module quiet zone, ECC level L
    pub fn new() -> Self {
        Self {
            width: 0,
            height: 0,
            margin: 4,
            ecc_level: EccLevel::L,
        }
    }

    pub fn size(mut self, width: usize, height: usize) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn margin(mut self, margin: usize) -> Self {
        self.margin = margin;
        self
    }

    pub fn ecc_level(mut self, level: EccLevel) -> Self {
        self.ecc_level = level;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.margin > MAX_MARGIN {
            return Err(Error::InvalidOptions("margin exceeds 64 modules"));
        }
        if self.width > MAX_DIMENSION || self.height > MAX_DIMENSION {
            return Err(Error::InvalidOptions("output size exceeds 16384 pixels"));
        }
        Ok(())
    }
}

/// A validated encode: payload, symbology and output options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodeRequest<'a> {
    text: &'a str,
    format: BarcodeFormat,
    options: EncodeOptions,
}

impl<'a> EncodeRequest<'a> {
    pub fn new(text: &'a str, format: BarcodeFormat, options: EncodeOptions) -> Result<Self> {
        options.validate()?;
        Ok(Self {
            text,
            format,
            options,
        })
    }

    pub fn text(&self) -> &'a str {
        self.text
    }

    pub fn format(&self) -> BarcodeFormat {
        self.format
    }

    pub fn options(&self) -> &EncodeOptions {
        &self.options
    }

    pub fn symbol(&self) -> Result<SymbolMatrix> {
        symbol_with(&QrEngine, self.text, self.format, &self.options)
    }

    pub fn image(&self) -> Result<EncodedImage> {
        self.symbol().map(|m| EncodedImage::from_matrix(&m))
    }
}

/// Build a symbol matrix for `text` with the default engine
///
/// `ecc_level` is 0..=3 for L, M, Q, H.
pub fn encode_request(
    text: &str,
    format: BarcodeFormat,
    width: usize,
    height: usize,
    margin: usize,
    ecc_level: u32,
) -> Result<SymbolMatrix> {
    let options = EncodeOptions {
        width,
        height,
        margin,
        ecc_level: EccLevel::try_from(ecc_level)?,
    };
    EncodeRequest::new(text, format, options)?.symbol()
}

/// Build a symbol matrix for `text` with any engine
pub fn symbol_with<E: BarcodeEngine + ?Sized>(
    engine: &E,
    text: &str,
    format: BarcodeFormat,
    options: &EncodeOptions,
) -> Result<SymbolMatrix> {
    options.validate()?;
    if !engine.encode_formats().contains(format.into()) {
        return Err(Error::UnsupportedFormat(format!(
            "{format} encoding is not supported"
        )));
    }

    let matrix = engine.encode(text, format, options)?;
    log::debug!(
        "encoded {} bytes as {format}: {}x{} pixels",
        text.len(),
        matrix.width(),
        matrix.height()
    );
    Ok(matrix)
}

/// Encode `text` into a greyscale raster with the default engine
pub fn encode(text: &str, format: BarcodeFormat, options: &EncodeOptions) -> Result<EncodedImage> {
    encode_with(&QrEngine, text, format, options)
}

pub fn encode_with<E: BarcodeEngine + ?Sized>(
    engine: &E,
    text: &str,
    format: BarcodeFormat,
    options: &EncodeOptions,
) -> Result<EncodedImage> {
    symbol_with(engine, text, format, options).map(|m| EncodedImage::from_matrix(&m))
}

/// Row-major 8-bit greyscale raster
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub width: usize,
    pub height: usize,
    pub pixels: Box<[u8]>,
}

impl EncodedImage {
    pub fn from_matrix(matrix: &SymbolMatrix) -> Self {
        let pixels = matrix
            .modules()
            .iter()
            .map(|&dark| if dark { DARK_PIXEL } else { LIGHT_PIXEL })
            .collect();
        Self {
            width: matrix.width(),
            height: matrix.height(),
            pixels,
        }
    }

    /// Byte size, always `width * height`
    pub fn size(&self) -> usize {
        self.pixels.len()
    }

    pub fn into_pixels(self) -> Box<[u8]> {
        self.pixels
    }
}

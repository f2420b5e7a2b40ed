//! WebAssembly bindings

use wasm_bindgen::prelude::*;

use crate::{
    decode, encode, BarcodeFormat, ChannelLayout, EccLevel, EncodeOptions, Error, Hints,
    PixelBufferView, Result,
};

/// A decoded symbol.
#[wasm_bindgen]
pub struct ScanResult {
    format: String,
    text: String,
    corners: Vec<i32>,
}

#[wasm_bindgen]
impl ScanResult {
    /// The barcode format name (e.g. "QR-Code").
    #[wasm_bindgen(getter)]
    pub fn format(&self) -> String {
        self.format.clone()
    }

    /// Decoded payload as UTF-8 text.
    #[wasm_bindgen(getter)]
    pub fn text(&self) -> String {
        self.text.clone()
    }

    /// Corner coordinates x0, y0 .. x3, y3, clockwise from top-left.
    #[wasm_bindgen(getter)]
    pub fn corners(&self) -> Vec<i32> {
        self.corners.clone()
    }
}

/// Scan RGBA pixel data (as from a canvas `ImageData`) for a QR code.
///
/// Returns `undefined` when nothing is decoded.
#[wasm_bindgen]
pub fn scan_rgba(
    data: &[u8],
    width: u32,
    height: u32,
) -> Result<Option<ScanResult>, JsValue> {
    let view = rgba_view(data, width, height).map_err(|e| JsValue::from_str(&e.to_string()))?;

    let result = decode(&view, &Hints::default());
    let (Some(format), Some(text), Some(corners)) = (result.format(), result.text(), result.corners())
    else {
        return Ok(None);
    };
    Ok(Some(ScanResult {
        format: format.to_string(),
        text: text.to_owned(),
        corners: corners.iter().flat_map(|p| [p.x, p.y]).collect(),
    }))
}

/// Tightly packed canvas RGBA
fn rgba_view(data: &[u8], width: u32, height: u32) -> Result<PixelBufferView<'_>> {
    let (width, height) = (width as usize, height as usize);
    let row_stride = width
        .checked_mul(4)
        .ok_or(Error::InvalidGeometry("row stride overflows"))?;
    PixelBufferView::new(data, width, height, row_stride, 4, ChannelLayout::RGBA)
}

/// Render `text` as a QR code: row-major greyscale, `size` x `size` or
/// natural size when `size` is 0.
#[wasm_bindgen]
pub fn encode_qr(
    text: &str,
    size: u32,
    margin: u32,
    ecc_level: u32,
) -> Result<Vec<u8>, JsValue> {
    let level = EccLevel::try_from(ecc_level).map_err(|e| JsValue::from_str(&e.to_string()))?;
    let options = EncodeOptions::new()
        .size(size as usize, size as usize)
        .margin(margin as usize)
        .ecc_level(level);
    encode(text, BarcodeFormat::QrCode, &options)
        .map(|image| image.into_pixels().into_vec())
        .map_err(|e| JsValue::from_str(&e.to_string()))
}

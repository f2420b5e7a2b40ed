//! Barcode decode/encode boundary over raw pixel buffers
//!
//! This crate exposes barcode decoding and encoding as a small Rust API and a
//! flat C ABI ([`ffi`]). A caller hands over a pixel buffer with arbitrary
//! row stride, pixel stride and channel layout; the crate wraps it in a
//! borrowed [`PixelBufferView`], runs a [`BarcodeEngine`] with per-call
//! [`Hints`] and returns a fully owned [`DecodeResult`]. The reverse path
//! renders text into a [`SymbolMatrix`] and flattens it into greyscale
//! pixels.
//!
//! The default engine, [`QrEngine`], reads and writes QR codes.
//!
//! # Examples
//!
//! ```
//! use zedbridge::{decode, encode, BarcodeFormat, EncodeOptions, Hints, PixelBufferView, Status};
//!
//! let image = encode("HELLO", BarcodeFormat::QrCode, &EncodeOptions::new().size(200, 200))?;
//! let view = PixelBufferView::from_luma(&image.pixels, image.width, image.height)?;
//!
//! let result = decode(&view, &Hints::default());
//! assert_eq!(result.status(), Status::Success);
//! assert_eq!(result.text(), Some("HELLO"));
//! # Ok::<(), zedbridge::Error>(())
//! ```

pub mod binarize;
pub mod decode;
pub mod encode;
pub mod engine;
pub mod error;
pub mod ffi;
pub mod format;
pub mod hints;
pub mod text;
pub mod view;

#[cfg(feature = "wasm")]
pub mod wasm;

pub use binarize::Binarizer;
pub use decode::{decode, decode_with, DecodeResult};
pub use encode::{
    encode, encode_request, encode_with, EccLevel, EncodeOptions, EncodeRequest, EncodedImage,
};
pub use engine::{BarcodeEngine, DecodeFailure, Detection, Point, QrEngine, SymbolMatrix};
pub use error::{Error, Result, Status};
pub use format::{BarcodeFormat, FormatSet};
pub use hints::Hints;
pub use view::{ChannelLayout, LumaPlane, PixelBufferView};

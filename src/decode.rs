//! Pixel buffer to decode outcome
//!
//! Decoding never fails in the `Result` sense: a frame without a readable
//! symbol is an ordinary outcome, reported through [`DecodeResult::status`].

use std::panic::{self, AssertUnwindSafe};

use crate::engine::{BarcodeEngine, DecodeFailure, Detection, Point, QrEngine};
use crate::error::Status;
use crate::format::BarcodeFormat;
use crate::hints::Hints;
use crate::text;
use crate::view::PixelBufferView;

/// Outcome of one decode call
///
/// Format, payload and corners are present exactly when the status is
/// [`Status::Success`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeResult {
    status: Status,
    format: Option<BarcodeFormat>,
    payload: Option<Box<[u8]>>,
    num_bits: u32,
    corners: Option<[Point; 4]>,
}

impl DecodeResult {
    pub fn success(format: BarcodeFormat, payload: Box<[u8]>, corners: [Point; 4]) -> Self {
        let num_bits = u32::try_from(payload.len())
            .ok()
            .and_then(|n| n.checked_mul(8))
            .unwrap_or(u32::MAX);
        Self {
            status: Status::Success,
            format: Some(format),
            payload: Some(payload),
            num_bits,
            corners: Some(corners),
        }
    }

    /// # Panics
    ///
    /// Panics if `status` is [`Status::Success`].
    pub fn failure(status: Status) -> Self {
        assert!(!status.is_success(), "failure() needs a failure status");
        Self {
            status,
            format: None,
            payload: None,
            num_bits: 0,
            corners: None,
        }
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn format(&self) -> Option<BarcodeFormat> {
        self.format
    }

    /// UTF-8 payload bytes
    pub fn payload(&self) -> Option<&[u8]> {
        self.payload.as_deref()
    }

    pub fn text(&self) -> Option<&str> {
        self.payload().and_then(|p| std::str::from_utf8(p).ok())
    }

    /// Payload size in bits; 0 on failure
    pub fn num_bits(&self) -> u32 {
        self.num_bits
    }

    /// Top-left, top-right, bottom-right, bottom-left relative to the symbol
    pub fn corners(&self) -> Option<&[Point; 4]> {
        self.corners.as_ref()
    }

    pub fn into_payload(self) -> Option<Box<[u8]>> {
        self.payload
    }
}

impl From<Detection> for DecodeResult {
    fn from(detection: Detection) -> Self {
        let text = text::to_utf8(&detection.raw);
        DecodeResult::success(
            detection.format,
            text.into_bytes().into_boxed_slice(),
            detection.corners,
        )
    }
}

impl From<DecodeFailure> for DecodeResult {
    fn from(failure: DecodeFailure) -> Self {
        DecodeResult::failure(failure.into())
    }
}

/// Decode one symbol with the default engine
///
/// # Examples
///
/// ```
/// use zedbridge::{decode, Hints, PixelBufferView, Status};
///
/// let blank = vec![255u8; 64 * 64];
/// let view = PixelBufferView::from_luma(&blank, 64, 64).unwrap();
/// let result = decode(&view, &Hints::default());
/// assert_eq!(result.status(), Status::NotFound);
/// assert!(result.payload().is_none());
/// ```
pub fn decode(view: &PixelBufferView<'_>, hints: &Hints) -> DecodeResult {
    decode_with(&QrEngine, view, hints)
}

/// Decode one symbol with any engine
///
/// A panicking engine is reported as [`Status::FormatError`].
pub fn decode_with<E: BarcodeEngine + ?Sized>(
    engine: &E,
    view: &PixelBufferView<'_>,
    hints: &Hints,
) -> DecodeResult {
    let formats = hints.accepted_formats();
    if !formats.is_empty() && !formats.intersects(engine.decode_formats()) {
        log::debug!("accepted formats {formats:?} are not supported by the engine");
        return DecodeResult::failure(Status::NotFound);
    }

    log::debug!(
        "decoding {}x{} frame (try_harder={}, binarizer={})",
        view.width(),
        view.height(),
        hints.is_try_harder(),
        hints.selected_binarizer()
    );

    let outcome = match panic::catch_unwind(AssertUnwindSafe(|| engine.decode(view, hints))) {
        Ok(outcome) => outcome,
        Err(_) => {
            log::warn!("engine panicked on a {}x{} frame", view.width(), view.height());
            return DecodeResult::failure(Status::FormatError);
        }
    };

    match outcome {
        Ok(detection) => {
            let result = DecodeResult::from(detection);
            log::debug!(
                "decoded {:?}: {} bytes",
                result.format(),
                result.payload().map_or(0, <[u8]>::len)
            );
            result
        }
        Err(failure) => {
            log::debug!("no symbol decoded: {failure}");
            failure.into()
        }
    }
}

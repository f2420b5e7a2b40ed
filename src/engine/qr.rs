//! Default engine: QR detection via `rqrr`, generation via `qrcode`

use std::panic::{self, AssertUnwindSafe};

use qrcode::types::{Color, EcLevel, QrError};
use qrcode::QrCode;

use super::{BarcodeEngine, DecodeFailure, Detection, Point, SymbolMatrix};
use crate::binarize::{Binarizer, DARK};
use crate::encode::{EccLevel, EncodeOptions};
use crate::format::{BarcodeFormat, FormatSet};
use crate::hints::Hints;
use crate::view::{LumaPlane, PixelBufferView};
use crate::{Error, Result};

/// Frames whose longer side is below this are also tried at 2x
const UPSCALE_BELOW: usize = 256;

/// Nearest-neighbour zoom for the upscaled attempt; the detector needs
/// light runs of at least two pixels along the timing patterns
const UPSCALE_ZOOM: usize = 2;

#[derive(Debug, Clone, Copy, Default)]
pub struct QrEngine;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Source {
    Original,
    Inverted,
    Upscaled,
}

/// Order of (plane, binarizer) pairs tried for one frame
fn attempts(hints: &Hints, width: usize, height: usize) -> Vec<(Source, Binarizer)> {
    let primary = hints.binarizer;
    let mut list = vec![(Source::Original, primary)];
    if hints.try_harder {
        list.extend(primary.fallbacks().map(|b| (Source::Original, b)));
        list.push((Source::Inverted, primary));
        if width.max(height) < UPSCALE_BELOW {
            list.push((Source::Upscaled, primary));
        }
    }
    list
}

impl From<rqrr::DeQRError> for DecodeFailure {
    fn from(err: rqrr::DeQRError) -> Self {
        match err {
            rqrr::DeQRError::DataEcc | rqrr::DeQRError::FormatEcc => DecodeFailure::ChecksumError,
            _ => DecodeFailure::FormatError,
        }
    }
}

/// Detect and decode the first readable QR symbol on a binarized plane
///
/// The mask is handed to the detector zoomed by `zoom` (nearest neighbour);
/// corners come back in plane coordinates.
fn scan(
    plane: &LumaPlane,
    binarizer: Binarizer,
    zoom: usize,
) -> Result<(Vec<u8>, [Point; 4]), DecodeFailure> {
    let mask = binarizer.apply(plane);
    let width = plane.width;
    let detected = panic::catch_unwind(AssertUnwindSafe(|| {
        detect(&mask, width, plane.height, zoom)
    }));
    match detected {
        Ok(found) => found.map(|(raw, corners)| {
            let corners = corners.map(|p| Point::new(p.x / zoom as i32, p.y / zoom as i32));
            (raw, corners)
        }),
        Err(_) => {
            log::warn!("{binarizer}: detector panicked on a {width}x{} plane", plane.height);
            Err(DecodeFailure::FormatError)
        }
    }
}

fn detect(
    mask: &[u8],
    width: usize,
    height: usize,
    zoom: usize,
) -> Result<(Vec<u8>, [Point; 4]), DecodeFailure> {
    let mut prepared =
        rqrr::PreparedImage::prepare_from_greyscale(width * zoom, height * zoom, |x, y| {
            if mask[(y / zoom) * width + x / zoom] == DARK {
                0
            } else {
                255
            }
        });

    let grids = prepared.detect_grids();
    log::trace!("zoom {zoom}: {} candidate grid(s)", grids.len());

    let mut failure = DecodeFailure::NotFound;
    for grid in grids {
        let mut raw = Vec::new();
        match grid.decode_to(&mut raw) {
            Ok(meta) => {
                log::trace!("grid decoded: version {}", meta.version.0);
                let corners = grid.bounds.map(|p| Point::new(p.x, p.y));
                return Ok((raw, corners));
            }
            Err(err) => {
                log::trace!("grid rejected: {err:?}");
                failure = failure.most_specific(err.into());
            }
        }
    }
    Err(failure)
}

impl BarcodeEngine for QrEngine {
    fn decode_formats(&self) -> FormatSet {
        BarcodeFormat::QrCode.into()
    }

    fn encode_formats(&self) -> FormatSet {
        BarcodeFormat::QrCode.into()
    }

    fn decode(
        &self,
        view: &PixelBufferView<'_>,
        hints: &Hints,
    ) -> Result<Detection, DecodeFailure> {
        if !hints.accepts(BarcodeFormat::QrCode) {
            log::debug!("no accepted format is supported, skipping scan");
            return Err(DecodeFailure::NotFound);
        }

        let original = view.to_luma();
        let mut inverted = None;
        let mut failure = DecodeFailure::NotFound;

        for (source, binarizer) in attempts(hints, view.width(), view.height()) {
            let (plane, zoom) = match source {
                Source::Original => (&original, 1),
                Source::Inverted => (&*inverted.get_or_insert_with(|| original.invert()), 1),
                Source::Upscaled => (&original, UPSCALE_ZOOM),
            };

            match scan(plane, binarizer, zoom) {
                Ok((raw, corners)) => {
                    log::debug!("QR symbol found ({source:?}, {binarizer})");
                    return Ok(Detection {
                        format: BarcodeFormat::QrCode,
                        raw,
                        corners,
                    });
                }
                Err(err) => {
                    log::trace!("attempt {source:?}/{binarizer} failed: {err}");
                    failure = failure.most_specific(err);
                }
            }
        }

        Err(failure)
    }

    fn encode(
        &self,
        text: &str,
        format: BarcodeFormat,
        options: &EncodeOptions,
    ) -> Result<SymbolMatrix> {
        if format != BarcodeFormat::QrCode {
            return Err(Error::UnsupportedFormat(format!(
                "{format} encoding is not supported"
            )));
        }

        let level = match options.ecc_level {
            EccLevel::L => EcLevel::L,
            EccLevel::M => EcLevel::M,
            EccLevel::Q => EcLevel::Q,
            EccLevel::H => EcLevel::H,
        };
        let code = QrCode::with_error_correction_level(text.as_bytes(), level).map_err(|err| {
            match err {
                QrError::DataTooLong => Error::UnsupportedFormat(format!(
                    "{} bytes exceed QR capacity at ECC level {:?}",
                    text.len(),
                    options.ecc_level
                )),
                other => Error::UnsupportedFormat(other.to_string()),
            }
        })?;

        let n = code.width();
        let modules = code
            .to_colors()
            .into_iter()
            .map(|c| c == Color::Dark)
            .collect();
        let symbol = SymbolMatrix::from_modules(n, n, modules);
        Ok(symbol.render(options.margin, options.width, options.height))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fast_mode_makes_one_attempt() {
        let hints = Hints::new().try_harder(false);
        assert_eq!(
            attempts(&hints, 640, 480),
            vec![(Source::Original, Binarizer::LocalAverage)]
        );
    }

    #[test]
    fn try_harder_attempt_order() {
        let hints = Hints::new();
        assert_eq!(
            attempts(&hints, 640, 480),
            vec![
                (Source::Original, Binarizer::LocalAverage),
                (Source::Original, Binarizer::GlobalHistogram),
                (Source::Inverted, Binarizer::LocalAverage),
            ]
        );
        let small = attempts(&hints, 120, 90);
        assert_eq!(small.last(), Some(&(Source::Upscaled, Binarizer::LocalAverage)));
    }

    #[test]
    fn rejected_formats_skip_scanning() {
        let data = vec![255u8; 64 * 64];
        let view = PixelBufferView::from_luma(&data, 64, 64).unwrap();
        let hints = Hints::new().accept(BarcodeFormat::Ean13);
        assert_eq!(
            QrEngine.decode(&view, &hints),
            Err(DecodeFailure::NotFound)
        );
    }

    fn natural_size_plane() -> LumaPlane {
        let image = crate::encode("HELLO", BarcodeFormat::QrCode, &EncodeOptions::new()).unwrap();
        assert_eq!((image.width, image.height), (29, 29));
        LumaPlane {
            width: image.width,
            height: image.height,
            data: image.pixels.into_vec(),
        }
    }

    #[test]
    fn single_pixel_modules_fail_as_data() {
        let plane = natural_size_plane();
        assert!(scan(&plane, Binarizer::LocalAverage, 1).is_err());
    }

    #[test]
    fn zoomed_mask_reads_single_pixel_modules() {
        let plane = natural_size_plane();
        let (raw, corners) = scan(&plane, Binarizer::LocalAverage, UPSCALE_ZOOM).unwrap();
        assert_eq!(raw, b"HELLO");
        // corners are reported in plane coordinates
        for p in corners {
            assert!((0..=29).contains(&p.x) && (0..=29).contains(&p.y), "{p:?}");
        }
    }

    #[test]
    fn fast_mode_on_single_pixel_modules_does_not_unwind() {
        let plane = natural_size_plane();
        let view = PixelBufferView::from_luma(&plane.data, plane.width, plane.height).unwrap();
        let outcome = QrEngine.decode(&view, &Hints::new().try_harder(false));
        assert!(outcome.is_err());
    }

    #[test]
    fn engine_rejects_other_symbologies() {
        let err = QrEngine
            .encode("123", BarcodeFormat::Code128, &EncodeOptions::new())
            .unwrap_err();
        assert!(matches!(err, Error::UnsupportedFormat(_)));
    }
}

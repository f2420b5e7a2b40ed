use std::ptr::{self, NonNull};

use libc::c_int;

use super::{non_negative, to_c_int};
use crate::binarize::Binarizer;
use crate::decode::{decode, DecodeResult};
use crate::engine::Point;
use crate::error::{Error, Status};
use crate::format::{BarcodeFormat, FormatSet};
use crate::hints::Hints;
use crate::view::{ChannelLayout, PixelBufferView};

/// Decode outcome as seen from C
///
/// `format` is the format bit identifier (0 when nothing was decoded).
/// `bytes` is null and `corners` are zero unless `status` is 0.
#[repr(C)]
#[derive(Debug)]
pub struct ZxDecodeResult {
    pub status: c_int,
    pub num_bits: c_int,
    pub format: c_int,
    pub bytes: *mut u8,
    pub bytes_size: c_int,
    /// x0, y0, x1, y1, x2, y2, x3, y3 from top-left clockwise
    pub corners: [c_int; 8],
}

/// Decode hints as seen from C
///
/// `binarizer`: 0 local average, 1 global histogram, 2 fixed `threshold`.
/// `formats` is a mask of format bits; 0 accepts everything.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct ZxDecodeHints {
    pub try_harder: c_int,
    pub binarizer: c_int,
    pub threshold: c_int,
    pub formats: u32,
}

impl TryFrom<&ZxDecodeHints> for Hints {
    type Error = Error;

    fn try_from(raw: &ZxDecodeHints) -> Result<Self, Error> {
        let binarizer = match raw.binarizer {
            0 => Binarizer::LocalAverage,
            1 => Binarizer::GlobalHistogram,
            2 => Binarizer::Threshold(
                u8::try_from(raw.threshold)
                    .map_err(|_| Error::InvalidOptions("threshold must be 0..=255"))?,
            ),
            _ => return Err(Error::InvalidOptions("unknown binarizer")),
        };
        Ok(Hints::new()
            .try_harder(raw.try_harder != 0)
            .binarizer(binarizer)
            .formats(FormatSet::from_bits_truncate(raw.formats)))
    }
}

impl ZxDecodeResult {
    fn from_result(result: DecodeResult) -> Self {
        let status = result.status();
        let format = result.format();
        let num_bits = result.num_bits();
        let corners = result.corners().copied();
        let payload = result.into_payload();

        let (Some(format), Some(payload), Some(corners)) = (format, payload, corners) else {
            return Self::failure(status);
        };
        let (Some(bytes_size), Ok(num_bits)) = (to_c_int(payload.len()), c_int::try_from(num_bits))
        else {
            log::warn!("payload of {} bytes does not fit the C record", payload.len());
            return Self::failure(Status::FormatError);
        };

        let mut flat = [0; 8];
        for (pair, point) in flat.chunks_exact_mut(2).zip(corners) {
            pair[0] = point.x;
            pair[1] = point.y;
        }

        Self {
            status: Status::Success.into(),
            num_bits,
            format: format.bits() as c_int,
            bytes: Box::into_raw(payload).cast::<u8>(),
            bytes_size,
            corners: flat,
        }
    }

    fn failure(status: Status) -> Self {
        Self {
            status: status.into(),
            num_bits: 0,
            format: 0,
            bytes: ptr::null_mut(),
            bytes_size: 0,
            corners: [0; 8],
        }
    }

    fn payload(&self) -> Option<&[u8]> {
        if self.bytes.is_null() {
            return None;
        }
        // SAFETY: non-null bytes always come from a boxed slice of
        // bytes_size elements owned by this record
        Some(unsafe { std::slice::from_raw_parts(self.bytes, self.bytes_size as usize) })
    }
}

/// Free a record and its payload
///
/// # Safety
///
/// `record` must come from [`Box::into_raw`] on a [`ZxDecodeResult`] built
/// by this module and must not be used afterwards.
unsafe fn free_record(record: *mut ZxDecodeResult) {
    let record = Box::from_raw(record);
    if !record.bytes.is_null() {
        let len = record.bytes_size as usize;
        drop(Box::from_raw(ptr::slice_from_raw_parts_mut(record.bytes, len)));
    }
}

/// Owned decode record
///
/// Move-only: the record is freed by [`DecodeHandle::release`] or on drop,
/// exactly once. A released handle cannot be used again:
///
/// ```compile_fail
/// use zedbridge::ffi::DecodeHandle;
/// use zedbridge::{DecodeResult, Status};
///
/// let handle = DecodeHandle::new(DecodeResult::failure(Status::NotFound));
/// handle.release();
/// handle.release();
/// ```
///
/// ```
/// use zedbridge::ffi::DecodeHandle;
/// use zedbridge::{DecodeResult, Status};
///
/// let handle = DecodeHandle::new(DecodeResult::failure(Status::NotFound));
/// assert_eq!(handle.status(), Status::NotFound);
/// assert!(handle.payload().is_none());
/// handle.release();
/// ```
#[derive(Debug)]
pub struct DecodeHandle(NonNull<ZxDecodeResult>);

// SAFETY: the handle exclusively owns its record and payload
unsafe impl Send for DecodeHandle {}

impl DecodeHandle {
    pub fn new(result: DecodeResult) -> Self {
        let record = Box::new(ZxDecodeResult::from_result(result));
        DecodeHandle(NonNull::from(Box::leak(record)))
    }

    /// Take ownership of a record returned through the C ABI
    ///
    /// # Safety
    ///
    /// `ptr` must be null or a record produced by [`zx_decode_barcode`] or
    /// [`zx_decode_barcode_with_hints`] that has not been released.
    pub unsafe fn from_raw(ptr: *mut ZxDecodeResult) -> Option<Self> {
        NonNull::new(ptr).map(DecodeHandle)
    }

    /// Give up ownership; the caller must release the record exactly once
    pub fn into_raw(self) -> *mut ZxDecodeResult {
        let ptr = self.0.as_ptr();
        std::mem::forget(self);
        ptr
    }

    pub fn record(&self) -> &ZxDecodeResult {
        // SAFETY: the record stays alive while the handle exists
        unsafe { self.0.as_ref() }
    }

    pub fn status(&self) -> Status {
        Status::try_from(self.record().status).unwrap_or(Status::FormatError)
    }

    pub fn format(&self) -> Option<BarcodeFormat> {
        BarcodeFormat::from_bits(self.record().format as u32)
    }

    pub fn payload(&self) -> Option<&[u8]> {
        self.record().payload()
    }

    pub fn text(&self) -> Option<&str> {
        self.payload().and_then(|p| std::str::from_utf8(p).ok())
    }

    pub fn corners(&self) -> Option<[Point; 4]> {
        let c = &self.record().corners;
        self.status().is_success().then(|| {
            [
                Point::new(c[0], c[1]),
                Point::new(c[2], c[3]),
                Point::new(c[4], c[5]),
                Point::new(c[6], c[7]),
            ]
        })
    }

    pub fn release(self) {
        drop(self);
    }
}

impl Drop for DecodeHandle {
    fn drop(&mut self) {
        // SAFETY: the record came from Box::into_raw and is owned by us
        unsafe { free_record(self.0.as_ptr()) }
    }
}

/// Validate the raw geometry and build a view over the caller's buffer
///
/// # Safety
///
/// `buffer` must be null or valid for reads of `buffer_len` bytes.
#[allow(clippy::too_many_arguments)]
unsafe fn view_from_raw<'a>(
    buffer: *const u8,
    buffer_len: usize,
    width: c_int,
    height: c_int,
    row_stride: c_int,
    pixel_stride: c_int,
    index_r: c_int,
    index_g: c_int,
    index_b: c_int,
) -> Result<PixelBufferView<'a>, Error> {
    if buffer.is_null() {
        return Err(Error::InvalidGeometry("null buffer"));
    }
    let dims = [width, height, row_stride, pixel_stride, index_r, index_g, index_b]
        .map(non_negative);
    let [Some(width), Some(height), Some(row_stride), Some(pixel_stride), Some(r), Some(g), Some(b)] =
        dims
    else {
        return Err(Error::InvalidGeometry("negative size, stride or channel index"));
    };

    let data = std::slice::from_raw_parts(buffer, buffer_len);
    PixelBufferView::new(
        data,
        width,
        height,
        row_stride,
        pixel_stride,
        ChannelLayout::from_indices(r, g, b),
    )
}

#[allow(clippy::too_many_arguments)]
unsafe fn decode_raw(
    out: *mut *mut ZxDecodeResult,
    buffer: *const u8,
    buffer_len: usize,
    width: c_int,
    height: c_int,
    row_stride: c_int,
    pixel_stride: c_int,
    index_r: c_int,
    index_g: c_int,
    index_b: c_int,
    hints: Result<Hints, Error>,
) -> c_int {
    if out.is_null() {
        log::warn!("zx_decode_barcode: null out pointer");
        return Status::InvalidGeometry.into();
    }
    *out = ptr::null_mut();

    let hints = match hints {
        Ok(hints) => hints,
        Err(err) => {
            log::warn!("zx_decode_barcode: {err}");
            return Status::from(&err).into();
        }
    };
    let view = match view_from_raw(
        buffer,
        buffer_len,
        width,
        height,
        row_stride,
        pixel_stride,
        index_r,
        index_g,
        index_b,
    ) {
        Ok(view) => view,
        Err(err) => {
            log::warn!("zx_decode_barcode: {err}");
            return Status::from(&err).into();
        }
    };

    publish(out, decode(&view, &hints))
}

/// Marshal `result` into `*out` and return the status the record carries
///
/// Marshalling can downgrade a success (payload too large for the record),
/// so the returned code is read back from the record itself.
///
/// # Safety
///
/// `out` must be valid for writes.
unsafe fn publish(out: *mut *mut ZxDecodeResult, result: DecodeResult) -> c_int {
    let handle = DecodeHandle::new(result);
    let status = handle.record().status;
    *out = handle.into_raw();
    status
}

/// Decode one symbol from a caller-owned pixel buffer with default hints
///
/// Returns the status code. For detection outcomes (0..=3) a record is
/// written to `*out` and must be passed to [`zx_release_decode_result`].
/// Otherwise `*out` is set to null.
///
/// # Safety
///
/// `out` must be null or valid for a pointer write. `buffer` must be null or
/// valid for reads of `buffer_len` bytes for the duration of the call.
#[no_mangle]
#[allow(clippy::too_many_arguments)]
pub unsafe extern "C" fn zx_decode_barcode(
    out: *mut *mut ZxDecodeResult,
    buffer: *const u8,
    buffer_len: usize,
    width: c_int,
    height: c_int,
    row_stride: c_int,
    pixel_stride: c_int,
    index_r: c_int,
    index_g: c_int,
    index_b: c_int,
) -> c_int {
    decode_raw(
        out,
        buffer,
        buffer_len,
        width,
        height,
        row_stride,
        pixel_stride,
        index_r,
        index_g,
        index_b,
        Ok(Hints::default()),
    )
}

/// [`zx_decode_barcode`] with explicit hints; null `hints` means defaults
///
/// # Safety
///
/// As for [`zx_decode_barcode`]; `hints` must be null or point to a valid
/// [`ZxDecodeHints`].
#[no_mangle]
#[allow(clippy::too_many_arguments)]
pub unsafe extern "C" fn zx_decode_barcode_with_hints(
    out: *mut *mut ZxDecodeResult,
    buffer: *const u8,
    buffer_len: usize,
    width: c_int,
    height: c_int,
    row_stride: c_int,
    pixel_stride: c_int,
    index_r: c_int,
    index_g: c_int,
    index_b: c_int,
    hints: *const ZxDecodeHints,
) -> c_int {
    let hints = match hints.as_ref() {
        Some(raw) => Hints::try_from(raw),
        None => Ok(Hints::default()),
    };
    decode_raw(
        out,
        buffer,
        buffer_len,
        width,
        height,
        row_stride,
        pixel_stride,
        index_r,
        index_g,
        index_b,
        hints,
    )
}

/// Free a record returned by the decode functions; null is ignored
///
/// # Safety
///
/// `result` must be null or a record from [`zx_decode_barcode`] /
/// [`zx_decode_barcode_with_hints`] that has not been released yet. The
/// record must not be used afterwards.
#[no_mangle]
pub unsafe extern "C" fn zx_release_decode_result(result: *mut ZxDecodeResult) {
    drop(DecodeHandle::from_raw(result));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hints_from_c() {
        let raw = ZxDecodeHints {
            try_harder: 0,
            binarizer: 2,
            threshold: 100,
            formats: BarcodeFormat::QrCode.bits() | (1 << 30),
        };
        let hints = Hints::try_from(&raw).unwrap();
        assert!(!hints.is_try_harder());
        assert_eq!(hints.selected_binarizer(), Binarizer::Threshold(100));
        assert_eq!(hints.accepted_formats().bits(), BarcodeFormat::QrCode.bits());

        let bad = ZxDecodeHints {
            binarizer: 7,
            ..raw
        };
        assert!(matches!(Hints::try_from(&bad), Err(Error::InvalidOptions(_))));
        let bad = ZxDecodeHints {
            threshold: 300,
            ..raw
        };
        assert!(matches!(Hints::try_from(&bad), Err(Error::InvalidOptions(_))));
    }

    #[test]
    fn oversized_payload_status_matches_record() {
        // num_bits no longer fits a c_int; zeroed pages are never touched
        let payload = vec![0u8; (1 << 28) + 1].into_boxed_slice();
        let result = DecodeResult::success(BarcodeFormat::QrCode, payload, [Point::new(0, 0); 4]);
        let mut out = ptr::null_mut();
        let status = unsafe { publish(&mut out, result) };
        assert_eq!(status, Status::FormatError as c_int);
        let handle = unsafe { DecodeHandle::from_raw(out) }.unwrap();
        assert_eq!(handle.record().status, status);
        assert!(handle.record().bytes.is_null());
        assert_eq!(handle.payload(), None);
    }

    #[test]
    fn success_record_layout() {
        let corners = [
            Point::new(1, 2),
            Point::new(3, 4),
            Point::new(5, 6),
            Point::new(7, 8),
        ];
        let handle = DecodeHandle::new(DecodeResult::success(
            BarcodeFormat::QrCode,
            b"HELLO"[..].into(),
            corners,
        ));
        let record = handle.record();
        assert_eq!(record.status, 0);
        assert_eq!(record.num_bits, 40);
        assert_eq!(record.format, 1 << 11);
        assert_eq!(record.bytes_size, 5);
        assert_eq!(record.corners, [1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(handle.text(), Some("HELLO"));
        assert_eq!(handle.corners(), Some(corners));
        assert_eq!(handle.format(), Some(BarcodeFormat::QrCode));
    }

    #[test]
    fn failure_record_is_empty() {
        let handle = DecodeHandle::new(DecodeResult::failure(Status::ChecksumError));
        let record = handle.record();
        assert_eq!(record.status, 3);
        assert!(record.bytes.is_null());
        assert_eq!(record.corners, [0; 8]);
        assert_eq!(handle.format(), None);
        assert_eq!(handle.corners(), None);
    }

    #[test]
    fn raw_round_trip_through_release() {
        let ptr = DecodeHandle::new(DecodeResult::success(
            BarcodeFormat::QrCode,
            b"x"[..].into(),
            [Point::default(); 4],
        ))
        .into_raw();
        assert!(!ptr.is_null());
        unsafe { zx_release_decode_result(ptr) };
        unsafe { zx_release_decode_result(ptr::null_mut()) };
    }

    #[test]
    fn null_out_and_buffer() {
        let data = [255u8; 16];
        let status = unsafe {
            zx_decode_barcode(ptr::null_mut(), data.as_ptr(), 16, 4, 4, 4, 1, 0, 0, 0)
        };
        assert_eq!(status, Status::InvalidGeometry as c_int);

        let mut out = ptr::NonNull::<ZxDecodeResult>::dangling().as_ptr();
        let status = unsafe { zx_decode_barcode(&mut out, ptr::null(), 16, 4, 4, 4, 1, 0, 0, 0) };
        assert_eq!(status, Status::InvalidGeometry as c_int);
        assert!(out.is_null());
    }
}

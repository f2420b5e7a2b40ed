use std::alloc::{handle_alloc_error, Layout};
use std::ptr::{self, NonNull};

use libc::c_int;

use super::{non_negative, to_c_int};
use crate::encode::{encode_request, EncodedImage};
use crate::error::{Error, Status};
use crate::format::BarcodeFormat;

/// Encoded greyscale raster as seen from C
///
/// `data` holds `size == width * height` bytes (0 dark, 255 light) and is
/// freed with [`zx_release_encode_buffer`].
#[repr(C)]
#[derive(Debug)]
pub struct ZxEncodedBuffer {
    pub data: *mut u8,
    pub size: usize,
    pub width: c_int,
    pub height: c_int,
}

impl ZxEncodedBuffer {
    fn zeroed() -> Self {
        Self {
            data: ptr::null_mut(),
            size: 0,
            width: 0,
            height: 0,
        }
    }
}

/// Owned `malloc` allocation holding an encoded raster
///
/// Freed exactly once on drop.
#[derive(Debug)]
pub struct EncodedBuffer {
    data: NonNull<u8>,
    size: usize,
    width: usize,
    height: usize,
}

// SAFETY: the buffer exclusively owns its allocation
unsafe impl Send for EncodedBuffer {}

impl EncodedBuffer {
    /// Copy an image into a fresh `malloc` allocation
    pub fn from_image(image: &EncodedImage) -> Self {
        let size = image.size();
        // SAFETY: malloc of at least one byte; a null return is handled
        let raw = unsafe { libc::malloc(size.max(1)) }.cast::<u8>();
        let Some(data) = NonNull::new(raw) else {
            handle_alloc_error(Layout::array::<u8>(size.max(1)).unwrap_or(Layout::new::<u8>()));
        };
        // SAFETY: data has room for size bytes and does not overlap pixels
        unsafe { ptr::copy_nonoverlapping(image.pixels.as_ptr(), data.as_ptr(), size) };
        Self {
            data,
            size,
            width: image.width,
            height: image.height,
        }
    }

    /// Take ownership of a buffer filled by [`zx_encode_barcode`]
    ///
    /// Returns `None` for a zeroed (failed) buffer. A non-null buffer with
    /// a negative width or height is freed and also yields `None`.
    ///
    /// # Safety
    ///
    /// `raw.data` must be null or an allocation from [`zx_encode_barcode`]
    /// holding `raw.size` bytes that has not been released.
    pub unsafe fn from_raw(raw: ZxEncodedBuffer) -> Option<Self> {
        let data = NonNull::new(raw.data)?;
        let (Some(width), Some(height)) = (non_negative(raw.width), non_negative(raw.height)) else {
            log::warn!("encoded buffer with {}x{} dimensions, freeing", raw.width, raw.height);
            libc::free(data.as_ptr().cast());
            return None;
        };
        Some(Self {
            data,
            size: raw.size,
            width,
            height,
        })
    }

    /// Give up ownership; release with [`zx_release_encode_buffer`]
    pub fn into_raw(self) -> ZxEncodedBuffer {
        let raw = ZxEncodedBuffer {
            data: self.data.as_ptr(),
            size: self.size,
            width: to_c_int(self.width).unwrap_or(c_int::MAX),
            height: to_c_int(self.height).unwrap_or(c_int::MAX),
        };
        std::mem::forget(self);
        raw
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn as_slice(&self) -> &[u8] {
        // SAFETY: data holds size initialized bytes for our lifetime
        unsafe { std::slice::from_raw_parts(self.data.as_ptr(), self.size) }
    }
}

impl Drop for EncodedBuffer {
    fn drop(&mut self) {
        // SAFETY: data came from libc::malloc and is owned by us
        unsafe { libc::free(self.data.as_ptr().cast()) }
    }
}

/// Validate the raw arguments and run the encode
///
/// # Safety
///
/// `text` must be null or valid for reads of `text_len` bytes.
unsafe fn encode_raw(
    text: *const u8,
    text_len: usize,
    format: c_int,
    width: c_int,
    height: c_int,
    margin: c_int,
    ecc_level: c_int,
) -> Result<EncodedBuffer, Error> {
    let bytes: &[u8] = if text.is_null() {
        if text_len != 0 {
            return Err(Error::InvalidOptions("null text with non-zero length"));
        }
        &[]
    } else {
        std::slice::from_raw_parts(text, text_len)
    };
    let text =
        std::str::from_utf8(bytes).map_err(|_| Error::InvalidOptions("text is not UTF-8"))?;

    let [Some(width), Some(height), Some(margin), Some(ecc_level)] =
        [width, height, margin, ecc_level].map(non_negative)
    else {
        return Err(Error::InvalidOptions("negative size, margin or ecc level"));
    };
    let format = u32::try_from(format)
        .ok()
        .and_then(BarcodeFormat::from_bits)
        .ok_or_else(|| Error::UnsupportedFormat(format!("unknown format id {format}")))?;
    let ecc_level =
        u32::try_from(ecc_level).map_err(|_| Error::InvalidOptions("ecc level must be 0..=3"))?;

    let matrix = encode_request(text, format, width, height, margin, ecc_level)?;
    Ok(EncodedBuffer::from_image(&EncodedImage::from_matrix(&matrix)))
}

/// Render `text` as a barcode into a freshly allocated greyscale buffer
///
/// Returns the status code. On success `*out` describes a buffer that must
/// be passed to [`zx_release_encode_buffer`]; on failure `*out` is zeroed
/// and nothing is allocated.
///
/// # Safety
///
/// `text` must be null or valid for reads of `text_len` bytes. `out` must be
/// null or valid for writes.
#[no_mangle]
pub unsafe extern "C" fn zx_encode_barcode(
    text: *const u8,
    text_len: usize,
    format: c_int,
    width: c_int,
    height: c_int,
    margin: c_int,
    ecc_level: c_int,
    out: *mut ZxEncodedBuffer,
) -> c_int {
    if out.is_null() {
        log::warn!("zx_encode_barcode: null out pointer");
        return Status::InvalidOptions.into();
    }
    *out = ZxEncodedBuffer::zeroed();

    match encode_raw(text, text_len, format, width, height, margin, ecc_level) {
        Ok(buffer) => {
            *out = buffer.into_raw();
            Status::Success.into()
        }
        Err(err) => {
            log::warn!("zx_encode_barcode: {err}");
            Status::from(&err).into()
        }
    }
}

/// Free a buffer returned by [`zx_encode_barcode`]; null is ignored
///
/// # Safety
///
/// `buffer` must be null or the `data` of a [`ZxEncodedBuffer`] filled by
/// [`zx_encode_barcode`] that has not been released yet.
#[no_mangle]
pub unsafe extern "C" fn zx_release_encode_buffer(buffer: *mut u8) {
    if !buffer.is_null() {
        libc::free(buffer.cast());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const QR: c_int = 1 << 11;

    fn encode_c(text: &[u8], format: c_int, margin: c_int, ecc: c_int) -> (c_int, ZxEncodedBuffer) {
        let mut out = ZxEncodedBuffer {
            data: NonNull::dangling().as_ptr(),
            size: 7,
            width: 7,
            height: 7,
        };
        let status = unsafe {
            zx_encode_barcode(text.as_ptr(), text.len(), format, 0, 0, margin, ecc, &mut out)
        };
        (status, out)
    }

    #[test]
    fn encodes_natural_size() {
        let (status, out) = encode_c(b"HELLO", QR, 4, 0);
        assert_eq!(status, 0);
        assert_eq!((out.width, out.height, out.size), (29, 29, 29 * 29));
        let buffer = unsafe { EncodedBuffer::from_raw(out) }.unwrap();
        assert_eq!(buffer.as_slice()[0], 255);
        assert_eq!(buffer.as_slice()[4 * 29 + 4], 0);
    }

    #[test]
    fn failures_zero_the_output() {
        for (status, out) in [
            encode_c(b"HELLO", QR, -1, 0),
            encode_c(b"HELLO", QR, 4, 4),
            encode_c(b"\xFF\xFE", QR, 4, 0),
        ] {
            assert_eq!(status, Status::InvalidOptions as c_int);
            assert!(out.data.is_null());
            assert_eq!((out.size, out.width, out.height), (0, 0, 0));
        }

        let (status, out) = encode_c(b"HELLO", 1 << 7, 4, 0);
        assert_eq!(status, Status::UnsupportedFormat as c_int);
        assert!(out.data.is_null());
        let (status, _) = encode_c(b"HELLO", 3, 4, 0);
        assert_eq!(status, Status::UnsupportedFormat as c_int);
    }

    #[test]
    fn null_text() {
        let mut out = ZxEncodedBuffer::zeroed();
        let status = unsafe { zx_encode_barcode(ptr::null(), 3, QR, 0, 0, 4, 0, &mut out) };
        assert_eq!(status, Status::InvalidOptions as c_int);
        let status = unsafe { zx_encode_barcode(ptr::null(), 0, QR, 0, 0, 4, 0, ptr::null_mut()) };
        assert_eq!(status, Status::InvalidOptions as c_int);
    }

    #[test]
    fn negative_dimensions_are_rejected() {
        let (status, mut out) = encode_c(b"HELLO", QR, 4, 0);
        assert_eq!(status, 0);
        out.height = -1;
        // the allocation is released here rather than leaked
        assert!(unsafe { EncodedBuffer::from_raw(out) }.is_none());
        assert!(unsafe { EncodedBuffer::from_raw(ZxEncodedBuffer::zeroed()) }.is_none());
    }

    #[test]
    fn release_null_is_noop() {
        unsafe { zx_release_encode_buffer(ptr::null_mut()) };
    }
}

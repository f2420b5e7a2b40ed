//! Invalid input at the C boundary is rejected before anything is allocated

use std::mem::{align_of, size_of};
use std::ptr;

use zedbridge::ffi::{self, ZxDecodeHints, ZxDecodeResult, ZxEncodedBuffer};
use zedbridge::Status;

const QR: i32 = 1 << 11;

/// Decode with the given geometry; returns the status and whether a record
/// was handed back (releasing it)
#[allow(clippy::too_many_arguments)]
fn decode_status(
    buffer: &[u8],
    buffer_len: usize,
    width: i32,
    height: i32,
    row_stride: i32,
    pixel_stride: i32,
    rgb: (i32, i32, i32),
    hints: Option<&ZxDecodeHints>,
) -> (i32, bool) {
    // poison the out slot so a missing write is visible
    let mut out: *mut ZxDecodeResult = ptr::NonNull::dangling().as_ptr();
    let status = unsafe {
        ffi::zx_decode_barcode_with_hints(
            &mut out,
            buffer.as_ptr(),
            buffer_len,
            width,
            height,
            row_stride,
            pixel_stride,
            rgb.0,
            rgb.1,
            rgb.2,
            hints.map_or(ptr::null(), |h| h as *const _),
        )
    };
    let allocated = !out.is_null();
    if allocated {
        unsafe { ffi::zx_release_decode_result(out) };
    }
    (status, allocated)
}

#[test]
fn test_invalid_geometry() {
    let buffer = vec![255u8; 64 * 64 * 3];
    let len = buffer.len();
    let rgb = (0, 1, 2);
    let invalid = Status::InvalidGeometry as i32;

    let cases = [
        ("zero width", 0, 64, 192, 3, rgb, len),
        ("zero height", 64, 0, 192, 3, rgb, len),
        ("negative width", -64, 64, 192, 3, rgb, len),
        ("negative stride", 64, 64, -192, 3, rgb, len),
        ("row stride too small", 64, 64, 191, 3, rgb, len),
        ("pixel stride too small", 64, 64, 192, 2, rgb, len),
        ("channel index past pixel", 64, 64, 256, 4, (0, 1, 4), len),
        ("negative channel index", 64, 64, 192, 3, (-1, 1, 2), len),
        ("short buffer", 64, 64, 192, 3, rgb, len - 1),
    ];
    for (name, w, h, row_stride, pixel_stride, rgb, buffer_len) in cases {
        let (status, allocated) =
            decode_status(&buffer, buffer_len, w, h, row_stride, pixel_stride, rgb, None);
        assert_eq!(status, invalid, "{name}");
        assert!(!allocated, "{name} allocated a record");
    }
}

#[test]
fn test_minimal_buffer_is_accepted() {
    // last row needs only width * pixel_stride bytes, not a full row stride
    let buffer = vec![255u8; 9 * 100 + 30 * 3];
    let (status, allocated) =
        decode_status(&buffer, buffer.len(), 30, 10, 100, 3, (2, 1, 0), None);
    assert_eq!(status, Status::NotFound as i32);
    assert!(allocated);
}

#[test]
fn test_invalid_hints() {
    let buffer = vec![255u8; 32 * 32];
    let hints = ZxDecodeHints {
        try_harder: 1,
        binarizer: 9,
        threshold: 0,
        formats: 0,
    };
    let (status, allocated) =
        decode_status(&buffer, buffer.len(), 32, 32, 32, 1, (0, 0, 0), Some(&hints));
    assert_eq!(status, Status::InvalidOptions as i32);
    assert!(!allocated);

    let hints = ZxDecodeHints {
        binarizer: 2,
        threshold: -1,
        ..hints
    };
    let (status, _) = decode_status(&buffer, buffer.len(), 32, 32, 32, 1, (0, 0, 0), Some(&hints));
    assert_eq!(status, Status::InvalidOptions as i32);
}

#[test]
fn test_hints_format_filter() {
    let buffer = vec![255u8; 32 * 32];
    let hints = ZxDecodeHints {
        try_harder: 0,
        binarizer: 1,
        threshold: 0,
        formats: 1 << 7,
    };
    let (status, allocated) =
        decode_status(&buffer, buffer.len(), 32, 32, 32, 1, (0, 0, 0), Some(&hints));
    assert_eq!(status, Status::NotFound as i32);
    assert!(allocated);
}

#[test]
fn test_null_hints_use_defaults() {
    let buffer = vec![255u8; 32 * 32];
    let (status, allocated) = decode_status(&buffer, buffer.len(), 32, 32, 32, 1, (0, 0, 0), None);
    assert_eq!(status, Status::NotFound as i32);
    assert!(allocated);
}

fn encode_status(text: &[u8], format: i32, width: i32, height: i32, margin: i32, ecc: i32) -> i32 {
    let mut out = ZxEncodedBuffer {
        data: ptr::null_mut(),
        size: 0,
        width: 0,
        height: 0,
    };
    let status = unsafe {
        ffi::zx_encode_barcode(
            text.as_ptr(),
            text.len(),
            format,
            width,
            height,
            margin,
            ecc,
            &mut out,
        )
    };
    if status == 0 {
        assert!(!out.data.is_null());
        assert_eq!(out.size, (out.width * out.height) as usize);
        unsafe { ffi::zx_release_encode_buffer(out.data) };
    } else {
        assert!(out.data.is_null());
        assert_eq!(out.size, 0);
    }
    status
}

#[test]
fn test_encode_argument_validation() {
    let options = Status::InvalidOptions as i32;
    let unsupported = Status::UnsupportedFormat as i32;

    assert_eq!(encode_status(b"HELLO", QR, 0, 0, 4, 0), 0);
    assert_eq!(encode_status(b"HELLO", QR, 300, 100, 0, 3), 0);
    assert_eq!(encode_status(b"", QR, 0, 0, 4, 0), 0);

    assert_eq!(encode_status(b"HELLO", QR, -1, 0, 4, 0), options);
    assert_eq!(encode_status(b"HELLO", QR, 0, -1, 4, 0), options);
    assert_eq!(encode_status(b"HELLO", QR, 0, 0, -4, 0), options);
    assert_eq!(encode_status(b"HELLO", QR, 0, 0, 4, -1), options);
    assert_eq!(encode_status(b"HELLO", QR, 0, 0, 4, 4), options);
    assert_eq!(encode_status(b"HELLO", QR, 0, 0, 65, 0), options);
    assert_eq!(encode_status(b"HELLO", QR, 20000, 0, 4, 0), options);
    assert_eq!(encode_status(b"\xC3\x28", QR, 0, 0, 4, 0), options);

    assert_eq!(encode_status(b"HELLO", 0, 0, 0, 4, 0), unsupported);
    assert_eq!(encode_status(b"HELLO", -1, 0, 0, 4, 0), unsupported);
    assert_eq!(encode_status(b"HELLO", 1 << 20, 0, 0, 4, 0), unsupported);
    assert_eq!(encode_status(b"12345670", 1 << 6, 0, 0, 4, 0), unsupported);
}

#[test]
fn test_release_null_is_noop() {
    unsafe {
        ffi::zx_release_decode_result(ptr::null_mut());
        ffi::zx_release_encode_buffer(ptr::null_mut());
    }
}

#[test]
#[cfg(target_pointer_width = "64")]
fn test_record_layout() {
    // Verify struct sizes match the C headers
    assert_eq!(size_of::<ZxDecodeHints>(), 16, "ZxDecodeHints size mismatch");
    assert_eq!(size_of::<ZxDecodeResult>(), 64, "ZxDecodeResult size mismatch");
    assert_eq!(align_of::<ZxDecodeResult>(), 8, "ZxDecodeResult align mismatch");
    assert_eq!(size_of::<ZxEncodedBuffer>(), 24, "ZxEncodedBuffer size mismatch");
}

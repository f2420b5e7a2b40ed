//! C ABI
//!
//! Flat `extern "C"` entry points over [`crate::decode`] and
//! [`crate::encode`]. Records handed to C are owned by the caller until they
//! are passed back to the matching release function exactly once.
//!
//! Rust callers that go through these records should hold them as
//! [`DecodeHandle`] and [`EncodedBuffer`], which release on drop and cannot
//! be released twice.

use libc::c_int;

mod decode;
mod encode;

pub use decode::{
    zx_decode_barcode, zx_decode_barcode_with_hints, zx_release_decode_result, DecodeHandle,
    ZxDecodeHints, ZxDecodeResult,
};
pub use encode::{zx_encode_barcode, zx_release_encode_buffer, EncodedBuffer, ZxEncodedBuffer};

/// Library version packed as `(major << 24) | (minor << 16) | (patch << 8)`
#[no_mangle]
pub extern "C" fn zx_version() -> u32 {
    let part = |s: &str| s.parse::<u32>().unwrap_or(0) & 0xFF;
    (part(env!("CARGO_PKG_VERSION_MAJOR")) << 24)
        | (part(env!("CARGO_PKG_VERSION_MINOR")) << 16)
        | (part(env!("CARGO_PKG_VERSION_PATCH")) << 8)
}

/// Non-negative C integer as `usize`
fn non_negative(value: c_int) -> Option<usize> {
    usize::try_from(value).ok()
}

/// `usize` as `c_int`, if it fits
fn to_c_int(value: usize) -> Option<c_int> {
    c_int::try_from(value).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_packing() {
        let v = zx_version();
        assert_eq!(v & 0xFF, 0);
        assert_eq!(v >> 24, env!("CARGO_PKG_VERSION_MAJOR").parse::<u32>().unwrap());
        assert_eq!(
            (v >> 16) & 0xFF,
            env!("CARGO_PKG_VERSION_MINOR").parse::<u32>().unwrap()
        );
    }

    #[test]
    fn negative_values_are_rejected() {
        assert_eq!(non_negative(-1), None);
        assert_eq!(non_negative(0), Some(0));
        assert_eq!(to_c_int(usize::MAX), None);
    }
}

//! Payload text normalization
//!
//! Symbols carry bytes, not text. Most payloads are ASCII or UTF-8, but
//! older QR encoders default to Shift-JIS or Latin-1 without an ECI marker,
//! so the charset has to be guessed. Results always leave this module as
//! UTF-8.

use encoding_rs::{Encoding, BIG5, SHIFT_JIS, WINDOWS_1252};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

fn text_is_ascii(text: &[u8]) -> bool {
    text.iter().all(|&c| c < 0x80)
}

fn text_is_latin1(text: &[u8]) -> bool {
    text.iter().all(|&c| !(0x80..0xA0).contains(&c))
}

fn text_is_big5(text: &[u8]) -> bool {
    let mut i = 0;
    while i < text.len() {
        if text[i] == 0xFF {
            return false;
        } else if text[i] >= 0x80 {
            i += 1;
            if i >= text.len() {
                return false;
            }
            if text[i] < 0x40 || (text[i] > 0x7E && text[i] < 0xA1) || text[i] > 0xFE {
                return false;
            }
        }
        i += 1;
    }
    true
}

fn decode_strict(enc: &'static Encoding, bytes: &[u8]) -> Option<String> {
    let (res, _enc, had_errors) = enc.decode(bytes);
    (!had_errors).then(|| res.into_owned())
}

/// Convert raw payload bytes to UTF-8
///
/// Order: UTF-8 with BOM, ASCII, strict UTF-8, Shift-JIS, Big5, then
/// Windows-1252. Windows-1252 accepts any input, so it goes last, and C1
/// control bytes (0x80..0xA0) are taken as a sign that it is the wrong
/// guess; lossy UTF-8 is used in that case.
pub fn to_utf8(bytes: &[u8]) -> String {
    if let Some(rest) = bytes.strip_prefix(UTF8_BOM) {
        if let Ok(text) = std::str::from_utf8(rest) {
            return text.to_owned();
        }
    }
    if text_is_ascii(bytes) {
        // ASCII is valid UTF-8
        return String::from_utf8_lossy(bytes).into_owned();
    }
    if let Ok(text) = std::str::from_utf8(bytes) {
        return text.to_owned();
    }

    if let Some(text) = decode_strict(SHIFT_JIS, bytes) {
        log::trace!("payload decoded as Shift_JIS");
        return text;
    }
    if text_is_big5(bytes) {
        if let Some(text) = decode_strict(BIG5, bytes) {
            log::trace!("payload decoded as Big5");
            return text;
        }
    }
    if text_is_latin1(bytes) {
        if let Some(text) = decode_strict(WINDOWS_1252, bytes) {
            log::trace!("payload decoded as windows-1252");
            return text;
        }
    }

    log::debug!("payload charset not recognized, replacing invalid sequences");
    String::from_utf8_lossy(bytes).into_owned()
}

//! Error and status types
//!
//! Construction problems (bad geometry, bad options) are [`Error`]s and are
//! reported before anything is allocated. Detection outcomes are [`Status`]
//! values stored inside a complete result record, since "nothing found" is
//! the common case for a camera frame.

use std::fmt;

use libc::c_int;

/// Caller errors detected while building a decode or encode request
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// Width/height/stride/layout do not describe a readable buffer
    #[error("invalid buffer geometry: {0}")]
    InvalidGeometry(&'static str),
    /// The symbology cannot encode this payload (or is not supported at all)
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),
    /// Margin, ECC level, size or hint values out of the accepted range
    #[error("invalid options: {0}")]
    InvalidOptions(&'static str),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Status code shared by the Rust and C surfaces
///
/// The numeric values are part of the ABI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum Status {
    Success = 0,
    NotFound = 1,
    FormatError = 2,
    ChecksumError = 3,
    InvalidGeometry = 4,
    UnsupportedFormat = 5,
    InvalidOptions = 6,
}

impl Status {
    pub fn is_success(self) -> bool {
        self == Status::Success
    }

    /// Outcomes that the engine reports as data rather than as an [`Error`]
    pub fn is_detection_outcome(self) -> bool {
        matches!(
            self,
            Status::Success | Status::NotFound | Status::FormatError | Status::ChecksumError
        )
    }

    /// Rank used when several attempts failed differently
    pub(crate) fn specificity(self) -> u8 {
        match self {
            Status::ChecksumError => 2,
            Status::FormatError => 1,
            _ => 0,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Success => "success",
            Self::NotFound => "no barcode found",
            Self::FormatError => "barcode structure is invalid",
            Self::ChecksumError => "error correction failed",
            Self::InvalidGeometry => "invalid buffer geometry",
            Self::UnsupportedFormat => "unsupported format",
            Self::InvalidOptions => "invalid options",
        };
        f.write_str(text)
    }
}

impl From<&Error> for Status {
    fn from(err: &Error) -> Self {
        match err {
            Error::InvalidGeometry(_) => Status::InvalidGeometry,
            Error::UnsupportedFormat(_) => Status::UnsupportedFormat,
            Error::InvalidOptions(_) => Status::InvalidOptions,
        }
    }
}

impl From<Status> for c_int {
    fn from(value: Status) -> Self {
        value as c_int
    }
}

impl TryFrom<c_int> for Status {
    type Error = c_int;

    fn try_from(value: c_int) -> std::result::Result<Self, c_int> {
        Ok(match value {
            0 => Self::Success,
            1 => Self::NotFound,
            2 => Self::FormatError,
            3 => Self::ChecksumError,
            4 => Self::InvalidGeometry,
            5 => Self::UnsupportedFormat,
            6 => Self::InvalidOptions,
            other => return Err(other),
        })
    }
}

//! Per-call decode configuration
//!
//! [`Hints`] is a plain value passed with every decode; there are no
//! process-wide defaults to mutate.
//!
//! # Examples
//!
//! ```
//! use zedbridge::{BarcodeFormat, Binarizer, Hints};
//!
//! let hints = Hints::new()
//!     .try_harder(false)
//!     .binarizer(Binarizer::GlobalHistogram)
//!     .accept(BarcodeFormat::QrCode);
//!
//! assert!(!hints.is_try_harder());
//! assert!(hints.accepts(BarcodeFormat::QrCode));
//! assert!(!hints.accepts(BarcodeFormat::Ean13));
//! ```

use crate::binarize::Binarizer;
use crate::format::{BarcodeFormat, FormatSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hints {
    pub(crate) try_harder: bool,
    pub(crate) binarizer: Binarizer,
    pub(crate) formats: FormatSet,
}

impl Default for Hints {
    fn default() -> Self {
        Self::new()
    }
}

impl Hints {
    /// Defaults favour decode success over latency:
    /// - try-harder is enabled
    /// - local-average binarization
    /// - every format the engine supports is accepted
    pub fn new() -> Self {
        Self {
            try_harder: true,
            binarizer: Binarizer::LocalAverage,
            formats: FormatSet::EMPTY,
        }
    }

    /// Exhaustive search (fallback binarizers, inverted and upscaled
    /// frames) versus a single fast attempt
    pub fn try_harder(mut self, enabled: bool) -> Self {
        self.try_harder = enabled;
        self
    }

    /// Binarizer for the first attempt
    pub fn binarizer(mut self, binarizer: Binarizer) -> Self {
        self.binarizer = binarizer;
        self
    }

    /// Add a format to the accepted set
    ///
    /// The first call narrows the default "everything" down to `format`.
    pub fn accept(mut self, format: BarcodeFormat) -> Self {
        self.formats.insert(format.into());
        self
    }

    /// Replace the accepted set; an empty set accepts everything
    pub fn formats(mut self, formats: FormatSet) -> Self {
        self.formats = formats;
        self
    }

    pub fn is_try_harder(&self) -> bool {
        self.try_harder
    }

    pub fn selected_binarizer(&self) -> Binarizer {
        self.binarizer
    }

    pub fn accepted_formats(&self) -> FormatSet {
        self.formats
    }

    pub fn accepts(&self, format: BarcodeFormat) -> bool {
        self.formats.accepts(format)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_hints() {
        let hints = Hints::default();
        assert!(hints.is_try_harder());
        assert_eq!(hints.selected_binarizer(), Binarizer::LocalAverage);
        assert!(hints.accepted_formats().is_empty());
        assert!(hints.accepts(BarcodeFormat::Code128));
    }

    #[test]
    fn test_builder_pattern() {
        let hints = Hints::new()
            .try_harder(false)
            .binarizer(Binarizer::Threshold(90))
            .accept(BarcodeFormat::QrCode)
            .accept(BarcodeFormat::Ean13);

        assert!(!hints.is_try_harder());
        assert_eq!(hints.selected_binarizer(), Binarizer::Threshold(90));
        assert_eq!(hints.accepted_formats().formats().count(), 2);
        assert!(!hints.accepts(BarcodeFormat::Code39));
    }

    #[test]
    fn test_replace_formats() {
        let hints = Hints::new()
            .accept(BarcodeFormat::QrCode)
            .formats(FormatSet::EMPTY);
        assert!(hints.accepts(BarcodeFormat::Aztec));
    }
}

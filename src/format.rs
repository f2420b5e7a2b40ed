//! Symbology identifiers
//!
//! Each format has a fixed bit identifier that is used unchanged at the C
//! boundary, both for reporting a single detected format and for building
//! a [`FormatSet`] mask of accepted formats.

use std::fmt::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BarcodeFormat {
    Aztec = 1 << 0,
    Codabar = 1 << 1,
    Code39 = 1 << 2,
    Code93 = 1 << 3,
    Code128 = 1 << 4,
    DataMatrix = 1 << 5,
    Ean8 = 1 << 6,
    Ean13 = 1 << 7,
    Itf = 1 << 8,
    MaxiCode = 1 << 9,
    Pdf417 = 1 << 10,
    QrCode = 1 << 11,
    Rss14 = 1 << 12,
    RssExpanded = 1 << 13,
    UpcA = 1 << 14,
    UpcE = 1 << 15,
    /// UPC/EAN add-on; never a stand-alone symbol
    UpcEanExtension = 1 << 16,
}

impl BarcodeFormat {
    pub const ALL: [Self; 17] = [
        BarcodeFormat::Aztec,
        BarcodeFormat::Codabar,
        BarcodeFormat::Code39,
        BarcodeFormat::Code93,
        BarcodeFormat::Code128,
        BarcodeFormat::DataMatrix,
        BarcodeFormat::Ean8,
        BarcodeFormat::Ean13,
        BarcodeFormat::Itf,
        BarcodeFormat::MaxiCode,
        BarcodeFormat::Pdf417,
        BarcodeFormat::QrCode,
        BarcodeFormat::Rss14,
        BarcodeFormat::RssExpanded,
        BarcodeFormat::UpcA,
        BarcodeFormat::UpcE,
        BarcodeFormat::UpcEanExtension,
    ];

    pub fn bits(self) -> u32 {
        self as u32
    }

    /// Look up a format by its exact bit identifier
    pub fn from_bits(bits: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.bits() == bits)
    }

    /// Whether the symbology is a matrix (2D) code
    pub fn is_2d(self) -> bool {
        matches!(
            self,
            Self::Aztec | Self::DataMatrix | Self::MaxiCode | Self::Pdf417 | Self::QrCode
        )
    }
}

impl Display for BarcodeFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Self::Aztec => "Aztec",
                Self::Codabar => "Codabar",
                Self::Code39 => "CODE-39",
                Self::Code93 => "CODE-93",
                Self::Code128 => "CODE-128",
                Self::DataMatrix => "DataMatrix",
                Self::Ean8 => "EAN-8",
                Self::Ean13 => "EAN-13",
                Self::Itf => "ITF",
                Self::MaxiCode => "MaxiCode",
                Self::Pdf417 => "PDF417",
                Self::QrCode => "QR-Code",
                Self::Rss14 => "RSS-14",
                Self::RssExpanded => "RSS-Expanded",
                Self::UpcA => "UPC-A",
                Self::UpcE => "UPC-E",
                Self::UpcEanExtension => "UPC/EAN-Extension",
            }
        )
    }
}

impl From<BarcodeFormat> for u32 {
    fn from(value: BarcodeFormat) -> Self {
        value.bits()
    }
}

bitflags::bitflags! {
    /// Set of formats as a bit mask over [`BarcodeFormat`] identifiers
    ///
    /// An empty set means "no restriction" wherever it is used as a filter.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct FormatSet: u32 {
        const AZTEC = BarcodeFormat::Aztec as u32;
        const CODABAR = BarcodeFormat::Codabar as u32;
        const CODE_39 = BarcodeFormat::Code39 as u32;
        const CODE_93 = BarcodeFormat::Code93 as u32;
        const CODE_128 = BarcodeFormat::Code128 as u32;
        const DATA_MATRIX = BarcodeFormat::DataMatrix as u32;
        const EAN_8 = BarcodeFormat::Ean8 as u32;
        const EAN_13 = BarcodeFormat::Ean13 as u32;
        const ITF = BarcodeFormat::Itf as u32;
        const MAXICODE = BarcodeFormat::MaxiCode as u32;
        const PDF_417 = BarcodeFormat::Pdf417 as u32;
        const QR_CODE = BarcodeFormat::QrCode as u32;
        const RSS_14 = BarcodeFormat::Rss14 as u32;
        const RSS_EXPANDED = BarcodeFormat::RssExpanded as u32;
        const UPC_A = BarcodeFormat::UpcA as u32;
        const UPC_E = BarcodeFormat::UpcE as u32;
        const UPC_EAN_EXTENSION = BarcodeFormat::UpcEanExtension as u32;
    }
}

impl FormatSet {
    pub const EMPTY: Self = Self::empty();

    /// The member formats, lowest bit first
    pub fn formats(self) -> impl Iterator<Item = BarcodeFormat> {
        self.iter()
            .filter_map(|flag| BarcodeFormat::from_bits(flag.bits()))
    }

    /// `true` when `format` passes this set used as a filter
    pub fn accepts(self, format: BarcodeFormat) -> bool {
        self.is_empty() || self.contains(format.into())
    }
}

impl FromIterator<BarcodeFormat> for FormatSet {
    fn from_iter<T: IntoIterator<Item = BarcodeFormat>>(iter: T) -> Self {
        iter.into_iter().map(FormatSet::from).collect()
    }
}

impl From<BarcodeFormat> for FormatSet {
    fn from(value: BarcodeFormat) -> Self {
        FormatSet::from_bits_retain(value.bits())
    }
}

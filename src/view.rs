//! Borrowed views over caller pixel memory
//!
//! A [`PixelBufferView`] interprets a flat byte slice as a grid of pixels
//! with arbitrary row and pixel strides. Geometry is validated once in
//! [`PixelBufferView::new`]; afterwards every read is inside
//! `[0, row_stride * height)` by construction.
//!
//! Luminance for colour layouts uses ITU-R BT.601 integer weights:
//! `(306 r + 601 g + 117 b + 512) >> 10`. The weights sum to 1024, so a grey
//! pixel (`r == g == b`) reduces to its own value.

use crate::{Error, Result};

/// Which byte offsets within a pixel hold the colour channels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelLayout {
    /// Single luminance channel at `offset`
    Luma { offset: usize },
    /// Red, green and blue channels at the given offsets
    Rgb { r: usize, g: usize, b: usize },
}

impl ChannelLayout {
    pub const LUMA: Self = ChannelLayout::Luma { offset: 0 };
    pub const RGB: Self = ChannelLayout::Rgb { r: 0, g: 1, b: 2 };
    pub const BGR: Self = ChannelLayout::Rgb { r: 2, g: 1, b: 0 };
    pub const RGBA: Self = ChannelLayout::RGB;
    pub const BGRA: Self = ChannelLayout::BGR;
    pub const ARGB: Self = ChannelLayout::Rgb { r: 1, g: 2, b: 3 };
    pub const ABGR: Self = ChannelLayout::Rgb { r: 3, g: 2, b: 1 };

    /// Layout from the `(index_r, index_g, index_b)` triple used at the C
    /// boundary; three equal indices select a single luminance channel
    pub fn from_indices(r: usize, g: usize, b: usize) -> Self {
        if r == g && g == b {
            ChannelLayout::Luma { offset: r }
        } else {
            ChannelLayout::Rgb { r, g, b }
        }
    }

    /// Smallest pixel stride that holds every channel of this layout
    pub fn min_pixel_stride(self) -> usize {
        match self {
            ChannelLayout::Luma { offset } => offset + 1,
            ChannelLayout::Rgb { r, g, b } => r.max(g).max(b) + 1,
        }
    }

    #[inline]
    fn reduce(self, px: &[u8]) -> u8 {
        match self {
            ChannelLayout::Luma { offset } => px[offset],
            ChannelLayout::Rgb { r, g, b } => {
                let sum = 306 * px[r] as u32 + 601 * px[g] as u32 + 117 * px[b] as u32;
                ((sum + 512) >> 10) as u8
            }
        }
    }
}

/// Read-only pixel grid over borrowed memory
#[derive(Debug, Clone, Copy)]
pub struct PixelBufferView<'a> {
    data: &'a [u8],
    width: usize,
    height: usize,
    row_stride: usize,
    pixel_stride: usize,
    layout: ChannelLayout,
}

impl<'a> PixelBufferView<'a> {
    /// Validate the geometry and wrap `data`
    ///
    /// `data` must hold at least `(height - 1) * row_stride + width *
    /// pixel_stride` bytes; padding after the last row is not required.
    pub fn new(
        data: &'a [u8],
        width: usize,
        height: usize,
        row_stride: usize,
        pixel_stride: usize,
        layout: ChannelLayout,
    ) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(Error::InvalidGeometry("width and height must be positive"));
        }
        if pixel_stride < layout.min_pixel_stride() {
            return Err(Error::InvalidGeometry(
                "pixel stride too small for the channel layout",
            ));
        }
        let row_bytes = width
            .checked_mul(pixel_stride)
            .ok_or(Error::InvalidGeometry("row size overflows"))?;
        if row_stride < row_bytes {
            return Err(Error::InvalidGeometry("row stride smaller than a row"));
        }
        let required = (height - 1)
            .checked_mul(row_stride)
            .and_then(|n| n.checked_add(row_bytes))
            .ok_or(Error::InvalidGeometry("buffer size overflows"))?;
        if data.len() < required {
            return Err(Error::InvalidGeometry("buffer shorter than the geometry"));
        }

        Ok(Self {
            data,
            width,
            height,
            row_stride,
            pixel_stride,
            layout,
        })
    }

    /// Tightly packed single-channel view
    pub fn from_luma(data: &'a [u8], width: usize, height: usize) -> Result<Self> {
        Self::new(data, width, height, width, 1, ChannelLayout::LUMA)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn row_stride(&self) -> usize {
        self.row_stride
    }

    pub fn pixel_stride(&self) -> usize {
        self.pixel_stride
    }

    pub fn layout(&self) -> ChannelLayout {
        self.layout
    }

    /// Luminance of the pixel at `(x, y)`
    ///
    /// # Panics
    ///
    /// Panics if `x >= width` or `y >= height`.
    #[inline]
    pub fn luminance_at(&self, x: usize, y: usize) -> u8 {
        assert!(x < self.width && y < self.height, "pixel ({x}, {y}) out of bounds");
        let start = y * self.row_stride + x * self.pixel_stride;
        self.layout.reduce(&self.data[start..start + self.pixel_stride])
    }

    /// Pixel bytes of row `y`, without the row padding
    #[inline]
    fn row(&self, y: usize) -> &'a [u8] {
        let start = y * self.row_stride;
        &self.data[start..start + self.width * self.pixel_stride]
    }

    /// Write the luminance of row `y` into `out` (`out.len() == width`)
    pub fn luma_row(&self, y: usize, out: &mut [u8]) {
        let layout = self.layout;
        for (dst, px) in out.iter_mut().zip(self.row(y).chunks_exact(self.pixel_stride)) {
            *dst = layout.reduce(px);
        }
    }

    /// Reduce the whole view into an owned luminance plane
    pub fn to_luma(&self) -> LumaPlane {
        let mut data = vec![0u8; self.width * self.height];
        for (y, out) in data.chunks_exact_mut(self.width).enumerate() {
            self.luma_row(y, out);
        }
        LumaPlane {
            width: self.width,
            height: self.height,
            data,
        }
    }
}

/// Tightly packed luminance copy, one byte per pixel
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LumaPlane {
    pub width: usize,
    pub height: usize,
    pub data: Vec<u8>,
}

impl LumaPlane {
    #[inline]
    pub fn get(&self, x: usize, y: usize) -> u8 {
        self.data[y * self.width + x]
    }

    /// Negative image, for light-on-dark symbols
    pub fn invert(&self) -> Self {
        Self {
            width: self.width,
            height: self.height,
            data: self.data.iter().map(|&v| !v).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_bad_geometry() {
        let buf = [0u8; 64];
        let err = |w, h, rs, ps, layout| PixelBufferView::new(&buf, w, h, rs, ps, layout).unwrap_err();

        assert!(matches!(err(0, 4, 4, 1, ChannelLayout::LUMA), Error::InvalidGeometry(_)));
        assert!(matches!(err(4, 0, 4, 1, ChannelLayout::LUMA), Error::InvalidGeometry(_)));
        // row stride shorter than width * pixel_stride
        assert!(matches!(err(4, 4, 11, 3, ChannelLayout::RGB), Error::InvalidGeometry(_)));
        // pixel stride cannot hold the alpha-first layout
        assert!(matches!(err(4, 4, 12, 3, ChannelLayout::ARGB), Error::InvalidGeometry(_)));
        // buffer too short
        assert!(matches!(err(4, 6, 12, 3, ChannelLayout::RGB), Error::InvalidGeometry(_)));
        assert!(matches!(
            err(usize::MAX, 2, usize::MAX, 2, ChannelLayout::LUMA),
            Error::InvalidGeometry(_)
        ));
    }

    #[test]
    fn last_row_needs_no_padding() {
        // 3 rows of 2 RGB pixels with 8-byte stride; last row is 6 bytes
        let buf = vec![7u8; 8 * 2 + 6];
        let view = PixelBufferView::new(&buf, 2, 3, 8, 3, ChannelLayout::RGB).unwrap();
        assert_eq!(view.luminance_at(1, 2), 7);
    }

    #[test]
    fn grey_pixels_reduce_to_themselves() {
        for v in 0..=255u8 {
            let px = [v, v, v];
            assert_eq!(ChannelLayout::RGB.reduce(&px), v);
            assert_eq!(ChannelLayout::BGR.reduce(&px), v);
        }
    }

    #[test]
    fn weighted_reduction() {
        assert_eq!(ChannelLayout::RGB.reduce(&[255, 0, 0]), 76);
        assert_eq!(ChannelLayout::RGB.reduce(&[0, 255, 0]), 150);
        assert_eq!(ChannelLayout::RGB.reduce(&[0, 0, 255]), 29);
        assert_eq!(ChannelLayout::BGR.reduce(&[0, 0, 255]), 76);
        assert_eq!(ChannelLayout::ARGB.reduce(&[9, 255, 0, 0]), 76);
    }

    #[test]
    fn layouts_from_indices() {
        assert_eq!(ChannelLayout::from_indices(0, 1, 2), ChannelLayout::RGB);
        assert_eq!(ChannelLayout::from_indices(2, 1, 0), ChannelLayout::BGR);
        assert_eq!(
            ChannelLayout::from_indices(3, 3, 3),
            ChannelLayout::Luma { offset: 3 }
        );
        assert_eq!(ChannelLayout::from_indices(3, 3, 3).min_pixel_stride(), 4);
    }

    #[test]
    fn padded_rows_to_luma() {
        // 2x2 BGRA with 4 bytes of row padding filled with garbage
        #[rustfmt::skip]
        let buf = [
            10, 10, 10, 0,   20, 20, 20, 0,   99, 99, 99, 99,
            30, 30, 30, 0,   40, 40, 40, 0,   99, 99, 99, 99,
        ];
        let view = PixelBufferView::new(&buf, 2, 2, 12, 4, ChannelLayout::BGRA).unwrap();
        let plane = view.to_luma();
        assert_eq!(plane.data, vec![10, 20, 30, 40]);
        assert_eq!(plane.get(1, 1), 40);
    }

    #[test]
    fn invert_plane() {
        let plane = LumaPlane {
            width: 2,
            height: 1,
            data: vec![0, 200],
        };
        assert_eq!(plane.invert().data, vec![255, 55]);
    }
}

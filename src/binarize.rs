//! Luminance binarization
//!
//! Every strategy turns a [`LumaPlane`] into a mask of the same size where
//! 0xFF marks a dark (foreground) pixel and 0x00 a light one.
//!
//! The local-average strategy compares each pixel value to the mean value of
//! a large window surrounding it. This simple approach works better than more
//! complex methods like Sauvola or Gatos for QR codes, as it doesn't
//! over-shrink isolated black dots inside the code.
//!
//! Copyright (C) 2008-2009 Timothy B. Terriberry (tterribe@xiph.org)
//! Licensed under LGPL 2.1 or later

use std::cmp::{max, min};
use std::fmt;

use crate::view::LumaPlane;

pub const DARK: u8 = 0xFF;
pub const LIGHT: u8 = 0x00;

/// Thresholding algorithm applied before symbol detection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Binarizer {
    /// Adaptive mean over a window of roughly 1/8 of the image
    #[default]
    LocalAverage,
    /// Single Otsu threshold over the luminance histogram
    GlobalHistogram,
    /// Fixed cut: values below the threshold are dark
    Threshold(u8),
}

impl Binarizer {
    pub fn apply(self, plane: &LumaPlane) -> Vec<u8> {
        match self {
            Binarizer::LocalAverage => local_average(&plane.data, plane.width, plane.height),
            Binarizer::GlobalHistogram => {
                let cut = otsu_threshold(&plane.data);
                threshold(&plane.data, cut)
            }
            Binarizer::Threshold(cut) => threshold(&plane.data, cut),
        }
    }

    /// The other strategies, in the order a thorough scan tries them
    pub(crate) fn fallbacks(self) -> impl Iterator<Item = Binarizer> {
        [Binarizer::LocalAverage, Binarizer::GlobalHistogram]
            .into_iter()
            .filter(move |b| *b != self)
    }
}

impl fmt::Display for Binarizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Binarizer::LocalAverage => f.write_str("local-average"),
            Binarizer::GlobalHistogram => f.write_str("global-histogram"),
            Binarizer::Threshold(cut) => write!(f, "threshold={cut}"),
        }
    }
}

/// Binarizes a grayscale image using adaptive thresholding
///
/// The window size is chosen to be large enough that it doesn't fit
/// completely inside the center of a finder pattern of a version 1 QR code
/// at full resolution.
pub fn local_average(img: &[u8], width: usize, height: usize) -> Vec<u8> {
    if width == 0 || height == 0 {
        return Vec::new();
    }

    let mut mask = vec![LIGHT; width * height];

    // Window size is a power of 2 between 16 and 256, roughly 1/8 of the
    // image dimension
    let mut logwindw = 4;
    while logwindw < 8 && (1 << logwindw) < ((width + 7) >> 3) {
        logwindw += 1;
    }

    let mut logwindh = 4;
    while logwindh < 8 && (1 << logwindh) < ((height + 7) >> 3) {
        logwindh += 1;
    }

    let windw = 1usize << logwindw;
    let windh = 1usize << logwindh;

    let mut col_sums = vec![0u32; width];

    for x in 0..width {
        let g = img[x] as u32;
        col_sums[x] = (g << (logwindh - 1)) + g;
    }

    for y in 1..(windh >> 1) {
        let y1offs = min(y, height - 1) * width;
        for x in 0..width {
            col_sums[x] += img[y1offs + x] as u32;
        }
    }

    for y in 0..height {
        let mut m = (col_sums[0] << (logwindw - 1)) + col_sums[0];
        for x in 1..(windw >> 1) {
            let x1 = min(x, width - 1);
            m += col_sums[x1];
        }

        for x in 0..width {
            // T = (m/n) - D, where n = windw * windh and D = 3
            let g = img[y * width + x] as u32;
            mask[y * width + x] = if ((g + 3) << (logwindw + logwindh)) < m {
                DARK
            } else {
                LIGHT
            };

            if x + 1 < width {
                let x0 = max(0, x as isize - (windw as isize >> 1)) as usize;
                let x1 = min(x + (windw >> 1), width - 1);
                m += col_sums[x1];
                m -= col_sums[x0];
            }
        }

        if y + 1 < height {
            let y0offs = max(0, y as isize - (windh as isize >> 1)) as usize * width;
            let y1offs = min(y + (windh >> 1), height - 1) * width;
            for x in 0..width {
                col_sums[x] -= img[y0offs + x] as u32;
                col_sums[x] += img[y1offs + x] as u32;
            }
        }
    }

    mask
}

/// Otsu's threshold: the cut that maximises between-class variance
///
/// Pixels strictly below the returned value are dark. A single-valued image
/// returns 0, so nothing is classified as dark.
pub fn otsu_threshold(img: &[u8]) -> u8 {
    let mut hist = [0u64; 256];
    for &v in img {
        hist[v as usize] += 1;
    }

    let total = img.len() as u64;
    let sum_all: u64 = hist.iter().enumerate().map(|(v, &n)| v as u64 * n).sum();

    let mut best_cut = 0u8;
    let mut best_var = 0f64;
    let mut weight_lo = 0u64;
    let mut sum_lo = 0u64;

    for t in 0..255usize {
        weight_lo += hist[t];
        sum_lo += t as u64 * hist[t];
        if weight_lo == 0 {
            continue;
        }
        let weight_hi = total - weight_lo;
        if weight_hi == 0 {
            break;
        }
        let sum_hi = sum_all - sum_lo;
        // Between-class variance, up to a constant factor of 1/total^2
        let mean_diff = sum_lo as f64 / weight_lo as f64 - sum_hi as f64 / weight_hi as f64;
        let var = weight_lo as f64 * weight_hi as f64 * mean_diff * mean_diff;
        if var > best_var {
            best_var = var;
            best_cut = (t + 1) as u8;
        }
    }

    best_cut
}

/// Fixed threshold: values below `cut` are dark
pub fn threshold(img: &[u8], cut: u8) -> Vec<u8> {
    img.iter()
        .map(|&v| if v < cut { DARK } else { LIGHT })
        .collect()
}

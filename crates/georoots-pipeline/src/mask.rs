//! Vegetation mask: HSV window thresholding and its visualizations.
//!
//! A pixel counts as vegetation iff its hue lies in
//! `[hue_low, hue_high]`, its saturation is at least `saturation_low`
//! and its value is at least `value_low`. The upper saturation and value
//! bounds are fixed at 255.

use std::fmt;

use image::{GrayImage, Luma, Rgb, RgbImage};
use serde::{Deserialize, Serialize};

use crate::hsv::{HUE_MAX, Hsv};
use crate::types::PipelineError;

/// Mask value for vegetation pixels.
pub const VEGETATION: u8 = 255;

/// Acceptance window for vegetation pixels in 8-bit HSV.
///
/// Hue bounds are in half-degrees (`0..=179`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HsvThresholds {
    /// Lowest accepted hue (inclusive).
    pub hue_low: u8,
    /// Highest accepted hue (inclusive).
    pub hue_high: u8,
    /// Lowest accepted saturation (inclusive).
    pub saturation_low: u8,
    /// Lowest accepted value (inclusive).
    pub value_low: u8,
}

impl HsvThresholds {
    /// Window used by the main dashboard: hue 35-85, S >= 40, V >= 40.
    pub const STANDARD: Self = Self {
        hue_low: 35,
        hue_high: 85,
        saturation_low: 40,
        value_low: 40,
    };

    /// Window used by the alternate dashboard: hue 72-108, S >= 42,
    /// V >= 24. Accepts darker, bluer foliage.
    pub const LOW_LIGHT: Self = Self {
        hue_low: 72,
        hue_high: 108,
        saturation_low: 42,
        value_low: 24,
    };

    /// Check the window is well formed.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidConfig`] if `hue_high` exceeds
    /// [`HUE_MAX`] or `hue_low > hue_high`.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.hue_high > HUE_MAX {
            return Err(PipelineError::InvalidConfig(format!(
                "hue_high must be at most {HUE_MAX}, got {}",
                self.hue_high
            )));
        }
        if self.hue_low > self.hue_high {
            return Err(PipelineError::InvalidConfig(format!(
                "hue_low ({}) must not exceed hue_high ({})",
                self.hue_low, self.hue_high
            )));
        }
        Ok(())
    }

    /// Whether a pixel falls inside the window.
    #[must_use]
    pub const fn accepts(&self, pixel: Hsv) -> bool {
        pixel.h >= self.hue_low
            && pixel.h <= self.hue_high
            && pixel.s >= self.saturation_low
            && pixel.v >= self.value_low
    }
}

impl Default for HsvThresholds {
    fn default() -> Self {
        Self::STANDARD
    }
}

impl fmt::Display for HsvThresholds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "H {}-{}, S >= {}, V >= {}",
            self.hue_low, self.hue_high, self.saturation_low, self.value_low
        )
    }
}

/// How to render the mask for display.
///
/// Both variants are computed from the same mask, so the vegetation
/// fraction never depends on this choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MaskView {
    /// The binary mask expanded to three equal channels.
    #[default]
    Binary,
    /// The preview with every non-vegetation pixel zeroed out.
    Composite,
}

impl fmt::Display for MaskView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Binary => f.write_str("Binary"),
            Self::Composite => f.write_str("Composite"),
        }
    }
}

/// Build the binary vegetation mask for a raster whose HSV pixels are
/// given in row-major order.
///
/// `hsv.len()` must equal `width * height`; missing trailing pixels are
/// treated as non-vegetation.
#[must_use = "returns the binary mask"]
pub fn vegetation_mask(
    hsv: &[Hsv],
    width: u32,
    height: u32,
    thresholds: &HsvThresholds,
) -> GrayImage {
    debug_assert_eq!(
        hsv.len() as u64,
        u64::from(width) * u64::from(height),
        "HSV buffer does not match raster size"
    );
    let mut mask = GrayImage::new(width, height);
    for (pixel, out) in hsv.iter().zip(mask.pixels_mut()) {
        if thresholds.accepts(*pixel) {
            *out = Luma([VEGETATION]);
        }
    }
    mask
}

/// Number of vegetation pixels in a mask.
#[must_use]
pub fn count_vegetation(mask: &GrayImage) -> u64 {
    mask.pixels()
        .map(|p| u64::from(u8::from(p.0[0] == VEGETATION)))
        .sum()
}

/// Vegetation share of a mask in `[0, 1]`; zero for an empty mask.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn fraction(vegetation_pixels: u64, total_pixels: u64) -> f64 {
    if total_pixels == 0 {
        0.0
    } else {
        vegetation_pixels as f64 / total_pixels as f64
    }
}

/// Render the mask for display.
#[must_use = "returns the visualization raster"]
pub fn visualize(mask: &GrayImage, preview: &RgbImage, view: MaskView) -> RgbImage {
    match view {
        MaskView::Binary => RgbImage::from_fn(mask.width(), mask.height(), |x, y| {
            let v = mask.get_pixel(x, y).0[0];
            Rgb([v, v, v])
        }),
        MaskView::Composite => RgbImage::from_fn(preview.width(), preview.height(), |x, y| {
            if mask.get_pixel(x, y).0[0] == VEGETATION {
                *preview.get_pixel(x, y)
            } else {
                Rgb([0, 0, 0])
            }
        }),
    }
}

//! Shared types for the georoots vegetation pipeline.

use serde::{Deserialize, Serialize};

use crate::downsample::DownsampleFilter;
use crate::mask::{HsvThresholds, MaskView};

/// Re-export `GrayImage` so downstream crates can reference the binary
/// vegetation mask without depending on `image` directly.
pub use image::GrayImage;

/// Re-export `RgbImage` so downstream crates can reference the preview
/// and visualization rasters without depending on `image` directly.
pub use image::RgbImage;

/// Image dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Dimensions {
    /// Dimensions of an RGB raster.
    #[must_use]
    pub fn of(image: &RgbImage) -> Self {
        Self {
            width: image.width(),
            height: image.height(),
        }
    }

    /// Total number of pixels (`width * height`).
    #[must_use]
    pub const fn pixel_count(self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

/// Configuration for the vegetation index estimator.
///
/// Every field has a default matching the main dashboard: an 800 px
/// display cap, area-averaging downscale, the standard green window and
/// a binary mask visualization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VegetationConfig {
    /// HSV acceptance window for vegetation pixels.
    pub thresholds: HsvThresholds,

    /// Images wider than this are downscaled to exactly this width,
    /// preserving aspect ratio. Must be at least 1.
    pub max_width: u32,

    /// Resampling filter used when downscaling.
    pub downsample_filter: DownsampleFilter,

    /// Which visualization to produce alongside the mask.
    pub view: MaskView,
}

impl VegetationConfig {
    /// Default display cap used by the main dashboard.
    pub const DEFAULT_MAX_WIDTH: u32 = 800;

    /// Smaller display cap used by the compact dashboard layouts.
    pub const COMPACT_MAX_WIDTH: u32 = 600;

    /// Default resampling filter.
    pub const DEFAULT_DOWNSAMPLE_FILTER: DownsampleFilter = DownsampleFilter::Area;

    /// Check the configuration for values the estimator cannot honour.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidConfig`] if `max_width` is zero or
    /// the HSV window is malformed (see [`HsvThresholds::validate`]).
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.max_width == 0 {
            return Err(PipelineError::InvalidConfig(
                "max_width must be at least 1".to_string(),
            ));
        }
        self.thresholds.validate()
    }
}

impl Default for VegetationConfig {
    fn default() -> Self {
        Self {
            thresholds: HsvThresholds::default(),
            max_width: Self::DEFAULT_MAX_WIDTH,
            downsample_filter: Self::DEFAULT_DOWNSAMPLE_FILTER,
            view: MaskView::default(),
        }
    }
}

/// Result of estimating the vegetation index of one image.
///
/// `fraction` is the only value that feeds downstream scoring; the
/// rasters are for display. Does not derive `PartialEq` because the
/// comparison would walk every pixel.
#[derive(Debug, Clone)]
pub struct VegetationResult {
    /// Share of vegetation pixels, in `[0, 1]`. Zero for empty images.
    pub fraction: f64,
    /// Binary mask (255 = vegetation, 0 = other) over the preview raster.
    pub mask: GrayImage,
    /// The (possibly downscaled) RGB raster the mask was computed from.
    pub preview: RgbImage,
    /// Display raster chosen by [`VegetationConfig::view`].
    pub visualization: RgbImage,
    /// Number of mask pixels set.
    pub vegetation_pixels: u64,
    /// Total number of pixels in the preview raster.
    pub total_pixels: u64,
    /// Dimensions of the preview raster.
    pub dimensions: Dimensions,
    /// Dimensions of the decoded image before downscaling.
    pub source_dimensions: Dimensions,
    /// Whether downscaling was applied.
    pub downscaled: bool,
}

impl VegetationResult {
    /// Vegetation cover as a percentage in `[0, 100]`.
    #[must_use]
    pub fn percent(&self) -> f64 {
        self.fraction * 100.0
    }

    /// Serializable summary without the raster data.
    #[must_use]
    pub fn summary(&self) -> VegetationSummary {
        VegetationSummary {
            fraction: self.fraction,
            percent: self.percent(),
            vegetation_pixels: self.vegetation_pixels,
            total_pixels: self.total_pixels,
            dimensions: self.dimensions,
            source_dimensions: self.source_dimensions,
            downscaled: self.downscaled,
        }
    }
}

/// Raster-free view of a [`VegetationResult`] for JSON output.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VegetationSummary {
    /// Share of vegetation pixels, in `[0, 1]`.
    pub fraction: f64,
    /// Same share as a percentage.
    pub percent: f64,
    /// Number of mask pixels set.
    pub vegetation_pixels: u64,
    /// Total pixel count of the analysed raster.
    pub total_pixels: u64,
    /// Analysed raster dimensions.
    pub dimensions: Dimensions,
    /// Decoded image dimensions.
    pub source_dimensions: Dimensions,
    /// Whether downscaling was applied.
    pub downscaled: bool,
}

/// Errors that can occur while estimating the vegetation index.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Failed to decode the input image.
    #[error("failed to decode image: {0}")]
    ImageDecode(#[from] image::ImageError),

    /// The input image bytes were empty.
    #[error("input image data is empty")]
    EmptyInput,

    /// Estimator configuration is invalid.
    #[error("invalid vegetation configuration: {0}")]
    InvalidConfig(String),
}

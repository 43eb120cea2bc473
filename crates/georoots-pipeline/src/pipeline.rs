//! Incremental estimator: advance stage-by-stage, inspecting each
//! intermediate result before continuing.
//!
//! Unlike [`crate::estimate_from_bytes`] which runs everything in one
//! call, [`Pipeline`] lets the caller drive execution one step at a time:
//!
//! ```rust
//! # use georoots_pipeline::{Pipeline, VegetationConfig, PipelineError};
//! # fn run(png: Vec<u8>) -> Result<(), PipelineError> {
//! let result = Pipeline::new(png, VegetationConfig::default())
//!     .decode()?
//!     .downsample()
//!     .convert()
//!     .threshold()
//!     .into_result();
//! println!("{:.2}% vegetation", result.percent());
//! # Ok(())
//! # }
//! ```
//!
//! Each stage method consumes `self` and returns the next stage, carrying
//! everything computed so far. Only decoding can fail; the configuration
//! is validated before any pixel is touched.

use log::debug;

use crate::diagnostics::StageMetrics;
use crate::hsv::Hsv;
use crate::types::{
    Dimensions, GrayImage, PipelineError, RgbImage, VegetationConfig, VegetationResult,
};

// ───────────────────────── Stage 0: Pending ──────────────────────────

/// State before any processing has occurred.
///
/// The source bytes and config are stored but not yet touched.
#[must_use = "pipeline stages are consumed by advancing, call .decode() to continue"]
pub struct Pending {
    config: VegetationConfig,
    source: Vec<u8>,
}

impl Pending {
    /// The raw source image bytes.
    #[must_use]
    pub fn source(&self) -> &[u8] {
        &self.source
    }

    /// Validate the config, decode the source image and advance to the
    /// [`Decoded`] stage.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidConfig`] for a malformed config,
    /// [`PipelineError::EmptyInput`] for empty bytes and
    /// [`PipelineError::ImageDecode`] for unreadable data.
    pub fn decode(self) -> Result<Decoded, PipelineError> {
        self.config.validate()?;
        let source_len = self.source.len();
        let image = crate::decode::decode_rgb(&self.source)?;
        debug!(
            "decoded {source_len} bytes into {}x{} RGB",
            image.width(),
            image.height()
        );
        Ok(Decoded {
            config: self.config,
            image,
            source_len,
        })
    }
}

// ───────────────────────── Stage 1: Decoded ──────────────────────────

/// State after decoding: the full-resolution RGB raster.
#[must_use = "pipeline stages are consumed by advancing, call .downsample() to continue"]
pub struct Decoded {
    config: VegetationConfig,
    image: RgbImage,
    source_len: usize,
}

impl Decoded {
    /// The decoded image at full resolution.
    #[must_use]
    pub const fn image(&self) -> &RgbImage {
        &self.image
    }

    /// Size of the encoded source in bytes (0 when built from a raster).
    #[must_use]
    pub const fn source_len(&self) -> usize {
        self.source_len
    }

    /// Metrics describing this stage.
    #[must_use]
    pub fn metrics(&self) -> StageMetrics {
        let dims = Dimensions::of(&self.image);
        StageMetrics::Decode {
            input_bytes: self.source_len,
            width: dims.width,
            height: dims.height,
            pixel_count: dims.pixel_count(),
        }
    }

    /// Advance to the downsample stage.
    pub fn downsample(self) -> Downsampled {
        let source_dimensions = Dimensions::of(&self.image);
        let (preview, applied) = crate::downsample::downscale_to_width(
            &self.image,
            self.config.max_width,
            self.config.downsample_filter,
        );
        if applied {
            debug!(
                "downscaled {}x{} -> {}x{} ({})",
                source_dimensions.width,
                source_dimensions.height,
                preview.width(),
                preview.height(),
                self.config.downsample_filter,
            );
        }
        Downsampled {
            config: self.config,
            preview,
            source_dimensions,
            applied,
        }
    }
}

// ───────────────────────── Stage 2: Downsampled ──────────────────────

/// State after capping the width to `config.max_width`.
#[must_use = "pipeline stages are consumed by advancing, call .convert() to continue"]
pub struct Downsampled {
    config: VegetationConfig,
    preview: RgbImage,
    source_dimensions: Dimensions,
    applied: bool,
}

impl Downsampled {
    /// The (possibly) downscaled RGB raster.
    #[must_use]
    pub const fn preview(&self) -> &RgbImage {
        &self.preview
    }

    /// Whether downscaling was actually applied.
    #[must_use]
    pub const fn applied(&self) -> bool {
        self.applied
    }

    /// Metrics describing this stage.
    #[must_use]
    pub fn metrics(&self) -> StageMetrics {
        let dims = Dimensions::of(&self.preview);
        StageMetrics::Downsample {
            filter: self.config.downsample_filter.to_string(),
            max_width: self.config.max_width,
            original_width: self.source_dimensions.width,
            original_height: self.source_dimensions.height,
            width: dims.width,
            height: dims.height,
            applied: self.applied,
        }
    }

    /// Advance to the colour conversion stage.
    pub fn convert(self) -> Converted {
        let hsv = crate::hsv::to_hsv(&self.preview);
        Converted {
            config: self.config,
            preview: self.preview,
            source_dimensions: self.source_dimensions,
            applied: self.applied,
            hsv,
        }
    }
}

// ───────────────────────── Stage 3: Converted ────────────────────────

/// State after converting the preview to 8-bit HSV.
#[must_use = "pipeline stages are consumed by advancing, call .threshold() to continue"]
pub struct Converted {
    config: VegetationConfig,
    preview: RgbImage,
    source_dimensions: Dimensions,
    applied: bool,
    hsv: Vec<Hsv>,
}

impl Converted {
    /// HSV pixels of the preview in row-major order.
    #[must_use]
    pub fn hsv(&self) -> &[Hsv] {
        &self.hsv
    }

    /// Metrics describing this stage.
    #[must_use]
    pub fn metrics(&self) -> StageMetrics {
        StageMetrics::Convert {
            pixel_count: self.hsv.len() as u64,
        }
    }

    /// Advance to the thresholding stage.
    pub fn threshold(self) -> Thresholded {
        let dims = Dimensions::of(&self.preview);
        let mask = crate::mask::vegetation_mask(
            &self.hsv,
            dims.width,
            dims.height,
            &self.config.thresholds,
        );
        let vegetation_pixels = crate::mask::count_vegetation(&mask);
        let total_pixels = dims.pixel_count();
        let visualization = crate::mask::visualize(&mask, &self.preview, self.config.view);
        debug!(
            "vegetation {vegetation_pixels}/{total_pixels} pixels ({})",
            self.config.thresholds
        );
        Thresholded {
            config: self.config,
            preview: self.preview,
            source_dimensions: self.source_dimensions,
            applied: self.applied,
            mask,
            visualization,
            vegetation_pixels,
            total_pixels,
        }
    }
}

// ───────────────────────── Stage 4: Thresholded ──────────────────────

/// Final state: mask, counts and visualization are available.
pub struct Thresholded {
    config: VegetationConfig,
    preview: RgbImage,
    source_dimensions: Dimensions,
    applied: bool,
    mask: GrayImage,
    visualization: RgbImage,
    vegetation_pixels: u64,
    total_pixels: u64,
}

impl Thresholded {
    /// The binary vegetation mask.
    #[must_use]
    pub const fn mask(&self) -> &GrayImage {
        &self.mask
    }

    /// Vegetation share in `[0, 1]`.
    #[must_use]
    pub fn fraction(&self) -> f64 {
        crate::mask::fraction(self.vegetation_pixels, self.total_pixels)
    }

    /// Metrics describing this stage.
    #[must_use]
    pub fn metrics(&self) -> StageMetrics {
        StageMetrics::Threshold {
            thresholds: self.config.thresholds,
            vegetation_pixels: self.vegetation_pixels,
            total_pixels: self.total_pixels,
            view: self.config.view.to_string(),
        }
    }

    /// Consume the final stage and produce the result.
    #[must_use]
    pub fn into_result(self) -> VegetationResult {
        let fraction = self.fraction();
        VegetationResult {
            fraction,
            dimensions: Dimensions::of(&self.preview),
            mask: self.mask,
            preview: self.preview,
            visualization: self.visualization,
            vegetation_pixels: self.vegetation_pixels,
            total_pixels: self.total_pixels,
            source_dimensions: self.source_dimensions,
            downscaled: self.applied,
        }
    }
}

// ───────────────────────── Entry points ──────────────────────────────

/// Entry point for the staged estimator.
pub struct Pipeline;

impl Pipeline {
    /// Start from encoded image bytes.
    pub const fn new(image_bytes: Vec<u8>, config: VegetationConfig) -> Pending {
        Pending {
            config,
            source: image_bytes,
        }
    }

    /// Start from an already decoded raster, skipping the decode step.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidConfig`] for a malformed config.
    pub fn from_image(image: RgbImage, config: VegetationConfig) -> Result<Decoded, PipelineError> {
        config.validate()?;
        Ok(Decoded {
            config,
            image,
            source_len: 0,
        })
    }
}

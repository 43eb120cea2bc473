//! georoots-pipeline: rockfall risk core (sans-IO).
//!
//! Three independent steps feed the risk dashboard:
//!
//! 1. **Vegetation index**: decode -> downscale -> HSV -> threshold ->
//!    pixel share ([`estimate`], [`estimate_from_bytes`], [`Pipeline`]).
//! 2. **Risk inference**: five site features -> externally trained model
//!    -> score ([`risk::predict`], [`RiskAdapter`], [`LinearModel`]).
//! 3. **Alert classification**: score -> Low / Medium / High
//!    ([`classify`], [`AlertThresholds`]).
//!
//! [`assess`] chains all three. [`summarize_csv`] describes a site
//! dataset for the insights views. This crate has **no I/O dependencies**:
//! it operates on in-memory bytes and rasters and returns structured
//! data. Reading files and model artifacts lives in the binaries.

pub mod alert;
pub mod analytics;
pub mod assess;
pub mod decode;
pub mod diagnostics;
pub mod downsample;
pub mod hsv;
pub mod mask;
pub mod model;
pub mod pipeline;
pub mod risk;
pub mod types;

pub use alert::{AlertLevel, AlertThresholds, LowerBoundary, classify};
pub use analytics::{AnalyticsError, DatasetSummary, summarize_csv};
pub use assess::{AssessError, Assessment, AssessmentSummary, SiteReadings, assess};
pub use diagnostics::{Clock, PipelineDiagnostics, estimate_with_diagnostics};
pub use downsample::DownsampleFilter;
pub use mask::{HsvThresholds, MaskView};
pub use model::{LinearModel, ModelError};
pub use pipeline::Pipeline;
pub use risk::{
    Feature, FeatureRow, RiskAdapter, RiskError, RiskFeatureRecord, RiskScore, RiskScorer,
    ScoringError,
};
pub use types::{
    Dimensions, GrayImage, PipelineError, RgbImage, VegetationConfig, VegetationResult,
    VegetationSummary,
};

/// Estimate the vegetation index of a decoded RGB raster.
///
/// # Steps
///
/// 1. Downscale to `config.max_width` if wider (aspect preserved)
/// 2. Convert to 8-bit HSV
/// 3. Threshold against `config.thresholds` into a binary mask
/// 4. Count mask pixels; `fraction = set / total` (0 for an empty raster)
/// 5. Render the visualization selected by `config.view`
///
/// The output is a pure function of `(image, config)`.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidConfig`] if `config` fails
/// [`VegetationConfig::validate`].
pub fn estimate(
    image: &RgbImage,
    config: &VegetationConfig,
) -> Result<VegetationResult, PipelineError> {
    Ok(Pipeline::from_image(image.clone(), config.clone())?
        .downsample()
        .convert()
        .threshold()
        .into_result())
}

/// Decode image bytes (PNG, JPEG, BMP, WebP) and estimate their
/// vegetation index.
///
/// # Errors
///
/// Returns [`PipelineError::EmptyInput`] if `image_bytes` is empty,
/// [`PipelineError::ImageDecode`] if the data cannot be decoded and
/// [`PipelineError::InvalidConfig`] for a malformed `config`.
pub fn estimate_from_bytes(
    image_bytes: &[u8],
    config: &VegetationConfig,
) -> Result<VegetationResult, PipelineError> {
    Ok(Pipeline::new(image_bytes.to_vec(), config.clone())
        .decode()?
        .downsample()
        .convert()
        .threshold()
        .into_result())
}

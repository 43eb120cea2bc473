//! Image decoding to an RGB raster.
//!
//! Accepts raw image bytes (PNG, JPEG, BMP, WebP) and produces the
//! 8-bit RGB buffer the estimator works on. Alpha is discarded.

use image::RgbImage;

use crate::types::PipelineError;

/// Decode raw image bytes into an RGB raster.
///
/// # Errors
///
/// Returns [`PipelineError::EmptyInput`] if `bytes` is empty.
/// Returns [`PipelineError::ImageDecode`] if the image format is
/// unrecognized or the data is corrupt.
#[must_use = "returns the decoded RGB image"]
pub fn decode_rgb(bytes: &[u8]) -> Result<RgbImage, PipelineError> {
    if bytes.is_empty() {
        return Err(PipelineError::EmptyInput);
    }

    let img = image::load_from_memory(bytes)?;
    Ok(img.to_rgb8())
}

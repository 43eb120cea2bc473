//! PNG encoding of estimator rasters and the two-column comparison
//! panel (preview on the left, mask visualization on the right).

use image::{ExtendedColorType, ImageEncoder, Rgb, codecs::png::PngEncoder};

use georoots_pipeline::{GrayImage, RgbImage};

/// Background colour for panel padding and the gutter.
const PANEL_BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);

/// Errors from raster export.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// PNG encoding failed.
    #[error("PNG encoding failed: {0}")]
    Encode(#[from] image::ImageError),
}

/// Encode an RGB raster as PNG.
///
/// # Errors
///
/// Returns [`ExportError::Encode`] if the encoder rejects the buffer.
pub fn encode_png_rgb(image: &RgbImage) -> Result<Vec<u8>, ExportError> {
    let mut buf = Vec::new();
    PngEncoder::new(&mut buf).write_image(
        image.as_raw(),
        image.width(),
        image.height(),
        ExtendedColorType::Rgb8,
    )?;
    Ok(buf)
}

/// Encode a grayscale raster (such as the vegetation mask) as PNG.
///
/// # Errors
///
/// Returns [`ExportError::Encode`] if the encoder rejects the buffer.
pub fn encode_png_gray(image: &GrayImage) -> Result<Vec<u8>, ExportError> {
    let mut buf = Vec::new();
    PngEncoder::new(&mut buf).write_image(
        image.as_raw(),
        image.width(),
        image.height(),
        ExtendedColorType::L8,
    )?;
    Ok(buf)
}

/// Place two rasters next to each other with a `gutter`-pixel gap.
///
/// Both are top-aligned; the shorter one is padded with white.
#[must_use]
pub fn side_by_side(left: &RgbImage, right: &RgbImage, gutter: u32) -> RgbImage {
    let width = left.width() + gutter + right.width();
    let height = left.height().max(right.height());
    let right_x = left.width() + gutter;
    RgbImage::from_fn(width, height, |x, y| {
        if x < left.width() {
            if y < left.height() {
                *left.get_pixel(x, y)
            } else {
                PANEL_BACKGROUND
            }
        } else if x >= right_x && y < right.height() {
            *right.get_pixel(x - right_x, y)
        } else {
            PANEL_BACKGROUND
        }
    })
}

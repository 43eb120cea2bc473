//! Downscaling to the display cap.
//!
//! Images wider than the configured `max_width` are reduced so their
//! width matches the cap exactly, preserving aspect ratio. This keeps
//! pixel counting and rendering cheap regardless of the camera that took
//! the photo. Images at or below the cap are returned unchanged.
//!
//! The default filter is area averaging: every destination pixel is the
//! coverage-weighted mean of the source pixels it overlaps. Unlike the
//! kernel filters of the `image` crate this never rings and never
//! invents colours that are not a mix of the ones underneath, which
//! matters when the result is thresholded afterwards.

use std::fmt;

use image::{Rgb, RgbImage};
use serde::{Deserialize, Serialize};

/// Resampling filter used when downscaling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DownsampleFilter {
    /// Disabled: keep the full resolution regardless of width.
    Disabled,
    /// Area averaging (coverage-weighted box filter).
    #[default]
    Area,
    /// Nearest-neighbor: fastest, blocky artifacts.
    Nearest,
    /// Bilinear interpolation.
    Triangle,
    /// Bicubic (Catmull-Rom).
    CatmullRom,
    /// Gaussian.
    Gaussian,
    /// Lanczos with 3 lobes.
    Lanczos3,
}

impl DownsampleFilter {
    /// Convert to the `image` crate's `FilterType`.
    ///
    /// Returns `None` for the two variants that are not backed by
    /// `image::imageops` ([`Self::Disabled`] and [`Self::Area`]).
    const fn to_image_filter(self) -> Option<image::imageops::FilterType> {
        match self {
            Self::Disabled | Self::Area => None,
            Self::Nearest => Some(image::imageops::FilterType::Nearest),
            Self::Triangle => Some(image::imageops::FilterType::Triangle),
            Self::CatmullRom => Some(image::imageops::FilterType::CatmullRom),
            Self::Gaussian => Some(image::imageops::FilterType::Gaussian),
            Self::Lanczos3 => Some(image::imageops::FilterType::Lanczos3),
        }
    }
}

impl fmt::Display for DownsampleFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disabled => f.write_str("Disabled"),
            Self::Area => f.write_str("Area"),
            Self::Nearest => f.write_str("Nearest"),
            Self::Triangle => f.write_str("Triangle"),
            Self::CatmullRom => f.write_str("CatmullRom"),
            Self::Gaussian => f.write_str("Gaussian"),
            Self::Lanczos3 => f.write_str("Lanczos3"),
        }
    }
}

/// Target dimensions for an image of `width` x `height` capped at
/// `max_width`, or `None` when no downscaling is needed.
///
/// The new width is exactly `max_width`; the new height is
/// `floor(height * max_width / width)`, never less than one row.
#[must_use]
pub fn target_dimensions(width: u32, height: u32, max_width: u32) -> Option<(u32, u32)> {
    if width <= max_width || max_width == 0 {
        return None;
    }
    let scaled = u64::from(height) * u64::from(max_width) / u64::from(width);
    // `scaled <= height` because `max_width < width`, so it fits in u32.
    let new_height = u32::try_from(scaled).unwrap_or(height).max(1);
    Some((max_width, new_height))
}

/// Downscale `image` so its width is at most `max_width`.
///
/// Returns the (possibly unchanged) image and whether downscaling was
/// actually applied.
#[must_use]
pub fn downscale_to_width(
    image: &RgbImage,
    max_width: u32,
    filter: DownsampleFilter,
) -> (RgbImage, bool) {
    if filter == DownsampleFilter::Disabled {
        return (image.clone(), false);
    }
    let Some((new_w, new_h)) = target_dimensions(image.width(), image.height(), max_width) else {
        return (image.clone(), false);
    };

    let resized = filter.to_image_filter().map_or_else(
        || area_resize(image, new_w, new_h),
        |f| image::imageops::resize(image, new_w, new_h, f),
    );
    (resized, true)
}

/// Source spans contributing to one destination index along an axis,
/// as `(source_index, weight)` pairs whose weights sum to one.
type AxisWeights = Vec<Vec<(u32, f64)>>;

/// Compute per-destination coverage weights for shrinking `src` samples
/// down to `dst` samples.
fn axis_weights(src: u32, dst: u32) -> AxisWeights {
    let scale = f64::from(src) / f64::from(dst);
    (0..dst)
        .map(|i| {
            let start = f64::from(i) * scale;
            let end = (f64::from(i) + 1.0) * scale;
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let first = start.floor() as u32;
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let last = (end.ceil() as u32).min(src);
            let mut spans: Vec<(u32, f64)> = (first..last)
                .map(|j| {
                    let lo = start.max(f64::from(j));
                    let hi = end.min(f64::from(j) + 1.0);
                    (j, (hi - lo).max(0.0))
                })
                .filter(|&(_, w)| w > 0.0)
                .collect();
            let total: f64 = spans.iter().map(|&(_, w)| w).sum();
            if total > 0.0 {
                for span in &mut spans {
                    span.1 /= total;
                }
            }
            spans
        })
        .collect()
}

/// Area-averaging resize. Only meaningful for shrinking.
fn area_resize(image: &RgbImage, new_w: u32, new_h: u32) -> RgbImage {
    let x_weights = axis_weights(image.width(), new_w);
    let y_weights = axis_weights(image.height(), new_h);

    RgbImage::from_fn(new_w, new_h, |dx, dy| {
        let mut acc = [0.0_f64; 3];
        for &(sy, wy) in &y_weights[dy as usize] {
            for &(sx, wx) in &x_weights[dx as usize] {
                let w = wx * wy;
                let p = image.get_pixel(sx, sy).0;
                acc[0] = f64::from(p[0]).mul_add(w, acc[0]);
                acc[1] = f64::from(p[1]).mul_add(w, acc[1]);
                acc[2] = f64::from(p[2]).mul_add(w, acc[2]);
            }
        }
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let channel = |v: f64| v.round().clamp(0.0, 255.0) as u8;
        Rgb([channel(acc[0]), channel(acc[1]), channel(acc[2])])
    })
}

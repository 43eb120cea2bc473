//! RGB to HSV conversion in the 8-bit convention.
//!
//! Hue is stored in half-degrees (`0..=179`) so it fits a byte;
//! saturation and value use the full `0..=255` range. This is the
//! representation the threshold presets are written in.

use image::{Rgb, RgbImage};

/// One pixel in 8-bit HSV.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hsv {
    /// Hue in half-degrees, `0..=179`.
    pub h: u8,
    /// Saturation, `0..=255`.
    pub s: u8,
    /// Value (brightness), `0..=255`.
    pub v: u8,
}

/// Largest representable hue in half-degrees.
pub const HUE_MAX: u8 = 179;

/// Convert one RGB pixel to 8-bit HSV.
///
/// `V = max(R, G, B)`, `S = round(255 * (V - min) / V)` (0 when `V = 0`),
/// hue is the usual hexcone angle halved and rounded, wrapping 180 to 0.
/// Achromatic pixels get hue 0.
#[must_use]
pub fn rgb_to_hsv(rgb: Rgb<u8>) -> Hsv {
    let [r, g, b] = rgb.0;
    let v = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = f32::from(v - min);

    let s = if v == 0 {
        0.0
    } else {
        255.0 * delta / f32::from(v)
    };

    let h_deg = if delta == 0.0 {
        0.0
    } else if v == r {
        60.0 * (f32::from(g) - f32::from(b)) / delta
    } else if v == g {
        60.0f32.mul_add((f32::from(b) - f32::from(r)) / delta, 120.0)
    } else {
        60.0f32.mul_add((f32::from(r) - f32::from(g)) / delta, 240.0)
    };
    let h_deg = if h_deg < 0.0 { h_deg + 360.0 } else { h_deg };

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let h = {
        let half = (h_deg / 2.0).round() as u16;
        if half > u16::from(HUE_MAX) { half - 180 } else { half }
    };

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    Hsv {
        h: h as u8,
        s: s.round() as u8,
        v,
    }
}

/// Convert every pixel of an RGB raster.
///
/// Returns the pixels in row-major order, matching `image.pixels()`.
#[must_use]
pub fn to_hsv(image: &RgbImage) -> Vec<Hsv> {
    image.pixels().map(|p| rgb_to_hsv(*p)).collect()
}

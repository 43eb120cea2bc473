//! georoots-export: pure serializers for georoots outputs (sans-IO).
//!
//! Turns pipeline results into files a person can look at: the risk
//! gauge as SVG, and the preview, mask and side-by-side panel as PNG.
//! Every function returns bytes or a string; writing them is the
//! caller's job.

pub mod gauge;
pub mod raster;

pub use gauge::{GaugeBand, SvgMetadata, risk_gauge_svg};
pub use raster::{ExportError, encode_png_gray, encode_png_rgb, side_by_side};

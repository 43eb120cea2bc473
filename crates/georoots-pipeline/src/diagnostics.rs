//! Estimator diagnostics: timing and pixel counts for each stage.
//!
//! Time is read through the [`Clock`] trait so the library stays free of
//! platform clocks; the CLI supplies an `Instant`-backed implementation
//! and tests supply a fake one.
//!
//! Durations are serialized as fractional seconds (`f64`) for JSON
//! compatibility, since `std::time::Duration` does not implement serde
//! traits.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::mask::HsvThresholds;
use crate::pipeline::Pipeline;
use crate::types::{PipelineError, VegetationConfig, VegetationResult};

/// Source of timestamps for stage timing.
pub trait Clock {
    /// Opaque timestamp type.
    type Instant;

    /// Current timestamp.
    fn now(&self) -> Self::Instant;

    /// Time elapsed since `since`.
    fn elapsed(&self, since: &Self::Instant) -> Duration;
}

/// Serde support for `std::time::Duration` as fractional seconds.
mod duration_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a `Duration` as fractional seconds (`f64`).
    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_secs_f64().serialize(serializer)
    }

    /// Deserialize a `Duration` from fractional seconds (`f64`).
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(|_| {
            serde::de::Error::custom(
                "duration seconds must be finite, non-negative, and representable as a Duration",
            )
        })
    }
}

/// Diagnostics collected from a single estimator run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineDiagnostics {
    /// Stage 1: image decoding.
    pub decode: StageDiagnostics,
    /// Stage 2: downscaling to the display cap.
    pub downsample: StageDiagnostics,
    /// Stage 3: RGB to HSV conversion.
    pub convert: StageDiagnostics,
    /// Stage 4: thresholding, counting and visualization.
    pub threshold: StageDiagnostics,
    /// Total wall-clock duration of the run (seconds).
    #[serde(with = "duration_serde")]
    pub total_duration: Duration,
}

/// Diagnostics for a single stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageDiagnostics {
    /// Wall-clock duration of this stage (seconds).
    #[serde(with = "duration_serde")]
    pub duration: Duration,
    /// Stage-specific metrics.
    pub metrics: StageMetrics,
}

/// Stage-specific metrics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum StageMetrics {
    /// Image decoding metrics.
    Decode {
        /// Size of the input image bytes.
        input_bytes: usize,
        /// Decoded width in pixels.
        width: u32,
        /// Decoded height in pixels.
        height: u32,
        /// Total pixel count.
        pixel_count: u64,
    },
    /// Downscaling metrics.
    Downsample {
        /// Filter name.
        filter: String,
        /// Configured display cap.
        max_width: u32,
        /// Width before downscaling.
        original_width: u32,
        /// Height before downscaling.
        original_height: u32,
        /// Width after downscaling.
        width: u32,
        /// Height after downscaling.
        height: u32,
        /// Whether downscaling was applied.
        applied: bool,
    },
    /// Colour conversion metrics.
    Convert {
        /// Pixels converted.
        pixel_count: u64,
    },
    /// Thresholding metrics.
    Threshold {
        /// Acceptance window used.
        thresholds: HsvThresholds,
        /// Pixels inside the window.
        vegetation_pixels: u64,
        /// Pixels examined.
        total_pixels: u64,
        /// Visualization variant.
        view: String,
    },
}

impl PipelineDiagnostics {
    /// Format diagnostics as a human-readable report.
    #[must_use]
    pub fn report(&self) -> String {
        let mut lines = Vec::new();

        lines.push(format!("Vegetation Diagnostics Report\n{}", "=".repeat(60)));
        lines.push(format!(
            "Total duration: {:.3}ms",
            duration_ms(self.total_duration),
        ));
        lines.push(String::new());
        lines.push(format!(
            "{:<16} {:>10} {:>10}  {}",
            "Stage", "Duration", "% Total", "Details"
        ));
        lines.push("-".repeat(80));

        let total_ms = duration_ms(self.total_duration);
        let stages = [
            ("Decode", &self.decode),
            ("Downsample", &self.downsample),
            ("Convert", &self.convert),
            ("Threshold", &self.threshold),
        ];
        for (name, diag) in stages {
            let ms = duration_ms(diag.duration);
            let pct = if total_ms > 0.0 {
                ms / total_ms * 100.0
            } else {
                0.0
            };
            let details = format_metrics(&diag.metrics);
            lines.push(format!("{name:<16} {ms:>8.3}ms {pct:>9.1}%  {details}"));
        }

        lines.join("\n")
    }
}

/// Convert a `Duration` to milliseconds as `f64`.
fn duration_ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

/// Format stage metrics into a compact detail string.
fn format_metrics(metrics: &StageMetrics) -> String {
    match metrics {
        StageMetrics::Decode {
            input_bytes,
            width,
            height,
            ..
        } => format!("{input_bytes} bytes -> {width}x{height}"),
        StageMetrics::Downsample {
            filter,
            max_width,
            original_width,
            original_height,
            width,
            height,
            applied,
        } => {
            if *applied {
                format!(
                    "{original_width}x{original_height} -> {width}x{height} ({filter}, cap {max_width})"
                )
            } else {
                format!("{width}x{height} unchanged (cap {max_width})")
            }
        }
        StageMetrics::Convert { pixel_count } => format!("{pixel_count} pixels"),
        StageMetrics::Threshold {
            thresholds,
            vegetation_pixels,
            total_pixels,
            view,
        } => {
            let pct = crate::mask::fraction(*vegetation_pixels, *total_pixels) * 100.0;
            format!("{thresholds}: {vegetation_pixels}/{total_pixels} ({pct:.2}%), {view} view")
        }
    }
}

/// Run the estimator on encoded bytes, timing every stage.
///
/// # Errors
///
/// Same as [`crate::estimate_from_bytes`].
pub fn estimate_with_diagnostics<C: Clock>(
    image_bytes: &[u8],
    config: &VegetationConfig,
    clock: &C,
) -> Result<(VegetationResult, PipelineDiagnostics), PipelineError> {
    let start = clock.now();

    let t = clock.now();
    let decoded = Pipeline::new(image_bytes.to_vec(), config.clone()).decode()?;
    let decode = StageDiagnostics {
        duration: clock.elapsed(&t),
        metrics: decoded.metrics(),
    };

    let t = clock.now();
    let downsampled = decoded.downsample();
    let downsample = StageDiagnostics {
        duration: clock.elapsed(&t),
        metrics: downsampled.metrics(),
    };

    let t = clock.now();
    let converted = downsampled.convert();
    let convert = StageDiagnostics {
        duration: clock.elapsed(&t),
        metrics: converted.metrics(),
    };

    let t = clock.now();
    let thresholded = converted.threshold();
    let threshold = StageDiagnostics {
        duration: clock.elapsed(&t),
        metrics: thresholded.metrics(),
    };

    let result = thresholded.into_result();
    let diagnostics = PipelineDiagnostics {
        decode,
        downsample,
        convert,
        threshold,
        total_duration: clock.elapsed(&start),
    };
    Ok((result, diagnostics))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::cell::Cell;

    use super::*;

    /// Clock that advances one millisecond per reading.
    struct TickClock(Cell<u64>);

    impl Clock for TickClock {
        type Instant = u64;

        fn now(&self) -> u64 {
            let t = self.0.get();
            self.0.set(t + 1);
            t
        }

        fn elapsed(&self, since: &u64) -> Duration {
            Duration::from_millis(self.0.get() - since)
        }
    }

    fn green_png() -> Vec<u8> {
        let img = image::RgbImage::from_pixel(12, 8, image::Rgb([0, 200, 0]));
        let mut buf = Vec::new();
        let encoder = image::codecs::png::PngEncoder::new(&mut buf);
        image::ImageEncoder::write_image(
            encoder,
            img.as_raw(),
            img.width(),
            img.height(),
            image::ExtendedColorType::Rgb8,
        )
        .unwrap();
        buf
    }

    #[test]
    fn duration_ms_converts_correctly() {
        let ms = duration_ms(Duration::from_millis(1234));
        assert!((ms - 1234.0).abs() < 0.01);
    }

    #[test]
    fn diagnostics_cover_every_stage() {
        let clock = TickClock(Cell::new(0));
        let (result, diag) =
            estimate_with_diagnostics(&green_png(), &VegetationConfig::default(), &clock).unwrap();
        assert!((result.fraction - 1.0).abs() < f64::EPSILON);
        assert!(matches!(
            diag.threshold.metrics,
            StageMetrics::Threshold {
                vegetation_pixels: 96,
                total_pixels: 96,
                ..
            }
        ));
        assert!(diag.total_duration >= diag.decode.duration);
        assert!(diag.decode.duration > Duration::ZERO);
    }

    #[test]
    fn diagnostics_propagate_decode_errors() {
        let clock = TickClock(Cell::new(0));
        let result = estimate_with_diagnostics(&[1, 2, 3], &VegetationConfig::default(), &clock);
        assert!(matches!(result, Err(PipelineError::ImageDecode(_))));
    }

    #[test]
    fn report_mentions_stages_and_thresholds() {
        let clock = TickClock(Cell::new(0));
        let (_, diag) =
            estimate_with_diagnostics(&green_png(), &VegetationConfig::default(), &clock).unwrap();
        let report = diag.report();
        assert!(report.contains("Vegetation Diagnostics Report"));
        assert!(report.contains("Downsample"));
        assert!(report.contains("H 35-85"));
        assert!(report.contains("96/96 (100.00%)"));
    }

    #[test]
    fn diagnostics_serialize_durations_as_seconds() {
        let clock = TickClock(Cell::new(0));
        let (_, diag) =
            estimate_with_diagnostics(&green_png(), &VegetationConfig::default(), &clock).unwrap();
        let json = serde_json::to_value(&diag).unwrap();
        assert!(json["total_duration"].is_f64());
        let back: PipelineDiagnostics = serde_json::from_value(json).unwrap();
        assert_eq!(back.total_duration, diag.total_duration);
    }
}

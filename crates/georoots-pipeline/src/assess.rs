//! One-call site assessment: vegetation, risk score and alert level.

use serde::{Deserialize, Serialize};

use crate::alert::{AlertLevel, AlertThresholds};
use crate::risk::{RiskAdapter, RiskError, RiskFeatureRecord, RiskScore};
use crate::types::{PipelineError, VegetationConfig, VegetationResult, VegetationSummary};

/// The four site measurements entered alongside the photo.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SiteReadings {
    /// Slope angle in degrees (advisory range 0-90).
    pub slope_angle_deg: f64,
    /// Factor of safety (advisory range 0-10).
    pub factor_of_safety: f64,
    /// Rainfall in mm/day (advisory range 0-5000).
    pub rainfall_mm_day: f64,
    /// Pore pressure in kPa (advisory range 0-5000).
    pub pore_pressure_kpa: f64,
}

impl SiteReadings {
    /// Combine the readings with a vegetation fraction into a model
    /// record.
    ///
    /// # Errors
    ///
    /// Returns [`RiskError::InvalidFeature`] for out-of-range values.
    pub fn record_with(&self, green_index: f64) -> Result<RiskFeatureRecord, RiskError> {
        RiskFeatureRecord::builder()
            .slope_angle_deg(self.slope_angle_deg)
            .factor_of_safety(self.factor_of_safety)
            .green_index(green_index)
            .rainfall_mm_day(self.rainfall_mm_day)
            .pore_pressure_kpa(self.pore_pressure_kpa)
            .build()
    }
}

/// Everything produced for one site.
#[derive(Debug, Clone)]
pub struct Assessment {
    /// Vegetation estimate from the photo.
    pub vegetation: VegetationResult,
    /// The record handed to the model.
    pub record: RiskFeatureRecord,
    /// Model output.
    pub score: RiskScore,
    /// Alert level of `score`.
    pub alert: AlertLevel,
}

impl Assessment {
    /// Raster-free summary for JSON output.
    #[must_use]
    pub fn summary(&self) -> AssessmentSummary {
        AssessmentSummary {
            vegetation: self.vegetation.summary(),
            record: self.record,
            score: self.score,
            alert: self.alert,
        }
    }
}

/// Serializable view of an [`Assessment`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AssessmentSummary {
    /// Vegetation summary.
    pub vegetation: VegetationSummary,
    /// Model input.
    pub record: RiskFeatureRecord,
    /// Model output.
    pub score: RiskScore,
    /// Alert level.
    pub alert: AlertLevel,
}

/// Failure at any step of an assessment.
#[derive(Debug, thiserror::Error)]
pub enum AssessError {
    /// The photo could not be analysed.
    #[error(transparent)]
    Vegetation(#[from] PipelineError),

    /// The record could not be built or scored.
    #[error(transparent)]
    Risk(#[from] RiskError),
}

/// Estimate vegetation, score the site and classify the score.
///
/// Any failure aborts the whole assessment.
///
/// # Errors
///
/// [`AssessError::Vegetation`] if the image cannot be analysed,
/// [`AssessError::Risk`] if the record is invalid, the model is
/// unavailable or scoring fails.
pub fn assess(
    image_bytes: &[u8],
    config: &VegetationConfig,
    readings: &SiteReadings,
    adapter: &RiskAdapter,
    thresholds: &AlertThresholds,
) -> Result<Assessment, AssessError> {
    let vegetation = crate::estimate_from_bytes(image_bytes, config)?;
    let record = readings.record_with(vegetation.fraction)?;
    let score = adapter.predict(&record)?;
    let alert = thresholds.classify(score.value());
    log::debug!("assessment: score {score} -> {alert}");
    Ok(Assessment {
        vegetation,
        record,
        score,
        alert,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::risk::{FeatureRow, ScoringError};

    fn sand_png() -> Vec<u8> {
        let img = image::RgbImage::from_pixel(8, 8, image::Rgb([210, 180, 140]));
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

    const READINGS: SiteReadings = SiteReadings {
        slope_angle_deg: 45.0,
        factor_of_safety: 0.9,
        rainfall_mm_day: 100.0,
        pore_pressure_kpa: 40.0,
    };

    #[test]
    fn assess_chains_all_three_steps() {
        let adapter = RiskAdapter::new(|row: &FeatureRow| -> Result<f64, ScoringError> {
            Ok(0.2 + row.get(crate::risk::Feature::GreenIndex))
        });
        let a = assess(
            &sand_png(),
            &VegetationConfig::default(),
            &READINGS,
            &adapter,
            &AlertThresholds::default(),
        )
        .unwrap();
        assert!(a.vegetation.fraction.abs() < f64::EPSILON);
        assert!((a.score.value() - 0.2).abs() < f64::EPSILON);
        assert_eq!(a.alert, AlertLevel::Low);
        assert!((a.record.slope_angle_deg() - 45.0).abs() < f64::EPSILON);
    }

    #[test]
    fn image_failure_aborts() {
        let adapter = RiskAdapter::new(|_: &FeatureRow| -> Result<f64, ScoringError> { Ok(0.1) });
        let result = assess(
            &[],
            &VegetationConfig::default(),
            &READINGS,
            &adapter,
            &AlertThresholds::default(),
        );
        assert!(matches!(
            result,
            Err(AssessError::Vegetation(PipelineError::EmptyInput))
        ));
    }

    #[test]
    fn unavailable_model_aborts() {
        let adapter = RiskAdapter::unavailable("no model file");
        let result = assess(
            &sand_png(),
            &VegetationConfig::default(),
            &READINGS,
            &adapter,
            &AlertThresholds::default(),
        );
        assert!(matches!(
            result,
            Err(AssessError::Risk(RiskError::ModelUnavailable { .. }))
        ));
    }

    #[test]
    fn invalid_reading_aborts() {
        let adapter = RiskAdapter::new(|_: &FeatureRow| -> Result<f64, ScoringError> { Ok(0.1) });
        let readings = SiteReadings {
            rainfall_mm_day: -5.0,
            ..READINGS
        };
        let result = assess(
            &sand_png(),
            &VegetationConfig::default(),
            &readings,
            &adapter,
            &AlertThresholds::default(),
        );
        assert!(matches!(
            result,
            Err(AssessError::Risk(RiskError::InvalidFeature { .. }))
        ));
    }

    #[test]
    fn summary_serializes_without_rasters() {
        let adapter = RiskAdapter::new(|_: &FeatureRow| -> Result<f64, ScoringError> { Ok(0.3) });
        let a = assess(
            &sand_png(),
            &VegetationConfig::default(),
            &READINGS,
            &adapter,
            &AlertThresholds::default(),
        )
        .unwrap();
        let json = serde_json::to_value(a.summary()).unwrap();
        assert_eq!(json["alert"], "High");
        assert_eq!(json["record"]["green_index"], 0.0);
        assert_eq!(json["vegetation"]["total_pixels"], 64);
    }
}

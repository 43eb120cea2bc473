//! Linear risk model loaded from a JSON artifact.
//!
//! The artifact is the exported form of the trained ridge regression:
//!
//! ```json
//! {
//!   "feature_names": ["slope_angle_deg", "factor_of_safety", "green_index",
//!                     "rainfall_mm_day", "pore_pressure_kpa"],
//!   "coefficients": [0.004, -0.05, -0.1, 0.0001, 0.0002],
//!   "intercept": 0.2
//! }
//! ```
//!
//! Feature names may appear in any order; coefficients are matched to
//! features by name, never by position in the scoring row.

use serde::{Deserialize, Serialize};

use crate::risk::{Feature, FeatureRow, RiskScorer, ScoringError};

/// On-disk layout of the model artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Artifact {
    feature_names: Vec<String>,
    coefficients: Vec<f64>,
    intercept: f64,
}

/// Ridge-style linear model: `intercept + sum(coef[f] * value[f])`.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearModel {
    /// Coefficients indexed by canonical feature position.
    coefficients: [f64; 5],
    intercept: f64,
}

impl LinearModel {
    /// Build a model from coefficients in canonical feature order.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::NonFinite`] if any parameter is NaN or
    /// infinite.
    pub fn new(coefficients: [f64; 5], intercept: f64) -> Result<Self, ModelError> {
        for feature in Feature::ALL {
            if !coefficients[feature.index()].is_finite() {
                return Err(ModelError::NonFinite(format!("coefficient for {feature}")));
            }
        }
        if !intercept.is_finite() {
            return Err(ModelError::NonFinite("intercept".to_owned()));
        }
        Ok(Self {
            coefficients,
            intercept,
        })
    }

    /// Parse a JSON artifact.
    ///
    /// # Errors
    ///
    /// [`ModelError::Parse`] for malformed JSON, [`ModelError::FeatureMismatch`]
    /// when the names are not exactly the five features or the
    /// coefficient count differs, [`ModelError::NonFinite`] for NaN or
    /// infinite parameters.
    pub fn from_json(json: &str) -> Result<Self, ModelError> {
        Self::from_artifact(serde_json::from_str(json)?)
    }

    /// Parse a JSON artifact from raw bytes.
    ///
    /// # Errors
    ///
    /// Same as [`Self::from_json`].
    pub fn from_slice(bytes: &[u8]) -> Result<Self, ModelError> {
        Self::from_artifact(serde_json::from_slice(bytes)?)
    }

    fn from_artifact(artifact: Artifact) -> Result<Self, ModelError> {
        if artifact.feature_names.len() != artifact.coefficients.len() {
            return Err(ModelError::FeatureMismatch(format!(
                "{} feature names but {} coefficients",
                artifact.feature_names.len(),
                artifact.coefficients.len()
            )));
        }

        let mut slots: [Option<f64>; 5] = [None; 5];
        for (name, &coef) in artifact.feature_names.iter().zip(&artifact.coefficients) {
            let feature = Feature::from_name(name)
                .ok_or_else(|| ModelError::FeatureMismatch(format!("unknown feature {name:?}")))?;
            if slots[feature.index()].replace(coef).is_some() {
                return Err(ModelError::FeatureMismatch(format!(
                    "feature {feature} listed twice"
                )));
            }
        }

        let mut coefficients = [0.0; 5];
        for feature in Feature::ALL {
            coefficients[feature.index()] = slots[feature.index()]
                .ok_or_else(|| ModelError::FeatureMismatch(format!("missing feature {feature}")))?;
        }
        Self::new(coefficients, artifact.intercept)
    }

    /// Serialize back to the artifact layout, in canonical order.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::Parse`] if serialization fails.
    pub fn to_json(&self) -> Result<String, ModelError> {
        let artifact = Artifact {
            feature_names: Feature::ALL.iter().map(|f| f.name().to_owned()).collect(),
            coefficients: self.coefficients.to_vec(),
            intercept: self.intercept,
        };
        Ok(serde_json::to_string_pretty(&artifact)?)
    }

    /// Coefficient of one feature.
    #[must_use]
    pub const fn coefficient(&self, feature: Feature) -> f64 {
        self.coefficients[feature.index()]
    }

    /// Model intercept.
    #[must_use]
    pub const fn intercept(&self) -> f64 {
        self.intercept
    }
}

impl RiskScorer for LinearModel {
    fn predict(&self, row: &FeatureRow) -> Result<f64, ScoringError> {
        Ok(row
            .iter()
            .fold(self.intercept, |acc, (feature, value)| {
                self.coefficient(feature).mul_add(value, acc)
            }))
    }
}

/// Errors from loading a model artifact.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    /// The artifact is not valid JSON of the expected shape.
    #[error("failed to parse model artifact: {0}")]
    Parse(#[from] serde_json::Error),

    /// The artifact's features do not match the five model features.
    #[error("model features do not match: {0}")]
    FeatureMismatch(String),

    /// A coefficient or the intercept is NaN or infinite.
    #[error("model {0} is not finite")]
    NonFinite(String),
}

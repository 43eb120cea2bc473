//! Risk inference adapter.
//!
//! Marshals the five site features into the row layout the scoring
//! model expects and turns scorer outcomes into [`RiskScore`] or a
//! [`RiskError`]. The model itself is injected through [`RiskScorer`];
//! this module never loads one and never substitutes a default score.

use std::fmt;
use std::sync::Arc;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

/// The five model features, in the canonical column order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    /// Slope angle in degrees.
    SlopeAngleDeg,
    /// Geotechnical factor of safety.
    FactorOfSafety,
    /// Vegetation fraction in `[0, 1]`.
    GreenIndex,
    /// Rainfall in mm/day.
    RainfallMmDay,
    /// Pore water pressure in kPa.
    PorePressureKpa,
}

impl Feature {
    /// Every feature in canonical column order.
    pub const ALL: [Self; 5] = [
        Self::SlopeAngleDeg,
        Self::FactorOfSafety,
        Self::GreenIndex,
        Self::RainfallMmDay,
        Self::PorePressureKpa,
    ];

    /// Column name used by the trained model.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::SlopeAngleDeg => "slope_angle_deg",
            Self::FactorOfSafety => "factor_of_safety",
            Self::GreenIndex => "green_index",
            Self::RainfallMmDay => "rainfall_mm_day",
            Self::PorePressureKpa => "pore_pressure_kpa",
        }
    }

    /// Look a feature up by its column name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.name() == name)
    }

    /// Position in [`Self::ALL`].
    pub(crate) const fn index(self) -> usize {
        match self {
            Self::SlopeAngleDeg => 0,
            Self::FactorOfSafety => 1,
            Self::GreenIndex => 2,
            Self::RainfallMmDay => 3,
            Self::PorePressureKpa => 4,
        }
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One named feature row as handed to a [`RiskScorer`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureRow {
    values: [f64; 5],
}

impl FeatureRow {
    /// Value of one feature.
    #[must_use]
    pub const fn get(&self, feature: Feature) -> f64 {
        self.values[feature.index()]
    }

    /// Value of a feature by column name, if the name is known.
    #[must_use]
    pub fn get_by_name(&self, name: &str) -> Option<f64> {
        Feature::from_name(name).map(|f| self.get(f))
    }

    /// `(feature, value)` pairs in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = (Feature, f64)> + '_ {
        Feature::ALL.into_iter().zip(self.values.iter().copied())
    }
}

/// Validated model input for one site.
///
/// Every value is finite and non-negative; `green_index` is also at
/// most 1. Build one with [`RiskFeatureRecord::builder`] or
/// [`RiskFeatureRecord::from_named`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RiskFeatureRecord {
    slope_angle_deg: f64,
    factor_of_safety: f64,
    green_index: f64,
    rainfall_mm_day: f64,
    pore_pressure_kpa: f64,
}

impl RiskFeatureRecord {
    /// Start a builder with every feature unset.
    #[must_use]
    pub const fn builder() -> RiskFeatureRecordBuilder {
        RiskFeatureRecordBuilder { values: [None; 5] }
    }

    /// Build a record from `(name, value)` pairs in any order.
    ///
    /// # Errors
    ///
    /// [`RiskError::UnknownFeature`] for a name outside the five
    /// features, [`RiskError::InvalidFeature`] for a repeated name or an
    /// out-of-range value, [`RiskError::MissingFeature`] if a feature
    /// is never given.
    pub fn from_named<I, S>(pairs: I) -> Result<Self, RiskError>
    where
        I: IntoIterator<Item = (S, f64)>,
        S: AsRef<str>,
    {
        let mut builder = Self::builder();
        for (name, value) in pairs {
            let name = name.as_ref();
            let feature =
                Feature::from_name(name).ok_or_else(|| RiskError::UnknownFeature(name.to_owned()))?;
            if builder.values[feature.index()].is_some() {
                return Err(RiskError::InvalidFeature {
                    feature,
                    value,
                    reason: "given more than once",
                });
            }
            builder = builder.set(feature, value);
        }
        builder.build()
    }

    /// Value of one feature.
    #[must_use]
    pub const fn get(&self, feature: Feature) -> f64 {
        match feature {
            Feature::SlopeAngleDeg => self.slope_angle_deg,
            Feature::FactorOfSafety => self.factor_of_safety,
            Feature::GreenIndex => self.green_index,
            Feature::RainfallMmDay => self.rainfall_mm_day,
            Feature::PorePressureKpa => self.pore_pressure_kpa,
        }
    }

    /// Slope angle in degrees.
    #[must_use]
    pub const fn slope_angle_deg(&self) -> f64 {
        self.slope_angle_deg
    }

    /// Factor of safety.
    #[must_use]
    pub const fn factor_of_safety(&self) -> f64 {
        self.factor_of_safety
    }

    /// Vegetation fraction.
    #[must_use]
    pub const fn green_index(&self) -> f64 {
        self.green_index
    }

    /// Rainfall in mm/day.
    #[must_use]
    pub const fn rainfall_mm_day(&self) -> f64 {
        self.rainfall_mm_day
    }

    /// Pore pressure in kPa.
    #[must_use]
    pub const fn pore_pressure_kpa(&self) -> f64 {
        self.pore_pressure_kpa
    }

    /// The record as a model row in canonical order.
    #[must_use]
    pub const fn to_row(&self) -> FeatureRow {
        FeatureRow {
            values: [
                self.slope_angle_deg,
                self.factor_of_safety,
                self.green_index,
                self.rainfall_mm_day,
                self.pore_pressure_kpa,
            ],
        }
    }
}

/// Builder for [`RiskFeatureRecord`]; fields may be set in any order.
#[derive(Debug, Clone, Copy, Default)]
#[must_use = "call .build() to obtain the record"]
pub struct RiskFeatureRecordBuilder {
    values: [Option<f64>; 5],
}

impl RiskFeatureRecordBuilder {
    /// Set one feature, replacing any earlier value.
    pub const fn set(mut self, feature: Feature, value: f64) -> Self {
        self.values[feature.index()] = Some(value);
        self
    }

    /// Set the slope angle.
    pub const fn slope_angle_deg(self, value: f64) -> Self {
        self.set(Feature::SlopeAngleDeg, value)
    }

    /// Set the factor of safety.
    pub const fn factor_of_safety(self, value: f64) -> Self {
        self.set(Feature::FactorOfSafety, value)
    }

    /// Set the vegetation fraction.
    pub const fn green_index(self, value: f64) -> Self {
        self.set(Feature::GreenIndex, value)
    }

    /// Set the rainfall.
    pub const fn rainfall_mm_day(self, value: f64) -> Self {
        self.set(Feature::RainfallMmDay, value)
    }

    /// Set the pore pressure.
    pub const fn pore_pressure_kpa(self, value: f64) -> Self {
        self.set(Feature::PorePressureKpa, value)
    }

    /// Validate and build the record.
    ///
    /// # Errors
    ///
    /// [`RiskError::MissingFeature`] for the first unset feature in
    /// canonical order, [`RiskError::InvalidFeature`] for a value that is
    /// not finite, negative, or (for `green_index`) above 1.
    pub fn build(self) -> Result<RiskFeatureRecord, RiskError> {
        let mut values = [0.0; 5];
        for feature in Feature::ALL {
            let value = self.values[feature.index()].ok_or(RiskError::MissingFeature(feature))?;
            validate_feature(feature, value)?;
            values[feature.index()] = value;
        }
        let [
            slope_angle_deg,
            factor_of_safety,
            green_index,
            rainfall_mm_day,
            pore_pressure_kpa,
        ] = values;
        Ok(RiskFeatureRecord {
            slope_angle_deg,
            factor_of_safety,
            green_index,
            rainfall_mm_day,
            pore_pressure_kpa,
        })
    }
}

fn validate_feature(feature: Feature, value: f64) -> Result<(), RiskError> {
    let reason = if !value.is_finite() {
        "must be finite"
    } else if value < 0.0 {
        "must not be negative"
    } else if feature == Feature::GreenIndex && value > 1.0 {
        "must be at most 1"
    } else {
        return Ok(());
    };
    Err(RiskError::InvalidFeature {
        feature,
        value,
        reason,
    })
}

/// A scorer failed to produce a score.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ScoringError {
    message: String,
}

impl ScoringError {
    /// Create a scoring error with a human-readable message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// A trained model that maps one feature row to a risk score.
pub trait RiskScorer {
    /// Score one row.
    ///
    /// # Errors
    ///
    /// Returns a [`ScoringError`] when the model cannot score the row.
    fn predict(&self, row: &FeatureRow) -> Result<f64, ScoringError>;
}

impl<F> RiskScorer for F
where
    F: Fn(&FeatureRow) -> Result<f64, ScoringError>,
{
    fn predict(&self, row: &FeatureRow) -> Result<f64, ScoringError> {
        self(row)
    }
}

/// A finite risk score as produced by the model.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RiskScore(f64);

impl RiskScore {
    /// Wrap a raw score; `None` if it is NaN or infinite.
    #[must_use]
    pub fn new(value: f64) -> Option<Self> {
        value.is_finite().then_some(Self(value))
    }

    /// The raw score.
    #[must_use]
    pub const fn value(self) -> f64 {
        self.0
    }
}

impl fmt::Display for RiskScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3}", self.0)
    }
}

/// Errors from building feature records or scoring them.
#[derive(Debug, thiserror::Error)]
pub enum RiskError {
    /// No scoring model is loaded.
    #[error("risk model unavailable: {reason}")]
    ModelUnavailable {
        /// Why the model could not be loaded.
        reason: String,
    },

    /// The model failed to score the row.
    #[error("risk scoring failed: {0}")]
    Scoring(#[from] ScoringError),

    /// A feature value is out of range.
    #[error("invalid {feature} = {value}: {reason}")]
    InvalidFeature {
        /// Offending feature.
        feature: Feature,
        /// Offending value.
        value: f64,
        /// What is wrong with it.
        reason: &'static str,
    },

    /// A feature was never given.
    #[error("missing feature {0}")]
    MissingFeature(Feature),

    /// A feature name outside the five known features.
    #[error("unknown feature {0:?}")]
    UnknownFeature(String),
}

/// Score one record.
///
/// # Errors
///
/// [`RiskError::ModelUnavailable`] when `scorer` is `None`;
/// [`RiskError::Scoring`] when the scorer fails or returns a non-finite
/// value.
pub fn predict(
    record: &RiskFeatureRecord,
    scorer: Option<&dyn RiskScorer>,
) -> Result<RiskScore, RiskError> {
    let scorer = scorer.ok_or_else(|| RiskError::ModelUnavailable {
        reason: "no scoring model was provided".to_owned(),
    })?;
    score_row(scorer, &record.to_row())
}

fn score_row(scorer: &dyn RiskScorer, row: &FeatureRow) -> Result<RiskScore, RiskError> {
    let raw = scorer.predict(row)?;
    if !raw.is_finite() {
        return Err(ScoringError::new(format!("model returned non-finite score {raw}")).into());
    }
    debug!("scored row {row:?} -> {raw}");
    Ok(RiskScore(raw))
}

/// Process-lifetime holder for the scoring model.
///
/// Either wraps a loaded scorer shared read-only, or remembers why
/// loading failed so every prediction reports
/// [`RiskError::ModelUnavailable`] with that reason.
#[derive(Clone)]
pub struct RiskAdapter {
    scorer: Result<Arc<dyn RiskScorer + Send + Sync>, String>,
}

impl RiskAdapter {
    /// Adapter around a loaded scorer.
    pub fn new(scorer: impl RiskScorer + Send + Sync + 'static) -> Self {
        Self {
            scorer: Ok(Arc::new(scorer)),
        }
    }

    /// Adapter around an already shared scorer.
    #[must_use]
    pub fn from_shared(scorer: Arc<dyn RiskScorer + Send + Sync>) -> Self {
        Self { scorer: Ok(scorer) }
    }

    /// Adapter whose model could not be loaded.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            scorer: Err(reason.into()),
        }
    }

    /// Adapter from the outcome of a model load, logging any failure.
    pub fn from_load<S, E>(loaded: Result<S, E>) -> Self
    where
        S: RiskScorer + Send + Sync + 'static,
        E: fmt::Display,
    {
        match loaded {
            Ok(scorer) => Self::new(scorer),
            Err(e) => {
                warn!("risk model failed to load: {e}");
                Self::unavailable(e.to_string())
            }
        }
    }

    /// Whether a scorer is loaded.
    #[must_use]
    pub const fn is_available(&self) -> bool {
        self.scorer.is_ok()
    }

    /// Why the model is unavailable, if it is.
    #[must_use]
    pub fn unavailable_reason(&self) -> Option<&str> {
        self.scorer.as_ref().err().map(String::as_str)
    }

    /// Score one record with the held model.
    ///
    /// # Errors
    ///
    /// Same as [`predict`], with the recorded load failure as the
    /// unavailability reason.
    pub fn predict(&self, record: &RiskFeatureRecord) -> Result<RiskScore, RiskError> {
        match &self.scorer {
            Ok(scorer) => score_row(scorer.as_ref(), &record.to_row()),
            Err(reason) => Err(RiskError::ModelUnavailable {
                reason: reason.clone(),
            }),
        }
    }
}

impl fmt::Debug for RiskAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.scorer {
            Ok(_) => f.write_str("RiskAdapter(loaded)"),
            Err(reason) => write!(f, "RiskAdapter(unavailable: {reason})"),
        }
    }
}

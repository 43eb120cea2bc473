//! Alert classification of risk scores.
//!
//! The default thresholds reproduce the deployed dashboard exactly,
//! including its gap: a score of exactly `0.21` (or NaN) falls through
//! both lower bands and is classified [`AlertLevel::High`].
//! [`LowerBoundary::Inclusive`] selects the gap-free variant.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Discrete alert level, ordered `Low < Medium < High`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AlertLevel {
    /// Below the low threshold.
    Low,
    /// Between the two thresholds.
    Medium,
    /// Everything else.
    High,
}

impl AlertLevel {
    /// Display label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
        }
    }
}

impl fmt::Display for AlertLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error parsing an [`AlertLevel`] label.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown alert level {0:?} (expected Low, Medium or High)")]
pub struct ParseAlertLevelError(String);

impl FromStr for AlertLevel {
    type Err = ParseAlertLevelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            _ => Err(ParseAlertLevelError(s.to_owned())),
        }
    }
}

/// How the lower threshold itself is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LowerBoundary {
    /// `score < low` is Low and `low < score <= medium` is Medium, so a
    /// score equal to `low` is High.
    #[default]
    Exclusive,
    /// `score <= low` is Low and `score <= medium` is Medium.
    Inclusive,
}

impl fmt::Display for LowerBoundary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exclusive => f.write_str("Exclusive"),
            Self::Inclusive => f.write_str("Inclusive"),
        }
    }
}

/// Score thresholds for [`AlertLevel`] classification.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertThresholds {
    /// Upper edge of the Low band.
    pub low_below: f64,
    /// Upper edge (inclusive) of the Medium band.
    pub medium_up_to: f64,
    /// Treatment of `low_below` itself.
    pub boundary: LowerBoundary,
}

impl AlertThresholds {
    /// Default upper edge of the Low band.
    pub const DEFAULT_LOW: f64 = 0.21;

    /// Default upper edge of the Medium band.
    pub const DEFAULT_MEDIUM: f64 = 0.25;

    /// Default treatment of `low_below` (a score equal to it is High).
    pub const DEFAULT_BOUNDARY: LowerBoundary = LowerBoundary::Exclusive;

    /// Classify a score. Total: every input, NaN included, gets a level.
    #[must_use]
    pub fn classify(&self, score: f64) -> AlertLevel {
        match self.boundary {
            LowerBoundary::Exclusive => {
                if score < self.low_below {
                    AlertLevel::Low
                } else if score > self.low_below && score <= self.medium_up_to {
                    AlertLevel::Medium
                } else {
                    AlertLevel::High
                }
            }
            LowerBoundary::Inclusive => {
                if score <= self.low_below {
                    AlertLevel::Low
                } else if score <= self.medium_up_to {
                    AlertLevel::Medium
                } else {
                    AlertLevel::High
                }
            }
        }
    }

    /// Check the thresholds are finite and ordered.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidThresholds`] otherwise.
    pub fn validate(&self) -> Result<(), InvalidThresholds> {
        if !self.low_below.is_finite() || !self.medium_up_to.is_finite() {
            return Err(InvalidThresholds(
                "thresholds must be finite".to_owned(),
            ));
        }
        if self.low_below > self.medium_up_to {
            return Err(InvalidThresholds(format!(
                "low_below ({}) must not exceed medium_up_to ({})",
                self.low_below, self.medium_up_to
            )));
        }
        Ok(())
    }
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self {
            low_below: Self::DEFAULT_LOW,
            medium_up_to: Self::DEFAULT_MEDIUM,
            boundary: Self::DEFAULT_BOUNDARY,
        }
    }
}

/// Alert thresholds that cannot classify sensibly.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid alert thresholds: {0}")]
pub struct InvalidThresholds(String);

/// Classify a score with the default thresholds.
#[must_use]
pub fn classify(score: f64) -> AlertLevel {
    AlertThresholds::default().classify(score)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const INCLUSIVE: AlertThresholds = AlertThresholds {
        low_below: AlertThresholds::DEFAULT_LOW,
        medium_up_to: AlertThresholds::DEFAULT_MEDIUM,
        boundary: LowerBoundary::Inclusive,
    };

    #[test]
    fn defaults_come_from_the_constants() {
        let t = AlertThresholds::default();
        assert_eq!(t.boundary, AlertThresholds::DEFAULT_BOUNDARY);
        assert_eq!(t.boundary, LowerBoundary::default());
        assert_eq!(t.classify(AlertThresholds::DEFAULT_LOW), AlertLevel::High);
    }

    #[test]
    fn default_table() {
        assert_eq!(classify(0.0), AlertLevel::Low);
        assert_eq!(classify(0.2), AlertLevel::Low);
        assert_eq!(classify(0.22), AlertLevel::Medium);
        assert_eq!(classify(0.25), AlertLevel::Medium);
        assert_eq!(classify(0.30), AlertLevel::High);
        assert_eq!(classify(1.5), AlertLevel::High);
    }

    #[test]
    fn exactly_low_threshold_is_high_by_default() {
        assert_eq!(classify(0.21), AlertLevel::High);
    }

    #[test]
    fn nan_is_high() {
        assert_eq!(classify(f64::NAN), AlertLevel::High);
        assert_eq!(INCLUSIVE.classify(f64::NAN), AlertLevel::High);
    }

    #[test]
    fn negative_scores_are_low() {
        assert_eq!(classify(-3.0), AlertLevel::Low);
        assert_eq!(classify(f64::NEG_INFINITY), AlertLevel::Low);
    }

    #[test]
    fn inclusive_boundary_closes_the_gap() {
        assert_eq!(INCLUSIVE.classify(0.21), AlertLevel::Low);
        assert_eq!(INCLUSIVE.classify(0.2100001), AlertLevel::Medium);
        assert_eq!(INCLUSIVE.classify(0.25), AlertLevel::Medium);
        assert_eq!(INCLUSIVE.classify(0.2500001), AlertLevel::High);
    }

    #[test]
    fn levels_are_ordered() {
        assert!(AlertLevel::Low < AlertLevel::Medium);
        assert!(AlertLevel::Medium < AlertLevel::High);
    }

    #[test]
    fn classification_is_monotonic_off_the_boundary() {
        let mut previous = AlertLevel::Low;
        for i in 0..=100 {
            let score = f64::from(i) / 100.0;
            if (score - AlertThresholds::DEFAULT_LOW).abs() < 1e-12 {
                continue;
            }
            let level = classify(score);
            assert!(level >= previous, "score {score}");
            previous = level;
        }
    }

    #[test]
    fn parse_labels() {
        assert_eq!("low".parse::<AlertLevel>().unwrap(), AlertLevel::Low);
        assert_eq!(" Medium ".parse::<AlertLevel>().unwrap(), AlertLevel::Medium);
        assert_eq!("HIGH".parse::<AlertLevel>().unwrap(), AlertLevel::High);
        assert!("severe".parse::<AlertLevel>().is_err());
    }

    #[test]
    fn partial_json_fills_defaults() {
        let t: AlertThresholds = serde_json::from_str(r#"{"boundary": "Inclusive"}"#).unwrap();
        assert_eq!(t, INCLUSIVE);
    }

    #[test]
    fn validate_rejects_inverted_bands() {
        let t = AlertThresholds {
            low_below: 0.3,
            medium_up_to: 0.2,
            ..AlertThresholds::default()
        };
        assert!(t.validate().is_err());
        assert!(AlertThresholds::default().validate().is_ok());
        let nan = AlertThresholds {
            low_below: f64::NAN,
            ..AlertThresholds::default()
        };
        assert!(nan.validate().is_err());
    }
}

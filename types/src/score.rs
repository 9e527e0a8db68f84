use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum ScoreError {
    #[error("normalized score must be within 0-100 (got {0})")]
    OutOfRange(f64),
    #[error("normalized score must be a finite number")]
    NotFinite,
}

/// A grade on the canonical 0-100 scale, independent of origin system.
///
/// Always derived, never persisted. Construction guarantees the value is
/// finite and within [0, 100].
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct NormalizedScore(f64);

impl NormalizedScore {
    pub fn new(value: f64) -> Result<Self, ScoreError> {
        if !value.is_finite() {
            return Err(ScoreError::NotFinite);
        }
        if !(0.0..=100.0).contains(&value) {
            return Err(ScoreError::OutOfRange(value));
        }
        Ok(Self(value))
    }

    /// Clamp an already-computed value into the scale. Normalization formulas
    /// stay inside [0, 100] for valid grades; this keeps float edge cases out.
    #[must_use]
    pub fn clamped(value: f64) -> Self {
        if value.is_finite() {
            Self(value.clamp(0.0, 100.0))
        } else {
            Self(0.0)
        }
    }

    #[must_use]
    pub const fn value(&self) -> f64 {
        self.0
    }

    /// Rounded to two decimal places, the precision reported by conversions.
    #[must_use]
    pub fn rounded(&self) -> Self {
        Self((self.0 * 100.0).round() / 100.0)
    }
}

impl TryFrom<f64> for NormalizedScore {
    type Error = ScoreError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<NormalizedScore> for f64 {
    fn from(score: NormalizedScore) -> Self {
        score.0
    }
}

impl fmt::Display for NormalizedScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_out_of_range_and_non_finite() {
        assert!(NormalizedScore::new(-0.1).is_err());
        assert!(NormalizedScore::new(100.1).is_err());
        assert!(NormalizedScore::new(f64::NAN).is_err());
        assert!(NormalizedScore::new(0.0).is_ok());
        assert!(NormalizedScore::new(100.0).is_ok());
    }

    #[test]
    fn clamped_pins_to_scale() {
        assert_eq!(NormalizedScore::clamped(120.0).value(), 100.0);
        assert_eq!(NormalizedScore::clamped(-3.0).value(), 0.0);
        assert_eq!(NormalizedScore::clamped(55.5).value(), 55.5);
    }

    #[test]
    fn rounds_to_two_decimals() {
        let score = NormalizedScore::clamped(66.666_666);
        assert_eq!(score.rounded().value(), 66.67);
    }

    #[test]
    fn scores_are_ordered() {
        assert!(NormalizedScore::clamped(90.0) > NormalizedScore::clamped(40.0));
    }
}

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CycleError {
    #[error("academic year must be within 1900-2200 (got {0})")]
    YearOutOfRange(u16),
    #[error("academic period must not be empty")]
    EmptyPeriod,
    #[error("evaluation type must not be empty")]
    EmptyEvaluationType,
}

/// The academic cycle a grade was earned in: a year plus the institution's
/// own period label ("S1", "Trimester 2", ...). The label is opaque here.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "AcademicCycleRepr", into = "AcademicCycleRepr")]
pub struct AcademicCycle {
    year: u16,
    period: String,
}

#[derive(Serialize, Deserialize)]
struct AcademicCycleRepr {
    year: u16,
    period: String,
}

impl TryFrom<AcademicCycleRepr> for AcademicCycle {
    type Error = CycleError;

    fn try_from(repr: AcademicCycleRepr) -> Result<Self, Self::Error> {
        Self::new(repr.year, repr.period)
    }
}

impl From<AcademicCycle> for AcademicCycleRepr {
    fn from(cycle: AcademicCycle) -> Self {
        Self {
            year: cycle.year,
            period: cycle.period,
        }
    }
}

impl AcademicCycle {
    pub fn new(year: u16, period: impl Into<String>) -> Result<Self, CycleError> {
        if !(1900..=2200).contains(&year) {
            return Err(CycleError::YearOutOfRange(year));
        }
        let period = period.into();
        if period.trim().is_empty() {
            return Err(CycleError::EmptyPeriod);
        }
        Ok(Self { year, period })
    }

    #[must_use]
    pub const fn year(&self) -> u16 {
        self.year
    }

    #[must_use]
    pub fn period(&self) -> &str {
        &self.period
    }
}

impl fmt::Display for AcademicCycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.year, self.period)
    }
}

/// What kind of evaluation produced the grade ("final", "midterm", ...).
/// Institutions use their own vocabularies, so this is a non-empty label,
/// not a closed enum.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EvaluationType(String);

impl EvaluationType {
    pub fn new(value: impl Into<String>) -> Result<Self, CycleError> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(CycleError::EmptyEvaluationType);
        }
        Ok(Self(value))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for EvaluationType {
    type Error = CycleError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<EvaluationType> for String {
    fn from(value: EvaluationType) -> Self {
        value.0
    }
}

impl fmt::Display for EvaluationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cycle_validates_year_and_period() {
        assert!(AcademicCycle::new(1800, "S1").is_err());
        assert!(AcademicCycle::new(2024, "  ").is_err());
        let cycle = AcademicCycle::new(2024, "S1").unwrap();
        assert_eq!(cycle.year(), 2024);
        assert_eq!(cycle.period(), "S1");
    }

    #[test]
    fn evaluation_type_rejects_empty() {
        assert!(EvaluationType::new("").is_err());
        assert!(EvaluationType::new("final").is_ok());
    }
}

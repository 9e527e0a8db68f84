//! Grade values, one validated constructor per grading system.
//!
//! `GradeValue` is a real sum type (not a system tag + "sometimes-meaningful"
//! fields). Range and presence constraints are enforced at construction time
//! and on deserialization, so holding a value means it is well-formed for its
//! system.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::system::GradingSystem;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum GradeValueError {
    #[error("UK numeric grade must be 1-9 (got {0})")]
    UkNumericOutOfRange(u8),
    #[error("unknown UK letter grade: {0}")]
    UkUnknownLetter(String),
    #[error("US grade needs at least one of letter, percentage, or gpa")]
    UsEmpty,
    #[error("US percentage must be within 0-100 (got {0})")]
    UsPercentageOutOfRange(f64),
    #[error("US gpa must be within 0.0-4.0 (got {0})")]
    UsGpaOutOfRange(f64),
    #[error("unknown US letter grade: {0}")]
    UsUnknownLetter(String),
    #[error("German nota must be within 1.0-6.0 (got {0})")]
    DeNotaOutOfRange(f64),
    #[error("Argentine nota must be within 1-10 (got {0})")]
    ArNotaOutOfRange(u8),
}

// ============================================================================
// United Kingdom
// ============================================================================

/// UK letter grades, best to worst.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UkLetter {
    #[serde(rename = "A*")]
    AStar,
    A,
    B,
    C,
    D,
    E,
    F,
    U,
}

impl UkLetter {
    /// All eight letters, best to worst.
    pub const ALL: [UkLetter; 8] = [
        UkLetter::AStar,
        UkLetter::A,
        UkLetter::B,
        UkLetter::C,
        UkLetter::D,
        UkLetter::E,
        UkLetter::F,
        UkLetter::U,
    ];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            UkLetter::AStar => "A*",
            UkLetter::A => "A",
            UkLetter::B => "B",
            UkLetter::C => "C",
            UkLetter::D => "D",
            UkLetter::E => "E",
            UkLetter::F => "F",
            UkLetter::U => "U",
        }
    }

    pub fn parse(s: &str) -> Result<Self, GradeValueError> {
        match s.trim().to_ascii_uppercase().as_str() {
            "A*" => Ok(UkLetter::AStar),
            "A" => Ok(UkLetter::A),
            "B" => Ok(UkLetter::B),
            "C" => Ok(UkLetter::C),
            "D" => Ok(UkLetter::D),
            "E" => Ok(UkLetter::E),
            "F" => Ok(UkLetter::F),
            "U" => Ok(UkLetter::U),
            other => Err(GradeValueError::UkUnknownLetter(other.to_string())),
        }
    }
}

/// The graded mark itself: a letter (A-level style) or a 9-1 numeric (GCSE).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UkMark {
    Letter(UkLetter),
    Numeric(u8),
}

/// A UK grade: letter or numeric mark, plus optional UCAS tariff points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "UkGradeRepr", into = "UkGradeRepr")]
pub struct UkGrade {
    mark: UkMark,
    points: Option<u16>,
}

#[derive(Serialize, Deserialize)]
struct UkGradeRepr {
    mark: UkMark,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    points: Option<u16>,
}

impl TryFrom<UkGradeRepr> for UkGrade {
    type Error = GradeValueError;

    fn try_from(repr: UkGradeRepr) -> Result<Self, Self::Error> {
        let grade = match repr.mark {
            UkMark::Letter(letter) => UkGrade::letter(letter),
            UkMark::Numeric(n) => UkGrade::numeric(n)?,
        };
        Ok(match repr.points {
            Some(points) => grade.with_points(points),
            None => grade,
        })
    }
}

impl From<UkGrade> for UkGradeRepr {
    fn from(grade: UkGrade) -> Self {
        Self {
            mark: grade.mark,
            points: grade.points,
        }
    }
}

impl UkGrade {
    #[must_use]
    pub const fn letter(letter: UkLetter) -> Self {
        Self {
            mark: UkMark::Letter(letter),
            points: None,
        }
    }

    /// GCSE-style numeric grade, 9 (best) down to 1.
    pub const fn numeric(grade: u8) -> Result<Self, GradeValueError> {
        if grade < 1 || grade > 9 {
            return Err(GradeValueError::UkNumericOutOfRange(grade));
        }
        Ok(Self {
            mark: UkMark::Numeric(grade),
            points: None,
        })
    }

    #[must_use]
    pub const fn with_points(mut self, points: u16) -> Self {
        self.points = Some(points);
        self
    }

    #[must_use]
    pub const fn mark(&self) -> UkMark {
        self.mark
    }

    #[must_use]
    pub const fn points(&self) -> Option<u16> {
        self.points
    }
}

// ============================================================================
// United States
// ============================================================================

/// US letter grades, best to worst. Thirteen steps, `A+` through `F`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UsLetter {
    #[serde(rename = "A+")]
    APlus,
    A,
    #[serde(rename = "A-")]
    AMinus,
    #[serde(rename = "B+")]
    BPlus,
    B,
    #[serde(rename = "B-")]
    BMinus,
    #[serde(rename = "C+")]
    CPlus,
    C,
    #[serde(rename = "C-")]
    CMinus,
    #[serde(rename = "D+")]
    DPlus,
    D,
    #[serde(rename = "D-")]
    DMinus,
    F,
}

impl UsLetter {
    /// All thirteen letters, best to worst.
    pub const ALL: [UsLetter; 13] = [
        UsLetter::APlus,
        UsLetter::A,
        UsLetter::AMinus,
        UsLetter::BPlus,
        UsLetter::B,
        UsLetter::BMinus,
        UsLetter::CPlus,
        UsLetter::C,
        UsLetter::CMinus,
        UsLetter::DPlus,
        UsLetter::D,
        UsLetter::DMinus,
        UsLetter::F,
    ];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            UsLetter::APlus => "A+",
            UsLetter::A => "A",
            UsLetter::AMinus => "A-",
            UsLetter::BPlus => "B+",
            UsLetter::B => "B",
            UsLetter::BMinus => "B-",
            UsLetter::CPlus => "C+",
            UsLetter::C => "C",
            UsLetter::CMinus => "C-",
            UsLetter::DPlus => "D+",
            UsLetter::D => "D",
            UsLetter::DMinus => "D-",
            UsLetter::F => "F",
        }
    }

    pub fn parse(s: &str) -> Result<Self, GradeValueError> {
        let wanted = s.trim().to_ascii_uppercase();
        UsLetter::ALL
            .iter()
            .find(|letter| letter.as_str() == wanted)
            .copied()
            .ok_or(GradeValueError::UsUnknownLetter(wanted))
    }
}

/// A US grade: letter, percentage, and/or GPA. At least one is present.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "UsGradeRepr", into = "UsGradeRepr")]
pub struct UsGrade {
    letter: Option<UsLetter>,
    percentage: Option<f64>,
    gpa: Option<f64>,
}

#[derive(Serialize, Deserialize)]
struct UsGradeRepr {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    letter: Option<UsLetter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    percentage: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    gpa: Option<f64>,
}

impl TryFrom<UsGradeRepr> for UsGrade {
    type Error = GradeValueError;

    fn try_from(repr: UsGradeRepr) -> Result<Self, Self::Error> {
        UsGrade::new(repr.letter, repr.percentage, repr.gpa)
    }
}

impl From<UsGrade> for UsGradeRepr {
    fn from(grade: UsGrade) -> Self {
        Self {
            letter: grade.letter,
            percentage: grade.percentage,
            gpa: grade.gpa,
        }
    }
}

impl UsGrade {
    pub fn new(
        letter: Option<UsLetter>,
        percentage: Option<f64>,
        gpa: Option<f64>,
    ) -> Result<Self, GradeValueError> {
        if letter.is_none() && percentage.is_none() && gpa.is_none() {
            return Err(GradeValueError::UsEmpty);
        }
        if let Some(p) = percentage {
            if !p.is_finite() || !(0.0..=100.0).contains(&p) {
                return Err(GradeValueError::UsPercentageOutOfRange(p));
            }
        }
        if let Some(g) = gpa {
            if !g.is_finite() || !(0.0..=4.0).contains(&g) {
                return Err(GradeValueError::UsGpaOutOfRange(g));
            }
        }
        Ok(Self {
            letter,
            percentage,
            gpa,
        })
    }

    #[must_use]
    pub const fn from_letter(letter: UsLetter) -> Self {
        Self {
            letter: Some(letter),
            percentage: None,
            gpa: None,
        }
    }

    pub fn from_percentage(percentage: f64) -> Result<Self, GradeValueError> {
        Self::new(None, Some(percentage), None)
    }

    pub fn from_gpa(gpa: f64) -> Result<Self, GradeValueError> {
        Self::new(None, None, Some(gpa))
    }

    /// All three representations, with out-of-range inputs clamped into
    /// their scales. Used when the values are computed rather than recorded.
    #[must_use]
    pub fn full(letter: UsLetter, percentage: f64, gpa: f64) -> Self {
        Self {
            letter: Some(letter),
            percentage: Some(percentage.clamp(0.0, 100.0)),
            gpa: Some(gpa.clamp(0.0, 4.0)),
        }
    }

    #[must_use]
    pub const fn letter(&self) -> Option<UsLetter> {
        self.letter
    }

    #[must_use]
    pub const fn percentage(&self) -> Option<f64> {
        self.percentage
    }

    #[must_use]
    pub const fn gpa(&self) -> Option<f64> {
        self.gpa
    }
}

// ============================================================================
// Germany
// ============================================================================

/// A German grade on the inverted 1.0-6.0 scale; 1.0 is best.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct DeGrade(f64);

impl DeGrade {
    pub fn new(nota: f64) -> Result<Self, GradeValueError> {
        if !nota.is_finite() || !(1.0..=6.0).contains(&nota) {
            return Err(GradeValueError::DeNotaOutOfRange(nota));
        }
        Ok(Self(nota))
    }

    /// Clamp into the valid scale. Used for computed notas.
    #[must_use]
    pub fn clamped(nota: f64) -> Self {
        if nota.is_finite() {
            Self(nota.clamp(1.0, 6.0))
        } else {
            Self(6.0)
        }
    }

    #[must_use]
    pub const fn nota(&self) -> f64 {
        self.0
    }
}

impl TryFrom<f64> for DeGrade {
    type Error = GradeValueError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<DeGrade> for f64 {
    fn from(grade: DeGrade) -> Self {
        grade.0
    }
}

// ============================================================================
// Argentina
// ============================================================================

/// An Argentine grade, integer 1-10. `aprobado` is derived, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct ArGrade(u8);

impl ArGrade {
    /// The lowest passing nota.
    pub const PASSING_NOTA: u8 = 4;

    pub const fn new(nota: u8) -> Result<Self, GradeValueError> {
        if nota < 1 || nota > 10 {
            return Err(GradeValueError::ArNotaOutOfRange(nota));
        }
        Ok(Self(nota))
    }

    /// Clamp into the valid scale. Used for computed notas.
    #[must_use]
    pub fn clamped(nota: i64) -> Self {
        Self(nota.clamp(1, 10) as u8)
    }

    #[must_use]
    pub const fn nota(&self) -> u8 {
        self.0
    }

    /// Whether the grade passes. Derived from the nota, by definition.
    #[must_use]
    pub const fn aprobado(&self) -> bool {
        self.0 >= Self::PASSING_NOTA
    }
}

impl TryFrom<u8> for ArGrade {
    type Error = GradeValueError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ArGrade> for u8 {
    fn from(grade: ArGrade) -> Self {
        grade.0
    }
}

// ============================================================================
// GradeValue
// ============================================================================

/// A grade as recorded in one of the supported systems.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "system", content = "grade", rename_all = "lowercase")]
pub enum GradeValue {
    Uk(UkGrade),
    Us(UsGrade),
    De(DeGrade),
    Ar(ArGrade),
}

impl GradeValue {
    /// The grading system this value belongs to.
    #[must_use]
    pub const fn system(&self) -> GradingSystem {
        match self {
            GradeValue::Uk(_) => GradingSystem::Uk,
            GradeValue::Us(_) => GradingSystem::Us,
            GradeValue::De(_) => GradingSystem::De,
            GradeValue::Ar(_) => GradingSystem::Ar,
        }
    }

    /// Canonical JSON form: the stable representation used for persistence,
    /// integrity hashing, and cache keys.
    pub fn canonical_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

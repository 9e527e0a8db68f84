//! Pure normalization and denormalization.
//!
//! `normalize` and `denormalize` are total functions: grade values are
//! validated at construction, so the "missing sub-field" failure the legacy
//! string-dispatch code had to guard against is unrepresentable here. The
//! only conversion-time failure left is asking for a same-system conversion,
//! which the engine rejects.

use tabula_types::{
    ArGrade, DeGrade, GradeValue, GradingSystem, NormalizedScore, UkGrade, UkLetter, UkMark,
    UsGrade, UsLetter,
};

use crate::tables::{UkBand, DE_CANONICAL_NOTAS, UK_BANDS, US_LETTER_PERCENTAGES};

/// Map a grade to the canonical 0-100 scale.
///
/// - UK letters map to the midpoint of their band; numeric n maps to n/9×100.
/// - US prefers percentage, then gpa/4×100, then the letter's fixed
///   percentage. This precedence is the documented fallback; nothing else is
///   derived.
/// - DE is inverted: (6 − nota)/5×100.
/// - AR: nota×10.
#[must_use]
pub fn normalize(value: &GradeValue) -> NormalizedScore {
    let raw = match value {
        GradeValue::Uk(uk) => normalize_uk(uk),
        GradeValue::Us(us) => normalize_us(us),
        GradeValue::De(de) => (6.0 - de.nota()) / 5.0 * 100.0,
        GradeValue::Ar(ar) => f64::from(ar.nota()) * 10.0,
    };
    NormalizedScore::clamped(raw)
}

fn normalize_uk(grade: &UkGrade) -> f64 {
    match grade.mark() {
        UkMark::Letter(letter) => uk_band(letter).midpoint(),
        UkMark::Numeric(n) => f64::from(n) / 9.0 * 100.0,
    }
}

fn normalize_us(grade: &UsGrade) -> f64 {
    if let Some(percentage) = grade.percentage() {
        percentage
    } else if let Some(gpa) = grade.gpa() {
        gpa / 4.0 * 100.0
    } else if let Some(letter) = grade.letter() {
        us_letter_percentage(letter)
    } else {
        // Unreachable: UsGrade construction requires at least one field.
        0.0
    }
}

/// Map a canonical score back into a destination system's representation.
#[must_use]
pub fn denormalize(score: NormalizedScore, destination: GradingSystem) -> GradeValue {
    let s = score.value();
    match destination {
        GradingSystem::Uk => GradeValue::Uk(denormalize_uk(s)),
        GradingSystem::Us => GradeValue::Us(denormalize_us(s)),
        GradingSystem::De => {
            let nota = round1((6.0 - s / 100.0 * 5.0).clamp(1.0, 6.0));
            GradeValue::De(DeGrade::clamped(nota))
        }
        GradingSystem::Ar => GradeValue::Ar(ArGrade::clamped((s / 10.0).round() as i64)),
    }
}

fn denormalize_uk(score: f64) -> UkGrade {
    // First band (descending by minimum) containing the score. Bands tile
    // the whole scale, so the fallback only guards float edge cases.
    let letter = UK_BANDS
        .iter()
        .find(|band| band.contains(score))
        .map_or(UkLetter::U, |band| band.letter);
    UkGrade::letter(letter)
}

fn denormalize_us(score: f64) -> UsGrade {
    let gpa = round2(score / 100.0 * 4.0);
    let percentage = score.round();
    UsGrade::full(nearest_us_letter(score), percentage, gpa)
}

/// Nearest fixed-percentage threshold; exact ties resolve to the better
/// letter, which the best-first table order gives us for free.
fn nearest_us_letter(score: f64) -> UsLetter {
    let mut best = UsLetter::F;
    let mut best_distance = f64::INFINITY;
    for (letter, percentage) in US_LETTER_PERCENTAGES {
        let distance = (score - percentage).abs();
        if distance < best_distance {
            best = letter;
            best_distance = distance;
        }
    }
    best
}

fn uk_band(letter: UkLetter) -> &'static UkBand {
    UK_BANDS
        .iter()
        .find(|band| band.letter == letter)
        .unwrap_or(&UK_BANDS[UK_BANDS.len() - 1])
}

fn us_letter_percentage(letter: UsLetter) -> f64 {
    US_LETTER_PERCENTAGES
        .iter()
        .find(|(candidate, _)| *candidate == letter)
        .map_or(0.0, |(_, percentage)| *percentage)
}

/// Every discrete grade point of a system's domain, in its natural
/// best-to-worst order. Continuous sub-scales (UK numeric, US percentage and
/// gpa) are represented by their discrete letter domains.
#[must_use]
pub fn domain_values(system: GradingSystem) -> Vec<GradeValue> {
    match system {
        GradingSystem::Uk => UkLetter::ALL
            .iter()
            .map(|letter| GradeValue::Uk(UkGrade::letter(*letter)))
            .collect(),
        GradingSystem::Us => UsLetter::ALL
            .iter()
            .map(|letter| GradeValue::Us(UsGrade::from_letter(*letter)))
            .collect(),
        GradingSystem::De => DE_CANONICAL_NOTAS
            .iter()
            .map(|nota| GradeValue::De(DeGrade::clamped(*nota)))
            .collect(),
        GradingSystem::Ar => (1..=10)
            .rev()
            .map(|nota| GradeValue::Ar(ArGrade::clamped(nota)))
            .collect(),
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

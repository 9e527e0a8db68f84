//! Per-system band tables.
//!
//! Immutable constants consumed by the pure functions in
//! [`normalize`](crate::normalize). Band order matters: every table is laid
//! out best grade first, and lookups rely on that ordering.

use tabula_types::{UkLetter, UsLetter};

/// A UK letter band on the 0-100 scale. `min` and `max` are the integer
/// grade boundaries; fractional scores between `max` and the next band's
/// minimum (89.5, say) still belong to this band.
#[derive(Debug, Clone, Copy)]
pub struct UkBand {
    pub letter: UkLetter,
    pub min: f64,
    pub max: f64,
}

impl UkBand {
    /// Bands step by whole numbers, so each one covers [min, min of the band
    /// above), which is [min, max + 1). The top band's max is 100, making
    /// its upper edge inclusive.
    #[must_use]
    pub fn contains(&self, score: f64) -> bool {
        self.min <= score && score < self.max + 1.0
    }

    #[must_use]
    pub fn midpoint(&self) -> f64 {
        (self.min + self.max) / 2.0
    }
}

/// UK letter bands, best to worst. The failing region [0, 39] is split so
/// that each of the eight letters owns a disjoint band: F covers [20, 39]
/// and U covers [0, 19], with U doubling as the below-everything fallback.
pub const UK_BANDS: [UkBand; 8] = [
    UkBand { letter: UkLetter::AStar, min: 90.0, max: 100.0 },
    UkBand { letter: UkLetter::A, min: 80.0, max: 89.0 },
    UkBand { letter: UkLetter::B, min: 70.0, max: 79.0 },
    UkBand { letter: UkLetter::C, min: 60.0, max: 69.0 },
    UkBand { letter: UkLetter::D, min: 50.0, max: 59.0 },
    UkBand { letter: UkLetter::E, min: 40.0, max: 49.0 },
    UkBand { letter: UkLetter::F, min: 20.0, max: 39.0 },
    UkBand { letter: UkLetter::U, min: 0.0, max: 19.0 },
];

/// Fixed percentage equivalents for US letters (band midpoints of the common
/// 13-step scale), best to worst. Both directions use this one table:
/// letter → percentage when normalizing, nearest-percentage when picking a
/// letter back out.
pub const US_LETTER_PERCENTAGES: [(UsLetter, f64); 13] = [
    (UsLetter::APlus, 98.5),
    (UsLetter::A, 94.5),
    (UsLetter::AMinus, 91.0),
    (UsLetter::BPlus, 88.0),
    (UsLetter::B, 84.5),
    (UsLetter::BMinus, 81.0),
    (UsLetter::CPlus, 78.0),
    (UsLetter::C, 74.5),
    (UsLetter::CMinus, 71.0),
    (UsLetter::DPlus, 68.0),
    (UsLetter::D, 64.5),
    (UsLetter::DMinus, 61.0),
    (UsLetter::F, 29.5),
];

/// A German descriptive band: every nota up to `max_nota` (inclusive) falls
/// under `descriptor`.
#[derive(Debug, Clone, Copy)]
pub struct DeBand {
    pub descriptor: &'static str,
    pub max_nota: f64,
}

/// German descriptive bands, best to worst.
pub const DE_BANDS: [DeBand; 6] = [
    DeBand { descriptor: "sehr gut", max_nota: 1.5 },
    DeBand { descriptor: "gut", max_nota: 2.5 },
    DeBand { descriptor: "befriedigend", max_nota: 3.5 },
    DeBand { descriptor: "ausreichend", max_nota: 4.0 },
    DeBand { descriptor: "mangelhaft", max_nota: 5.0 },
    DeBand { descriptor: "ungenügend", max_nota: 6.0 },
];

/// The twelve canonical third-step notas of the German university scale,
/// best (1.0) to worst (6.0).
pub const DE_CANONICAL_NOTAS: [f64; 12] = [
    1.0, 1.3, 1.7, 2.0, 2.3, 2.7, 3.0, 3.3, 3.7, 4.0, 5.0, 6.0,
];

/// Descriptive band for a nota: the first band whose upper bound covers it,
/// else the worst band.
#[must_use]
pub fn de_descriptor(nota: f64) -> &'static str {
    DE_BANDS
        .iter()
        .find(|band| nota <= band.max_nota)
        .unwrap_or(&DE_BANDS[DE_BANDS.len() - 1])
        .descriptor
}

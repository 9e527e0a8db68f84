//! Integrity hashing over a fixed field projection.
//!
//! The hash deliberately covers an explicitly-ordered projection of the
//! record rather than the whole persisted row: incidental shape changes
//! (added columns, storage-layer decoration) must never trip the tamper
//! alarm. The projection is the set of facts that make the grade what it
//! is; everything else is bookkeeping.

use std::fmt;

use chrono::NaiveDate;
use sha2::{Digest, Sha256};

use tabula_types::{ActorId, AcademicCycle, EvaluationType, GradeValue, GradingSystem};

/// Hex-encoded SHA-256 over the fixed projection.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct IntegrityHash(String);

impl IntegrityHash {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Wrap a hash read back from storage. No validation: storage is
    /// untrusted by definition and verification happens by recomputing.
    #[must_use]
    pub fn from_stored(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for IntegrityHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Compute the integrity hash for a record's fixed projection.
///
/// Field order is part of the contract: origin system, cycle year, cycle
/// period, canonical grade JSON, evaluation type, evaluation date,
/// registrant — newline-separated, hashed once at creation.
pub fn integrity_hash(
    origin_system: GradingSystem,
    cycle: &AcademicCycle,
    original_value: &GradeValue,
    evaluation_type: &EvaluationType,
    evaluation_date: NaiveDate,
    registered_by: &ActorId,
) -> Result<IntegrityHash, serde_json::Error> {
    let mut hasher = Sha256::new();
    hasher.update(origin_system.as_str().as_bytes());
    hasher.update(b"\n");
    hasher.update(cycle.year().to_string().as_bytes());
    hasher.update(b"\n");
    hasher.update(cycle.period().as_bytes());
    hasher.update(b"\n");
    hasher.update(original_value.canonical_json()?.as_bytes());
    hasher.update(b"\n");
    hasher.update(evaluation_type.as_str().as_bytes());
    hasher.update(b"\n");
    hasher.update(evaluation_date.to_string().as_bytes());
    hasher.update(b"\n");
    hasher.update(registered_by.as_str().as_bytes());

    let digest = hasher.finalize();
    let mut hex = String::with_capacity(64);
    for byte in digest {
        use fmt::Write;
        let _ = write!(hex, "{byte:02x}");
    }
    Ok(IntegrityHash(hex))
}

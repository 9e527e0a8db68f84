//! The ledger entity: one immutable evaluation result.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use tabula_types::{
    ActorId, AcademicCycle, EvaluationType, GradeValue, GradingSystem, InstitutionId, LineageId,
    RecordId, StudentId, SubjectId, TransferBatchId,
};

use crate::hash::IntegrityHash;

/// Lifecycle status of a record. Exactly one record per lineage is
/// `Current` at any time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    Current,
    Corrected,
    Voided,
}

impl RecordStatus {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            RecordStatus::Current => "current",
            RecordStatus::Corrected => "corrected",
            RecordStatus::Voided => "voided",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "current" => Some(RecordStatus::Current),
            "corrected" => Some(RecordStatus::Corrected),
            "voided" => Some(RecordStatus::Voided),
            _ => None,
        }
    }
}

/// Where a transferred record came from: the source record, the conversion
/// rule applied, and the batch it was created in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferProvenance {
    pub source_record_id: RecordId,
    pub rule_id: String,
    pub batch_id: TransferBatchId,
}

/// One immutable evaluation result in the ledger.
///
/// `original_value` is write-once: corrections supersede the record with a
/// new version instead of mutating it, and voiding only changes `status`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradeRecord {
    pub record_id: RecordId,
    /// Shared by every version descended from one initial record.
    pub lineage_id: LineageId,
    pub student_id: StudentId,
    pub subject_id: SubjectId,
    pub institution_id: InstitutionId,
    pub origin_system: GradingSystem,
    pub cycle: AcademicCycle,
    pub original_value: GradeValue,
    pub evaluation_type: EvaluationType,
    pub evaluation_date: NaiveDate,
    pub registered_at: DateTime<Utc>,
    pub registered_by: ActorId,
    pub integrity_hash: IntegrityHash,
    /// 1 for the original record, incremented by each correction.
    pub version: u32,
    pub previous_version_id: Option<RecordId>,
    pub is_correction: bool,
    /// Why the record superseded (correction) or left (void) the current
    /// state. `None` on original records.
    pub correction_reason: Option<String>,
    pub status: RecordStatus,
    pub transfer: Option<TransferProvenance>,
}

/// Input for registering a brand-new grade (version 1 of a new lineage).
#[derive(Debug, Clone)]
pub struct CreateGradeInput {
    pub student_id: StudentId,
    pub subject_id: SubjectId,
    pub institution_id: InstitutionId,
    pub origin_system: GradingSystem,
    pub cycle: AcademicCycle,
    pub value: GradeValue,
    pub evaluation_type: EvaluationType,
    pub evaluation_date: NaiveDate,
    pub registered_by: ActorId,
    /// Present when the grade derives from a transfer rather than a direct
    /// evaluation.
    pub transfer: Option<TransferProvenance>,
}

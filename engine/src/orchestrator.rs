//! Transfer orchestration: move a student's current grades between
//! institutions with different grading systems.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use tabula_conversion::ConversionEngine;
use tabula_ledger::{
    AuditEvent, AuditSink, CreateGradeInput, GradeRecord, Institution, InstitutionRepository,
    LedgerError, LedgerService, SubjectRepository, TransferProvenance,
};
use tabula_types::{
    ActorId, GradeValue, GradingSystem, InstitutionId, NormalizedScore, RecordId, StudentId,
    SubjectId, TransferBatchId,
};

use crate::directory::{
    DirectoryError, EquivalenceGraph, StudentDirectory, StudentProfile, TransferHistoryEntry,
};

#[derive(Debug, Error)]
pub enum TransferError {
    #[error("invalid {field}: {message}")]
    Validation { field: &'static str, message: String },

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Directory(#[from] DirectoryError),
}

/// What would happen to one current grade under the transfer.
///
/// A grade is transferable when it has both an equivalent subject and a
/// converted value; `failure` carries the reason when conversion itself could
/// not run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubjectPreview {
    pub source_record_id: RecordId,
    pub origin_subject: SubjectId,
    pub equivalent_subject: Option<SubjectId>,
    pub normalized_score: Option<NormalizedScore>,
    pub converted_value: Option<GradeValue>,
    pub rule_id: Option<String>,
    pub failure: Option<String>,
}

impl SubjectPreview {
    fn transferable(&self) -> Option<(&SubjectId, GradeValue, &str)> {
        match (&self.equivalent_subject, self.converted_value, &self.rule_id) {
            (Some(subject), Some(value), Some(rule)) => Some((subject, value, rule.as_str())),
            _ => None,
        }
    }
}

/// Dry-run result: the full per-subject breakdown, no writes performed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferPreview {
    pub student_id: StudentId,
    pub from_institution: InstitutionId,
    pub to_institution: InstitutionId,
    pub from_system: GradingSystem,
    pub to_system: GradingSystem,
    pub subjects: Vec<SubjectPreview>,
}

/// Outcome of an executed transfer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferReport {
    pub batch_id: TransferBatchId,
    pub records_created: Vec<RecordId>,
    pub transferred: usize,
    pub skipped_no_equivalence: usize,
    pub failed: usize,
}

struct ResolvedTransfer {
    student: StudentProfile,
    destination: Institution,
    records: Vec<GradeRecord>,
}

/// Coordinates the ledger, the conversion engine, the student directory, and
/// the equivalence graph for cross-system transfers.
pub struct TransferOrchestrator {
    ledger: LedgerService,
    engine: ConversionEngine,
    directory: Arc<dyn StudentDirectory>,
    graph: Arc<dyn EquivalenceGraph>,
    subjects: Arc<dyn SubjectRepository>,
    institutions: Arc<dyn InstitutionRepository>,
    audit: Arc<dyn AuditSink>,
}

impl TransferOrchestrator {
    #[must_use]
    pub fn new(
        ledger: LedgerService,
        engine: ConversionEngine,
        directory: Arc<dyn StudentDirectory>,
        graph: Arc<dyn EquivalenceGraph>,
        subjects: Arc<dyn SubjectRepository>,
        institutions: Arc<dyn InstitutionRepository>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            ledger,
            engine,
            directory,
            graph,
            subjects,
            institutions,
            audit,
        }
    }

    /// The underlying ledger, for reading back records.
    #[must_use]
    pub fn ledger(&self) -> &LedgerService {
        &self.ledger
    }

    /// Dry-run a transfer: resolve both sides, fetch the student's current
    /// grades, and report what each would become. No writes.
    pub fn simulate(
        &self,
        student_id: &StudentId,
        destination_id: &InstitutionId,
    ) -> Result<TransferPreview, TransferError> {
        let resolved = self.resolve(student_id, destination_id)?;
        let subjects = resolved
            .records
            .iter()
            .map(|record| self.preview_record(record, resolved.destination.system))
            .collect();

        Ok(TransferPreview {
            student_id: student_id.clone(),
            from_institution: resolved.student.institution_id,
            to_institution: resolved.destination.id,
            from_system: resolved.student.active_system,
            to_system: resolved.destination.system,
            subjects,
        })
    }

    /// Carry out the transfer: one derived ledger record per transferable
    /// subject, then the directory updates.
    ///
    /// Per-subject writes are independent; a failure on one subject is
    /// counted and the rest proceed. The active-system flip is the last step.
    pub fn execute(
        &mut self,
        student_id: &StudentId,
        destination_id: &InstitutionId,
        actor: &ActorId,
    ) -> Result<TransferReport, TransferError> {
        let resolved = self.resolve(student_id, destination_id)?;
        let to_system = resolved.destination.system;
        let batch_id = TransferBatchId::new();

        let mut records_created = Vec::new();
        let mut skipped_no_equivalence = 0;
        let mut failed = 0;

        for record in &resolved.records {
            let preview = self.preview_record(record, to_system);
            let Some((equivalent_subject, converted_value, rule)) = preview.transferable() else {
                if preview.equivalent_subject.is_none() && preview.failure.is_none() {
                    skipped_no_equivalence += 1;
                } else {
                    failed += 1;
                }
                continue;
            };

            let input = CreateGradeInput {
                student_id: student_id.clone(),
                subject_id: equivalent_subject.clone(),
                institution_id: resolved.destination.id.clone(),
                origin_system: to_system,
                cycle: record.cycle.clone(),
                value: converted_value,
                evaluation_type: record.evaluation_type.clone(),
                evaluation_date: record.evaluation_date,
                registered_by: actor.clone(),
                transfer: Some(TransferProvenance {
                    source_record_id: record.record_id,
                    rule_id: rule.to_string(),
                    batch_id,
                }),
            };
            let equivalent_subject = equivalent_subject.clone();
            match self.ledger.create(input) {
                Ok(created) => {
                    records_created.push(created.record.record_id);
                    if let Err(e) =
                        self.graph
                            .link(&record.subject_id, &equivalent_subject, batch_id)
                    {
                        warn!(error = %e, subject = %record.subject_id, "equivalence edge not recorded");
                    }
                }
                Err(e) => {
                    warn!(error = %e, source = %record.record_id, "transfer write failed for subject");
                    failed += 1;
                }
            }
        }

        self.directory
            .set_active_system(student_id, to_system, destination_id)?;
        self.directory.append_transfer(
            student_id,
            TransferHistoryEntry {
                batch_id,
                from_institution: resolved.student.institution_id,
                to_institution: resolved.destination.id,
                from_system: resolved.student.active_system,
                to_system,
                occurred_at: Utc::now(),
                actor: actor.clone(),
            },
        )?;

        let transferred = records_created.len();
        info!(
            %batch_id,
            student = %student_id,
            transferred,
            skipped_no_equivalence,
            failed,
            "transfer executed"
        );
        if let Err(e) = self.audit.emit(AuditEvent::new(
            "transfer.executed",
            batch_id,
            format!("{student_id} -> {destination_id}: {transferred} records"),
        )) {
            warn!(error = %e, "audit emission failed; continuing");
        }

        Ok(TransferReport {
            batch_id,
            records_created,
            transferred,
            skipped_no_equivalence,
            failed,
        })
    }

    fn resolve(
        &self,
        student_id: &StudentId,
        destination_id: &InstitutionId,
    ) -> Result<ResolvedTransfer, TransferError> {
        let student = self
            .directory
            .find(student_id)
            .ok_or_else(|| TransferError::NotFound {
                entity: "student",
                id: student_id.to_string(),
            })?;
        let destination = self
            .institutions
            .find_by_id(destination_id)
            .ok_or_else(|| TransferError::NotFound {
                entity: "institution",
                id: destination_id.to_string(),
            })?;
        if student.active_system == destination.system {
            return Err(TransferError::Validation {
                field: "destination_institution",
                message: format!(
                    "student is already evaluated under {}; nothing to convert",
                    destination.system
                ),
            });
        }
        let records = self.ledger.current_records_for_student(student_id)?;
        Ok(ResolvedTransfer {
            student,
            destination,
            records,
        })
    }

    /// Per-subject preview. Conversion runs whether or not an equivalence
    /// exists; a graph failure degrades to "no equivalence found".
    fn preview_record(&self, record: &GradeRecord, to_system: GradingSystem) -> SubjectPreview {
        let mut preview = SubjectPreview {
            source_record_id: record.record_id,
            origin_subject: record.subject_id.clone(),
            equivalent_subject: None,
            normalized_score: None,
            converted_value: None,
            rule_id: None,
            failure: None,
        };

        match self.subjects.find_by_id(&record.subject_id) {
            Some(subject) => {
                match self
                    .graph
                    .find(&subject.code, record.origin_system, to_system)
                {
                    Ok(equivalent) => preview.equivalent_subject = equivalent,
                    Err(e) => {
                        warn!(error = %e, code = %subject.code, "equivalence lookup failed; treating as none");
                    }
                }
            }
            None => {
                preview.failure = Some(format!("unknown subject: {}", record.subject_id));
                return preview;
            }
        }

        match self.engine.convert(to_system, &record.original_value) {
            Ok(conversion) => {
                preview.normalized_score = Some(conversion.normalized_score);
                preview.converted_value = Some(conversion.converted_value);
                preview.rule_id = Some(conversion.rule_id);
            }
            Err(e) => preview.failure = Some(e.to_string()),
        }
        preview
    }
}

//! High-level ledger operations.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use tabula_conversion::normalize;
use tabula_types::{GradeValue, LineageId, NormalizedScore, RecordId, StudentId};

use crate::error::LedgerError;
use crate::hash::{integrity_hash, IntegrityHash};
use crate::record::{CreateGradeInput, GradeRecord, RecordStatus};
use crate::repos::{
    AuditEvent, AuditSink, InstitutionRepository, StudentRepository, SubjectRepository,
};
use crate::store::LedgerStore;

/// Minimum length of a correction or void reason, after trimming.
pub const MIN_REASON_LEN: usize = 10;

/// Outcome of registering a new grade.
#[derive(Debug, Clone)]
pub struct CreatedRecord {
    pub record: GradeRecord,
    pub hash: IntegrityHash,
}

/// Outcome of a correction: the superseded record and its successor.
#[derive(Debug, Clone)]
pub struct CorrectionOutcome {
    pub predecessor_id: RecordId,
    pub successor: GradeRecord,
}

/// Result of an integrity check. A mismatch is a tamper alarm carried in the
/// report, never an error: the caller decides what to do about it.
#[derive(Debug, Clone)]
pub struct IntegrityReport {
    pub record_id: RecordId,
    pub valid: bool,
    pub hash_stored: IntegrityHash,
    pub hash_computed: IntegrityHash,
    pub message: String,
}

/// Creation, correction-as-new-version, integrity verification, and history
/// retrieval over the grade ledger.
pub struct LedgerService {
    store: LedgerStore,
    students: Arc<dyn StudentRepository>,
    subjects: Arc<dyn SubjectRepository>,
    institutions: Arc<dyn InstitutionRepository>,
    audit: Arc<dyn AuditSink>,
}

impl LedgerService {
    #[must_use]
    pub fn new(
        store: LedgerStore,
        students: Arc<dyn StudentRepository>,
        subjects: Arc<dyn SubjectRepository>,
        institutions: Arc<dyn InstitutionRepository>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            store,
            students,
            subjects,
            institutions,
            audit,
        }
    }

    /// Register a new grade: version 1 of a fresh lineage.
    pub fn create(&mut self, input: CreateGradeInput) -> Result<CreatedRecord, LedgerError> {
        if self.students.find_by_id(&input.student_id).is_none() {
            return Err(LedgerError::not_found("student", &input.student_id));
        }
        if self.subjects.find_by_id(&input.subject_id).is_none() {
            return Err(LedgerError::not_found("subject", &input.subject_id));
        }
        if self.institutions.find_by_id(&input.institution_id).is_none() {
            return Err(LedgerError::not_found("institution", &input.institution_id));
        }
        if input.value.system() != input.origin_system {
            return Err(LedgerError::validation(
                "origin_system",
                format!(
                    "declared system {} does not match the grade's system {}",
                    input.origin_system,
                    input.value.system()
                ),
            ));
        }

        let hash = integrity_hash(
            input.origin_system,
            &input.cycle,
            &input.value,
            &input.evaluation_type,
            input.evaluation_date,
            &input.registered_by,
        )?;
        let record = GradeRecord {
            record_id: RecordId::new(),
            lineage_id: LineageId::new(),
            student_id: input.student_id,
            subject_id: input.subject_id,
            institution_id: input.institution_id,
            origin_system: input.origin_system,
            cycle: input.cycle,
            original_value: input.value,
            evaluation_type: input.evaluation_type,
            evaluation_date: input.evaluation_date,
            registered_at: Utc::now(),
            registered_by: input.registered_by,
            integrity_hash: hash.clone(),
            version: 1,
            previous_version_id: None,
            is_correction: false,
            correction_reason: None,
            status: RecordStatus::Current,
            transfer: input.transfer,
        };
        self.store.insert(&record)?;
        info!(record_id = %record.record_id, student = %record.student_id, "grade registered");

        self.emit_audit(AuditEvent::new(
            "grade.created",
            record.record_id,
            format!("version 1, system {}", record.origin_system),
        ));
        Ok(CreatedRecord { record, hash })
    }

    /// Supersede a current record with a corrected version.
    ///
    /// The predecessor flips to `Corrected` and the successor (version + 1,
    /// same lineage) becomes the current record, in one atomic transition.
    pub fn correct(
        &mut self,
        record_id: &RecordId,
        new_value: GradeValue,
        reason: &str,
    ) -> Result<CorrectionOutcome, LedgerError> {
        let predecessor = self.require(record_id)?;
        Self::check_reason(reason)?;
        if predecessor.status != RecordStatus::Current {
            return Err(LedgerError::validation(
                "record_id",
                format!(
                    "only current records can be corrected; this one is {}",
                    predecessor.status.as_str()
                ),
            ));
        }
        if new_value.system() != predecessor.origin_system {
            return Err(LedgerError::validation(
                "new_value",
                format!(
                    "corrected grade must stay in system {}, got {}",
                    predecessor.origin_system,
                    new_value.system()
                ),
            ));
        }

        let hash = integrity_hash(
            predecessor.origin_system,
            &predecessor.cycle,
            &new_value,
            &predecessor.evaluation_type,
            predecessor.evaluation_date,
            &predecessor.registered_by,
        )?;
        let successor = GradeRecord {
            record_id: RecordId::new(),
            lineage_id: predecessor.lineage_id,
            student_id: predecessor.student_id.clone(),
            subject_id: predecessor.subject_id.clone(),
            institution_id: predecessor.institution_id.clone(),
            origin_system: predecessor.origin_system,
            cycle: predecessor.cycle.clone(),
            original_value: new_value,
            evaluation_type: predecessor.evaluation_type.clone(),
            evaluation_date: predecessor.evaluation_date,
            registered_at: Utc::now(),
            registered_by: predecessor.registered_by.clone(),
            integrity_hash: hash,
            version: predecessor.version + 1,
            previous_version_id: Some(predecessor.record_id),
            is_correction: true,
            correction_reason: Some(reason.to_string()),
            status: RecordStatus::Current,
            transfer: None,
        };
        self.store
            .supersede(record_id, RecordStatus::Corrected, reason, &successor)?;
        info!(
            predecessor = %record_id,
            successor = %successor.record_id,
            version = successor.version,
            "grade corrected"
        );

        self.emit_audit(AuditEvent::new(
            "grade.corrected",
            successor.record_id,
            format!("supersedes {record_id}: {reason}"),
        ));
        Ok(CorrectionOutcome {
            predecessor_id: *record_id,
            successor,
        })
    }

    /// Void a current record. Only the status changes; the lineage keeps no
    /// successor.
    pub fn void(&mut self, record_id: &RecordId, reason: &str) -> Result<(), LedgerError> {
        let record = self.require(record_id)?;
        Self::check_reason(reason)?;
        if record.status != RecordStatus::Current {
            return Err(LedgerError::validation(
                "record_id",
                format!(
                    "only current records can be voided; this one is {}",
                    record.status.as_str()
                ),
            ));
        }
        self.store.mark_voided(record_id, reason)?;
        info!(record_id = %record_id, "grade voided");

        self.emit_audit(AuditEvent::new("grade.voided", record_id, reason));
        Ok(())
    }

    /// Recompute the integrity hash from the stored projection and compare.
    pub fn verify_integrity(&self, record_id: &RecordId) -> Result<IntegrityReport, LedgerError> {
        let record = self.require(record_id)?;
        let computed = integrity_hash(
            record.origin_system,
            &record.cycle,
            &record.original_value,
            &record.evaluation_type,
            record.evaluation_date,
            &record.registered_by,
        )?;
        let valid = computed == record.integrity_hash;
        if !valid {
            warn!(record_id = %record_id, "integrity hash mismatch");
        }
        Ok(IntegrityReport {
            record_id: *record_id,
            valid,
            hash_stored: record.integrity_hash,
            hash_computed: computed,
            message: if valid {
                "integrity verified".to_string()
            } else {
                "hash mismatch: stored content differs from the registered projection".to_string()
            },
        })
    }

    /// Full lineage of a record, ordered by version ascending.
    pub fn history(&self, record_id: &RecordId) -> Result<Vec<GradeRecord>, LedgerError> {
        let record = self.require(record_id)?;
        self.store.lineage(&record.lineage_id)
    }

    /// The record's grade on the canonical 0-100 scale, or `None` if the
    /// declared system does not match the stored value. Never errors.
    #[must_use]
    pub fn value_on_standard_scale(record: &GradeRecord) -> Option<NormalizedScore> {
        if record.original_value.system() == record.origin_system {
            Some(normalize(&record.original_value))
        } else {
            None
        }
    }

    /// All current records for a student.
    pub fn current_records_for_student(
        &self,
        student_id: &StudentId,
    ) -> Result<Vec<GradeRecord>, LedgerError> {
        self.store
            .records_for_student(student_id, RecordStatus::Current)
    }

    pub fn get(&self, record_id: &RecordId) -> Result<Option<GradeRecord>, LedgerError> {
        self.store.get(record_id)
    }

    fn require(&self, record_id: &RecordId) -> Result<GradeRecord, LedgerError> {
        self.store
            .get(record_id)?
            .ok_or_else(|| LedgerError::not_found("record", record_id))
    }

    fn check_reason(reason: &str) -> Result<(), LedgerError> {
        if reason.trim().len() < MIN_REASON_LEN {
            return Err(LedgerError::validation(
                "reason",
                format!("must be at least {MIN_REASON_LEN} characters"),
            ));
        }
        Ok(())
    }

    /// Audit is fire-and-forget: a failing sink is logged and ignored.
    fn emit_audit(&self, event: AuditEvent) {
        if let Err(e) = self.audit.emit(event) {
            warn!(error = %e, "audit emission failed; continuing");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use chrono::NaiveDate;
    use tabula_types::{
        ActorId, AcademicCycle, ArGrade, DeGrade, EvaluationType, GradeValue, GradingSystem,
        InstitutionId, RecordId, StudentId, SubjectId,
    };

    use super::{LedgerService, MIN_REASON_LEN};
    use crate::error::LedgerError;
    use crate::record::{CreateGradeInput, RecordStatus};
    use crate::repos::{
        AuditError, AuditEvent, AuditSink, InMemoryInstitutions, InMemoryStudents,
        InMemorySubjects, Institution, Student, Subject,
    };
    use crate::store::LedgerStore;

    struct FailingAuditSink;

    impl AuditSink for FailingAuditSink {
        fn emit(&self, _event: AuditEvent) -> Result<(), AuditError> {
            Err(AuditError("audit backend unreachable".to_string()))
        }
    }

    #[derive(Default)]
    struct CountingAuditSink(AtomicUsize);

    impl AuditSink for CountingAuditSink {
        fn emit(&self, _event: AuditEvent) -> Result<(), AuditError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn service_with_audit(audit: Arc<dyn AuditSink>) -> LedgerService {
        let students = InMemoryStudents::new();
        students.insert(Student {
            id: StudentId::new("STU-1"),
            name: "Lucía Pérez".to_string(),
            active_system: GradingSystem::Ar,
            institution_id: InstitutionId::new("INST-AR"),
        });
        let subjects = InMemorySubjects::new();
        subjects.insert(Subject {
            id: SubjectId::new("MATH-1"),
            code: "MATH".to_string(),
            name: "Mathematics".to_string(),
        });
        let institutions = InMemoryInstitutions::new();
        institutions.insert(Institution {
            id: InstitutionId::new("INST-AR"),
            name: "Escuela Normal".to_string(),
            system: GradingSystem::Ar,
        });

        LedgerService::new(
            LedgerStore::open_in_memory().unwrap(),
            Arc::new(students),
            Arc::new(subjects),
            Arc::new(institutions),
            audit,
        )
    }

    fn service() -> LedgerService {
        service_with_audit(Arc::new(crate::repos::NoopAuditSink))
    }

    fn ar_input(nota: u8) -> CreateGradeInput {
        CreateGradeInput {
            student_id: StudentId::new("STU-1"),
            subject_id: SubjectId::new("MATH-1"),
            institution_id: InstitutionId::new("INST-AR"),
            origin_system: GradingSystem::Ar,
            cycle: AcademicCycle::new(2024, "S2").unwrap(),
            value: GradeValue::Ar(ArGrade::new(nota).unwrap()),
            evaluation_type: EvaluationType::new("final").unwrap(),
            evaluation_date: NaiveDate::from_ymd_opt(2024, 11, 30).unwrap(),
            registered_by: ActorId::new("teacher-1"),
            transfer: None,
        }
    }

    #[test]
    fn create_persists_and_verifies() {
        let mut service = service();
        let created = service.create(ar_input(8)).unwrap();
        assert_eq!(created.record.version, 1);
        assert_eq!(created.record.status, RecordStatus::Current);

        let report = service.verify_integrity(&created.record.record_id).unwrap();
        assert!(report.valid, "{}", report.message);
    }

    #[test]
    fn create_rejects_unknown_references() {
        let mut service = service();
        let mut input = ar_input(8);
        input.student_id = StudentId::new("STU-MISSING");
        let err = service.create(input).unwrap_err();
        assert!(matches!(err, LedgerError::NotFound { entity: "student", .. }));

        let mut input = ar_input(8);
        input.subject_id = SubjectId::new("NOPE");
        assert!(matches!(
            service.create(input).unwrap_err(),
            LedgerError::NotFound { entity: "subject", .. }
        ));
    }

    #[test]
    fn create_rejects_system_mismatch() {
        let mut service = service();
        let mut input = ar_input(8);
        input.value = GradeValue::De(DeGrade::new(2.0).unwrap());
        let err = service.create(input).unwrap_err();
        assert!(matches!(
            err,
            LedgerError::Validation { field: "origin_system", .. }
        ));
    }

    #[test]
    fn short_reason_fails_long_reason_corrects() {
        let mut service = service();
        let created = service.create(ar_input(6)).unwrap();
        let id = created.record.record_id;
        let new_value = GradeValue::Ar(ArGrade::new(7).unwrap());

        let err = service.correct(&id, new_value, "too short").unwrap_err();
        assert!(matches!(err, LedgerError::Validation { field: "reason", .. }));
        assert!("too short".len() < MIN_REASON_LEN);

        let outcome = service
            .correct(&id, new_value, "transcription error at entry")
            .unwrap();
        assert_eq!(outcome.successor.version, 2);
        assert!(outcome.successor.is_correction);
        assert_eq!(outcome.successor.previous_version_id, Some(id));

        let history = service.history(&id).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].status, RecordStatus::Corrected);
        assert_eq!(history[1].status, RecordStatus::Current);
    }

    #[test]
    fn exactly_one_current_after_correction() {
        let mut service = service();
        let id = service.create(ar_input(5)).unwrap().record.record_id;
        service
            .correct(
                &id,
                GradeValue::Ar(ArGrade::new(6).unwrap()),
                "late homework credited",
            )
            .unwrap();

        let history = service.history(&id).unwrap();
        let currents: Vec<_> = history
            .iter()
            .filter(|r| r.status == RecordStatus::Current)
            .collect();
        assert_eq!(currents.len(), 1);
        let max_version = history.iter().map(|r| r.version).max().unwrap();
        assert_eq!(currents[0].version, max_version);
    }

    #[test]
    fn correcting_a_corrected_record_fails_validation() {
        let mut service = service();
        let id = service.create(ar_input(5)).unwrap().record.record_id;
        let value = GradeValue::Ar(ArGrade::new(6).unwrap());
        service.correct(&id, value, "first correction applied").unwrap();

        let err = service
            .correct(&id, value, "second correction attempt")
            .unwrap_err();
        assert!(matches!(
            err,
            LedgerError::Validation { field: "record_id", .. }
        ));
    }

    #[test]
    fn correction_must_stay_in_the_origin_system() {
        let mut service = service();
        let id = service.create(ar_input(5)).unwrap().record.record_id;
        let err = service
            .correct(
                &id,
                GradeValue::De(DeGrade::new(2.0).unwrap()),
                "wrong system entirely",
            )
            .unwrap_err();
        assert!(matches!(
            err,
            LedgerError::Validation { field: "new_value", .. }
        ));
    }

    #[test]
    fn correct_missing_record_is_not_found() {
        let mut service = service();
        let err = service
            .correct(
                &RecordId::new(),
                GradeValue::Ar(ArGrade::new(6).unwrap()),
                "no such record here",
            )
            .unwrap_err();
        assert!(matches!(err, LedgerError::NotFound { entity: "record", .. }));
    }

    #[test]
    fn void_changes_only_status() {
        let mut service = service();
        let created = service.create(ar_input(8)).unwrap();
        let id = created.record.record_id;
        service.void(&id, "registered against wrong student").unwrap();

        let voided = service.get(&id).unwrap().unwrap();
        assert_eq!(voided.status, RecordStatus::Voided);
        assert_eq!(voided.original_value, created.record.original_value);
        assert_eq!(voided.version, 1);

        // Voided records cannot be corrected.
        let err = service
            .correct(
                &id,
                GradeValue::Ar(ArGrade::new(9).unwrap()),
                "attempting to revive it",
            )
            .unwrap_err();
        assert!(matches!(err, LedgerError::Validation { .. }));
    }

    #[test]
    fn value_on_standard_scale_matches_normalization() {
        let mut service = service();
        let record = service.create(ar_input(8)).unwrap().record;
        let score = LedgerService::value_on_standard_scale(&record).unwrap();
        assert_eq!(score.value(), 80.0);
    }

    #[test]
    fn tampered_row_fails_verification() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.db");

        let students = InMemoryStudents::new();
        students.insert(Student {
            id: StudentId::new("STU-1"),
            name: "Lucía Pérez".to_string(),
            active_system: GradingSystem::Ar,
            institution_id: InstitutionId::new("INST-AR"),
        });
        let subjects = InMemorySubjects::new();
        subjects.insert(Subject {
            id: SubjectId::new("MATH-1"),
            code: "MATH".to_string(),
            name: "Mathematics".to_string(),
        });
        let institutions = InMemoryInstitutions::new();
        institutions.insert(Institution {
            id: InstitutionId::new("INST-AR"),
            name: "Escuela Normal".to_string(),
            system: GradingSystem::Ar,
        });
        let mut service = LedgerService::new(
            LedgerStore::open(&path).unwrap(),
            Arc::new(students),
            Arc::new(subjects),
            Arc::new(institutions),
            Arc::new(crate::repos::NoopAuditSink),
        );
        let id = service.create(ar_input(8)).unwrap().record.record_id;

        // Rewrite the stored grade behind the service's back.
        let db = rusqlite::Connection::open(&path).unwrap();
        db.execute(
            "UPDATE grade_records SET original_value = ?1 WHERE record_id = ?2",
            rusqlite::params![r#"{"system":"ar","grade":10}"#, id.to_string()],
        )
        .unwrap();

        let report = service.verify_integrity(&id).unwrap();
        assert!(!report.valid);
        assert_ne!(report.hash_stored, report.hash_computed);
    }

    #[test]
    fn audit_failure_never_fails_the_write() {
        let mut service = service_with_audit(Arc::new(FailingAuditSink));
        let created = service.create(ar_input(8)).unwrap();
        assert_eq!(created.record.version, 1);
    }

    #[test]
    fn audit_events_are_emitted_per_operation() {
        let sink = Arc::new(CountingAuditSink::default());
        let mut service = service_with_audit(sink.clone());
        let id = service.create(ar_input(8)).unwrap().record.record_id;
        service
            .correct(
                &id,
                GradeValue::Ar(ArGrade::new(9).unwrap()),
                "re-marked after appeal",
            )
            .unwrap();
        assert_eq!(sink.0.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn current_records_for_student_lists_only_current() {
        let mut service = service();
        let first = service.create(ar_input(8)).unwrap().record.record_id;
        service.create(ar_input(6)).unwrap();
        service.void(&first, "registered against wrong cycle").unwrap();

        let records = service
            .current_records_for_student(&StudentId::new("STU-1"))
            .unwrap();
        assert_eq!(records.len(), 1);
    }
}

//! SQLite persistence for grade records.
//!
//! Records are rows in `grade_records`; lineages are addressed by a shared
//! `lineage_id` plus a version counter, so "find current" and "find history"
//! are single indexed queries. A partial unique index enforces the
//! one-current-per-lineage invariant at the storage level, and the
//! supersede/void transitions run inside a transaction with an optimistic
//! status guard on the predecessor row.

use std::path::Path;

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use tabula_types::{
    ActorId, AcademicCycle, EvaluationType, GradeValue, GradingSystem, InstitutionId, LineageId,
    RecordId, StudentId, SubjectId, TransferBatchId,
};

use crate::error::LedgerError;
use crate::hash::IntegrityHash;
use crate::record::{GradeRecord, RecordStatus, TransferProvenance};

pub struct LedgerStore {
    db: Connection,
}

impl LedgerStore {
    const SCHEMA: &'static str = r"
        CREATE TABLE IF NOT EXISTS grade_records (
            record_id TEXT PRIMARY KEY,
            lineage_id TEXT NOT NULL,
            student_id TEXT NOT NULL,
            subject_id TEXT NOT NULL,
            institution_id TEXT NOT NULL,
            origin_system TEXT NOT NULL,
            cycle_year INTEGER NOT NULL,
            cycle_period TEXT NOT NULL,
            original_value TEXT NOT NULL,
            evaluation_type TEXT NOT NULL,
            evaluation_date TEXT NOT NULL,
            registered_at TEXT NOT NULL,
            registered_by TEXT NOT NULL,
            integrity_hash TEXT NOT NULL,
            version INTEGER NOT NULL,
            previous_version_id TEXT,
            is_correction INTEGER NOT NULL,
            correction_reason TEXT,
            status TEXT NOT NULL,
            transfer_source_record_id TEXT,
            transfer_rule_id TEXT,
            transfer_batch_id TEXT
        );

        CREATE UNIQUE INDEX IF NOT EXISTS idx_records_lineage_version
        ON grade_records(lineage_id, version);

        -- At most one current record per lineage, enforced by storage.
        CREATE UNIQUE INDEX IF NOT EXISTS idx_records_lineage_current
        ON grade_records(lineage_id) WHERE status = 'current';

        CREATE INDEX IF NOT EXISTS idx_records_student_status
        ON grade_records(student_id, status);
    ";

    /// Open or create the ledger database at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, LedgerError> {
        let db = Connection::open(path.as_ref())?;
        Self::initialize(db)
    }

    /// Open an in-memory ledger (for testing).
    pub fn open_in_memory() -> Result<Self, LedgerError> {
        Self::initialize(Connection::open_in_memory()?)
    }

    fn initialize(db: Connection) -> Result<Self, LedgerError> {
        db.execute_batch(
            "PRAGMA journal_mode=WAL; PRAGMA synchronous=FULL; PRAGMA foreign_keys=ON;",
        )?;
        db.execute_batch(Self::SCHEMA)?;
        Ok(Self { db })
    }

    /// Insert a fully-built record. Used for version 1 of a new lineage;
    /// successors go through [`LedgerStore::supersede`].
    pub fn insert(&mut self, record: &GradeRecord) -> Result<(), LedgerError> {
        insert_record(&self.db, record)
    }

    pub fn get(&self, id: &RecordId) -> Result<Option<GradeRecord>, LedgerError> {
        let record = self
            .db
            .prepare(&format!("{SELECT_RECORD} WHERE record_id = ?1"))?
            .query_row(params![id.to_string()], row_to_record)
            .optional()?;
        Ok(record)
    }

    /// Every version of a lineage, ordered by version ascending.
    pub fn lineage(&self, lineage_id: &LineageId) -> Result<Vec<GradeRecord>, LedgerError> {
        let mut stmt = self
            .db
            .prepare(&format!(
                "{SELECT_RECORD} WHERE lineage_id = ?1 ORDER BY version ASC"
            ))?;
        let rows = stmt.query_map(params![lineage_id.to_string()], row_to_record)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// All records for a student with the given status, oldest registration
    /// first.
    pub fn records_for_student(
        &self,
        student_id: &StudentId,
        status: RecordStatus,
    ) -> Result<Vec<GradeRecord>, LedgerError> {
        let mut stmt = self.db.prepare(&format!(
            "{SELECT_RECORD} WHERE student_id = ?1 AND status = ?2 ORDER BY registered_at ASC, record_id ASC"
        ))?;
        let rows = stmt.query_map(
            params![student_id.as_str(), status.as_str()],
            row_to_record,
        )?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Atomically flip the predecessor out of `current` and insert its
    /// successor. The `UPDATE ... WHERE status = 'current'` guard is the
    /// optimistic concurrency check: if another correction got there first,
    /// zero rows change and the whole transaction rolls back with
    /// [`LedgerError::Conflict`].
    pub fn supersede(
        &mut self,
        predecessor_id: &RecordId,
        new_predecessor_status: RecordStatus,
        reason: &str,
        successor: &GradeRecord,
    ) -> Result<(), LedgerError> {
        let tx = self.db.transaction()?;
        let flipped = tx.execute(
            "UPDATE grade_records
             SET status = ?1, correction_reason = ?2
             WHERE record_id = ?3 AND status = 'current'",
            params![
                new_predecessor_status.as_str(),
                reason,
                predecessor_id.to_string()
            ],
        )?;
        if flipped == 0 {
            return Err(LedgerError::Conflict {
                id: predecessor_id.to_string(),
            });
        }
        insert_record(&tx, successor)?;
        tx.commit()?;
        Ok(())
    }

    /// Flip a current record to `voided`. Only the status (and the recorded
    /// reason) changes; the grade content stays untouched.
    pub fn mark_voided(&mut self, record_id: &RecordId, reason: &str) -> Result<(), LedgerError> {
        let tx = self.db.transaction()?;
        let flipped = tx.execute(
            "UPDATE grade_records
             SET status = 'voided', correction_reason = ?1
             WHERE record_id = ?2 AND status = 'current'",
            params![reason, record_id.to_string()],
        )?;
        if flipped == 0 {
            return Err(LedgerError::Conflict {
                id: record_id.to_string(),
            });
        }
        tx.commit()?;
        Ok(())
    }
}

const SELECT_RECORD: &str = "
    SELECT record_id, lineage_id, student_id, subject_id, institution_id,
           origin_system, cycle_year, cycle_period, original_value,
           evaluation_type, evaluation_date, registered_at, registered_by,
           integrity_hash, version, previous_version_id, is_correction,
           correction_reason, status, transfer_source_record_id,
           transfer_rule_id, transfer_batch_id
    FROM grade_records";

fn insert_record(db: &Connection, record: &GradeRecord) -> Result<(), LedgerError> {
    let original_value = record.original_value.canonical_json()?;
    db.execute(
        "INSERT INTO grade_records (
            record_id, lineage_id, student_id, subject_id, institution_id,
            origin_system, cycle_year, cycle_period, original_value,
            evaluation_type, evaluation_date, registered_at, registered_by,
            integrity_hash, version, previous_version_id, is_correction,
            correction_reason, status, transfer_source_record_id,
            transfer_rule_id, transfer_batch_id
        ) VALUES (
            ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14,
            ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22
        )",
        params![
            record.record_id.to_string(),
            record.lineage_id.to_string(),
            record.student_id.as_str(),
            record.subject_id.as_str(),
            record.institution_id.as_str(),
            record.origin_system.as_str(),
            record.cycle.year(),
            record.cycle.period(),
            original_value,
            record.evaluation_type.as_str(),
            record.evaluation_date.to_string(),
            record.registered_at.to_rfc3339(),
            record.registered_by.as_str(),
            record.integrity_hash.as_str(),
            record.version,
            record.previous_version_id.map(|id| id.to_string()),
            record.is_correction,
            record.correction_reason,
            record.status.as_str(),
            record.transfer.as_ref().map(|t| t.source_record_id.to_string()),
            record.transfer.as_ref().map(|t| t.rule_id.clone()),
            record.transfer.as_ref().map(|t| t.batch_id.to_string()),
        ],
    )?;
    Ok(())
}

fn row_to_record(row: &Row<'_>) -> rusqlite::Result<GradeRecord> {
    let record_id: String = row.get(0)?;
    let lineage_id: String = row.get(1)?;
    let student_id: String = row.get(2)?;
    let subject_id: String = row.get(3)?;
    let institution_id: String = row.get(4)?;
    let origin_system: String = row.get(5)?;
    let cycle_year: u16 = row.get(6)?;
    let cycle_period: String = row.get(7)?;
    let original_value: String = row.get(8)?;
    let evaluation_type: String = row.get(9)?;
    let evaluation_date: String = row.get(10)?;
    let registered_at: String = row.get(11)?;
    let registered_by: String = row.get(12)?;
    let integrity_hash: String = row.get(13)?;
    let version: u32 = row.get(14)?;
    let previous_version_id: Option<String> = row.get(15)?;
    let is_correction: bool = row.get(16)?;
    let correction_reason: Option<String> = row.get(17)?;
    let status: String = row.get(18)?;
    let transfer_source: Option<String> = row.get(19)?;
    let transfer_rule: Option<String> = row.get(20)?;
    let transfer_batch: Option<String> = row.get(21)?;

    let transfer = match (transfer_source, transfer_rule, transfer_batch) {
        (Some(source), Some(rule), Some(batch)) => Some(TransferProvenance {
            source_record_id: RecordId::from_uuid(parse_uuid(19, &source)?),
            rule_id: rule,
            batch_id: TransferBatchId::from_uuid(parse_uuid(21, &batch)?),
        }),
        _ => None,
    };

    Ok(GradeRecord {
        record_id: RecordId::from_uuid(parse_uuid(0, &record_id)?),
        lineage_id: LineageId::from_uuid(parse_uuid(1, &lineage_id)?),
        student_id: StudentId::new(student_id),
        subject_id: SubjectId::new(subject_id),
        institution_id: InstitutionId::new(institution_id),
        origin_system: GradingSystem::parse(&origin_system)
            .ok_or_else(|| invalid_column(5, format!("unknown system: {origin_system}")))?,
        cycle: AcademicCycle::new(cycle_year, cycle_period)
            .map_err(|e| invalid_column(6, e.to_string()))?,
        original_value: serde_json::from_str::<GradeValue>(&original_value)
            .map_err(|e| invalid_column(8, e.to_string()))?,
        evaluation_type: EvaluationType::new(evaluation_type)
            .map_err(|e| invalid_column(9, e.to_string()))?,
        evaluation_date: evaluation_date
            .parse::<NaiveDate>()
            .map_err(|e| invalid_column(10, e.to_string()))?,
        registered_at: registered_at
            .parse::<DateTime<Utc>>()
            .map_err(|e| invalid_column(11, e.to_string()))?,
        registered_by: ActorId::new(registered_by),
        integrity_hash: IntegrityHash::from_stored(integrity_hash),
        version,
        previous_version_id: previous_version_id
            .map(|id| parse_uuid(15, &id).map(RecordId::from_uuid))
            .transpose()?,
        is_correction,
        correction_reason,
        status: RecordStatus::parse(&status)
            .ok_or_else(|| invalid_column(18, format!("unknown status: {status}")))?,
        transfer,
    })
}

fn parse_uuid(column: usize, value: &str) -> rusqlite::Result<Uuid> {
    value
        .parse::<Uuid>()
        .map_err(|e| invalid_column(column, e.to_string()))
}

fn invalid_column(column: usize, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        column,
        rusqlite::types::Type::Text,
        message.into(),
    )
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, Utc};
    use tabula_types::{
        ActorId, AcademicCycle, ArGrade, EvaluationType, GradeValue, GradingSystem, InstitutionId,
        LineageId, RecordId, StudentId, SubjectId,
    };

    use super::LedgerStore;
    use crate::error::LedgerError;
    use crate::hash::integrity_hash;
    use crate::record::{GradeRecord, RecordStatus};

    fn sample_record(student: &str, nota: u8) -> GradeRecord {
        let cycle = AcademicCycle::new(2024, "S2").unwrap();
        let value = GradeValue::Ar(ArGrade::new(nota).unwrap());
        let evaluation_type = EvaluationType::new("final").unwrap();
        let evaluation_date = NaiveDate::from_ymd_opt(2024, 11, 30).unwrap();
        let registered_by = ActorId::new("teacher-1");
        let hash = integrity_hash(
            GradingSystem::Ar,
            &cycle,
            &value,
            &evaluation_type,
            evaluation_date,
            &registered_by,
        )
        .unwrap();

        GradeRecord {
            record_id: RecordId::new(),
            lineage_id: LineageId::new(),
            student_id: StudentId::new(student),
            subject_id: SubjectId::new("MATH-1"),
            institution_id: InstitutionId::new("INST-AR"),
            origin_system: GradingSystem::Ar,
            cycle,
            original_value: value,
            evaluation_type,
            evaluation_date,
            registered_at: Utc::now(),
            registered_by,
            integrity_hash: hash,
            version: 1,
            previous_version_id: None,
            is_correction: false,
            correction_reason: None,
            status: RecordStatus::Current,
            transfer: None,
        }
    }

    #[test]
    fn insert_and_get_round_trip() {
        let mut store = LedgerStore::open_in_memory().unwrap();
        let record = sample_record("STU-1", 8);
        store.insert(&record).unwrap();

        let loaded = store.get(&record.record_id).unwrap().unwrap();
        assert_eq!(loaded, record);
    }

    #[test]
    fn get_missing_returns_none() {
        let store = LedgerStore::open_in_memory().unwrap();
        assert!(store.get(&RecordId::new()).unwrap().is_none());
    }

    #[test]
    fn supersede_flips_and_inserts_atomically() {
        let mut store = LedgerStore::open_in_memory().unwrap();
        let original = sample_record("STU-1", 6);
        store.insert(&original).unwrap();

        let mut successor = sample_record("STU-1", 7);
        successor.lineage_id = original.lineage_id;
        successor.version = 2;
        successor.previous_version_id = Some(original.record_id);
        successor.is_correction = true;
        successor.correction_reason = Some("transcription error".to_string());

        store
            .supersede(
                &original.record_id,
                RecordStatus::Corrected,
                "transcription error",
                &successor,
            )
            .unwrap();

        let lineage = store.lineage(&original.lineage_id).unwrap();
        assert_eq!(lineage.len(), 2);
        assert_eq!(lineage[0].status, RecordStatus::Corrected);
        assert_eq!(lineage[1].status, RecordStatus::Current);
        assert_eq!(lineage[1].version, 2);
    }

    #[test]
    fn supersede_with_stale_predecessor_conflicts() {
        let mut store = LedgerStore::open_in_memory().unwrap();
        let original = sample_record("STU-1", 6);
        store.insert(&original).unwrap();

        let mut first = sample_record("STU-1", 7);
        first.lineage_id = original.lineage_id;
        first.version = 2;
        first.previous_version_id = Some(original.record_id);
        store
            .supersede(&original.record_id, RecordStatus::Corrected, "fix", &first)
            .unwrap();

        // A second caller still holding the original as "current" loses.
        let mut second = sample_record("STU-1", 8);
        second.lineage_id = original.lineage_id;
        second.version = 2;
        second.previous_version_id = Some(original.record_id);
        let err = store
            .supersede(&original.record_id, RecordStatus::Corrected, "fix", &second)
            .unwrap_err();
        assert!(matches!(err, LedgerError::Conflict { .. }));

        // The loser left no partial state behind.
        let lineage = store.lineage(&original.lineage_id).unwrap();
        assert_eq!(lineage.len(), 2);
    }

    #[test]
    fn storage_rejects_two_currents_in_one_lineage() {
        let mut store = LedgerStore::open_in_memory().unwrap();
        let original = sample_record("STU-1", 6);
        store.insert(&original).unwrap();

        let mut sibling = sample_record("STU-1", 7);
        sibling.lineage_id = original.lineage_id;
        sibling.version = 2;
        assert!(store.insert(&sibling).is_err());
    }

    #[test]
    fn records_for_student_filters_by_status() {
        let mut store = LedgerStore::open_in_memory().unwrap();
        let current = sample_record("STU-1", 8);
        store.insert(&current).unwrap();
        store.insert(&sample_record("STU-2", 5)).unwrap();

        store.mark_voided(&current.record_id, "registered in error").unwrap();

        let currents = store
            .records_for_student(&StudentId::new("STU-1"), RecordStatus::Current)
            .unwrap();
        assert!(currents.is_empty());

        let voided = store
            .records_for_student(&StudentId::new("STU-1"), RecordStatus::Voided)
            .unwrap();
        assert_eq!(voided.len(), 1);
        assert_eq!(
            voided[0].correction_reason.as_deref(),
            Some("registered in error")
        );
    }

    #[test]
    fn open_on_disk_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.db");
        let record = sample_record("STU-1", 9);

        {
            let mut store = LedgerStore::open(&path).unwrap();
            store.insert(&record).unwrap();
        }

        let store = LedgerStore::open(&path).unwrap();
        assert_eq!(store.get(&record.record_id).unwrap().unwrap(), record);
    }
}

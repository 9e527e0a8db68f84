//! The immutable grade ledger.
//!
//! Every evaluation is one [`GradeRecord`]: write-once, hash-protected, and
//! correctable only by superseding with a new version. The crate exposes:
//! - [`LedgerService`]: create, correct-as-new-version, void, integrity
//!   verification, history retrieval.
//! - [`LedgerStore`]: the SQLite persistence layer with the
//!   one-current-per-lineage invariant enforced at the storage level.
//! - Collaborator traits ([`StudentRepository`], [`SubjectRepository`],
//!   [`InstitutionRepository`], [`AuditSink`]) for the systems the ledger
//!   consults but does not own.

mod error;
mod hash;
mod record;
mod repos;
mod service;
mod store;

pub use error::LedgerError;
pub use hash::{integrity_hash, IntegrityHash};
pub use record::{CreateGradeInput, GradeRecord, RecordStatus, TransferProvenance};
pub use repos::{
    AuditError, AuditEvent, AuditSink, InMemoryInstitutions, InMemoryStudents, InMemorySubjects,
    Institution, InstitutionRepository, NoopAuditSink, Student, StudentRepository, Subject,
    SubjectRepository,
};
pub use service::{CorrectionOutcome, CreatedRecord, IntegrityReport, LedgerService};
pub use store::LedgerStore;

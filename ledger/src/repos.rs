//! Collaborator interfaces.
//!
//! The ledger consults students, subjects, and institutions but does not own
//! them; it reaches them through these narrow traits. Audit emission is
//! fire-and-forget: an explicit injectable sink rather than inline
//! swallow-and-ignore, so tests can assert on both the happy and the failing
//! path.

use std::collections::HashMap;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use tabula_types::{GradingSystem, InstitutionId, StudentId, SubjectId};

#[derive(Debug, Clone)]
pub struct Student {
    pub id: StudentId,
    pub name: String,
    /// The grading system the student is currently evaluated under.
    pub active_system: GradingSystem,
    pub institution_id: InstitutionId,
}

#[derive(Debug, Clone)]
pub struct Subject {
    pub id: SubjectId,
    /// Short catalogue code, the key used for cross-system equivalence.
    pub code: String,
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct Institution {
    pub id: InstitutionId,
    pub name: String,
    pub system: GradingSystem,
}

pub trait StudentRepository: Send + Sync {
    fn find_by_id(&self, id: &StudentId) -> Option<Student>;
}

pub trait SubjectRepository: Send + Sync {
    fn find_by_id(&self, id: &SubjectId) -> Option<Subject>;
}

pub trait InstitutionRepository: Send + Sync {
    fn find_by_id(&self, id: &InstitutionId) -> Option<Institution>;
}

// ============================================================================
// Audit
// ============================================================================

#[derive(Debug, Error)]
#[error("audit sink failure: {0}")]
pub struct AuditError(pub String);

/// A best-effort audit event. Emission failures are logged by the caller and
/// never fail the primary write.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Dotted action name, e.g. `"grade.created"`.
    pub action: String,
    /// Identifier of the affected aggregate, when there is one.
    pub subject: String,
    pub detail: String,
}

impl AuditEvent {
    pub fn new(
        action: impl Into<String>,
        subject: impl ToString,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            action: action.into(),
            subject: subject.to_string(),
            detail: detail.into(),
        }
    }
}

pub trait AuditSink: Send + Sync {
    fn emit(&self, event: AuditEvent) -> Result<(), AuditError>;
}

/// Sink that drops every event. The default for callers without auditing.
#[derive(Debug, Default)]
pub struct NoopAuditSink;

impl AuditSink for NoopAuditSink {
    fn emit(&self, _event: AuditEvent) -> Result<(), AuditError> {
        Ok(())
    }
}

// ============================================================================
// In-memory repositories
// ============================================================================

/// In-memory student repository, for tests and demos.
#[derive(Default)]
pub struct InMemoryStudents {
    students: Mutex<HashMap<StudentId, Student>>,
}

impl InMemoryStudents {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, student: Student) {
        if let Ok(mut students) = self.students.lock() {
            students.insert(student.id.clone(), student);
        }
    }
}

impl StudentRepository for InMemoryStudents {
    fn find_by_id(&self, id: &StudentId) -> Option<Student> {
        self.students.lock().ok()?.get(id).cloned()
    }
}

/// In-memory subject repository, for tests and demos.
#[derive(Default)]
pub struct InMemorySubjects {
    subjects: Mutex<HashMap<SubjectId, Subject>>,
}

impl InMemorySubjects {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, subject: Subject) {
        if let Ok(mut subjects) = self.subjects.lock() {
            subjects.insert(subject.id.clone(), subject);
        }
    }
}

impl SubjectRepository for InMemorySubjects {
    fn find_by_id(&self, id: &SubjectId) -> Option<Subject> {
        self.subjects.lock().ok()?.get(id).cloned()
    }
}

/// In-memory institution repository, for tests and demos.
#[derive(Default)]
pub struct InMemoryInstitutions {
    institutions: Mutex<HashMap<InstitutionId, Institution>>,
}

impl InMemoryInstitutions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, institution: Institution) {
        if let Ok(mut institutions) = self.institutions.lock() {
            institutions.insert(institution.id.clone(), institution);
        }
    }
}

impl InstitutionRepository for InMemoryInstitutions {
    fn find_by_id(&self, id: &InstitutionId) -> Option<Institution> {
        self.institutions.lock().ok()?.get(id).cloned()
    }
}

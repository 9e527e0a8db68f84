//! Student-directory and equivalence-graph collaborators.
//!
//! Transfers touch two systems the orchestrator does not own: the directory
//! that knows which grading system a student is currently evaluated under,
//! and the graph that knows which subjects correspond across systems. Both
//! are reached through narrow traits; in-memory implementations serve tests
//! and demos.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use tabula_types::{
    ActorId, GradingSystem, InstitutionId, StudentId, SubjectId, TransferBatchId,
};

#[derive(Debug, Error)]
#[error("student directory failure: {0}")]
pub struct DirectoryError(pub String);

#[derive(Debug, Error)]
#[error("equivalence graph failure: {0}")]
pub struct GraphError(pub String);

/// The directory's view of a student: identity plus the single active
/// grading-system marker.
#[derive(Debug, Clone)]
pub struct StudentProfile {
    pub id: StudentId,
    pub active_system: GradingSystem,
    pub institution_id: InstitutionId,
}

/// One entry in a student's append-only transfer history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferHistoryEntry {
    pub batch_id: TransferBatchId,
    pub from_institution: InstitutionId,
    pub to_institution: InstitutionId,
    pub from_system: GradingSystem,
    pub to_system: GradingSystem,
    pub occurred_at: DateTime<Utc>,
    pub actor: ActorId,
}

pub trait StudentDirectory: Send + Sync {
    fn find(&self, id: &StudentId) -> Option<StudentProfile>;

    /// Point the student at a new system and institution. Must be idempotent:
    /// setting the marker to its current value is a no-op, not an error.
    fn set_active_system(
        &self,
        id: &StudentId,
        system: GradingSystem,
        institution_id: &InstitutionId,
    ) -> Result<(), DirectoryError>;

    fn append_transfer(
        &self,
        id: &StudentId,
        entry: TransferHistoryEntry,
    ) -> Result<(), DirectoryError>;
}

/// Cross-system subject correspondence, keyed by catalogue code.
pub trait EquivalenceGraph: Send + Sync {
    /// The destination-system subject equivalent to `subject_code`, if the
    /// graph knows one.
    fn find(
        &self,
        subject_code: &str,
        origin: GradingSystem,
        destination: GradingSystem,
    ) -> Result<Option<SubjectId>, GraphError>;

    /// Record that a transfer established (or reaffirmed) an equivalence
    /// edge between two subjects.
    fn link(
        &self,
        origin_subject: &SubjectId,
        equivalent_subject: &SubjectId,
        batch_id: TransferBatchId,
    ) -> Result<(), GraphError>;
}

// ============================================================================
// In-memory implementations
// ============================================================================

#[derive(Default)]
struct DirectoryState {
    profiles: HashMap<StudentId, StudentProfile>,
    history: HashMap<StudentId, Vec<TransferHistoryEntry>>,
}

/// In-memory student directory, for tests and demos.
#[derive(Default)]
pub struct InMemoryDirectory {
    state: Mutex<DirectoryState>,
}

impl InMemoryDirectory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, profile: StudentProfile) {
        if let Ok(mut state) = self.state.lock() {
            state.profiles.insert(profile.id.clone(), profile);
        }
    }

    #[must_use]
    pub fn history(&self, id: &StudentId) -> Vec<TransferHistoryEntry> {
        self.state
            .lock()
            .ok()
            .and_then(|state| state.history.get(id).cloned())
            .unwrap_or_default()
    }
}

impl StudentDirectory for InMemoryDirectory {
    fn find(&self, id: &StudentId) -> Option<StudentProfile> {
        self.state.lock().ok()?.profiles.get(id).cloned()
    }

    fn set_active_system(
        &self,
        id: &StudentId,
        system: GradingSystem,
        institution_id: &InstitutionId,
    ) -> Result<(), DirectoryError> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| DirectoryError("directory lock poisoned".to_string()))?;
        let profile = state
            .profiles
            .get_mut(id)
            .ok_or_else(|| DirectoryError(format!("unknown student: {id}")))?;
        profile.active_system = system;
        profile.institution_id = institution_id.clone();
        Ok(())
    }

    fn append_transfer(
        &self,
        id: &StudentId,
        entry: TransferHistoryEntry,
    ) -> Result<(), DirectoryError> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| DirectoryError("directory lock poisoned".to_string()))?;
        state.history.entry(id.clone()).or_default().push(entry);
        Ok(())
    }
}

/// In-memory equivalence graph backed by a `(code, origin, destination)` map.
#[derive(Default)]
pub struct InMemoryEquivalences {
    edges: Mutex<HashMap<(String, GradingSystem, GradingSystem), SubjectId>>,
    links: Mutex<Vec<(SubjectId, SubjectId, TransferBatchId)>>,
}

impl InMemoryEquivalences {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(
        &self,
        subject_code: impl Into<String>,
        origin: GradingSystem,
        destination: GradingSystem,
        equivalent: SubjectId,
    ) {
        if let Ok(mut edges) = self.edges.lock() {
            edges.insert((subject_code.into(), origin, destination), equivalent);
        }
    }

    /// Edges recorded through [`EquivalenceGraph::link`].
    #[must_use]
    pub fn recorded_links(&self) -> Vec<(SubjectId, SubjectId, TransferBatchId)> {
        self.links.lock().map(|links| links.clone()).unwrap_or_default()
    }
}

impl EquivalenceGraph for InMemoryEquivalences {
    fn find(
        &self,
        subject_code: &str,
        origin: GradingSystem,
        destination: GradingSystem,
    ) -> Result<Option<SubjectId>, GraphError> {
        let edges = self
            .edges
            .lock()
            .map_err(|_| GraphError("graph lock poisoned".to_string()))?;
        Ok(edges
            .get(&(subject_code.to_string(), origin, destination))
            .cloned())
    }

    fn link(
        &self,
        origin_subject: &SubjectId,
        equivalent_subject: &SubjectId,
        batch_id: TransferBatchId,
    ) -> Result<(), GraphError> {
        let mut links = self
            .links
            .lock()
            .map_err(|_| GraphError("graph lock poisoned".to_string()))?;
        links.push((origin_subject.clone(), equivalent_subject.clone(), batch_id));
        Ok(())
    }
}

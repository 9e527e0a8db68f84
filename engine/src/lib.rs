//! Cross-system transfer orchestration.
//!
//! When a student moves to an institution graded under a different system,
//! the [`TransferOrchestrator`] resolves subject equivalences through an
//! external graph, converts every current grade onto the destination scale,
//! and emits derived ledger records carrying full provenance. [`simulate`]
//! previews the outcome without writing; [`execute`] performs it.
//!
//! [`simulate`]: TransferOrchestrator::simulate
//! [`execute`]: TransferOrchestrator::execute

mod directory;
mod orchestrator;

pub use directory::{
    DirectoryError, EquivalenceGraph, GraphError, InMemoryDirectory, InMemoryEquivalences,
    StudentDirectory, StudentProfile, TransferHistoryEntry,
};
pub use orchestrator::{
    SubjectPreview, TransferError, TransferOrchestrator, TransferPreview, TransferReport,
};

//! Core domain types for Tabula.
//!
//! This crate contains pure domain types with no IO and no persistence.
//! Grade values are validated at construction time: once you hold a
//! [`GradeValue`], every range and presence constraint of its grading
//! system already holds. Everything here can be used from any layer.

mod cycle;
mod ids;
mod score;
mod system;
mod value;

pub use cycle::{AcademicCycle, CycleError, EvaluationType};
pub use ids::{ActorId, InstitutionId, LineageId, RecordId, StudentId, SubjectId, TransferBatchId};
pub use score::{NormalizedScore, ScoreError};
pub use system::GradingSystem;
pub use value::{
    ArGrade, DeGrade, GradeValue, GradeValueError, UkGrade, UkLetter, UkMark, UsGrade, UsLetter,
};

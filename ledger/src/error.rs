use thiserror::Error;

#[derive(Debug, Error)]
pub enum LedgerError {
    /// A request field failed a business rule. Names the offending field.
    #[error("invalid {field}: {message}")]
    Validation { field: &'static str, message: String },

    /// A referenced entity does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Lost a concurrent race on the same record; safe to retry.
    #[error("record {id} was modified concurrently; retry the operation")]
    Conflict { id: String },

    #[error("ledger storage failure")]
    Storage(#[from] rusqlite::Error),

    #[error("grade value encoding failure")]
    Encoding(#[from] serde_json::Error),
}

impl LedgerError {
    pub(crate) fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }

    pub(crate) fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

use thiserror::Error;

/// Hard failures of the schedule task store.
///
/// Soft outcomes (missing document, missing sub-task, moving onto the same
/// cell) are not errors; they come back as `Option`/`bool`/[`MoveOutcome`]
/// values so callers never have to match on a "not found" variant.
///
/// [`MoveOutcome`]: crate::types::MoveOutcome
#[derive(Debug, Error)]
pub enum TaskError {
    /// Underlying SQLite / rusqlite error.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// A sub-task list could not be encoded for storage.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The collection name is not a plain SQL identifier.
    #[error("invalid collection name: {0}")]
    InvalidCollection(String),

    /// A request the store cannot represent (blank content, a date past the
    /// end of the calendar).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Write rejected by a non-SQLite store implementation.
    #[error("store write failed: {0}")]
    Store(String),
}

pub type Result<T> = std::result::Result<T, TaskError>;

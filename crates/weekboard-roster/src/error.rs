use thiserror::Error;

/// Roster-layer errors. Kept apart from `WeekboardError` so the gateway
/// decides the HTTP mapping.
#[derive(Debug, Error)]
pub enum RosterError {
    #[error("Employee not found: {0}")]
    NotFound(String),

    #[error("Invalid employee: {0}")]
    Invalid(String),

    #[error("Invalid collection name: {0}")]
    InvalidCollection(String),

    #[error("Database error: {0}")]
    DatabaseError(#[from] rusqlite::Error),
}

pub type Result<T> = std::result::Result<T, RosterError>;

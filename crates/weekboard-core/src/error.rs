use thiserror::Error;

/// Gateway-facing error. Each subsystem keeps its own error enum; this one is
/// what the HTTP and WS layers map them into before answering a client.
#[derive(Debug, Error)]
pub enum WeekboardError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Authentication failed: {0}")]
    AuthFailed(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Payload too large: {size} bytes (max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl WeekboardError {
    /// Short error code string sent to clients in error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            WeekboardError::Config(_) => "CONFIG_ERROR",
            WeekboardError::AuthFailed(_) => "AUTH_FAILED",
            WeekboardError::InvalidInput(_) => "INVALID_INPUT",
            WeekboardError::NotFound(_) => "NOT_FOUND",
            WeekboardError::Store(_) => "STORE_WRITE_FAILURE",
            WeekboardError::Serialization(_) => "SERIALIZATION_ERROR",
            WeekboardError::Io(_) => "IO_ERROR",
            WeekboardError::PayloadTooLarge { .. } => "PAYLOAD_TOO_LARGE",
            WeekboardError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

pub type Result<T> = std::result::Result<T, WeekboardError>;

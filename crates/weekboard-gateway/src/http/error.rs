use axum::{http::StatusCode, Json};
use serde::Serialize;
use tracing::{error, warn};
use weekboard_core::WeekboardError;
use weekboard_roster::RosterError;
use weekboard_tasks::TaskError;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: &'static str,
    pub message: String,
}

pub type ApiError = (StatusCode, Json<ErrorBody>);
pub type ApiResult<T> = Result<Json<T>, ApiError>;

pub fn api_error(e: WeekboardError) -> ApiError {
    let status = match &e {
        WeekboardError::AuthFailed(_) => StatusCode::UNAUTHORIZED,
        WeekboardError::InvalidInput(_) | WeekboardError::Serialization(_) => {
            StatusCode::BAD_REQUEST
        }
        WeekboardError::NotFound(_) => StatusCode::NOT_FOUND,
        WeekboardError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
        WeekboardError::Store(_) => StatusCode::SERVICE_UNAVAILABLE,
        WeekboardError::Config(_) | WeekboardError::Io(_) | WeekboardError::Internal(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    if status.is_server_error() {
        error!(code = e.code(), "request failed: {e}");
    } else {
        warn!(code = e.code(), "request rejected: {e}");
    }
    (
        status,
        Json(ErrorBody {
            error: ErrorDetail {
                code: e.code(),
                message: e.to_string(),
            },
        }),
    )
}

pub fn task_error(e: TaskError) -> ApiError {
    api_error(match e {
        TaskError::Serialization(e) => WeekboardError::Serialization(e),
        TaskError::InvalidCollection(name) => {
            WeekboardError::Config(format!("invalid collection: {name}"))
        }
        TaskError::Database(e) => WeekboardError::Store(e.to_string()),
        TaskError::Store(msg) => WeekboardError::Store(msg),
        TaskError::InvalidInput(msg) => WeekboardError::InvalidInput(msg),
    })
}

pub fn roster_error(e: RosterError) -> ApiError {
    api_error(match e {
        RosterError::NotFound(id) => WeekboardError::NotFound(format!("employee {id}")),
        RosterError::Invalid(msg) => WeekboardError::InvalidInput(msg),
        RosterError::InvalidCollection(name) => {
            WeekboardError::Config(format!("invalid collection: {name}"))
        }
        RosterError::DatabaseError(e) => WeekboardError::Store(e.to_string()),
    })
}

pub fn not_found(what: impl Into<String>) -> ApiError {
    api_error(WeekboardError::NotFound(what.into()))
}

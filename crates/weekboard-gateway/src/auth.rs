//! Shared-password gate for the REST and WS surfaces.
//!
//! Accepted credentials: `Authorization: Bearer <password>` or
//! `x-board-password: <password>`. With no password configured every request
//! passes.

use axum::http::HeaderMap;
use weekboard_core::WeekboardError;

use crate::app::AppState;
use crate::http::error::{api_error, ApiError};

pub const PASSWORD_HEADER: &str = "x-board-password";

/// Returns true if the request is authorised.
pub fn check_auth(state: &AppState, headers: &HeaderMap) -> bool {
    check_credential(state, extract_bearer(headers).or_else(|| extract_password(headers)))
}

/// Same check for a credential obtained elsewhere (e.g. a WS query param).
pub fn check_credential(state: &AppState, supplied: Option<&str>) -> bool {
    match &state.config.gateway.auth.password {
        None => true,
        Some(expected) => supplied.map(|s| s == expected).unwrap_or(false),
    }
}

pub fn require_auth(state: &AppState, headers: &HeaderMap) -> Result<(), ApiError> {
    if check_auth(state, headers) {
        Ok(())
    } else {
        Err(api_error(WeekboardError::AuthFailed(format!(
            "set 'Authorization: Bearer <password>' or '{PASSWORD_HEADER}'"
        ))))
    }
}

fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}

fn extract_password(headers: &HeaderMap) -> Option<&str> {
    headers.get(PASSWORD_HEADER).and_then(|v| v.to_str().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::tests::test_state;

    fn headers(name: &'static str, value: &str) -> HeaderMap {
        let mut h = HeaderMap::new();
        h.insert(name, value.parse().unwrap());
        h
    }

    #[test]
    fn open_when_no_password() {
        let state = test_state(None);
        assert!(check_auth(&state, &HeaderMap::new()));
    }

    #[test]
    fn accepts_bearer_or_board_header() {
        let state = test_state(Some("secret"));
        assert!(check_auth(&state, &headers("authorization", "Bearer secret")));
        assert!(check_auth(&state, &headers(PASSWORD_HEADER, "secret")));
        assert!(!check_auth(&state, &headers(PASSWORD_HEADER, "wrong")));
        assert!(!check_auth(&state, &HeaderMap::new()));
    }
}

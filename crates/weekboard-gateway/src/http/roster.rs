use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    Json,
};
use serde::{Deserialize, Serialize};
use weekboard_core::Employee;
use weekboard_roster::RosterEmployee;

use crate::app::AppState;
use crate::auth::require_auth;
use crate::http::error::{roster_error, ApiResult};

#[derive(Debug, Deserialize)]
pub struct SaveEmployee {
    #[serde(flatten)]
    pub employee: Employee,
    pub order: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct ReorderBody {
    pub ids: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct Seeded {
    pub inserted: usize,
}

#[derive(Debug, Serialize)]
pub struct Deleted {
    pub deleted: String,
}

/// GET /api/employees: stored roster, or the configured defaults while the
/// collection is empty.
pub async fn list(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> ApiResult<Vec<Employee>> {
    require_auth(&state, &headers)?;
    state
        .roster
        .list_or_fallback(&state.config.roster.defaults)
        .map(Json)
        .map_err(roster_error)
}

/// PUT /api/employees: create or update by name.
pub async fn save(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<SaveEmployee>,
) -> ApiResult<RosterEmployee> {
    require_auth(&state, &headers)?;
    state
        .roster
        .save(&body.employee, body.order)
        .map(Json)
        .map_err(roster_error)
}

pub async fn delete(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult<Deleted> {
    require_auth(&state, &headers)?;
    state.roster.delete(&id).map_err(roster_error)?;
    Ok(Json(Deleted { deleted: id }))
}

pub async fn reorder(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<ReorderBody>,
) -> ApiResult<Vec<RosterEmployee>> {
    require_auth(&state, &headers)?;
    state.roster.reorder(&body.ids).map_err(roster_error)?;
    state.roster.list().map(Json).map_err(roster_error)
}

/// POST /api/employees/seed: insert configured defaults that are missing.
pub async fn seed_defaults(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> ApiResult<Seeded> {
    require_auth(&state, &headers)?;
    let inserted = state
        .roster
        .seed_defaults(&state.config.roster.defaults)
        .map_err(roster_error)?;
    Ok(Json(Seeded { inserted }))
}

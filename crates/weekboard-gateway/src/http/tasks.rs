//! Schedule task routes under `/api`.
//!
//! A cell is addressed as `/api/tasks/{employee}/{date}` with `date` in
//! `yyyy-MM-dd`. Bodies and responses use camelCase JSON.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    Json,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use weekboard_core::week::{parse_date, week_dates, week_info, WeekInfo, WeekRange};
use weekboard_tasks::{
    MoveOutcome, ScheduleTask, SubTask, SubTaskDraft, TaskStatus, WeeklyStats, WorkLocation,
};

use crate::app::AppState;
use crate::auth::require_auth;
use crate::http::error::{api_error, not_found, task_error, ApiResult};

#[derive(Debug, Deserialize)]
pub struct RangeQuery {
    pub start: String,
    pub end: String,
}

impl RangeQuery {
    pub fn parse(&self) -> Result<(NaiveDate, NaiveDate), crate::http::error::ApiError> {
        let start = parse_date(&self.start).map_err(api_error)?;
        let end = parse_date(&self.end).map_err(api_error)?;
        Ok((start, end))
    }
}

#[derive(Debug, Deserialize)]
pub struct WeekQuery {
    /// Any day in the week; defaults to today.
    pub date: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeekView {
    pub range: WeekRange,
    pub info: WeekInfo,
    pub tasks: Vec<ScheduleTask>,
    pub stats: BTreeMap<String, WeeklyStats>,
}

#[derive(Debug, Deserialize)]
pub struct TextBody {
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct StatusBody {
    pub status: TaskStatus,
}

#[derive(Debug, Deserialize)]
pub struct AbsenceBody {
    pub absent: bool,
}

#[derive(Debug, Deserialize)]
pub struct LocationBody {
    pub location: WorkLocation,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveRequest {
    pub from_employee: String,
    pub from_date: String,
    /// Defaults to `from_employee` (same-row move).
    pub to_employee: Option<String>,
    pub to_date: String,
    pub sub_task_id: String,
}

#[derive(Debug, Serialize)]
pub struct Updated {
    pub updated: bool,
}

fn cell_date(date: &str) -> Result<NaiveDate, crate::http::error::ApiError> {
    parse_date(date).map_err(api_error)
}

/// GET /api/tasks?start=&end=: documents in range, migrated and sorted.
pub async fn list_range(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(q): Query<RangeQuery>,
) -> ApiResult<Vec<ScheduleTask>> {
    require_auth(&state, &headers)?;
    let (start, end) = q.parse()?;
    state.tasks.list_range(start, end).map(Json).map_err(task_error)
}

/// GET /api/week?date=: the Monday-to-Sunday week containing `date`.
pub async fn week(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(q): Query<WeekQuery>,
) -> ApiResult<WeekView> {
    require_auth(&state, &headers)?;
    let date = match q.date {
        Some(d) => cell_date(&d)?,
        None => chrono::Local::now().date_naive(),
    };
    let range = week_dates(date).map_err(api_error)?;
    let tasks = state
        .tasks
        .list_range(range.start, range.end)
        .map_err(task_error)?;
    let stats = weekboard_tasks::stats::weekly_stats(&tasks);
    Ok(Json(WeekView {
        info: week_info(date).map_err(api_error)?,
        range,
        tasks,
        stats,
    }))
}

/// GET /api/stats?start=&end=
pub async fn stats(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(q): Query<RangeQuery>,
) -> ApiResult<BTreeMap<String, WeeklyStats>> {
    require_auth(&state, &headers)?;
    let (start, end) = q.parse()?;
    state.tasks.weekly_stats(start, end).map(Json).map_err(task_error)
}

pub async fn get_task(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path((employee, date)): Path<(String, String)>,
) -> ApiResult<ScheduleTask> {
    require_auth(&state, &headers)?;
    let date = cell_date(&date)?;
    state
        .tasks
        .get(&employee, date)
        .map_err(task_error)?
        .map(Json)
        .ok_or_else(|| not_found(format!("no document for {employee} on {date}")))
}

pub async fn save_text_content(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path((employee, date)): Path<(String, String)>,
    Json(body): Json<TextBody>,
) -> ApiResult<Updated> {
    require_auth(&state, &headers)?;
    let date = cell_date(&date)?;
    state
        .tasks
        .save_text_content(&employee, date, &body.text)
        .map_err(task_error)?;
    Ok(Json(Updated { updated: true }))
}

pub async fn set_status(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path((employee, date)): Path<(String, String)>,
    Json(body): Json<StatusBody>,
) -> ApiResult<Updated> {
    require_auth(&state, &headers)?;
    let date = cell_date(&date)?;
    state
        .tasks
        .set_status(&employee, date, body.status)
        .map_err(task_error)?;
    Ok(Json(Updated { updated: true }))
}

pub async fn toggle_absence(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path((employee, date)): Path<(String, String)>,
    Json(body): Json<AbsenceBody>,
) -> ApiResult<Updated> {
    require_auth(&state, &headers)?;
    let date = cell_date(&date)?;
    state
        .tasks
        .toggle_absence(&employee, date, body.absent)
        .map_err(task_error)?;
    Ok(Json(Updated { updated: true }))
}

pub async fn set_work_location(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path((employee, date)): Path<(String, String)>,
    Json(body): Json<LocationBody>,
) -> ApiResult<Updated> {
    require_auth(&state, &headers)?;
    let date = cell_date(&date)?;
    state
        .tasks
        .set_work_location(&employee, date, body.location)
        .map_err(task_error)?;
    Ok(Json(Updated { updated: true }))
}

/// PUT .../subtasks: replace the list. Entries that are not JSON objects
/// are dropped; bad fields fall back to defaults.
pub async fn save_sub_tasks(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path((employee, date)): Path<(String, String)>,
    Json(body): Json<Vec<Value>>,
) -> ApiResult<Vec<SubTask>> {
    require_auth(&state, &headers)?;
    let date = cell_date(&date)?;
    let drafts: Vec<SubTaskDraft> = body.iter().filter_map(SubTaskDraft::from_value).collect();
    state
        .tasks
        .save_sub_tasks(&employee, date, drafts)
        .map(Json)
        .map_err(task_error)
}

/// POST .../subtasks: append one sub-task.
pub async fn add_sub_task(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path((employee, date)): Path<(String, String)>,
    Json(body): Json<Value>,
) -> ApiResult<SubTask> {
    require_auth(&state, &headers)?;
    let date = cell_date(&date)?;
    let draft = SubTaskDraft::from_value(&body).ok_or_else(|| {
        api_error(weekboard_core::WeekboardError::InvalidInput(
            "sub-task must be a JSON object".into(),
        ))
    })?;
    state
        .tasks
        .add_sub_task_to_employee(&employee, date, draft)
        .map(Json)
        .map_err(task_error)
}

pub async fn set_sub_task_status(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path((employee, date, id)): Path<(String, String, String)>,
    Json(body): Json<StatusBody>,
) -> ApiResult<Updated> {
    require_auth(&state, &headers)?;
    let date = cell_date(&date)?;
    let updated = state
        .tasks
        .set_sub_task_status(&employee, date, &id, body.status)
        .map_err(task_error)?;
    if !updated {
        return Err(not_found(format!("sub-task {id}")));
    }
    Ok(Json(Updated { updated }))
}

pub async fn duplicate_sub_task(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path((employee, date, id)): Path<(String, String, String)>,
) -> ApiResult<SubTask> {
    require_auth(&state, &headers)?;
    let date = cell_date(&date)?;
    state
        .tasks
        .duplicate_sub_task(&employee, date, &id)
        .map_err(task_error)?
        .map(Json)
        .ok_or_else(|| not_found(format!("sub-task {id}")))
}

pub async fn duplicate_sub_task_to_next_day(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path((employee, date, id)): Path<(String, String, String)>,
) -> ApiResult<SubTask> {
    require_auth(&state, &headers)?;
    let date = cell_date(&date)?;
    state
        .tasks
        .duplicate_sub_task_to_next_day(&employee, date, &id)
        .map_err(task_error)?
        .map(Json)
        .ok_or_else(|| not_found(format!("sub-task {id}")))
}

/// POST /api/moves. No-op outcomes are 200 responses with
/// `"outcome": "no_op"` and a reason, not errors.
pub async fn move_sub_task(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<MoveRequest>,
) -> ApiResult<MoveOutcome> {
    require_auth(&state, &headers)?;
    let from_date = cell_date(&req.from_date)?;
    let to_date = cell_date(&req.to_date)?;
    let to_employee = req.to_employee.as_deref().unwrap_or(&req.from_employee);
    state
        .tasks
        .move_sub_task_cross_employee(
            &req.from_employee,
            from_date,
            to_employee,
            to_date,
            &req.sub_task_id,
        )
        .map(Json)
        .map_err(task_error)
}

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use axum::{
    routing::{delete, get, post, put},
    Router,
};
use weekboard_core::config::WeekboardConfig;
use weekboard_roster::RosterManager;
use weekboard_tasks::{ScheduleTaskManager, SqliteTaskStore};

use crate::http::{health, roster, tasks};

/// Central shared state, passed as `Arc<AppState>` to all Axum handlers.
pub struct AppState {
    pub config: WeekboardConfig,
    pub tasks: ScheduleTaskManager<SqliteTaskStore>,
    pub roster: RosterManager,
    /// Open WS connections, reported by /health.
    pub ws_clients: AtomicUsize,
}

impl AppState {
    pub fn new(
        config: WeekboardConfig,
        tasks: ScheduleTaskManager<SqliteTaskStore>,
        roster: RosterManager,
    ) -> Self {
        Self {
            config,
            tasks,
            roster,
            ws_clients: AtomicUsize::new(0),
        }
    }

    pub fn ws_client_count(&self) -> usize {
        self.ws_clients.load(Ordering::Relaxed)
    }
}

/// Assemble the full Axum router.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cell = "/api/tasks/{employee}/{date}";
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/ws", get(crate::ws::connection::ws_handler))
        .route("/api/tasks", get(tasks::list_range))
        .route("/api/week", get(tasks::week))
        .route("/api/stats", get(tasks::stats))
        .route("/api/moves", post(tasks::move_sub_task))
        .route(cell, get(tasks::get_task))
        .route(&format!("{cell}/content"), put(tasks::save_text_content))
        .route(&format!("{cell}/status"), put(tasks::set_status))
        .route(&format!("{cell}/absence"), put(tasks::toggle_absence))
        .route(&format!("{cell}/location"), put(tasks::set_work_location))
        .route(
            &format!("{cell}/subtasks"),
            put(tasks::save_sub_tasks).post(tasks::add_sub_task),
        )
        .route(
            &format!("{cell}/subtasks/{{id}}/status"),
            put(tasks::set_sub_task_status),
        )
        .route(
            &format!("{cell}/subtasks/{{id}}/duplicate"),
            post(tasks::duplicate_sub_task),
        )
        .route(
            &format!("{cell}/subtasks/{{id}}/duplicate-next-day"),
            post(tasks::duplicate_sub_task_to_next_day),
        )
        .route("/api/employees", get(roster::list).put(roster::save))
        .route("/api/employees/order", put(roster::reorder))
        .route("/api/employees/seed", post(roster::seed_defaults))
        .route("/api/employees/{id}", delete(roster::delete))
        .with_state(state)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    pub(crate) fn test_state(password: Option<&str>) -> Arc<AppState> {
        let mut config = WeekboardConfig::default();
        config.gateway.auth.password = password.map(String::from);
        let tasks =
            ScheduleTaskManager::new(SqliteTaskStore::open_in_memory("schedule_tasks").unwrap());
        let roster = RosterManager::open_in_memory("employees").unwrap();
        Arc::new(AppState::new(config, tasks, roster))
    }

    async fn call(
        router: Router,
        method: &str,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut req = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(v) => {
                req = req.header("content-type", "application/json");
                Body::from(v.to_string())
            }
            None => Body::empty(),
        };
        let res = router.oneshot(req.body(body).unwrap()).await.unwrap();
        let status = res.status();
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    #[tokio::test]
    async fn health_is_open() {
        let router = build_router(test_state(Some("secret")));
        let (status, body) = call(router, "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn api_requires_password_when_configured() {
        let router = build_router(test_state(Some("secret")));
        let (status, body) = call(router, "GET", "/api/tasks?start=2024-03-04&end=2024-03-10", None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"]["code"], "AUTH_FAILED");
    }

    #[tokio::test]
    async fn sub_tasks_round_trip_through_http() {
        let state = test_state(None);
        let router = build_router(state.clone());
        let (status, saved) = call(
            router.clone(),
            "PUT",
            "/api/tasks/Jana/2024-03-04/subtasks",
            Some(json!([
                {"content": "Draft copy", "order": 0},
                {"content": "Review", "status": "completed", "order": 1},
                "not an object"
            ])),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(saved.as_array().unwrap().len(), 2);

        let (status, doc) = call(router.clone(), "GET", "/api/tasks/Jana/2024-03-04", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(doc["status"], "in-progress");
        assert_eq!(doc["taskContent"], "Draft copy\nReview");

        let id = saved[0]["id"].as_str().unwrap();
        let (status, outcome) = call(
            router.clone(),
            "POST",
            "/api/moves",
            Some(json!({
                "fromEmployee": "Jana",
                "fromDate": "2024-03-04",
                "toEmployee": "Petr",
                "toDate": "2024-03-05",
                "subTaskId": id
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(outcome["outcome"], "moved");
        assert_eq!(outcome["destination"], "petr_2024-03-05");

        let (status, _) = call(router, "GET", "/api/tasks/Nobody/2024-03-04", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn bad_dates_are_rejected() {
        let router = build_router(test_state(None));
        let (status, body) = call(router, "PUT", "/api/tasks/Jana/04-03-2024/absence", Some(json!({"absent": true}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "INVALID_INPUT");
    }

    #[tokio::test]
    async fn blank_sub_task_is_rejected() {
        let router = build_router(test_state(None));
        let (status, body) = call(
            router.clone(),
            "POST",
            "/api/tasks/Jana/2024-03-04/subtasks",
            Some(json!({"content": "   "})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "INVALID_INPUT");

        let (status, _) = call(router, "GET", "/api/tasks/Jana/2024-03-04", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn roster_falls_back_to_defaults() {
        let state = test_state(None);
        let router = build_router(state.clone());
        let (status, list) = call(router, "GET", "/api/employees", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            list.as_array().unwrap().len(),
            state.config.roster.defaults.len()
        );
    }
}

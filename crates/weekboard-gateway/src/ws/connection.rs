//! `GET /ws?start=&end=`: live board snapshots.
//!
//! Server -> client events (JSON text frames):
//!   `{"event":"snapshot","start":..,"end":..,"tasks":[..],"stats":{..}}`
//!   `{"event":"roster","employees":[..]}`
//!   `{"event":"tick","ts":<ms>}`
//!
//! Client -> server: `{"start":"yyyy-MM-dd","end":"yyyy-MM-dd"}` moves the
//! watched range. Without a range the current week is watched.

use std::sync::{atomic::Ordering, Arc};

use axum::{
    extract::{ws::Message, ws::WebSocket, Query, State, WebSocketUpgrade},
    http::HeaderMap,
    response::{IntoResponse, Response},
};
use chrono::NaiveDate;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::{broadcast::error::RecvError, mpsc};
use tracing::{debug, info, warn};
use weekboard_core::config::{HEARTBEAT_INTERVAL_SECS, MAX_PAYLOAD_BYTES};
use weekboard_core::week::{format_date, parse_date, week_dates};
use weekboard_core::WeekboardError;
use weekboard_tasks::{stats::weekly_stats, Subscription};

use crate::app::AppState;
use crate::auth::{check_auth, check_credential};
use crate::http::error::api_error;

#[derive(Debug, Default, Deserialize)]
pub struct WsParams {
    pub start: Option<String>,
    pub end: Option<String>,
    /// Browsers cannot set headers on a WS upgrade.
    pub password: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RangeRequest {
    start: String,
    end: String,
}

/// Axum handler: authenticates, then upgrades HTTP to WebSocket at GET /ws.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(params): Query<WsParams>,
) -> Response {
    if !check_auth(&state, &headers) && !check_credential(&state, params.password.as_deref()) {
        return api_error(WeekboardError::AuthFailed("bad or missing password".into()))
            .into_response();
    }
    let (start, end) = match initial_range(&params) {
        Ok(r) => r,
        Err(e) => return api_error(e).into_response(),
    };
    ws.on_upgrade(move |socket| run_connection(socket, state, start, end))
        .into_response()
}

fn initial_range(params: &WsParams) -> Result<(NaiveDate, NaiveDate), WeekboardError> {
    match (&params.start, &params.end) {
        (Some(s), Some(e)) => Ok((parse_date(s)?, parse_date(e)?)),
        (None, None) => {
            let week = week_dates(chrono::Local::now().date_naive())?;
            Ok((week.start, week.end))
        }
        _ => Err(WeekboardError::InvalidInput(
            "start and end must be given together".into(),
        )),
    }
}

fn watch_range(
    state: &AppState,
    start: NaiveDate,
    end: NaiveDate,
    out: &mpsc::UnboundedSender<String>,
) -> Subscription {
    let out = out.clone();
    state.tasks.subscribe_to_range(start, end, move |tasks| {
        let frame = event(
            "snapshot",
            json!({
                "start": format_date(start),
                "end": format_date(end),
                "stats": weekly_stats(&tasks),
                "tasks": tasks,
            }),
        );
        let _ = out.send(frame);
    })
}

fn event(name: &str, mut payload: Value) -> String {
    if let Value::Object(map) = &mut payload {
        map.insert("event".into(), Value::String(name.into()));
    }
    payload.to_string()
}

/// Per-connection event loop; lives for the entire WS session.
async fn run_connection(socket: WebSocket, state: Arc<AppState>, start: NaiveDate, end: NaiveDate) {
    let conn_id = uuid::Uuid::new_v4().to_string();
    state.ws_clients.fetch_add(1, Ordering::Relaxed);
    info!(conn_id = %conn_id, %start, %end, "new WS connection");

    let (mut tx, mut rx) = socket.split();
    let (frames_tx, mut frames_rx) = mpsc::unbounded_channel::<String>();
    let mut subscription = watch_range(&state, start, end, &frames_tx);
    let mut roster_rx = state.roster.subscribe_changes();

    let mut tick = tokio::time::interval(std::time::Duration::from_secs(HEARTBEAT_INTERVAL_SECS));
    tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            msg = rx.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        if text.len() > MAX_PAYLOAD_BYTES {
                            warn!(conn_id, size = text.len(), "payload too large");
                            break;
                        }
                        match parse_range_request(text.as_str()) {
                            Ok((s, e)) => {
                                debug!(conn_id, start = %s, end = %e, "range changed");
                                // Replacing the handle drops (and stops) the old subscription.
                                subscription = watch_range(&state, s, e, &frames_tx);
                            }
                            Err(e) => {
                                let frame = event("error", json!({ "code": e.code(), "message": e.to_string() }));
                                if tx.send(Message::Text(frame.into())).await.is_err() {
                                    break;
                                }
                            }
                        }
                    }
                    Some(Ok(Message::Ping(data))) => {
                        let _ = tx.send(Message::Pong(data)).await;
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    _ => {}
                }
            }

            Some(frame) = frames_rx.recv() => {
                if tx.send(Message::Text(frame.into())).await.is_err() {
                    break;
                }
            }

            change = roster_rx.recv() => {
                match change {
                    Ok(_) | Err(RecvError::Lagged(_)) => {
                        let employees = match state.roster.list_or_fallback(&state.config.roster.defaults) {
                            Ok(list) => list,
                            Err(e) => {
                                warn!(conn_id, "roster reload failed: {e}");
                                continue;
                            }
                        };
                        let frame = event("roster", json!({ "employees": employees }));
                        if tx.send(Message::Text(frame.into())).await.is_err() {
                            break;
                        }
                    }
                    Err(RecvError::Closed) => break,
                }
            }

            _ = tick.tick() => {
                let frame = event("tick", json!({ "ts": chrono::Utc::now().timestamp_millis() }));
                if tx.send(Message::Text(frame.into())).await.is_err() {
                    break;
                }
            }
        }
    }

    subscription.unsubscribe();
    state.ws_clients.fetch_sub(1, Ordering::Relaxed);
    info!(conn_id, "WS connection closed");
}

fn parse_range_request(text: &str) -> Result<(NaiveDate, NaiveDate), WeekboardError> {
    let req: RangeRequest = serde_json::from_str(text)?;
    let start = parse_date(&req.start)?;
    let end = parse_date(&req.end)?;
    if start > end {
        return Err(WeekboardError::InvalidInput("start is after end".into()));
    }
    Ok((start, end))
}

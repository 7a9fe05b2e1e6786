//! Router assembly and REST handlers.

use axum::extract::State;
use axum::http::{header::CONTENT_TYPE, HeaderValue, Method, StatusCode};
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;
use tracing::{error, warn};

use super::{ws, AppState};
use crate::poll::PollRecord;

pub fn router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.client_url);
    Router::new()
        .route("/ws", get(ws::ws_handler))
        .route("/api/polls/history", get(poll_history))
        .route("/healthz", get(healthz))
        .layer(cors)
        .with_state(state)
}

/// Allow the configured browser origin; an unparseable origin falls back to
/// a permissive-less default layer rather than refusing to boot.
fn cors_layer(client_url: &str) -> CorsLayer {
    match client_url.parse::<HeaderValue>() {
        Ok(origin) => CorsLayer::new()
            .allow_origin(origin)
            .allow_methods([Method::GET, Method::POST])
            .allow_headers([CONTENT_TYPE]),
        Err(_) => {
            warn!(client_url = %client_url, "invalid client origin, CORS left at defaults");
            CorsLayer::new()
        }
    }
}

/// The most recent finished polls, newest first.
async fn poll_history(
    State(state): State<AppState>,
) -> Result<Json<Vec<PollRecord>>, StatusCode> {
    state
        .room
        .history()
        .recent(state.config.history_page_size)
        .map(Json)
        .map_err(|err| {
            error!(error = %err, "history read failed");
            StatusCode::INTERNAL_SERVER_ERROR
        })
}

async fn healthz() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "ts": Utc::now().timestamp_millis(),
    }))
}

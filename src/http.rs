//! HTTP API: health, store status, diagnostics, metrics, and static files.
//!
//! Everything shares one router with the WebSocket endpoint, so the board
//! page, its socket, and the probes live on a single port.

use crate::config::{Config, WebSocketConfig};
use crate::handlers::Registry;
use crate::state::Board;
use crate::store::{Session, SessionStore, StoreError};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use stormer_proto::{OriginPolicy, Template};
use tower_http::services::ServeDir;
use tracing::warn;

/// How many sessions `/api/db-status` lists.
const RECENT_SESSIONS: usize = 5;

/// Shared state for every route.
#[derive(Clone)]
pub struct AppState {
    pub board: Arc<Board>,
    pub registry: Arc<Registry>,
    pub origins: Arc<OriginPolicy>,
    pub websocket: Arc<WebSocketConfig>,
    pub max_frame_bytes: usize,
}

impl AppState {
    pub fn new(config: &Config, board: Arc<Board>, registry: Arc<Registry>) -> Self {
        Self {
            board,
            registry,
            origins: Arc::new(OriginPolicy::new(
                config.websocket.allow_origins.clone(),
                config.websocket.require_origin,
            )),
            websocket: Arc::new(config.websocket.clone()),
            max_frame_bytes: config.limits.max_frame_bytes,
        }
    }
}

/// Build the router. Disabled endpoints are simply not routed.
pub fn router(config: &Config, state: AppState) -> Router {
    let mut router = Router::new()
        .route("/api/health", get(health))
        .route("/api/db-status", get(db_status))
        .route(&config.websocket.path, get(crate::network::ws_handler));

    if config.http.debug_endpoints {
        router = router.route("/api/debug/sessions", get(debug_sessions));
    }
    if config.http.metrics {
        router = router.route("/metrics", get(metrics_handler));
    }

    router
        .fallback_service(ServeDir::new(&config.listen.static_dir))
        .with_state(state)
}

#[derive(Debug, Serialize)]
pub struct Health {
    status: &'static str,
    environment: String,
    timestamp: DateTime<Utc>,
}

async fn health(State(state): State<AppState>) -> Json<Health> {
    Json(Health {
        status: "ok",
        environment: state.board.server_info.environment.clone(),
        timestamp: Utc::now(),
    })
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DbStatus {
    status: &'static str,
    backend: &'static str,
    session_count: usize,
    recent_sessions: Vec<RecentSession>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentSession {
    code: String,
    topic: String,
    template: Template,
    user_count: usize,
    idea_count: usize,
    created_at: DateTime<Utc>,
}

impl From<Session> for RecentSession {
    fn from(session: Session) -> Self {
        Self {
            user_count: session.users.len(),
            idea_count: session.ideas.len(),
            code: session.code,
            topic: session.topic,
            template: session.template,
            created_at: session.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    status: &'static str,
    message: String,
}

async fn load_status(store: &dyn SessionStore) -> Result<DbStatus, StoreError> {
    let session_count = store.count_all().await?;
    let recent = store.list_recent(RECENT_SESSIONS).await?;
    Ok(DbStatus {
        status: "connected",
        backend: store.backend(),
        session_count,
        recent_sessions: recent.into_iter().map(RecentSession::from).collect(),
    })
}

fn store_error(e: StoreError) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ApiError {
            status: "error",
            message: e.to_string(),
        }),
    )
        .into_response()
}

async fn db_status(State(state): State<AppState>) -> Response {
    match load_status(state.board.store.as_ref()).await {
        Ok(status) => Json(status).into_response(),
        Err(e) => {
            warn!(error = %e, "Store status check failed");
            store_error(e)
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DebugSessions {
    session_count: usize,
    sessions: Vec<SessionSummary>,
}

#[derive(Debug, Serialize)]
pub struct SessionSummary {
    code: String,
    users: usize,
    ideas: usize,
    template: Template,
}

async fn debug_sessions(State(state): State<AppState>) -> Response {
    match state.board.store.list_all().await {
        Ok(sessions) => Json(DebugSessions {
            session_count: sessions.len(),
            sessions: sessions
                .into_iter()
                .map(|s| SessionSummary {
                    users: s.users.len(),
                    ideas: s.ideas.len(),
                    code: s.code,
                    template: s.template,
                })
                .collect(),
        })
        .into_response(),
        Err(e) => {
            warn!(error = %e, "Session listing failed");
            store_error(e)
        }
    }
}

/// Handler for GET /metrics - returns Prometheus metrics in text format.
async fn metrics_handler() -> String {
    crate::metrics::gather_metrics()
}

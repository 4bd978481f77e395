//! Notewall HTTP moderation API
//!
//! Axum server for the host panel and the operator CLI. Runs alongside the
//! Unix socket store host on port 8767 (configurable).
//!
//! Each endpoint is a thin axum handler over an inner function returning
//! `(StatusCode, serde_json::Value)`, so the logic is testable without axum.
//!
//! Endpoints:
//! - GET    /health                   - liveness, store connectivity
//! - GET    /version                  - server version and protocol
//! - GET    /sessions?partition=      - sessions, all partitions or one
//! - GET    /stats                    - counts per partition, displayed today
//! - POST   /sessions                 - capture a new note
//! - POST   /sessions/:id/:action     - approve | reject | restore | complete
//! - DELETE /sessions/:id             - delete forever (typed confirmation)
//! - POST   /sessions/clear           - delete everything (typed confirmation)
//! - POST   /sessions/seed            - write demo notes
//! - POST   /slideshow/reset          - signal displays to restart
//! - GET    /settings, PATCH /settings
//! - GET    /display                  - current in-process display frame

use std::sync::Arc;

use anyhow::Result;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use notewall_core::display::DisplayFrame;
use notewall_core::ipc::PROTOCOL_VERSION;
use notewall_core::moderation::{ModerationController, Partition};
use notewall_core::{NotewallConfig, NotewallError, SessionStore, SettingsPatch};
use notewall_ingest::{SeedOptions, Submission, SubmissionError};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, watch};

/// Shared state for all HTTP handlers
#[derive(Clone)]
pub struct HttpState {
    pub store: Arc<dyn SessionStore>,
    pub moderation: ModerationController,
    pub config: NotewallConfig,
    /// Present when the in-process display runtime is enabled.
    pub display: Option<watch::Receiver<DisplayFrame>>,
}

/// Build the Axum router with all endpoints
pub fn build_router(state: Arc<HttpState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/version", get(version_handler))
        .route("/sessions", get(list_sessions_handler).post(submit_handler))
        .route("/sessions/clear", post(clear_handler))
        .route("/sessions/seed", post(seed_handler))
        .route("/sessions/:id", delete(delete_handler))
        .route("/sessions/:id/:action", post(transition_handler))
        .route("/stats", get(stats_handler))
        .route("/slideshow/reset", post(reset_handler))
        .route("/settings", get(get_settings_handler).patch(patch_settings_handler))
        .route("/display", get(display_handler))
        .with_state(state)
}

/// Start the HTTP server on the configured address.
/// Gracefully shuts down when the broadcast shutdown signal fires.
pub async fn start_http_server(state: Arc<HttpState>, mut shutdown: broadcast::Receiver<()>) -> Result<()> {
    let addr = format!("{}:{}", state.config.http.host, state.config.http.port);
    let app = build_router(state);
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("Notewall HTTP API listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown.recv().await;
            tracing::info!("HTTP server shutting down...");
        })
        .await?;

    Ok(())
}

// ============================================================================
// Request DTOs
// ============================================================================

#[derive(Debug, Deserialize, Default)]
pub struct ListQuery {
    pub partition: Option<String>,
}

/// Most demo notes one seed request may write.
pub const MAX_SEED_COUNT: usize = 100;

#[derive(Debug, Deserialize, Default)]
pub struct SeedRequest {
    pub count: Option<usize>,
    #[serde(default)]
    pub live: bool,
}

#[derive(Debug, Deserialize, Default)]
pub struct ConfirmationRequest {
    #[serde(default)]
    pub confirmation: String,
}

// ============================================================================
// Inner (directly testable) business logic functions
// ============================================================================

fn error_body(msg: impl std::fmt::Display) -> Value {
    json!({
        "error": msg.to_string(),
        "status": "error",
    })
}

/// Map a domain error to an HTTP status and body.
pub fn error_response(err: &NotewallError) -> (StatusCode, Value) {
    let status = match err {
        NotewallError::NotFound(_) => StatusCode::NOT_FOUND,
        NotewallError::Validation(_) | NotewallError::ConfirmationMismatch { .. } => StatusCode::BAD_REQUEST,
        NotewallError::Disconnected => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, error_body(err))
}

/// Pull the store's current state into the moderation view so a request
/// sees writes that landed just before it.
async fn sync_view(moderation: &ModerationController) -> Option<(StatusCode, Value)> {
    match moderation.refresh().await {
        Ok(()) => None,
        Err(e) => {
            tracing::warn!("Moderation view refresh failed: {}", e);
            Some(error_response(&e))
        }
    }
}

pub async fn health_inner(state: &HttpState) -> (StatusCode, Value) {
    let connected = *state.store.connectivity().borrow();
    let status = if connected { "healthy" } else { "degraded" };
    let code = if connected {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (
        code,
        json!({
            "status": status,
            "version": env!("CARGO_PKG_VERSION"),
            "connected": connected,
            "socket": state.config.service.socket_path,
            "display": state.display.is_some(),
        }),
    )
}

/// Version info (pure, no IO).
pub fn version_inner() -> Value {
    json!({
        "version": env!("CARGO_PKG_VERSION"),
        "protocol": PROTOCOL_VERSION,
    })
}

pub async fn list_sessions_inner(moderation: &ModerationController, query: ListQuery) -> (StatusCode, Value) {
    let partition = match query.partition.as_deref().map(str::parse::<Partition>) {
        None => None,
        Some(Ok(p)) => Some(p),
        Some(Err(e)) => return error_response(&e),
    };
    if let Some(err) = sync_view(moderation).await {
        return err;
    }

    let partitions = moderation.partitions();
    let body = match partition {
        Some(p) => {
            let sessions = partitions.get(p);
            json!({
                "partition": p,
                "count": sessions.len(),
                "sessions": sessions,
            })
        }
        None => match serde_json::to_value(&partitions) {
            Ok(v) => v,
            Err(e) => return (StatusCode::INTERNAL_SERVER_ERROR, error_body(e)),
        },
    };
    (StatusCode::OK, body)
}

pub async fn stats_inner(moderation: &ModerationController) -> (StatusCode, Value) {
    if let Some(err) = sync_view(moderation).await {
        return err;
    }
    let mut body = json!(moderation.stats());
    if let Some(obj) = body.as_object_mut() {
        obj.insert("connected".to_string(), json!(moderation.is_connected()));
    }
    (StatusCode::OK, body)
}

pub async fn submit_inner(store: &dyn SessionStore, ttl_secs: u64, submission: Submission) -> (StatusCode, Value) {
    match notewall_ingest::submit(store, submission, ttl_secs).await {
        Ok(session) => (
            StatusCode::CREATED,
            json!({
                "sessionId": session.session_id,
                "session": session,
            }),
        ),
        Err(SubmissionError::MissingField(field)) => (
            StatusCode::BAD_REQUEST,
            error_body(format!("{} is required", field)),
        ),
        Err(SubmissionError::Store(e)) => error_response(&e),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, error_body(e)),
    }
}

pub async fn seed_inner(store: &dyn SessionStore, ttl_secs: u64, req: SeedRequest) -> (StatusCode, Value) {
    let defaults = SeedOptions::default();
    if req.count.is_some_and(|n| n > MAX_SEED_COUNT) {
        return (
            StatusCode::BAD_REQUEST,
            error_body(format!("count must be at most {}", MAX_SEED_COUNT)),
        );
    }
    let options = SeedOptions {
        count: req.count.unwrap_or(defaults.count),
        live: req.live,
        ttl_secs,
    };
    match notewall_ingest::seed_demo_notes(store, &options).await {
        Ok(ids) => (
            StatusCode::CREATED,
            json!({
                "seeded": ids.len(),
                "ids": ids,
            }),
        ),
        Err(e) => error_response(&e),
    }
}

pub async fn transition_inner(moderation: &ModerationController, id: &str, action: &str) -> (StatusCode, Value) {
    if let Some(err) = sync_view(moderation).await {
        return err;
    }
    let result = match action {
        "approve" => moderation.approve(id).await,
        "reject" => moderation.reject(id).await,
        "restore" => moderation.restore(id).await,
        "complete" => moderation.mark_complete(id).await,
        other => {
            return (
                StatusCode::NOT_FOUND,
                error_body(format!("unknown action: {}", other)),
            )
        }
    };
    match result {
        Ok(updated) => (
            StatusCode::OK,
            json!({
                "id": id,
                "action": action,
                "updated": updated,
            }),
        ),
        Err(e) => error_response(&e),
    }
}

pub async fn delete_inner(moderation: &ModerationController, id: &str, req: ConfirmationRequest) -> (StatusCode, Value) {
    if let Some(err) = sync_view(moderation).await {
        return err;
    }
    match moderation.delete_forever(id, &req.confirmation).await {
        Ok(()) => (StatusCode::OK, json!({ "deleted": id })),
        Err(e) => error_response(&e),
    }
}

pub async fn clear_inner(moderation: &ModerationController, req: ConfirmationRequest) -> (StatusCode, Value) {
    if let Some(err) = sync_view(moderation).await {
        return err;
    }
    match moderation.clear_all(&req.confirmation).await {
        Ok(count) => (StatusCode::OK, json!({ "deleted": count })),
        Err(e) => error_response(&e),
    }
}

pub fn reset_inner(moderation: &ModerationController, req: ConfirmationRequest) -> (StatusCode, Value) {
    match moderation.reset_slideshow(&req.confirmation) {
        Ok(receivers) => (StatusCode::OK, json!({ "sent": true, "receivers": receivers })),
        Err(e) => error_response(&e),
    }
}

pub async fn get_settings_inner(moderation: &ModerationController) -> (StatusCode, Value) {
    if let Some(err) = sync_view(moderation).await {
        return err;
    }
    (StatusCode::OK, json!(moderation.settings()))
}

pub async fn patch_settings_inner(moderation: &ModerationController, patch: SettingsPatch) -> (StatusCode, Value) {
    if patch.is_empty() {
        return (StatusCode::BAD_REQUEST, error_body("no recognised settings fields"));
    }
    if let Some(err) = sync_view(moderation).await {
        return err;
    }
    match moderation.update_settings(patch).await {
        Ok(settings) => (StatusCode::OK, json!(settings)),
        Err(e) => error_response(&e),
    }
}

pub fn display_inner(display: Option<&watch::Receiver<DisplayFrame>>) -> (StatusCode, Value) {
    match display {
        Some(rx) => (StatusCode::OK, json!(*rx.borrow())),
        None => (
            StatusCode::NOT_FOUND,
            error_body("display runtime is not enabled on this server"),
        ),
    }
}

// ============================================================================
// Axum handler wrappers (thin, delegate to inner functions)
// ============================================================================

pub async fn health_handler(State(state): State<Arc<HttpState>>) -> impl IntoResponse {
    let (status, body) = health_inner(&state).await;
    (status, Json(body))
}

pub async fn version_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(version_inner()))
}

pub async fn list_sessions_handler(
    State(state): State<Arc<HttpState>>,
    Query(query): Query<ListQuery>,
) -> impl IntoResponse {
    let (status, body) = list_sessions_inner(&state.moderation, query).await;
    (status, Json(body))
}

pub async fn stats_handler(State(state): State<Arc<HttpState>>) -> impl IntoResponse {
    let (status, body) = stats_inner(&state.moderation).await;
    (status, Json(body))
}

pub async fn submit_handler(
    State(state): State<Arc<HttpState>>,
    Json(submission): Json<Submission>,
) -> impl IntoResponse {
    let ttl = state.config.moderation.session_ttl_seconds;
    let (status, body) = submit_inner(state.store.as_ref(), ttl, submission).await;
    (status, Json(body))
}

pub async fn seed_handler(
    State(state): State<Arc<HttpState>>,
    Json(req): Json<SeedRequest>,
) -> impl IntoResponse {
    let ttl = state.config.moderation.session_ttl_seconds;
    let (status, body) = seed_inner(state.store.as_ref(), ttl, req).await;
    (status, Json(body))
}

pub async fn transition_handler(
    State(state): State<Arc<HttpState>>,
    Path((id, action)): Path<(String, String)>,
) -> impl IntoResponse {
    let (status, body) = transition_inner(&state.moderation, &id, &action).await;
    (status, Json(body))
}

pub async fn delete_handler(
    State(state): State<Arc<HttpState>>,
    Path(id): Path<String>,
    Json(req): Json<ConfirmationRequest>,
) -> impl IntoResponse {
    let (status, body) = delete_inner(&state.moderation, &id, req).await;
    (status, Json(body))
}

pub async fn clear_handler(
    State(state): State<Arc<HttpState>>,
    Json(req): Json<ConfirmationRequest>,
) -> impl IntoResponse {
    let (status, body) = clear_inner(&state.moderation, req).await;
    (status, Json(body))
}

pub async fn reset_handler(
    State(state): State<Arc<HttpState>>,
    Json(req): Json<ConfirmationRequest>,
) -> impl IntoResponse {
    let (status, body) = reset_inner(&state.moderation, req);
    (status, Json(body))
}

pub async fn get_settings_handler(State(state): State<Arc<HttpState>>) -> impl IntoResponse {
    let (status, body) = get_settings_inner(&state.moderation).await;
    (status, Json(body))
}

pub async fn patch_settings_handler(
    State(state): State<Arc<HttpState>>,
    Json(patch): Json<SettingsPatch>,
) -> impl IntoResponse {
    let (status, body) = patch_settings_inner(&state.moderation, patch).await;
    (status, Json(body))
}

pub async fn display_handler(State(state): State<Arc<HttpState>>) -> impl IntoResponse {
    let (status, body) = display_inner(state.display.as_ref());
    (status, Json(body))
}

// ============================================================================
// Unit Tests: call inner functions directly
// ============================================================================

//! # HTTP boundary
//!
//! Thin `axum` layer over [`GachaService`]. Every game operation is a JSON `POST` with
//! its own request type; the handler moves the (blocking) service call onto tokio's
//! blocking pool and serializes the returned view.
//!
//! | Route | Body |
//! |---|---|
//! | `/profile`, `/inventory`, `/team/get`, `/pull`, `/pull10`, `/history`, `/index_data`, `/progress/get` | `username` |
//! | `/team/set` | `username`, `team_ids` |
//! | `/stage/complete` | `username`, `stage_id` (default 1), `victory` |
//! | `/inventory/sell`, `/inventory/dismantle_selected` | `username`, `instance_ids` (alias `ids`) |
//! | `/inventory/dismantle`, `/upgrade/level`, `/upgrade/ascend` | `username`, `instance_id` (alias `id`) |
//!
//! `GET /health` and `GET /metrics` are also served. Errors come back as
//! `{"error": "..."}` with 400 for bodies that are not valid JSON, 404 for unknown instances, 409 for team conflicts (plus the
//! `blocked` ids), 400 for other rejected requests and 500 for storage failures.

use std::sync::Arc;

use anyhow::Context;
use axum::{
    extract::{rejection::JsonRejection, FromRequest, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use log::{error, info, warn};
use serde::Deserialize;
use serde_json::json;
use tower_http::cors::CorsLayer;

use crate::config::ServerConfig;
use crate::gacha::{
    AscendView, DismantleView, GachaError, GachaService, HistoryView, IndexData, InventoryView,
    LevelUpView, Profile, PullTenView, PullView, SaleView, StageProgress, StageView, TeamView,
};
use crate::metrics;
use crate::validation::{normalize_id, normalize_ids};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    service: Arc<GachaService>,
}

// ============================================================================
// Requests
// ============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct UserRequest {
    pub username: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct TeamSetRequest {
    pub username: Option<String>,
    pub team_ids: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct StageRequest {
    pub username: Option<String>,
    pub stage_id: Option<u32>,
    pub victory: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct InstancesRequest {
    pub username: Option<String>,
    #[serde(alias = "ids")]
    pub instance_ids: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct InstanceRequest {
    pub username: Option<String>,
    #[serde(alias = "id")]
    pub instance_id: Option<String>,
}

/// JSON body extractor whose failures use the `{"error": ...}` shape.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

// ============================================================================
// Errors
// ============================================================================

pub struct ApiError(GachaError);

impl From<GachaError> for ApiError {
    fn from(err: GachaError) -> Self {
        ApiError(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        let err = GachaError::InvalidRequest(rejection.body_text());
        warn!("malformed request body: {}", err);
        metrics::record_rejection(err.kind());
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let err = self.0;
        let (status, body) = match &err {
            GachaError::InstanceNotFound(_) => {
                (StatusCode::NOT_FOUND, json!({ "error": err.to_string() }))
            }
            GachaError::TeamConflict { blocked } => (
                StatusCode::CONFLICT,
                json!({ "error": err.to_string(), "blocked": blocked }),
            ),
            e if e.is_rejection() => (StatusCode::BAD_REQUEST, json!({ "error": err.to_string() })),
            _ => {
                error!("request failed: {}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "internal server error" }),
                )
            }
        };
        (status, Json(body)).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

/// Run a service call on the blocking pool; persistence does synchronous file I/O.
async fn run<T, F>(state: &AppState, call: F) -> ApiResult<T>
where
    T: Send + 'static,
    F: FnOnce(&GachaService) -> Result<T, GachaError> + Send + 'static,
{
    let service = Arc::clone(&state.service);
    let out = tokio::task::spawn_blocking(move || call(&service))
        .await
        .map_err(|e| GachaError::Internal(format!("worker task failed: {}", e)))??;
    Ok(Json(out))
}

// ============================================================================
// Handlers
// ============================================================================

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let accounts = state.service.account_count().unwrap_or(0);
    Json(json!({ "status": "ok", "accounts": accounts }))
}

async fn metrics_snapshot() -> impl IntoResponse {
    Json(metrics::snapshot())
}

async fn profile(State(state): State<AppState>, ApiJson(req): ApiJson<UserRequest>) -> ApiResult<Profile> {
    let username = req.username.unwrap_or_default();
    run(&state, move |svc| svc.profile(&username)).await
}

async fn inventory(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<UserRequest>,
) -> ApiResult<InventoryView> {
    let username = req.username.unwrap_or_default();
    run(&state, move |svc| svc.inventory(&username)).await
}

async fn team_get(State(state): State<AppState>, ApiJson(req): ApiJson<UserRequest>) -> ApiResult<TeamView> {
    let username = req.username.unwrap_or_default();
    run(&state, move |svc| svc.team(&username)).await
}

async fn team_set(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<TeamSetRequest>,
) -> ApiResult<TeamView> {
    let username = req.username.unwrap_or_default();
    let candidates = normalize_ids(req.team_ids.as_deref());
    run(&state, move |svc| svc.set_team(&username, &candidates)).await
}

async fn pull(State(state): State<AppState>, ApiJson(req): ApiJson<UserRequest>) -> ApiResult<PullView> {
    let username = req.username.unwrap_or_default();
    run(&state, move |svc| svc.pull_one(&username)).await
}

async fn pull_ten(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<UserRequest>,
) -> ApiResult<PullTenView> {
    let username = req.username.unwrap_or_default();
    run(&state, move |svc| svc.pull_ten(&username)).await
}

async fn history(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<UserRequest>,
) -> ApiResult<HistoryView> {
    let username = req.username.unwrap_or_default();
    run(&state, move |svc| svc.history(&username)).await
}

async fn index_data(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<UserRequest>,
) -> ApiResult<IndexData> {
    let username = req.username.unwrap_or_default();
    run(&state, move |svc| svc.index_data(&username)).await
}

async fn progress(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<UserRequest>,
) -> ApiResult<StageProgress> {
    let username = req.username.unwrap_or_default();
    run(&state, move |svc| svc.progress(&username)).await
}

async fn stage_complete(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<StageRequest>,
) -> ApiResult<StageView> {
    let username = req.username.unwrap_or_default();
    let stage_id = req.stage_id.unwrap_or(1);
    let victory = req.victory.unwrap_or(false);
    run(&state, move |svc| svc.complete_stage(&username, stage_id, victory)).await
}

async fn sell(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<InstancesRequest>,
) -> ApiResult<SaleView> {
    let username = req.username.unwrap_or_default();
    let ids = normalize_ids(req.instance_ids.as_deref());
    run(&state, move |svc| svc.sell(&username, &ids)).await
}

async fn dismantle(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<InstanceRequest>,
) -> ApiResult<DismantleView> {
    let username = req.username.unwrap_or_default();
    let id = normalize_id(req.instance_id.as_deref());
    run(&state, move |svc| svc.dismantle(&username, &id)).await
}

async fn dismantle_selected(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<InstancesRequest>,
) -> ApiResult<DismantleView> {
    let username = req.username.unwrap_or_default();
    let ids = normalize_ids(req.instance_ids.as_deref());
    run(&state, move |svc| svc.dismantle_selected(&username, &ids)).await
}

async fn level_up(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<InstanceRequest>,
) -> ApiResult<LevelUpView> {
    let username = req.username.unwrap_or_default();
    let id = normalize_id(req.instance_id.as_deref());
    run(&state, move |svc| svc.level_up(&username, &id)).await
}

async fn ascend(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<InstanceRequest>,
) -> ApiResult<AscendView> {
    let username = req.username.unwrap_or_default();
    let id = normalize_id(req.instance_id.as_deref());
    run(&state, move |svc| svc.ascend(&username, &id)).await
}

// ============================================================================
// Router / server
// ============================================================================

pub fn router(service: Arc<GachaService>, permissive_cors: bool) -> Router {
    let app = Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics_snapshot))
        .route("/profile", post(profile))
        .route("/inventory", post(inventory))
        .route("/team/get", post(team_get))
        .route("/team/set", post(team_set))
        .route("/pull", post(pull))
        .route("/pull10", post(pull_ten))
        .route("/history", post(history))
        .route("/index_data", post(index_data))
        .route("/progress/get", post(progress))
        .route("/stage/complete", post(stage_complete))
        .route("/inventory/sell", post(sell))
        .route("/inventory/dismantle", post(dismantle))
        .route("/inventory/dismantle_selected", post(dismantle_selected))
        .route("/upgrade/level", post(level_up))
        .route("/upgrade/ascend", post(ascend))
        .with_state(AppState { service });
    if permissive_cors {
        app.layer(CorsLayer::permissive())
    } else {
        app
    }
}

/// Bind `config`'s address and serve until Ctrl-C.
pub async fn serve(service: Arc<GachaService>, config: &ServerConfig) -> anyhow::Result<()> {
    let addr = config.socket_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("swca listening on http://{}", addr);
    axum::serve(listener, router(service, config.permissive_cors))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("http server failed")?;
    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("failed to listen for ctrl-c: {}", e);
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}

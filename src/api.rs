use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::{net::SocketAddr, sync::Arc};
use thiserror::Error;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info, warn};

use crate::blocks::BlockService;
use crate::config::Config;
use crate::db::DailyBlock;
use crate::points::{self, Progress};
use crate::tracker::{CalculateResponse, Tracker, TrackerError};
use crate::validation::{validate_block_number, validate_volume, validate_wallet_address, ValidationError};

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Upstream provider failed: {0}")]
    Upstream(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::BadRequest(_) | ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            error!("{}", self);
        }

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

impl From<TrackerError> for ApiError {
    fn from(err: TrackerError) -> Self {
        ApiError::Upstream(err.to_string())
    }
}

#[derive(Clone)]
pub struct AppState {
    pub tracker: Arc<Tracker>,
    pub blocks: Arc<BlockService>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculateRequest {
    #[serde(default)]
    pub address: Option<String>,
    /// String or number; today's block when absent.
    #[serde(default)]
    pub block_number: Option<Value>,
}

#[derive(Deserialize)]
pub struct PointsQuery {
    pub volume: Option<String>,
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(|| async { "Alpha Tracker API running" }))
        .route("/api/health", get(health))
        .route("/api/block", get(current_block))
        .route("/api/calculate", post(calculate))
        .route("/api/points", get(points_for_volume))
        .with_state(state)
        .layer(cors)
}

pub async fn serve(cfg: &Config, state: AppState) -> eyre::Result<()> {
    let ip = if cfg.bind_all { [0, 0, 0, 0] } else { [127, 0, 0, 1] };
    let addr = SocketAddr::from((ip, cfg.port));
    info!("API listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router(state).into_make_service()).await?;

    Ok(())
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "explorer": state.tracker.explorer().breaker_status(),
    }))
}

// GET /api/block
async fn current_block(State(state): State<AppState>) -> Result<Json<DailyBlock>, ApiError> {
    let block = state
        .blocks
        .current()
        .await
        .map_err(|e| ApiError::Upstream(e.to_string()))?;
    Ok(Json(block))
}

// POST /api/calculate
async fn calculate(
    State(state): State<AppState>,
    payload: Result<Json<CalculateRequest>, JsonRejection>,
) -> Result<Json<CalculateResponse>, ApiError> {
    let Json(req) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    let address = validate_wallet_address(req.address.as_deref().unwrap_or_default())?;

    let start_block = match req.block_number {
        None | Some(Value::Null) => {
            let block = state
                .blocks
                .current()
                .await
                .map_err(|e| ApiError::Upstream(e.to_string()))?;
            block.block_number
        }
        Some(Value::String(s)) => validate_block_number(&s)?,
        Some(Value::Number(n)) => validate_block_number(&n.to_string())?,
        Some(other) => return Err(ValidationError::InvalidBlockNumber(other.to_string()).into()),
    };

    info!("Processing calculate request for {} from block {}", address, start_block);

    let resp = state.tracker.calculate(&address, &start_block).await.map_err(|e| {
        warn!("Calculate failed for {}: {}", address, e);
        ApiError::from(e)
    })?;

    Ok(Json(resp))
}

// GET /api/points?volume=
async fn points_for_volume(Query(q): Query<PointsQuery>) -> Result<Json<Progress>, ApiError> {
    let raw = q
        .volume
        .ok_or_else(|| ValidationError::MissingParameter("volume".to_string()))?;
    let volume: f64 = raw
        .trim()
        .parse()
        .map_err(|_| ValidationError::InvalidVolume(raw.clone()))?;
    let volume = validate_volume(volume)?;

    Ok(Json(points::progress(volume)))
}

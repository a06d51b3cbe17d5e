//! Model status and reload endpoints
//!
//! GET /api/ai/model-status, POST /api/ai/reload-models

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::info;

use crate::config::FallbackConfig;
use crate::services::{ResourceKind, ResourceStatus};
use crate::{ApiError, ApiResult, AppState};

/// Fallback settings as reported to clients
#[derive(Debug, Serialize)]
pub struct FallbackConfigView {
    pub model_load_timeout_secs: u64,
    pub index_init_timeout_secs: u64,
    pub request_timeout_secs: u64,
    pub enable_fallback: bool,
    pub fallback_vector_dim: usize,
}

impl From<&FallbackConfig> for FallbackConfigView {
    fn from(config: &FallbackConfig) -> Self {
        Self {
            model_load_timeout_secs: config.model_load_timeout.as_secs(),
            index_init_timeout_secs: config.index_init_timeout.as_secs(),
            request_timeout_secs: config.request_timeout.as_secs(),
            enable_fallback: config.fallback_enabled,
            fallback_vector_dim: config.fallback_vector_dimension,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ModelStatusResponse {
    pub model_status: BTreeMap<ResourceKind, ResourceStatus>,
    pub fallback_config: FallbackConfigView,
    pub timestamp: DateTime<Utc>,
}

/// Optional reload body; no body reloads everything
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReloadRequest {
    #[serde(default)]
    pub resource: Option<ResourceKind>,
}

impl ReloadRequest {
    /// Empty body → reload all; anything else must parse
    fn from_body(body: &[u8]) -> ApiResult<Self> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        serde_json::from_slice(body)
            .map_err(|e| ApiError::BadRequest(format!("invalid reload request: {}", e)))
    }
}

#[derive(Debug, Serialize)]
pub struct ReloadResponse {
    pub accepted: bool,
    pub resources: Vec<ResourceKind>,
}

/// GET /api/ai/model-status
pub async fn model_status(State(state): State<AppState>) -> Json<ModelStatusResponse> {
    Json(ModelStatusResponse {
        model_status: state.lifecycle.all_statuses(),
        fallback_config: FallbackConfigView::from(state.lifecycle.config()),
        timestamp: Utc::now(),
    })
}

/// POST /api/ai/reload-models
///
/// Starts background reloads and returns 202 immediately. Poll
/// `/api/ai/model-status` for the outcome. A body that does not parse
/// (unknown resource kind, malformed JSON) is rejected with 400 and nothing
/// is reloaded.
pub async fn reload_models(
    State(state): State<AppState>,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<ReloadResponse>)> {
    let request = ReloadRequest::from_body(&body)?;

    let resources = match request.resource {
        Some(kind) => {
            state.lifecycle.reload(kind);
            vec![kind]
        }
        None => {
            state.lifecycle.reload_all();
            ResourceKind::ALL.to_vec()
        }
    };

    info!(?resources, "Reload scheduled");
    Ok((
        StatusCode::ACCEPTED,
        Json(ReloadResponse {
            accepted: true,
            resources,
        }),
    ))
}

/// Build model management routes
pub fn model_routes() -> Router<AppState> {
    Router::new()
        .route("/api/ai/model-status", get(model_status))
        .route("/api/ai/reload-models", post(reload_models))
}

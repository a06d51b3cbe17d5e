//! Vector collection endpoints
//!
//! POST /api/vector/user-interests, /api/vector/content-similarity,
//! /api/vector/cluster-compatibility
//!
//! Unlike `/api/ai/index-vector` these report failures: 503 while the index
//! is not ready, 502 when the index rejects the add.

use axum::{extract::State, routing::post, Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::info;

use crate::services::Collection;
use crate::{ApiResult, AppState};

#[derive(Debug, Deserialize)]
pub struct AddVectorRequest {
    #[serde(alias = "user_id", alias = "content_id", alias = "cluster_id")]
    pub id: String,
    pub vector: Vec<f32>,
    /// Extra metadata stored beside the id and creation time
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

#[derive(Debug, Serialize)]
pub struct AddVectorResponse {
    pub status: &'static str,
    pub collection: Collection,
    pub id: String,
}

async fn add_vector(
    state: AppState,
    collection: Collection,
    request: AddVectorRequest,
) -> ApiResult<Json<AddVectorResponse>> {
    let mut metadata = request.metadata;
    metadata.insert(collection.id_field().to_string(), Value::from(request.id.clone()));
    metadata.insert("created_at".to_string(), Value::from(Utc::now().to_rfc3339()));

    state
        .gateway
        .store_vector(collection, &request.id, &request.vector, Value::Object(metadata))
        .await?;

    info!(collection = %collection, id = %request.id, "Vector added");
    Ok(Json(AddVectorResponse {
        status: "success",
        collection,
        id: request.id,
    }))
}

/// POST /api/vector/user-interests
pub async fn add_user_interest(
    State(state): State<AppState>,
    Json(request): Json<AddVectorRequest>,
) -> ApiResult<Json<AddVectorResponse>> {
    add_vector(state, Collection::UserInterests, request).await
}

/// POST /api/vector/content-similarity
pub async fn add_content_vector(
    State(state): State<AppState>,
    Json(request): Json<AddVectorRequest>,
) -> ApiResult<Json<AddVectorResponse>> {
    add_vector(state, Collection::ContentSimilarity, request).await
}

/// POST /api/vector/cluster-compatibility
pub async fn add_cluster_vector(
    State(state): State<AppState>,
    Json(request): Json<AddVectorRequest>,
) -> ApiResult<Json<AddVectorResponse>> {
    add_vector(state, Collection::ClusterCompatibility, request).await
}

/// Build vector collection routes
pub fn vector_routes() -> Router<AppState> {
    Router::new()
        .route("/api/vector/user-interests", post(add_user_interest))
        .route("/api/vector/content-similarity", post(add_content_vector))
        .route("/api/vector/cluster-compatibility", post(add_cluster_vector))
}

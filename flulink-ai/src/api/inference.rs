//! Embedding and similarity endpoints
//!
//! POST /api/ai/embed-text, /api/ai/find-similar-users, /api/ai/index-vector

use axum::{extract::State, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::services::{Candidate, Collection, EmbeddingResult, SimilarityResult};
use crate::{ApiResult, AppState};

#[derive(Debug, Deserialize)]
pub struct EmbedTextRequest {
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct FindSimilarRequest {
    pub seed_vector: Vec<f32>,
    #[serde(default)]
    pub user_pool: Vec<Candidate>,
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(default = "default_min_similarity")]
    pub min_similarity: f32,
}

fn default_limit() -> usize {
    10
}

fn default_min_similarity() -> f32 {
    0.6
}

fn default_collection() -> Collection {
    Collection::UserInterests
}

#[derive(Debug, Deserialize)]
pub struct IndexVectorRequest {
    /// Defaults to the user interest collection
    #[serde(default = "default_collection")]
    pub collection: Collection,
    pub id: String,
    pub vector: Vec<f32>,
    #[serde(default)]
    pub metadata: Option<Value>,
}

#[derive(Debug, Serialize)]
pub struct IndexVectorResponse {
    pub collection: Collection,
    pub id: String,
    pub indexed: bool,
}

/// POST /api/ai/embed-text
pub async fn embed_text(
    State(state): State<AppState>,
    Json(request): Json<EmbedTextRequest>,
) -> ApiResult<Json<EmbeddingResult>> {
    let result = state.gateway.embed(&request.text).await?;
    Ok(Json(result))
}

/// POST /api/ai/find-similar-users
pub async fn find_similar_users(
    State(state): State<AppState>,
    Json(request): Json<FindSimilarRequest>,
) -> ApiResult<Json<SimilarityResult>> {
    let result = state
        .gateway
        .find_similar(
            &request.seed_vector,
            &request.user_pool,
            request.limit,
            request.min_similarity,
        )
        .await?;
    Ok(Json(result))
}

/// POST /api/ai/index-vector
///
/// Always 200; `indexed` is false when the vector index is not ready.
pub async fn index_vector(
    State(state): State<AppState>,
    Json(request): Json<IndexVectorRequest>,
) -> Json<IndexVectorResponse> {
    let metadata = request
        .metadata
        .unwrap_or_else(|| Value::Object(Default::default()));
    let indexed = state
        .gateway
        .index_vector(request.collection, &request.id, &request.vector, metadata)
        .await;

    Json(IndexVectorResponse {
        collection: request.collection,
        id: request.id,
        indexed,
    })
}

/// Build inference routes
pub fn inference_routes() -> Router<AppState> {
    Router::new()
        .route("/api/ai/embed-text", post(embed_text))
        .route("/api/ai/find-similar-users", post(find_similar_users))
        .route("/api/ai/index-vector", post(index_vector))
}

//! Content analysis and spread prediction endpoints
//!
//! POST /api/analyze/toxicity, /api/predict/spread, /api/ai/analyze-content,
//! /api/ai/extract-tags, /api/ai/predict-potential, /api/ai/optimize-propagation

use axum::{extract::State, routing::post, Json, Router};
use chrono::Utc;
use flulink_common::{AccessTier, OriginLocation};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{info, warn};

use crate::services::{
    analyze_content, extract_tags, optimize_propagation, predict_potential, ContentAnalysis,
    PropagationOptimization, PropagationPlan, RecordStore, SpreadPotential, TagExtraction,
    ToxicityAssessment,
};
use crate::{ApiResult, AppState};

#[derive(Debug, Deserialize)]
pub struct ToxicityRequest {
    pub content: String,
    /// Strain record to update with the result
    #[serde(default)]
    pub strain_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SpreadRequest {
    pub toxicity_score: f64,
    #[serde(alias = "access_tier")]
    pub creator_level: String,
    #[serde(default)]
    pub origin_location: OriginLocation,
    #[serde(default)]
    pub strain_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ContentRequest {
    pub content: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct StarSeed {
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct PotentialRequest {
    #[serde(default)]
    pub star_seed: StarSeed,
}

#[derive(Debug, Deserialize)]
pub struct OptimizeRequest {
    #[serde(default)]
    pub star_seed: Map<String, Value>,
    #[serde(default)]
    pub target_users: Vec<Value>,
}

/// POST /api/analyze/toxicity
///
/// Never fails on analyzer trouble; the keyword fallback answers instead.
pub async fn analyze_toxicity(
    State(state): State<AppState>,
    Json(request): Json<ToxicityRequest>,
) -> Json<ToxicityAssessment> {
    let assessment = state.classifier.classify(&request.content).await;

    info!(
        score = assessment.toxicity_score.value(),
        virulence = %assessment.virulence_level,
        model_used = %assessment.served_by,
        "Toxicity analyzed"
    );

    if let (Some(strain_id), Some(store)) = (request.strain_id, state.record_store.clone()) {
        persist_assessment(store, strain_id, &assessment);
    }

    Json(assessment)
}

/// Write the assessment to the strain record in the background
fn persist_assessment(store: Arc<dyn RecordStore>, strain_id: String, assessment: &ToxicityAssessment) {
    let mut fields = Map::new();
    fields.insert(
        "toxicity_score".to_string(),
        Value::from(assessment.toxicity_score.value()),
    );
    fields.insert(
        "virulence_level".to_string(),
        Value::from(assessment.virulence_level.as_str()),
    );
    fields.insert(
        "spectral_tags".to_string(),
        Value::from(assessment.tags.clone()),
    );

    tokio::spawn(async move {
        match store.update(&strain_id, fields).await {
            Ok(true) => info!(strain_id = %strain_id, "Strain record updated"),
            Ok(false) => warn!(strain_id = %strain_id, "Strain record update rejected"),
            Err(e) => warn!(strain_id = %strain_id, error = %e, "Strain record update failed"),
        }
    });
}

/// POST /api/predict/spread
pub async fn predict_spread(
    State(state): State<AppState>,
    Json(request): Json<SpreadRequest>,
) -> ApiResult<Json<PropagationPlan>> {
    let tier: AccessTier = request.creator_level.parse()?;
    let plan = state
        .predictor
        .predict(request.toxicity_score, tier, request.origin_location)?;

    info!(
        strain_id = request.strain_id.as_deref().unwrap_or("-"),
        tier = %tier,
        levels = plan.predicted_path.len(),
        estimated_reach = plan.estimated_reach,
        "Spread predicted"
    );

    Ok(Json(plan))
}

/// POST /api/ai/analyze-content
pub async fn analyze_content_handler(Json(request): Json<ContentRequest>) -> Json<ContentAnalysis> {
    Json(analyze_content(&request.content))
}

/// POST /api/ai/extract-tags
pub async fn extract_tags_handler(Json(request): Json<ContentRequest>) -> Json<TagExtraction> {
    Json(extract_tags(&request.content))
}

/// POST /api/ai/predict-potential
pub async fn predict_potential_handler(Json(request): Json<PotentialRequest>) -> Json<SpreadPotential> {
    Json(predict_potential(&request.star_seed.content))
}

/// POST /api/ai/optimize-propagation
///
/// Delivery sequence starts at the current time.
pub async fn optimize_propagation_handler(
    Json(request): Json<OptimizeRequest>,
) -> Json<PropagationOptimization> {
    let result = optimize_propagation(&request.star_seed, &request.target_users, Utc::now());
    info!(
        seed_id = %result.optimal_path.seed_id,
        targets = result.optimal_path.estimated_reach,
        "Propagation path optimized"
    );
    Json(result)
}

/// Build analysis routes
pub fn analysis_routes() -> Router<AppState> {
    Router::new()
        .route("/api/analyze/toxicity", post(analyze_toxicity))
        .route("/api/predict/spread", post(predict_spread))
        .route("/api/ai/analyze-content", post(analyze_content_handler))
        .route("/api/ai/extract-tags", post(extract_tags_handler))
        .route("/api/ai/predict-potential", post(predict_potential_handler))
        .route("/api/ai/optimize-propagation", post(optimize_propagation_handler))
}

//! flulink-ai library interface
//!
//! Resilient inference layer for FluLink: embeddings and similar-user lookup
//! with transparent fallback, toxicity (virality) classification, and
//! geo-hierarchy spread prediction. Exposed over HTTP by the `flulink-ai`
//! binary; the library surface is what the integration tests drive.

pub mod api;
pub mod config;
pub mod error;
pub mod services;

pub use crate::error::{ApiError, ApiResult, InferenceError};

use crate::config::AiConfig;
use crate::services::{
    ContentAnalyzer, EmbeddingModel, HttpContentAnalyzer, HttpEmbeddingModelLoader,
    HttpRecordBackend, HttpVectorIndexLoader, InferenceGateway, ModelLifecycleManager,
    RecordStore, RecordStoreClient, ResourceLoader, SpreadPredictor, ToxicityClassifier,
    UnconfiguredLoader, VectorIndex,
};
use axum::Router;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Resource status registry
    pub lifecycle: Arc<ModelLifecycleManager>,
    pub gateway: Arc<InferenceGateway>,
    pub classifier: Arc<ToxicityClassifier>,
    pub predictor: Arc<SpreadPredictor>,
    /// Where strain attributes are persisted, when configured
    pub record_store: Option<Arc<dyn RecordStore>>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(
        lifecycle: Arc<ModelLifecycleManager>,
        classifier: ToxicityClassifier,
        predictor: SpreadPredictor,
        record_store: Option<Arc<dyn RecordStore>>,
    ) -> Self {
        Self {
            gateway: Arc::new(InferenceGateway::new(Arc::clone(&lifecycle))),
            lifecycle,
            classifier: Arc::new(classifier),
            predictor: Arc::new(predictor),
            record_store,
            startup_time: Utc::now(),
        }
    }

    /// Wire up HTTP collaborators from `config`
    ///
    /// Endpoints left unset are not an error: the matching resource settles
    /// in `Failed` (or the collaborator is skipped) and requests are served
    /// by the fallback path.
    pub fn from_config(config: &AiConfig) -> flulink_common::Result<Self> {
        let endpoints = &config.endpoints;
        let request_timeout = config.fallback.request_timeout;

        let embedding_loader: Arc<dyn ResourceLoader<dyn EmbeddingModel>> = match &endpoints.embedding_url {
            Some(url) => Arc::new(HttpEmbeddingModelLoader::new(
                url.as_str(),
                endpoints.embedding_model.as_str(),
                request_timeout,
            )),
            None => Arc::new(UnconfiguredLoader::new("embedding model")),
        };

        let index_loader: Arc<dyn ResourceLoader<dyn VectorIndex>> = match &endpoints.vector_index_url {
            Some(url) => Arc::new(HttpVectorIndexLoader::new(
                url.as_str(),
                endpoints.collection_names(),
                request_timeout,
            )),
            None => Arc::new(UnconfiguredLoader::new("vector index")),
        };

        let analyzer: Option<Arc<dyn ContentAnalyzer>> = match &endpoints.analyzer_url {
            Some(url) => {
                let client = HttpContentAnalyzer::new(
                    url,
                    endpoints.analyzer_api_key.clone().unwrap_or_default(),
                    request_timeout,
                )
                .map_err(|e| flulink_common::Error::Config(format!("content analyzer: {}", e)))?;
                Some(Arc::new(client))
            }
            None => None,
        };

        let record_store: Option<Arc<dyn RecordStore>> = match (
            &endpoints.record_store_url,
            &endpoints.record_store_identity,
            &endpoints.record_store_password,
        ) {
            (Some(url), Some(identity), Some(password)) => {
                let backend = HttpRecordBackend::new(
                    url,
                    &endpoints.record_collection,
                    identity.clone(),
                    password.clone(),
                    request_timeout,
                )
                .map_err(|e| flulink_common::Error::Config(format!("record store: {}", e)))?;
                Some(Arc::new(RecordStoreClient::new(backend)))
            }
            (Some(_), _, _) => {
                tracing::warn!("Record store URL set without credentials; persistence disabled");
                None
            }
            _ => None,
        };

        info!(
            embedding = endpoints.embedding_url.is_some(),
            vector_index = endpoints.vector_index_url.is_some(),
            analyzer = analyzer.is_some(),
            record_store = record_store.is_some(),
            "Collaborators configured"
        );

        let lifecycle = Arc::new(ModelLifecycleManager::new(
            config.fallback.clone(),
            embedding_loader,
            index_loader,
        ));

        Ok(Self::new(
            lifecycle,
            ToxicityClassifier::new(analyzer, request_timeout),
            SpreadPredictor::new(),
            record_store,
        ))
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::health_routes())
        .merge(api::model_routes())
        .merge(api::inference_routes())
        .merge(api::analysis_routes())
        .merge(api::vector_routes())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

//! Test Helper Utilities
//!
//! Mock collaborators and app builders shared by the flulink-ai integration
//! tests. Mocks implement the same traits as the HTTP clients.

#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use flulink_ai::config::FallbackConfig;
use flulink_ai::services::{
    AnalysisType, AnalyzerError, AnalyzerResult, Collection, ContentAnalyzer, EmbeddingModel,
    EmbeddingModelError, IndexHit, LoadError, ModelLifecycleManager, RecordStore,
    RecordStoreError, ResourceLoader, SpreadPredictor, ToxicityClassifier, VectorIndex,
    VectorIndexError,
};
use flulink_ai::AppState;
use http_body_util::BodyExt;
use serde_json::{Map, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tower::util::ServiceExt;

/// Embedding model returning a fixed vector
pub struct StaticModel {
    pub vector: Vec<f32>,
}

#[async_trait]
impl EmbeddingModel for StaticModel {
    fn name(&self) -> &str {
        "static-test-model"
    }

    async fn encode(&self, _text: &str) -> Result<Vec<f32>, EmbeddingModelError> {
        Ok(self.vector.clone())
    }
}

/// Model loader that counts constructions and can be slowed or failed
pub struct MockModelLoader {
    pub calls: AtomicUsize,
    pub delay: Duration,
    pub fail: bool,
}

impl MockModelLoader {
    pub fn ready() -> Arc<Self> {
        Self::with(Duration::ZERO, false)
    }

    pub fn failing() -> Arc<Self> {
        Self::with(Duration::ZERO, true)
    }

    pub fn slow(delay: Duration) -> Arc<Self> {
        Self::with(delay, false)
    }

    pub fn with(delay: Duration, fail: bool) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            delay,
            fail,
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ResourceLoader<dyn EmbeddingModel> for MockModelLoader {
    async fn load(&self) -> Result<Arc<dyn EmbeddingModel>, LoadError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        if self.fail {
            return Err(LoadError::new("model weights unavailable"));
        }
        Ok(Arc::new(StaticModel {
            vector: vec![0.6, 0.8, 0.0],
        }))
    }
}

/// Vector index with canned user-interest hits; records adds
#[derive(Default)]
pub struct MockIndex {
    pub hits: Vec<IndexHit>,
    pub added: Mutex<Vec<(Collection, String, Value)>>,
}

impl MockIndex {
    /// Ids added to `collection`, in order
    pub fn added_ids(&self, collection: Collection) -> Vec<String> {
        self.added
            .lock()
            .unwrap()
            .iter()
            .filter(|(c, _, _)| *c == collection)
            .map(|(_, id, _)| id.clone())
            .collect()
    }
}

#[async_trait]
impl VectorIndex for MockIndex {
    async fn query(&self, collection: Collection, _vector: &[f32], k: usize) -> Result<Vec<IndexHit>, VectorIndexError> {
        if collection != Collection::UserInterests {
            return Ok(Vec::new());
        }
        Ok(self.hits.iter().take(k).cloned().collect())
    }

    async fn add(
        &self,
        collection: Collection,
        id: &str,
        _vector: &[f32],
        metadata: Value,
    ) -> Result<bool, VectorIndexError> {
        self.added
            .lock()
            .unwrap()
            .push((collection, id.to_string(), metadata));
        Ok(true)
    }
}

pub struct MockIndexLoader {
    pub index: Option<Arc<MockIndex>>,
}

impl MockIndexLoader {
    pub fn ready(index: Arc<MockIndex>) -> Arc<Self> {
        Arc::new(Self { index: Some(index) })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self { index: None })
    }
}

#[async_trait]
impl ResourceLoader<dyn VectorIndex> for MockIndexLoader {
    async fn load(&self) -> Result<Arc<dyn VectorIndex>, LoadError> {
        match &self.index {
            Some(index) => Ok(index.clone()),
            None => Err(LoadError::new("index unreachable")),
        }
    }
}

/// Analyzer that always fails, forcing keyword scoring
pub struct DownAnalyzer;

#[async_trait]
impl ContentAnalyzer for DownAnalyzer {
    async fn analyze(&self, _text: &str, _t: AnalysisType) -> Result<AnalyzerResult, AnalyzerError> {
        Err(AnalyzerError::NetworkError("connection refused".to_string()))
    }
}

/// Record store that remembers every update
#[derive(Default)]
pub struct RecordingStore {
    pub updates: Mutex<Vec<(String, Map<String, Value>)>>,
}

#[async_trait]
impl RecordStore for RecordingStore {
    async fn update(&self, record_id: &str, fields: Map<String, Value>) -> Result<bool, RecordStoreError> {
        self.updates.lock().unwrap().push((record_id.to_string(), fields));
        Ok(true)
    }
}

pub fn test_config(fallback_enabled: bool) -> FallbackConfig {
    FallbackConfig {
        model_load_timeout: Duration::from_secs(2),
        index_init_timeout: Duration::from_secs(2),
        request_timeout: Duration::from_millis(500),
        fallback_enabled,
        fallback_vector_dimension: 64,
    }
}

/// State whose resources fail to load (after `initialize`)
pub fn degraded_state(fallback_enabled: bool) -> AppState {
    let lifecycle = Arc::new(ModelLifecycleManager::new(
        test_config(fallback_enabled),
        MockModelLoader::failing(),
        MockIndexLoader::failing(),
    ));
    AppState::new(
        lifecycle,
        ToxicityClassifier::new(Some(Arc::new(DownAnalyzer)), Duration::from_millis(200)),
        SpreadPredictor::with_seed(42),
        None,
    )
}

/// State with working mock resources (after `initialize`)
pub fn healthy_state(index: Arc<MockIndex>, record_store: Option<Arc<dyn RecordStore>>) -> AppState {
    let lifecycle = Arc::new(ModelLifecycleManager::new(
        test_config(true),
        MockModelLoader::ready(),
        MockIndexLoader::ready(index),
    ));
    AppState::new(
        lifecycle,
        ToxicityClassifier::local_only(),
        SpreadPredictor::with_seed(42),
        record_store,
    )
}

/// Run the state's startup load and build the router
pub async fn initialized_app(state: AppState) -> Router {
    state.lifecycle.initialize().await;
    flulink_ai::build_router(state)
}

pub async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    read_json(response).await
}

pub async fn post_json(app: Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(serde_json::to_string(&body).unwrap()))
                .unwrap(),
        )
        .await
        .unwrap();
    read_json(response).await
}

async fn read_json(response: axum::response::Response) -> (StatusCode, Value) {
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap()
    };
    (status, json)
}

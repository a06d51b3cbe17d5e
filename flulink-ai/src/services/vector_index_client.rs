//! Vector index client
//!
//! Nearest-neighbour lookups and vector storage against a Chroma-compatible
//! REST API. One connection serves three collections: user interests
//! (similar-user search), content similarity and cluster compatibility.
//! Similarity is reported as `1 - distance`.

use crate::services::lifecycle::{LoadError, ResourceLoader};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

const USER_AGENT: &str = concat!("FluLink-AI/", env!("CARGO_PKG_VERSION"));

/// Vector index errors
#[derive(Debug, Error)]
pub enum VectorIndexError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("API error {0}: {1}")]
    ApiError(u16, String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Collection not available: {0}")]
    UnknownCollection(Collection),
}

/// Logical collections held in the index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    UserInterests,
    ContentSimilarity,
    ClusterCompatibility,
}

impl Collection {
    pub const ALL: [Collection; 3] = [
        Collection::UserInterests,
        Collection::ContentSimilarity,
        Collection::ClusterCompatibility,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::UserInterests => "user_interests",
            Collection::ContentSimilarity => "content_similarity",
            Collection::ClusterCompatibility => "cluster_compatibility",
        }
    }

    /// Metadata key naming the stored id (`user_id`, `content_id`, `cluster_id`)
    pub fn id_field(&self) -> &'static str {
        match self {
            Collection::UserInterests => "user_id",
            Collection::ContentSimilarity => "content_id",
            Collection::ClusterCompatibility => "cluster_id",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Collection {
    type Err = flulink_common::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Collection::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| flulink_common::Error::InvalidInput(format!("unknown collection: {}", s)))
    }
}

/// Server-side collection name for each logical collection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionNames {
    pub user_interests: String,
    pub content_similarity: String,
    pub cluster_compatibility: String,
}

impl Default for CollectionNames {
    fn default() -> Self {
        Self {
            user_interests: Collection::UserInterests.as_str().to_string(),
            content_similarity: Collection::ContentSimilarity.as_str().to_string(),
            cluster_compatibility: Collection::ClusterCompatibility.as_str().to_string(),
        }
    }
}

impl CollectionNames {
    pub fn name(&self, collection: Collection) -> &str {
        match collection {
            Collection::UserInterests => &self.user_interests,
            Collection::ContentSimilarity => &self.content_similarity,
            Collection::ClusterCompatibility => &self.cluster_compatibility,
        }
    }
}

/// One neighbour returned by a query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexHit {
    pub id: String,
    pub distance: f32,
    pub metadata: Value,
}

impl IndexHit {
    pub fn similarity(&self) -> f32 {
        1.0 - self.distance
    }
}

#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Up to `k` nearest neighbours of `vector` in `collection`, closest first
    async fn query(
        &self,
        collection: Collection,
        vector: &[f32],
        k: usize,
    ) -> Result<Vec<IndexHit>, VectorIndexError>;

    /// Store `vector` under `id` in `collection`
    async fn add(
        &self,
        collection: Collection,
        id: &str,
        vector: &[f32],
        metadata: Value,
    ) -> Result<bool, VectorIndexError>;
}

#[derive(Debug, Serialize)]
struct QueryRequest<'a> {
    query_embeddings: [&'a [f32]; 1],
    n_results: usize,
}

/// Chroma returns one list per query embedding
#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    ids: Vec<Vec<String>>,
    #[serde(default)]
    distances: Option<Vec<Vec<f32>>>,
    #[serde(default)]
    metadatas: Option<Vec<Vec<Option<Value>>>>,
}

impl QueryResponse {
    fn into_hits(self) -> Vec<IndexHit> {
        let ids = self.ids.into_iter().next().unwrap_or_default();
        let distances = self
            .distances
            .and_then(|d| d.into_iter().next())
            .unwrap_or_default();
        let metadatas = self
            .metadatas
            .and_then(|m| m.into_iter().next())
            .unwrap_or_default();

        ids.into_iter()
            .enumerate()
            .filter_map(|(i, id)| {
                // A hit without a distance cannot be scored
                let distance = *distances.get(i)?;
                let metadata = metadatas
                    .get(i)
                    .cloned()
                    .flatten()
                    .unwrap_or_else(|| Value::Object(Default::default()));
                Some(IndexHit { id, distance, metadata })
            })
            .collect()
    }
}

#[derive(Debug, Serialize)]
struct AddRequest<'a> {
    ids: [&'a str; 1],
    embeddings: [&'a [f32]; 1],
    metadatas: [Value; 1],
}

#[derive(Debug, Serialize)]
struct CreateCollectionRequest<'a> {
    name: &'a str,
    get_or_create: bool,
}

#[derive(Debug, Deserialize)]
struct CollectionResponse {
    id: String,
}

/// Chroma REST client with every collection resolved up front
pub struct HttpVectorIndex {
    http_client: reqwest::Client,
    base_url: String,
    collection_ids: HashMap<Collection, String>,
}

impl HttpVectorIndex {
    fn build_client(timeout: Duration) -> Result<reqwest::Client, VectorIndexError> {
        reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| VectorIndexError::NetworkError(e.to_string()))
    }

    /// Check the server is alive and resolve (or create) every collection
    pub async fn connect(
        base_url: &str,
        names: &CollectionNames,
        timeout: Duration,
    ) -> Result<Self, VectorIndexError> {
        let http_client = Self::build_client(timeout)?;
        let base_url = base_url.trim_end_matches('/').to_string();

        let heartbeat = http_client
            .get(format!("{}/api/v1/heartbeat", base_url))
            .send()
            .await
            .map_err(|e| VectorIndexError::NetworkError(e.to_string()))?;
        if !heartbeat.status().is_success() {
            let status = heartbeat.status().as_u16();
            let error_text = heartbeat.text().await.unwrap_or_default();
            return Err(VectorIndexError::ApiError(status, error_text));
        }

        let mut collection_ids = HashMap::new();
        for collection in Collection::ALL {
            let id = Self::get_or_create(&http_client, &base_url, names.name(collection)).await?;
            tracing::info!(collection = %collection, collection_id = %id, "Vector index collection ready");
            collection_ids.insert(collection, id);
        }

        Ok(Self {
            http_client,
            base_url,
            collection_ids,
        })
    }

    async fn get_or_create(
        http_client: &reqwest::Client,
        base_url: &str,
        name: &str,
    ) -> Result<String, VectorIndexError> {
        let response = http_client
            .post(format!("{}/api/v1/collections", base_url))
            .json(&CreateCollectionRequest {
                name,
                get_or_create: true,
            })
            .send()
            .await
            .map_err(|e| VectorIndexError::NetworkError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(VectorIndexError::ApiError(status.as_u16(), error_text));
        }

        let created: CollectionResponse = response
            .json()
            .await
            .map_err(|e| VectorIndexError::ParseError(e.to_string()))?;
        Ok(created.id)
    }

    fn collection_url(&self, collection: Collection, action: &str) -> Result<String, VectorIndexError> {
        let id = self
            .collection_ids
            .get(&collection)
            .ok_or(VectorIndexError::UnknownCollection(collection))?;
        Ok(format!("{}/api/v1/collections/{}/{}", self.base_url, id, action))
    }
}

#[async_trait]
impl VectorIndex for HttpVectorIndex {
    async fn query(
        &self,
        collection: Collection,
        vector: &[f32],
        k: usize,
    ) -> Result<Vec<IndexHit>, VectorIndexError> {
        let response = self
            .http_client
            .post(self.collection_url(collection, "query")?)
            .json(&QueryRequest {
                query_embeddings: [vector],
                n_results: k,
            })
            .send()
            .await
            .map_err(|e| VectorIndexError::NetworkError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(VectorIndexError::ApiError(status.as_u16(), error_text));
        }

        let body: QueryResponse = response
            .json()
            .await
            .map_err(|e| VectorIndexError::ParseError(e.to_string()))?;

        let hits = body.into_hits();
        tracing::debug!(collection = %collection, k, hits = hits.len(), "Vector index query complete");
        Ok(hits)
    }

    async fn add(
        &self,
        collection: Collection,
        id: &str,
        vector: &[f32],
        metadata: Value,
    ) -> Result<bool, VectorIndexError> {
        let response = self
            .http_client
            .post(self.collection_url(collection, "add")?)
            .json(&AddRequest {
                ids: [id],
                embeddings: [vector],
                metadatas: [metadata],
            })
            .send()
            .await
            .map_err(|e| VectorIndexError::NetworkError(e.to_string()))?;

        let ok = response.status().is_success();
        if !ok {
            tracing::warn!(collection = %collection, id, status = response.status().as_u16(), "Vector index rejected add");
        }
        Ok(ok)
    }
}

/// Connects an [`HttpVectorIndex`]
pub struct HttpVectorIndexLoader {
    base_url: String,
    names: CollectionNames,
    request_timeout: Duration,
}

impl HttpVectorIndexLoader {
    pub fn new(base_url: impl Into<String>, names: CollectionNames, request_timeout: Duration) -> Self {
        Self {
            base_url: base_url.into(),
            names,
            request_timeout,
        }
    }
}

#[async_trait]
impl ResourceLoader<dyn VectorIndex> for HttpVectorIndexLoader {
    async fn load(&self) -> Result<Arc<dyn VectorIndex>, LoadError> {
        let index = HttpVectorIndex::connect(&self.base_url, &self.names, self.request_timeout)
            .await
            .map_err(|e| LoadError::new(e.to_string()))?;
        Ok(Arc::new(index))
    }
}

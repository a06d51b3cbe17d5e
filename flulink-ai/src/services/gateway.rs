//! Inference gateway
//!
//! Single entry point for embeddings and similar-user lookups. Each call reads
//! the resource snapshot once, tries the primary resource under the request
//! timeout, and degrades to the local fallback when that is not possible.
//! Every result carries the [`ServedBy`] tag of the path that produced it.

use crate::error::InferenceError;
use crate::services::fallback_vector::FallbackVectorGenerator;
use crate::services::lifecycle::ModelLifecycleManager;
use crate::services::similarity::{rank_candidates, rank_matches, Candidate, SimilarityMatch};
use crate::services::vector_index_client::Collection;
use flulink_common::ServedBy;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Embedding for one text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingResult {
    pub vector: Vec<f32>,
    pub dimension: usize,
    #[serde(rename = "model_used")]
    pub served_by: ServedBy,
}

/// Ranked similar users
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarityResult {
    #[serde(rename = "similar_users")]
    pub matches: Vec<SimilarityMatch>,
    #[serde(rename = "model_used")]
    pub served_by: ServedBy,
}

pub struct InferenceGateway {
    lifecycle: Arc<ModelLifecycleManager>,
    fallback: FallbackVectorGenerator,
}

impl InferenceGateway {
    pub fn new(lifecycle: Arc<ModelLifecycleManager>) -> Self {
        Self {
            lifecycle,
            fallback: FallbackVectorGenerator::new(),
        }
    }

    pub fn lifecycle(&self) -> &Arc<ModelLifecycleManager> {
        &self.lifecycle
    }

    fn request_timeout(&self) -> Duration {
        self.lifecycle.config().request_timeout
    }

    fn fallback_enabled(&self) -> bool {
        self.lifecycle.config().fallback_enabled
    }

    /// Embed `text`
    ///
    /// Never fails while fallback is enabled; with fallback disabled an
    /// unusable primary yields `ResourceUnavailable`.
    pub async fn embed(&self, text: &str) -> Result<EmbeddingResult, InferenceError> {
        let snapshot = self.lifecycle.embedding_snapshot();

        let failure = match snapshot.ready_handle() {
            Some(model) => {
                match with_deadline(self.request_timeout(), model.encode(text)).await {
                    Ok(Ok(vector)) if !vector.is_empty() => {
                        debug!(model = model.name(), dimension = vector.len(), "Embedding served by primary model");
                        return Ok(EmbeddingResult {
                            dimension: vector.len(),
                            vector,
                            served_by: ServedBy::Primary,
                        });
                    }
                    Ok(Ok(_)) => InferenceError::DependencyError("model returned an empty vector".into()),
                    Ok(Err(e)) => InferenceError::DependencyError(e.to_string()),
                    Err(timeout) => timeout,
                }
            }
            None => InferenceError::ResourceUnavailable(format!(
                "embedding model is {}",
                snapshot.status.state
            )),
        };

        if !self.fallback_enabled() {
            warn!(error = %failure, "Primary embedding unusable and fallback disabled");
            return Err(unavailable(failure));
        }

        warn!(reason = %failure, "Serving fallback embedding");
        let dimension = self.lifecycle.config().fallback_vector_dimension;
        let vector = self.fallback.generate(text, dimension);
        Ok(EmbeddingResult {
            vector,
            dimension,
            served_by: ServedBy::Fallback,
        })
    }

    /// Users most similar to `seed`, best first
    ///
    /// The vector index answers when ready; otherwise similarity is computed
    /// over `candidates`.
    pub async fn find_similar(
        &self,
        seed: &[f32],
        candidates: &[Candidate],
        limit: usize,
        min_similarity: f32,
    ) -> Result<SimilarityResult, InferenceError> {
        if seed.is_empty() {
            return Err(InferenceError::InvalidInput("seed vector is empty".into()));
        }
        if limit == 0 {
            return Err(InferenceError::InvalidInput("limit must be at least 1".into()));
        }
        if !min_similarity.is_finite() || !(-1.0..=1.0).contains(&min_similarity) {
            return Err(InferenceError::InvalidInput(format!(
                "min_similarity must be within [-1, 1], got {}",
                min_similarity
            )));
        }

        let snapshot = self.lifecycle.index_snapshot();

        let failure = match snapshot.ready_handle() {
            Some(index) => match with_deadline(self.request_timeout(), index.query(Collection::UserInterests, seed, limit)).await {
                Ok(Ok(hits)) => {
                    let matches = hits
                        .into_iter()
                        .map(|hit| SimilarityMatch {
                            similarity: hit.similarity(),
                            id: hit.id,
                            metadata: hit.metadata,
                        })
                        .collect();
                    let matches = rank_matches(matches, limit, min_similarity);
                    debug!(matches = matches.len(), "Similar users served by vector index");
                    return Ok(SimilarityResult {
                        matches,
                        served_by: ServedBy::Primary,
                    });
                }
                Ok(Err(e)) => InferenceError::DependencyError(e.to_string()),
                Err(timeout) => timeout,
            },
            None => InferenceError::ResourceUnavailable(format!(
                "vector index is {}",
                snapshot.status.state
            )),
        };

        if !self.fallback_enabled() {
            warn!(error = %failure, "Vector index unusable and fallback disabled");
            return Err(unavailable(failure));
        }

        warn!(reason = %failure, pool = candidates.len(), "Ranking similar users in-process");
        Ok(SimilarityResult {
            matches: rank_candidates(seed, candidates, limit, min_similarity),
            served_by: ServedBy::Fallback,
        })
    }

    /// Store `vector` under `id` in `collection`
    ///
    /// `ResourceUnavailable` when the index is not ready; a rejected or
    /// failed add is a `DependencyError`. There is no fallback store.
    pub async fn store_vector(
        &self,
        collection: Collection,
        id: &str,
        vector: &[f32],
        metadata: Value,
    ) -> Result<(), InferenceError> {
        if id.is_empty() {
            return Err(InferenceError::InvalidInput("id is empty".into()));
        }
        if vector.is_empty() {
            return Err(InferenceError::InvalidInput("vector is empty".into()));
        }

        let snapshot = self.lifecycle.index_snapshot();
        let Some(index) = snapshot.ready_handle() else {
            return Err(InferenceError::ResourceUnavailable(format!(
                "vector index is {}",
                snapshot.status.state
            )));
        };

        match with_deadline(self.request_timeout(), index.add(collection, id, vector, metadata)).await? {
            Ok(true) => {
                debug!(collection = %collection, id, "Vector stored");
                Ok(())
            }
            Ok(false) => Err(InferenceError::DependencyError(format!(
                "vector index rejected {} in {}",
                id, collection
            ))),
            Err(e) => Err(InferenceError::DependencyError(e.to_string())),
        }
    }

    /// Best-effort [`store_vector`](Self::store_vector); `false` on any failure
    pub async fn index_vector(&self, collection: Collection, id: &str, vector: &[f32], metadata: Value) -> bool {
        match self.store_vector(collection, id, vector, metadata).await {
            Ok(()) => true,
            Err(InferenceError::ResourceUnavailable(reason)) => {
                debug!(id, reason = %reason, "Vector index not ready; skipping add");
                false
            }
            Err(e) => {
                warn!(collection = %collection, id, error = %e, "Vector index add failed");
                false
            }
        }
    }
}

/// Run `fut` with a deadline, mapping expiry to [`InferenceError::Timeout`]
async fn with_deadline<F: Future>(deadline: Duration, fut: F) -> Result<F::Output, InferenceError> {
    tokio::time::timeout(deadline, fut)
        .await
        .map_err(|_| InferenceError::Timeout(deadline))
}

fn unavailable(cause: InferenceError) -> InferenceError {
    match cause {
        InferenceError::ResourceUnavailable(_) => cause,
        other => InferenceError::ResourceUnavailable(other.to_string()),
    }
}

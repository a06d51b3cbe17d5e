//! Inference services
//!
//! Resource lifecycle, collaborator clients, and the components built on
//! them:
//! - `lifecycle`: load/reload of the embedding model and vector index
//! - `gateway`: primary-or-fallback embeddings and similar-user lookups
//! - `toxicity`: analyzer-or-keyword virality scoring
//! - `spread_predictor`: geo-hierarchy propagation plans
//! - `content_insights`: local sentiment/topic/tag analysis
//! - `propagation_optimizer`: hourly delivery sequence for a seed's targets

pub mod analyzer_client;
pub mod content_insights;
pub mod embedding_client;
pub mod fallback_vector;
pub mod gateway;
pub mod lifecycle;
pub mod propagation_optimizer;
pub mod record_store_client;
pub mod similarity;
pub mod spread_predictor;
pub mod toxicity;
pub mod vector_index_client;

pub use analyzer_client::{AnalysisType, AnalyzerError, AnalyzerResult, ContentAnalyzer, HttpContentAnalyzer};
pub use content_insights::{analyze_content, extract_tags, predict_potential, ContentAnalysis, Sentiment, SpreadPotential, TagExtraction};
pub use embedding_client::{EmbeddingModel, EmbeddingModelError, HttpEmbeddingModel, HttpEmbeddingModelLoader};
pub use fallback_vector::FallbackVectorGenerator;
pub use gateway::{EmbeddingResult, InferenceGateway, SimilarityResult};
pub use lifecycle::{
    LoadError, LoadState, ModelLifecycleManager, ResourceKind, ResourceLoader, ResourceSnapshot,
    ResourceStatus, UnconfiguredLoader,
};
pub use propagation_optimizer::{optimize_propagation, OptimalPath, PropagationOptimization, PropagationTouch};
pub use record_store_client::{HttpRecordBackend, RecordBackend, RecordStore, RecordStoreClient, RecordStoreError};
pub use similarity::{cosine_similarity, Candidate, SimilarityMatch};
pub use spread_predictor::{predict_spread, PropagationPlan, PropagationStep, SpreadPredictor};
pub use toxicity::{keyword_score, ToxicityAssessment, ToxicityClassifier, ToxicityScore, VirulenceLevel};
pub use vector_index_client::{
    Collection, CollectionNames, HttpVectorIndex, HttpVectorIndexLoader, IndexHit, VectorIndex,
    VectorIndexError,
};

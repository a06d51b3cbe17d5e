//! Configuration resolution for flulink-ai
//!
//! Provides multi-tier configuration resolution with CLI → ENV → TOML → default
//! priority. CLI overrides are applied by the binary; this module merges the
//! TOML file with `FLULINK_*` environment variables and validates the result.

use crate::services::vector_index_client::CollectionNames;
use flulink_common::config::{env_parse, env_var, LoggingConfig};
use flulink_common::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::info;

/// Fallback and timeout budget for the inference layer
///
/// Immutable after process start. Read by the lifecycle manager (load
/// timeouts) and the inference gateway (request timeout, fallback switch).
#[derive(Debug, Clone, PartialEq)]
pub struct FallbackConfig {
    /// Budget for loading the embedding model
    pub model_load_timeout: Duration,
    /// Budget for connecting to the vector index
    pub index_init_timeout: Duration,
    /// Deadline for every primary call on the request path
    pub request_timeout: Duration,
    /// Serve fallback results when the primary path is unusable
    pub fallback_enabled: bool,
    /// Dimension of vectors produced by the fallback generator
    pub fallback_vector_dimension: usize,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            model_load_timeout: Duration::from_secs(30),
            index_init_timeout: Duration::from_secs(15),
            request_timeout: Duration::from_secs(10),
            fallback_enabled: true,
            fallback_vector_dimension: 384,
        }
    }
}

impl FallbackConfig {
    pub fn validate(&self) -> Result<()> {
        if self.model_load_timeout.is_zero() {
            return Err(Error::Config("model_load_timeout must be nonzero".to_string()));
        }
        if self.index_init_timeout.is_zero() {
            return Err(Error::Config("index_init_timeout must be nonzero".to_string()));
        }
        if self.request_timeout.is_zero() {
            return Err(Error::Config("request_timeout must be nonzero".to_string()));
        }
        if self.fallback_vector_dimension == 0 {
            return Err(Error::Config("fallback_vector_dim must be nonzero".to_string()));
        }
        Ok(())
    }
}

/// HTTP listener settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

/// `[fallback]` section as written in TOML (durations in seconds)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FallbackSection {
    #[serde(default = "default_model_load_timeout_secs")]
    pub model_load_timeout_secs: u64,
    #[serde(default = "default_index_init_timeout_secs")]
    pub index_init_timeout_secs: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_enable_fallback")]
    pub enable_fallback: bool,
    #[serde(default = "default_fallback_vector_dim")]
    pub fallback_vector_dim: usize,
}

impl Default for FallbackSection {
    fn default() -> Self {
        Self {
            model_load_timeout_secs: default_model_load_timeout_secs(),
            index_init_timeout_secs: default_index_init_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            enable_fallback: default_enable_fallback(),
            fallback_vector_dim: default_fallback_vector_dim(),
        }
    }
}

fn default_model_load_timeout_secs() -> u64 {
    30
}

fn default_index_init_timeout_secs() -> u64 {
    15
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_enable_fallback() -> bool {
    true
}

fn default_fallback_vector_dim() -> usize {
    384
}

impl From<&FallbackSection> for FallbackConfig {
    fn from(section: &FallbackSection) -> Self {
        Self {
            model_load_timeout: Duration::from_secs(section.model_load_timeout_secs),
            index_init_timeout: Duration::from_secs(section.index_init_timeout_secs),
            request_timeout: Duration::from_secs(section.request_timeout_secs),
            fallback_enabled: section.enable_fallback,
            fallback_vector_dimension: section.fallback_vector_dim,
        }
    }
}

/// Collaborator endpoints
///
/// Any endpoint left unset disables that collaborator: the matching resource
/// reports `Failed` and requests are served by the fallback path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointConfig {
    /// External content analyzer base URL
    #[serde(default)]
    pub analyzer_url: Option<String>,
    #[serde(default)]
    pub analyzer_api_key: Option<String>,
    /// Embedding model server base URL
    #[serde(default)]
    pub embedding_url: Option<String>,
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,
    /// Vector index base URL
    #[serde(default)]
    pub vector_index_url: Option<String>,
    /// User interest collection (similar-user search)
    #[serde(default = "default_vector_collection")]
    pub vector_collection: String,
    #[serde(default = "default_content_collection")]
    pub content_collection: String,
    #[serde(default = "default_cluster_collection")]
    pub cluster_collection: String,
    /// Record store base URL
    #[serde(default)]
    pub record_store_url: Option<String>,
    #[serde(default = "default_record_collection")]
    pub record_collection: String,
    #[serde(default)]
    pub record_store_identity: Option<String>,
    #[serde(default)]
    pub record_store_password: Option<String>,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            analyzer_url: None,
            analyzer_api_key: None,
            embedding_url: None,
            embedding_model: default_embedding_model(),
            vector_index_url: None,
            vector_collection: default_vector_collection(),
            content_collection: default_content_collection(),
            cluster_collection: default_cluster_collection(),
            record_store_url: None,
            record_collection: default_record_collection(),
            record_store_identity: None,
            record_store_password: None,
        }
    }
}

fn default_embedding_model() -> String {
    "all-MiniLM-L6-v2".to_string()
}

fn default_vector_collection() -> String {
    "user_interests".to_string()
}

fn default_content_collection() -> String {
    "content_similarity".to_string()
}

fn default_cluster_collection() -> String {
    "cluster_compatibility".to_string()
}

impl EndpointConfig {
    pub fn collection_names(&self) -> CollectionNames {
        CollectionNames {
            user_interests: self.vector_collection.clone(),
            content_similarity: self.content_collection.clone(),
            cluster_compatibility: self.cluster_collection.clone(),
        }
    }
}

fn default_record_collection() -> String {
    "strains".to_string()
}

/// `flulink-ai.toml` file layout
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AiTomlConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub fallback: FallbackSection,
    #[serde(default)]
    pub endpoints: EndpointConfig,
}

/// Fully resolved service configuration
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AiConfig {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub fallback: FallbackConfig,
    pub endpoints: EndpointConfig,
}

/// Merge TOML settings (if any) with `FLULINK_*` environment variables
///
/// Environment wins over TOML; compiled defaults fill whatever neither sets.
pub fn resolve_config(toml_config: Option<AiTomlConfig>) -> Result<AiConfig> {
    let from_file = toml_config.is_some();
    let mut file = toml_config.unwrap_or_default();

    // Server
    if let Some(host) = env_var("FLULINK_HOST") {
        file.server.host = host;
    }
    if let Some(port) = env_parse::<u16>("FLULINK_PORT")? {
        file.server.port = port;
    }

    // Logging
    if let Some(level) = env_var("FLULINK_LOG_LEVEL") {
        file.logging.level = level;
    }

    // Fallback budget
    if let Some(secs) = env_parse::<u64>("FLULINK_MODEL_LOAD_TIMEOUT_SECS")? {
        file.fallback.model_load_timeout_secs = secs;
    }
    if let Some(secs) = env_parse::<u64>("FLULINK_INDEX_INIT_TIMEOUT_SECS")? {
        file.fallback.index_init_timeout_secs = secs;
    }
    if let Some(secs) = env_parse::<u64>("FLULINK_REQUEST_TIMEOUT_SECS")? {
        file.fallback.request_timeout_secs = secs;
    }
    if let Some(enabled) = env_parse::<bool>("FLULINK_ENABLE_FALLBACK")? {
        file.fallback.enable_fallback = enabled;
    }
    if let Some(dim) = env_parse::<usize>("FLULINK_FALLBACK_VECTOR_DIM")? {
        file.fallback.fallback_vector_dim = dim;
    }

    // Endpoints
    let endpoints = &mut file.endpoints;
    override_opt(&mut endpoints.analyzer_url, "FLULINK_ANALYZER_URL");
    override_opt(&mut endpoints.analyzer_api_key, "FLULINK_ANALYZER_API_KEY");
    override_opt(&mut endpoints.embedding_url, "FLULINK_EMBEDDING_URL");
    if let Some(model) = env_var("FLULINK_EMBEDDING_MODEL") {
        endpoints.embedding_model = model;
    }
    override_opt(&mut endpoints.vector_index_url, "FLULINK_VECTOR_INDEX_URL");
    if let Some(collection) = env_var("FLULINK_VECTOR_COLLECTION") {
        endpoints.vector_collection = collection;
    }
    if let Some(collection) = env_var("FLULINK_CONTENT_COLLECTION") {
        endpoints.content_collection = collection;
    }
    if let Some(collection) = env_var("FLULINK_CLUSTER_COLLECTION") {
        endpoints.cluster_collection = collection;
    }
    override_opt(&mut endpoints.record_store_url, "FLULINK_RECORD_STORE_URL");
    override_opt(&mut endpoints.record_store_identity, "FLULINK_RECORD_STORE_IDENTITY");
    override_opt(&mut endpoints.record_store_password, "FLULINK_RECORD_STORE_PASSWORD");

    let fallback = FallbackConfig::from(&file.fallback);
    fallback.validate()?;

    info!(
        from_file,
        fallback_enabled = fallback.fallback_enabled,
        fallback_dim = fallback.fallback_vector_dimension,
        "Configuration resolved"
    );

    Ok(AiConfig {
        server: file.server,
        logging: file.logging,
        fallback,
        endpoints: file.endpoints,
    })
}

fn override_opt(slot: &mut Option<String>, env_name: &str) {
    if let Some(value) = env_var(env_name) {
        *slot = Some(value);
    }
}

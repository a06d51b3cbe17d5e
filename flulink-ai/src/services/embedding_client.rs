//! Embedding model client
//!
//! The primary embedding path talks to a model server over HTTP. Loading the
//! model means building the client and running one warm-up encode, so a
//! `Ready` status implies the server actually answers.

use crate::services::lifecycle::{LoadError, ResourceLoader};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

const USER_AGENT: &str = concat!("FluLink-AI/", env!("CARGO_PKG_VERSION"));
const WARMUP_TEXT: &str = "warm-up";

/// Embedding model errors
#[derive(Debug, Error)]
pub enum EmbeddingModelError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("API error {0}: {1}")]
    ApiError(u16, String),

    #[error("Parse error: {0}")]
    ParseError(String),
}

/// Text encoder behind the primary embedding path
#[async_trait]
pub trait EmbeddingModel: Send + Sync {
    /// Model identifier, for logs
    fn name(&self) -> &str;

    async fn encode(&self, text: &str) -> Result<Vec<f32>, EmbeddingModelError>;
}

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    text: &'a str,
    model: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embedding: Vec<f32>,
}

/// Model server client
pub struct HttpEmbeddingModel {
    http_client: reqwest::Client,
    base_url: String,
    model: String,
}

impl HttpEmbeddingModel {
    pub fn new(base_url: &str, model: &str, timeout: Duration) -> Result<Self, EmbeddingModelError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| EmbeddingModelError::NetworkError(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
        })
    }
}

#[async_trait]
impl EmbeddingModel for HttpEmbeddingModel {
    fn name(&self) -> &str {
        &self.model
    }

    async fn encode(&self, text: &str) -> Result<Vec<f32>, EmbeddingModelError> {
        let response = self
            .http_client
            .post(format!("{}/embed", self.base_url))
            .json(&EmbedRequest {
                text,
                model: &self.model,
            })
            .send()
            .await
            .map_err(|e| EmbeddingModelError::NetworkError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(EmbeddingModelError::ApiError(status.as_u16(), error_text));
        }

        let body: EmbedResponse = response
            .json()
            .await
            .map_err(|e| EmbeddingModelError::ParseError(e.to_string()))?;

        tracing::debug!(model = %self.model, dimension = body.embedding.len(), "Text encoded");
        Ok(body.embedding)
    }
}

/// Builds an [`HttpEmbeddingModel`] and checks it with a warm-up encode
pub struct HttpEmbeddingModelLoader {
    base_url: String,
    model: String,
    request_timeout: Duration,
}

impl HttpEmbeddingModelLoader {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>, request_timeout: Duration) -> Self {
        Self {
            base_url: base_url.into(),
            model: model.into(),
            request_timeout,
        }
    }
}

#[async_trait]
impl ResourceLoader<dyn EmbeddingModel> for HttpEmbeddingModelLoader {
    async fn load(&self) -> Result<Arc<dyn EmbeddingModel>, LoadError> {
        let model = HttpEmbeddingModel::new(&self.base_url, &self.model, self.request_timeout)
            .map_err(|e| LoadError::new(e.to_string()))?;

        let warmup = model
            .encode(WARMUP_TEXT)
            .await
            .map_err(|e| LoadError::new(format!("warm-up encode failed: {}", e)))?;
        if warmup.is_empty() {
            return Err(LoadError::new("warm-up encode returned an empty vector"));
        }

        tracing::info!(model = %self.model, dimension = warmup.len(), "Embedding model warmed up");
        Ok(Arc::new(model))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation_trims_base_url() {
        let model = HttpEmbeddingModel::new("http://models:9000/", "mini", Duration::from_secs(1)).unwrap();
        assert_eq!(model.base_url, "http://models:9000");
        assert_eq!(model.name(), "mini");
    }

    #[test]
    fn test_request_body_shape() {
        let body = serde_json::to_value(EmbedRequest {
            text: "你好",
            model: "mini",
        })
        .unwrap();
        assert_eq!(body, serde_json::json!({"text": "你好", "model": "mini"}));
    }

    #[tokio::test]
    async fn test_loader_fails_when_server_unreachable() {
        // Port 9 (discard) on localhost is not an HTTP server
        let loader = HttpEmbeddingModelLoader::new("http://127.0.0.1:9", "mini", Duration::from_millis(500));
        let result = loader.load().await;
        assert!(result.is_err());
    }
}

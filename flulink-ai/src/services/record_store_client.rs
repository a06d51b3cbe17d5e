//! Record store client
//!
//! Persists derived strain attributes (toxicity score, virulence level, tags)
//! to a PocketBase-compatible record store. Admin credentials are exchanged
//! for a token, which is cached and reused until the store rejects it; a
//! rejected token triggers exactly one re-authentication and retry.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;

const USER_AGENT: &str = concat!("FluLink-AI/", env!("CARGO_PKG_VERSION"));

/// Record store errors
#[derive(Debug, Error)]
pub enum RecordStoreError {
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Token missing, expired or rejected
    #[error("Unauthorized")]
    Unauthorized,

    #[error("API error {0}: {1}")]
    ApiError(u16, String),

    #[error("Parse error: {0}")]
    ParseError(String),
}

/// Raw record store operations
///
/// The token cache and retry policy live in [`RecordStoreClient`], so
/// backends stay stateless.
#[async_trait]
pub trait RecordBackend: Send + Sync {
    /// Exchange credentials for an auth token
    async fn authenticate(&self) -> Result<String, RecordStoreError>;

    /// Patch `fields` into record `record_id` of the configured collection
    async fn patch_record(
        &self,
        token: &str,
        record_id: &str,
        fields: &Map<String, Value>,
    ) -> Result<(), RecordStoreError>;
}

/// Record store as seen by the service
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// `Ok(true)` when the record was updated
    async fn update(&self, record_id: &str, fields: Map<String, Value>) -> Result<bool, RecordStoreError>;
}

/// Token-caching client over a [`RecordBackend`]
pub struct RecordStoreClient<B> {
    backend: B,
    token: Mutex<Option<String>>,
}

impl<B: RecordBackend> RecordStoreClient<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            token: Mutex::new(None),
        }
    }

    async fn current_token(&self) -> Result<String, RecordStoreError> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref() {
            return Ok(token.clone());
        }
        let token = self.backend.authenticate().await?;
        tracing::debug!("Record store authenticated");
        *cached = Some(token.clone());
        Ok(token)
    }

    async fn refresh_token(&self) -> Result<String, RecordStoreError> {
        let mut cached = self.token.lock().await;
        *cached = None;
        let token = self.backend.authenticate().await?;
        tracing::info!("Record store token refreshed");
        *cached = Some(token.clone());
        Ok(token)
    }
}

#[async_trait]
impl<B: RecordBackend> RecordStore for RecordStoreClient<B> {
    async fn update(&self, record_id: &str, fields: Map<String, Value>) -> Result<bool, RecordStoreError> {
        let token = self.current_token().await?;

        match self.backend.patch_record(&token, record_id, &fields).await {
            Ok(()) => Ok(true),
            Err(RecordStoreError::Unauthorized) => {
                let token = self.refresh_token().await?;
                match self.backend.patch_record(&token, record_id, &fields).await {
                    Ok(()) => Ok(true),
                    Err(RecordStoreError::Unauthorized) => {
                        tracing::warn!(record_id, "Record store rejected refreshed token");
                        Ok(false)
                    }
                    Err(e) => Err(e),
                }
            }
            Err(e) => Err(e),
        }
    }
}

#[derive(Debug, Serialize)]
struct AuthRequest<'a> {
    identity: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct AuthResponse {
    token: String,
}

/// PocketBase-compatible HTTP backend
pub struct HttpRecordBackend {
    http_client: reqwest::Client,
    base_url: String,
    collection: String,
    identity: String,
    password: String,
}

impl HttpRecordBackend {
    pub fn new(
        base_url: &str,
        collection: &str,
        identity: String,
        password: String,
        timeout: Duration,
    ) -> Result<Self, RecordStoreError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| RecordStoreError::NetworkError(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            collection: collection.to_string(),
            identity,
            password,
        })
    }
}

#[async_trait]
impl RecordBackend for HttpRecordBackend {
    async fn authenticate(&self) -> Result<String, RecordStoreError> {
        let response = self
            .http_client
            .post(format!("{}/api/admins/auth-with-password", self.base_url))
            .json(&AuthRequest {
                identity: &self.identity,
                password: &self.password,
            })
            .send()
            .await
            .map_err(|e| RecordStoreError::NetworkError(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::BAD_REQUEST {
            return Err(RecordStoreError::Unauthorized);
        }
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(RecordStoreError::ApiError(status.as_u16(), error_text));
        }

        let body: AuthResponse = response
            .json()
            .await
            .map_err(|e| RecordStoreError::ParseError(e.to_string()))?;
        Ok(body.token)
    }

    async fn patch_record(
        &self,
        token: &str,
        record_id: &str,
        fields: &Map<String, Value>,
    ) -> Result<(), RecordStoreError> {
        let response = self
            .http_client
            .patch(format!(
                "{}/api/collections/{}/records/{}",
                self.base_url, self.collection, record_id
            ))
            .bearer_auth(token)
            .json(fields)
            .send()
            .await
            .map_err(|e| RecordStoreError::NetworkError(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(RecordStoreError::Unauthorized);
        }
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(RecordStoreError::ApiError(status.as_u16(), error_text));
        }
        Ok(())
    }
}

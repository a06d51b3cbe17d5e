//! External content analyzer client
//!
//! The analyzer scores a piece of user content for "toxicity" (virality in
//! FluLink terms). Its failures never leave the toxicity classifier, which
//! falls back to local keyword scoring.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

const USER_AGENT: &str = concat!("FluLink-AI/", env!("CARGO_PKG_VERSION"));

/// Analyzer client errors
#[derive(Debug, Error)]
pub enum AnalyzerError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("API error {0}: {1}")]
    ApiError(u16, String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Invalid API key")]
    InvalidApiKey,
}

/// Kind of analysis requested
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisType {
    Toxicity,
    Sentiment,
}

impl fmt::Display for AnalysisType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnalysisType::Toxicity => f.write_str("toxicity"),
            AnalysisType::Sentiment => f.write_str("sentiment"),
        }
    }
}

/// Analyzer verdict
///
/// `score` is optional on the wire; a missing score makes the verdict unusable
/// for toxicity classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzerResult {
    #[serde(default, alias = "toxicity_score")]
    pub score: Option<f64>,
    #[serde(default)]
    pub sentiment: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(skip)]
    pub raw: Value,
}

#[async_trait]
pub trait ContentAnalyzer: Send + Sync {
    async fn analyze(&self, text: &str, analysis_type: AnalysisType) -> Result<AnalyzerResult, AnalyzerError>;
}

#[derive(Debug, Serialize)]
struct AnalyzeRequest<'a> {
    content: &'a str,
    analysis_type: AnalysisType,
    language: &'a str,
    context: &'a str,
}

/// HTTP analyzer client with bearer auth
pub struct HttpContentAnalyzer {
    http_client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl HttpContentAnalyzer {
    pub fn new(base_url: &str, api_key: String, timeout: Duration) -> Result<Self, AnalyzerError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| AnalyzerError::NetworkError(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }
}

#[async_trait]
impl ContentAnalyzer for HttpContentAnalyzer {
    async fn analyze(&self, text: &str, analysis_type: AnalysisType) -> Result<AnalyzerResult, AnalyzerError> {
        tracing::debug!(%analysis_type, chars = text.chars().count(), "Calling content analyzer");

        let response = self
            .http_client
            .post(format!("{}/analyze", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&AnalyzeRequest {
                content: text,
                analysis_type,
                language: "zh-CN",
                context: "social_media_viral_content",
            })
            .send()
            .await
            .map_err(|e| AnalyzerError::NetworkError(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(AnalyzerError::InvalidApiKey);
        }
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(AnalyzerError::ApiError(status.as_u16(), error_text));
        }

        let raw: Value = response
            .json()
            .await
            .map_err(|e| AnalyzerError::ParseError(e.to_string()))?;

        parse_result(raw)
    }
}

fn parse_result(raw: Value) -> Result<AnalyzerResult, AnalyzerError> {
    let mut result: AnalyzerResult =
        serde_json::from_value(raw.clone()).map_err(|e| AnalyzerError::ParseError(e.to_string()))?;
    result.raw = raw;
    Ok(result)
}

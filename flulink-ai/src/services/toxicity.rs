//! Toxicity classifier
//!
//! "Toxicity" is FluLink's virality score: how strongly a piece of content
//! is expected to spread. Scores live in `[0, 10]` and map onto a fixed
//! virulence table.
//!
//! The external analyzer is tried first under the request timeout. Any
//! failure (network, HTTP status, missing or non-finite score, timeout) falls
//! back to local keyword scoring, so classification itself never fails.

use crate::services::analyzer_client::{AnalysisType, ContentAnalyzer};
use flulink_common::ServedBy;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

pub const MIN_SCORE: f64 = 0.0;
pub const MAX_SCORE: f64 = 10.0;

/// Score in `[0, 10]`
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ToxicityScore(f64);

impl ToxicityScore {
    /// Clamp `value` into range; non-finite values map to 0
    pub fn clamped(value: f64) -> Self {
        if value.is_finite() {
            Self(value.clamp(MIN_SCORE, MAX_SCORE))
        } else {
            Self(MIN_SCORE)
        }
    }

    pub fn value(&self) -> f64 {
        self.0
    }

    pub fn virulence_level(&self) -> VirulenceLevel {
        VirulenceLevel::from_score(self.0)
    }

    pub fn super_spread_triggered(&self) -> bool {
        self.virulence_level() == VirulenceLevel::SuperSpread
    }
}

/// Qualitative bucket of a score
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VirulenceLevel {
    Low,
    Moderate,
    HighVirulence,
    SuperSpread,
}

impl VirulenceLevel {
    /// Lower bounds, highest first
    const THRESHOLDS: [(f64, VirulenceLevel); 3] = [
        (7.5, VirulenceLevel::SuperSpread),
        (6.0, VirulenceLevel::HighVirulence),
        (4.0, VirulenceLevel::Moderate),
    ];

    pub fn from_score(score: f64) -> Self {
        Self::THRESHOLDS
            .iter()
            .find(|(min, _)| score >= *min)
            .map(|(_, level)| *level)
            .unwrap_or(VirulenceLevel::Low)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            VirulenceLevel::Low => "low",
            VirulenceLevel::Moderate => "moderate",
            VirulenceLevel::HighVirulence => "high_virulence",
            VirulenceLevel::SuperSpread => "super_spread",
        }
    }
}

impl fmt::Display for VirulenceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classification of one piece of content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToxicityAssessment {
    pub toxicity_score: ToxicityScore,
    pub virulence_level: VirulenceLevel,
    pub super_spread_triggered: bool,
    pub sentiment: String,
    #[serde(rename = "spectral_tags")]
    pub tags: Vec<String>,
    #[serde(rename = "model_used")]
    pub served_by: ServedBy,
    /// Analyzer payload, when the analyzer answered
    #[serde(rename = "analysis_details", default, skip_serializing_if = "Value::is_null")]
    pub details: Value,
}

impl ToxicityAssessment {
    fn new(score: ToxicityScore, sentiment: String, tags: Vec<String>, served_by: ServedBy, details: Value) -> Self {
        Self {
            toxicity_score: score,
            virulence_level: score.virulence_level(),
            super_spread_triggered: score.super_spread_triggered(),
            sentiment,
            tags,
            served_by,
            details,
        }
    }
}

/// Keyword buckets for the local fallback: (weight, keywords)
const KEYWORD_BUCKETS: [(f64, &[&str]); 3] = [
    (
        3.0,
        &[
            "病毒", "感染", "传播", "爆发", "疫情", "危险", "致命",
            "virus", "infect", "outbreak", "epidemic", "deadly",
        ],
    ),
    (
        2.0,
        &[
            "流行", "趋势", "热门", "火爆", "疯狂", "强烈",
            "trending", "viral", "popular", "crazy",
        ],
    ),
    (
        1.0,
        &["有趣", "好玩", "新奇", "特别", "独特", "funny", "novel", "unique"],
    ),
];

const LENGTH_UNIT: f64 = 100.0;
const MAX_LENGTH_FACTOR: f64 = 2.0;

const FALLBACK_TAGS: [&str; 2] = ["user_generated", "social_content"];

/// Local keyword score
///
/// Each bucket contributes its weight once if any of its keywords occurs
/// (case-insensitive), scaled by `min(chars / 100, 2)` and clamped.
pub fn keyword_score(text: &str) -> ToxicityScore {
    let lowered = text.to_lowercase();

    let raw: f64 = KEYWORD_BUCKETS
        .iter()
        .filter(|(_, keywords)| keywords.iter().any(|k| lowered.contains(k)))
        .map(|(weight, _)| weight)
        .sum();

    let length_factor = (text.chars().count() as f64 / LENGTH_UNIT).min(MAX_LENGTH_FACTOR);
    ToxicityScore::clamped(raw * length_factor)
}

fn fallback_sentiment(score: ToxicityScore) -> &'static str {
    match score.value() {
        s if s < 3.0 => "positive",
        s if s > 7.0 => "negative",
        _ => "neutral",
    }
}

pub struct ToxicityClassifier {
    analyzer: Option<Arc<dyn ContentAnalyzer>>,
    request_timeout: Duration,
}

impl ToxicityClassifier {
    pub fn new(analyzer: Option<Arc<dyn ContentAnalyzer>>, request_timeout: Duration) -> Self {
        Self {
            analyzer,
            request_timeout,
        }
    }

    /// Classifier with no analyzer; every call uses keyword scoring
    pub fn local_only() -> Self {
        Self::new(None, Duration::from_secs(1))
    }

    pub async fn classify(&self, text: &str) -> ToxicityAssessment {
        match self.try_analyzer(text).await {
            Ok(assessment) => assessment,
            Err(reason) => {
                warn!(reason = %reason, "Serving fallback toxicity score");
                self.classify_locally(text)
            }
        }
    }

    pub fn classify_locally(&self, text: &str) -> ToxicityAssessment {
        let score = keyword_score(text);
        debug!(score = score.value(), "Keyword toxicity score");
        ToxicityAssessment::new(
            score,
            fallback_sentiment(score).to_string(),
            FALLBACK_TAGS.iter().map(|t| t.to_string()).collect(),
            ServedBy::Fallback,
            Value::Null,
        )
    }

    async fn try_analyzer(&self, text: &str) -> Result<ToxicityAssessment, String> {
        let analyzer = self
            .analyzer
            .as_ref()
            .ok_or_else(|| "analyzer not configured".to_string())?;

        let result = tokio::time::timeout(
            self.request_timeout,
            analyzer.analyze(text, AnalysisType::Toxicity),
        )
        .await
        .map_err(|_| format!("analyzer timed out after {:?}", self.request_timeout))?
        .map_err(|e| e.to_string())?;

        let raw_score = result
            .score
            .ok_or_else(|| "analyzer response has no score".to_string())?;
        if !raw_score.is_finite() {
            return Err(format!("analyzer returned non-finite score {}", raw_score));
        }

        let score = ToxicityScore::clamped(raw_score);
        let sentiment = result
            .sentiment
            .unwrap_or_else(|| fallback_sentiment(score).to_string());

        Ok(ToxicityAssessment::new(
            score,
            sentiment,
            result.tags,
            ServedBy::Primary,
            result.raw,
        ))
    }
}

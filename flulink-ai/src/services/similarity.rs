//! In-process similarity ranking
//!
//! Fallback for the vector index: cosine similarity over a caller-supplied
//! candidate pool.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;

/// A user that may be similar to the seed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    #[serde(default = "unknown_id")]
    pub id: String,
    /// Interest vector; candidates without one are skipped
    #[serde(default)]
    pub interest_vector: Option<Vec<f32>>,
    #[serde(default)]
    pub metadata: Option<Value>,
}

fn unknown_id() -> String {
    "unknown".to_string()
}

/// One ranked result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarityMatch {
    pub id: String,
    pub similarity: f32,
    #[serde(default)]
    pub metadata: Value,
}

/// Cosine similarity of two vectors
///
/// `None` when lengths differ, either vector is empty, or either norm is zero.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Option<f32> {
    if a.len() != b.len() || a.is_empty() {
        return None;
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (x, y) in a.iter().zip(b.iter()) {
        let (x, y) = (*x as f64, *y as f64);
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return None;
    }

    let similarity = dot / (norm_a.sqrt() * norm_b.sqrt());
    similarity.is_finite().then_some(similarity as f32)
}

/// Sort descending by similarity (stable, so ties keep input order),
/// drop entries below `min_similarity`, keep at most `limit`
pub fn rank_matches(
    mut matches: Vec<SimilarityMatch>,
    limit: usize,
    min_similarity: f32,
) -> Vec<SimilarityMatch> {
    matches.retain(|m| m.similarity >= min_similarity);
    matches.sort_by(|a, b| b.similarity.partial_cmp(&a.similarity).unwrap_or(Ordering::Equal));
    matches.truncate(limit);
    matches
}

/// Rank `candidates` against `seed`
///
/// Candidates with no vector, a vector of the wrong length, or a zero vector
/// are skipped rather than scored as zero.
pub fn rank_candidates(
    seed: &[f32],
    candidates: &[Candidate],
    limit: usize,
    min_similarity: f32,
) -> Vec<SimilarityMatch> {
    let scored = candidates
        .iter()
        .filter_map(|candidate| {
            let vector = candidate.interest_vector.as_deref()?;
            let similarity = match cosine_similarity(seed, vector) {
                Some(s) => s,
                None => {
                    tracing::debug!(candidate = %candidate.id, "Skipping candidate without a usable vector");
                    return None;
                }
            };
            Some(SimilarityMatch {
                id: candidate.id.clone(),
                similarity,
                metadata: candidate
                    .metadata
                    .clone()
                    .unwrap_or_else(|| Value::Object(Default::default())),
            })
        })
        .collect();

    rank_matches(scored, limit, min_similarity)
}

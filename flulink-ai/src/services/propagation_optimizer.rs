//! Propagation path optimizer
//!
//! Orders a seed's target users into an hourly delivery sequence with a
//! decaying expected resonance. Local heuristic; results are tagged
//! [`ServedBy::Fallback`].

use chrono::{DateTime, Duration, Utc};
use flulink_common::ServedBy;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

const FIRST_TARGETS: usize = 5;
const SEQUENCE_LEN: usize = 10;
const BASE_RESONANCE: u32 = 80;
const RESONANCE_STEP: u32 = 5;
const GEOGRAPHIC_WEIGHT: f64 = 0.6;
const SEMANTIC_WEIGHT: f64 = 0.4;
const PATH_CONFIDENCE: f64 = 0.8;

/// One scheduled delivery
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropagationTouch {
    pub user_id: String,
    pub timestamp: DateTime<Utc>,
    pub expected_resonance: u32,
    pub geographic_weight: f64,
    pub semantic_weight: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimalPath {
    pub seed_id: String,
    /// First target users, as submitted
    pub first_targets: Vec<Value>,
    pub propagation_sequence: Vec<PropagationTouch>,
    /// Every submitted target, not only the sequenced ones
    pub estimated_reach: usize,
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropagationOptimization {
    pub optimal_path: OptimalPath,
    #[serde(rename = "model_used")]
    pub served_by: ServedBy,
}

/// `id` as a string; numbers are accepted
fn id_of(object: &Map<String, Value>) -> Option<String> {
    match object.get("id")? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Plan the delivery of `seed` to `targets`, first touch at `start`
pub fn optimize_propagation(
    seed: &Map<String, Value>,
    targets: &[Value],
    start: DateTime<Utc>,
) -> PropagationOptimization {
    let propagation_sequence = targets
        .iter()
        .take(SEQUENCE_LEN)
        .enumerate()
        .map(|(i, user)| PropagationTouch {
            user_id: user
                .as_object()
                .and_then(id_of)
                .unwrap_or_else(|| format!("user_{}", i)),
            timestamp: start + Duration::hours(i as i64),
            expected_resonance: BASE_RESONANCE.saturating_sub(RESONANCE_STEP * i as u32),
            geographic_weight: GEOGRAPHIC_WEIGHT,
            semantic_weight: SEMANTIC_WEIGHT,
        })
        .collect();

    PropagationOptimization {
        optimal_path: OptimalPath {
            seed_id: id_of(seed).unwrap_or_else(|| "unknown".to_string()),
            first_targets: targets.iter().take(FIRST_TARGETS).cloned().collect(),
            propagation_sequence,
            estimated_reach: targets.len(),
            confidence: PATH_CONFIDENCE,
        },
        served_by: ServedBy::Fallback,
    }
}

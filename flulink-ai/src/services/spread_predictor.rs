//! Spread predictor
//!
//! Walks the geographic hierarchy from the smallest scope outwards, limited to
//! the levels the creator's access tier may reach, and includes each level
//! whose infection threshold the normalized score meets. Levels are never
//! skipped out of order: thresholds ascend with the hierarchy, so the included
//! set is always a prefix of the allowed levels.

use crate::error::InferenceError;
use flulink_common::{AccessTier, GeoLevel, OriginLocation};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use tracing::debug;

/// Reach jitter bounds applied to each level's base estimate
const REACH_FACTOR_MIN: f64 = 0.8;
const REACH_FACTOR_MAX: f64 = 1.2;

/// One level of a propagation plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropagationStep {
    pub level: GeoLevel,
    pub estimated_users: u64,
    pub delay_minutes: u32,
    pub infection_rate: f64,
}

/// Forecast of how far content spreads
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropagationPlan {
    pub predicted_path: Vec<PropagationStep>,
    pub estimated_reach: u64,
    pub confidence_score: f64,
    pub geo_hierarchy_progression: Vec<GeoLevel>,
    /// Levels are visited in hierarchy order without skips
    pub daoism_compliance: bool,
    #[serde(default)]
    pub origin: OriginLocation,
}

impl PropagationPlan {
    pub fn is_empty(&self) -> bool {
        self.predicted_path.is_empty()
    }
}

/// Build a plan drawing reach jitter from `rng`
///
/// `score` must be finite and within `[0, 10]`. An empty plan can still
/// carry a nonzero confidence: confidence reflects the score, not the reach.
pub fn predict_spread<R: Rng + ?Sized>(
    score: f64,
    tier: AccessTier,
    origin: OriginLocation,
    rng: &mut R,
) -> Result<PropagationPlan, InferenceError> {
    if !score.is_finite() || !(0.0..=10.0).contains(&score) {
        return Err(InferenceError::InvalidInput(format!(
            "toxicity score must be within [0, 10], got {}",
            score
        )));
    }

    let normalized = score / 10.0;
    let rate = normalized.min(1.0);

    let predicted_path: Vec<PropagationStep> = tier
        .allowed_levels()
        .iter()
        .filter(|level| normalized >= level.infection_threshold())
        .map(|&level| {
            let factor = rng.gen_range(REACH_FACTOR_MIN..=REACH_FACTOR_MAX);
            PropagationStep {
                level,
                estimated_users: (level.base_user_estimate() as f64 * factor).floor() as u64,
                delay_minutes: level.delay_minutes(),
                infection_rate: rate,
            }
        })
        .collect();

    let estimated_reach = predicted_path.iter().map(|s| s.estimated_users).sum();
    let geo_hierarchy_progression = predicted_path.iter().map(|s| s.level).collect();

    debug!(
        score,
        tier = %tier,
        levels = predicted_path.len(),
        estimated_reach,
        "Spread predicted"
    );

    Ok(PropagationPlan {
        predicted_path,
        estimated_reach,
        confidence_score: rate,
        geo_hierarchy_progression,
        daoism_compliance: true,
        origin,
    })
}

/// Shared predictor owning its random source
pub struct SpreadPredictor {
    rng: Mutex<StdRng>,
}

impl SpreadPredictor {
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Predictor with a fixed seed, for reproducible plans
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    pub fn predict(
        &self,
        score: f64,
        tier: AccessTier,
        origin: OriginLocation,
    ) -> Result<PropagationPlan, InferenceError> {
        // A panic while holding the lock cannot leave the RNG inconsistent
        let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        predict_spread(score, tier, origin, &mut *rng)
    }
}

impl Default for SpreadPredictor {
    fn default() -> Self {
        Self::new()
    }
}

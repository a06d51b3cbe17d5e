//! Geographic spread hierarchy and access tiers
//!
//! Static, process-wide configuration tables. Nothing here is mutated at
//! runtime; the spread predictor and the API layer only read them.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Geographic scope a piece of content may reach, in ascending hierarchy order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeoLevel {
    Community,
    Neighborhood,
    Street,
    City,
}

impl GeoLevel {
    /// Every level in hierarchy order
    pub const ALL: [GeoLevel; 4] = [
        GeoLevel::Community,
        GeoLevel::Neighborhood,
        GeoLevel::Street,
        GeoLevel::City,
    ];

    /// Minimum normalized score (0.0-1.0) required to reach this level
    pub fn infection_threshold(&self) -> f64 {
        match self {
            GeoLevel::Community => 0.1,
            GeoLevel::Neighborhood => 0.2,
            GeoLevel::Street => 0.4,
            GeoLevel::City => 0.6,
        }
    }

    /// Propagation delay before content surfaces at this level
    pub fn delay_minutes(&self) -> u32 {
        match self {
            GeoLevel::Community => 0,
            GeoLevel::Neighborhood => 30,
            GeoLevel::Street => 120,
            GeoLevel::City => 480,
        }
    }

    /// Baseline number of users reachable at this level
    pub fn base_user_estimate(&self) -> u64 {
        match self {
            GeoLevel::Community => 50,
            GeoLevel::Neighborhood => 200,
            GeoLevel::Street => 1_000,
            GeoLevel::City => 10_000,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            GeoLevel::Community => "community",
            GeoLevel::Neighborhood => "neighborhood",
            GeoLevel::Street => "street",
            GeoLevel::City => "city",
        }
    }
}

impl fmt::Display for GeoLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Caller classification bounding which geo levels a plan may include
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessTier {
    Free,
    Premium,
    Enterprise,
}

impl AccessTier {
    /// Levels this tier may reach; always a prefix of [`GeoLevel::ALL`]
    pub fn allowed_levels(&self) -> &'static [GeoLevel] {
        match self {
            AccessTier::Free => &[GeoLevel::Community],
            AccessTier::Premium => &[GeoLevel::Community, GeoLevel::Neighborhood],
            AccessTier::Enterprise => &GeoLevel::ALL,
        }
    }

    /// Immunity power multiplier
    ///
    /// Part of the tier table but not consumed by spread prediction.
    pub fn immunity_power(&self) -> f64 {
        match self {
            AccessTier::Free => 1.0,
            AccessTier::Premium => 1.5,
            AccessTier::Enterprise => 2.0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AccessTier::Free => "free",
            AccessTier::Premium => "premium",
            AccessTier::Enterprise => "enterprise",
        }
    }
}

impl fmt::Display for AccessTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccessTier {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "free" => Ok(AccessTier::Free),
            "premium" => Ok(AccessTier::Premium),
            "enterprise" => Ok(AccessTier::Enterprise),
            other => Err(Error::InvalidInput(format!("Unknown access tier: {}", other))),
        }
    }
}

/// Where a piece of content originated
///
/// Passed through to the propagation plan unchanged. Extra fields supplied by
/// callers (district, city, ...) are preserved.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OriginLocation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levels_are_ordered_and_thresholds_ascend() {
        for pair in GeoLevel::ALL.windows(2) {
            assert!(pair[0] < pair[1]);
            assert!(pair[0].infection_threshold() < pair[1].infection_threshold());
            assert!(pair[0].delay_minutes() < pair[1].delay_minutes());
            assert!(pair[0].base_user_estimate() < pair[1].base_user_estimate());
        }
    }

    #[test]
    fn test_tier_levels_are_prefixes() {
        for tier in [AccessTier::Free, AccessTier::Premium, AccessTier::Enterprise] {
            let allowed = tier.allowed_levels();
            assert!(!allowed.is_empty());
            assert_eq!(allowed, &GeoLevel::ALL[..allowed.len()]);
        }
        assert_eq!(AccessTier::Free.allowed_levels(), &[GeoLevel::Community]);
        assert_eq!(AccessTier::Enterprise.allowed_levels().len(), 4);
    }

    #[test]
    fn test_tier_from_str() {
        assert_eq!("free".parse::<AccessTier>().unwrap(), AccessTier::Free);
        assert_eq!(" Premium ".parse::<AccessTier>().unwrap(), AccessTier::Premium);
        assert_eq!("ENTERPRISE".parse::<AccessTier>().unwrap(), AccessTier::Enterprise);

        let err = "platinum".parse::<AccessTier>().unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn test_immunity_power_table() {
        assert_eq!(AccessTier::Free.immunity_power(), 1.0);
        assert_eq!(AccessTier::Premium.immunity_power(), 1.5);
        assert_eq!(AccessTier::Enterprise.immunity_power(), 2.0);
    }

    #[test]
    fn test_origin_location_keeps_extra_fields() {
        let origin: OriginLocation = serde_json::from_str(
            r#"{"latitude": 31.2, "longitude": 121.5, "district": "Xuhui"}"#,
        )
        .unwrap();
        assert_eq!(origin.latitude, Some(31.2));
        assert_eq!(origin.extra.get("district").and_then(|v| v.as_str()), Some("Xuhui"));

        let json = serde_json::to_value(&origin).unwrap();
        assert_eq!(json["district"], "Xuhui");
    }
}

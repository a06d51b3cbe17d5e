//! Served-by tag for inference responses

use serde::{Deserialize, Serialize};
use std::fmt;

/// Which computation produced a response
///
/// Every response that may have been degraded carries this tag so downstream
/// consumers can tell quality tiers apart. Serialized as `"primary"` /
/// `"fallback"` (the `model_used` field of API responses).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServedBy {
    /// The primary resource (model, index, external analyzer) answered
    Primary,
    /// The local fallback computation answered
    Fallback,
}

impl ServedBy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServedBy::Primary => "primary",
            ServedBy::Fallback => "fallback",
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, ServedBy::Fallback)
    }
}

impl fmt::Display for ServedBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

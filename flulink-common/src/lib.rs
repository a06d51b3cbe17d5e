//! # FluLink Common Library
//!
//! Shared code for FluLink services including:
//! - Error types
//! - Configuration file resolution and logging settings
//! - The geographic spread hierarchy and access tier tables
//! - The served-by tag attached to every inference response

pub mod config;
pub mod error;
pub mod geo;
pub mod served_by;

pub use error::{Error, Result};
pub use geo::{AccessTier, GeoLevel, OriginLocation};
pub use served_by::ServedBy;

//! Configuration file resolution and TOML loading
//!
//! Services resolve their settings in priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! This module owns tier 3: locating the per-module TOML file and parsing it.
//! A missing file is not an error; callers receive `None` and run on defaults.

use crate::{Error, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable overriding the config file location
pub const CONFIG_PATH_ENV: &str = "FLULINK_CONFIG";

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Locates the TOML file for one module
///
/// Search order: `$FLULINK_CONFIG`, then `<config_dir>/flulink/<module>.toml`,
/// then (Linux only) `/etc/flulink/<module>.toml`.
#[derive(Debug, Clone)]
pub struct ConfigFileResolver {
    module_name: String,
}

impl ConfigFileResolver {
    pub fn new(module_name: impl Into<String>) -> Self {
        Self {
            module_name: module_name.into(),
        }
    }

    /// Candidate paths in priority order
    pub fn candidates(&self) -> Vec<PathBuf> {
        let file_name = format!("{}.toml", self.module_name);
        let mut candidates = Vec::new();

        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            if !path.trim().is_empty() {
                candidates.push(PathBuf::from(path));
            }
        }

        if let Some(dir) = dirs::config_dir() {
            candidates.push(dir.join("flulink").join(&file_name));
        }

        if cfg!(target_os = "linux") {
            candidates.push(PathBuf::from("/etc/flulink").join(&file_name));
        }

        candidates
    }

    /// First candidate that exists on disk
    pub fn resolve(&self) -> Option<PathBuf> {
        self.candidates().into_iter().find(|p| p.exists())
    }
}

/// Parse a TOML file into `T`
pub fn load_toml_config<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read TOML failed ({}): {}", path.display(), e)))?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse TOML failed ({}): {}", path.display(), e)))
}

/// Load the module's TOML file if one exists
///
/// Missing file → `Ok(None)` with a warning, so the service starts on
/// compiled defaults. A file that exists but fails to parse is an error.
pub fn load_module_config<T: DeserializeOwned>(resolver: &ConfigFileResolver) -> Result<Option<T>> {
    match resolver.resolve() {
        Some(path) => {
            let config = load_toml_config(&path)?;
            info!("Loaded configuration from {}", path.display());
            Ok(Some(config))
        }
        None => {
            warn!(
                "No configuration file found for {} (searched {:?}); using defaults",
                resolver.module_name,
                resolver.candidates()
            );
            Ok(None)
        }
    }
}

/// Read an environment variable, treating empty/whitespace values as unset
pub fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Read and parse an environment variable
///
/// Unset → `Ok(None)`; set but unparseable → `Error::Config`.
pub fn env_parse<T>(name: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env_var(name) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| Error::Config(format!("{}={:?} is invalid: {}", name, raw, e))),
        None => Ok(None),
    }
}

//! Driver manager configuration.
//!
//! The startup driver list comes from an explicit setting when present,
//! otherwise from an environment variable holding separator-delimited
//! driver names. It is only consulted while a root scope initializes.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::engine::error::{EngineError, EngineResult};

pub const DEFAULT_DRIVERS_ENV: &str = "DRIVERSCOPE_DRIVERS";
pub const DEFAULT_SEPARATOR: &str = ":";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagerConfig {
    /// Drivers to force-load at root initialization. Overrides `drivers_env`.
    pub initial_drivers: Option<Vec<String>>,
    /// Environment variable read when `initial_drivers` is not set
    pub drivers_env: String,
    pub separator: String,
    /// Advisory login timeout (seconds), 0 means unbounded
    pub login_timeout_secs: u32,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            initial_drivers: None,
            drivers_env: DEFAULT_DRIVERS_ENV.to_string(),
            separator: DEFAULT_SEPARATOR.to_string(),
            login_timeout_secs: 0,
        }
    }
}

impl ManagerConfig {
    pub fn with_initial_drivers<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.initial_drivers = Some(names.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_login_timeout(mut self, seconds: u32) -> Self {
        self.login_timeout_secs = seconds;
        self
    }

    pub fn load_from_file(path: &Path) -> EngineResult<Self> {
        let raw = fs::read_to_string(path)
            .map_err(|e| EngineError::internal(format!("Failed to read config: {}", e)))?;
        serde_json::from_str(&raw)
            .map_err(|e| EngineError::internal(format!("Invalid config: {}", e)))
    }

    /// Resolves the startup driver list. Reads the environment each call,
    /// so callers invoke it exactly when a root scope initializes.
    pub fn initial_driver_names(&self) -> Vec<String> {
        if let Some(ref names) = self.initial_drivers {
            return names
                .iter()
                .map(|name| name.trim())
                .filter(|name| !name.is_empty())
                .map(str::to_string)
                .collect();
        }

        match std::env::var(&self.drivers_env) {
            Ok(raw) => parse_driver_list(&raw, &self.separator),
            Err(_) => Vec::new(),
        }
    }
}

/// Splits a delimited driver list, trimming entries and dropping empty ones
pub fn parse_driver_list(raw: &str, separator: &str) -> Vec<String> {
    if separator.is_empty() {
        let trimmed = raw.trim();
        return if trimmed.is_empty() {
            Vec::new()
        } else {
            vec![trimmed.to_string()]
        };
    }

    raw.split(separator)
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

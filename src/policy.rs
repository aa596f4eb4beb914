//! Registry authorization policy.
//!
//! Defaults are persisted to a per-user config file. Environment variables
//! override any stored values to allow managed deployments to enforce policy.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::engine::scope::Scope;
use crate::engine::traits::Authorizer;
use crate::engine::types::Permission;
use crate::paths;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryPolicy {
    pub allow_deregistration: bool,
    pub allow_log_sink_changes: bool,
    /// When set, a driver may only be deregistered from its own scope or
    /// one of its descendants.
    pub enforce_scope_visibility: bool,
}

fn env_bool_opt(key: &str) -> Option<bool> {
    std::env::var(key).ok().map(|value| {
        matches!(
            value.trim().to_ascii_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        )
    })
}

fn load_from_file(path: &Path) -> Option<RegistryPolicy> {
    let raw = fs::read_to_string(path).ok()?;
    serde_json::from_str(&raw).ok()
}

impl RegistryPolicy {
    fn defaults() -> Self {
        Self {
            allow_deregistration: true,
            allow_log_sink_changes: true,
            enforce_scope_visibility: true,
        }
    }

    fn apply_env_overrides(&mut self) {
        if let Some(value) = env_bool_opt("DRIVERSCOPE_ALLOW_DEREGISTER") {
            self.allow_deregistration = value;
        }
        if let Some(value) = env_bool_opt("DRIVERSCOPE_ALLOW_SET_LOG") {
            self.allow_log_sink_changes = value;
        }
        if let Some(value) = env_bool_opt("DRIVERSCOPE_ENFORCE_VISIBILITY") {
            self.enforce_scope_visibility = value;
        }
    }

    pub fn load() -> Self {
        Self::load_from(&paths::policy_path())
    }

    pub fn load_from(path: &Path) -> Self {
        let mut policy = load_from_file(path).unwrap_or_else(Self::defaults);
        policy.apply_env_overrides();
        policy
    }

    pub fn save_to_file(&self) -> Result<(), String> {
        self.save_to(&paths::policy_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<(), String> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create config directory: {}", e))?;
        }

        let payload =
            serde_json::to_string_pretty(self).map_err(|e| format!("Save failed: {}", e))?;
        fs::write(path, payload).map_err(|e| format!("Save failed: {}", e))?;
        Ok(())
    }
}

impl Default for RegistryPolicy {
    fn default() -> Self {
        Self::defaults()
    }
}

impl Authorizer for RegistryPolicy {
    fn check(&self, permission: Permission) -> bool {
        match permission {
            Permission::DeregisterDriver => self.allow_deregistration,
            Permission::SetLog => self.allow_log_sink_changes,
        }
    }

    fn is_driver_allowed(&self, driver_scope: &Scope, requester: &Scope) -> bool {
        !self.enforce_scope_visibility || requester.is_within(driver_scope)
    }
}

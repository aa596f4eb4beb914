//! Shared data types for the driver engine

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a scope handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScopeId(pub Uuid);

impl ScopeId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ScopeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ScopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Sensitive capabilities checked against the [`Authorizer`](crate::engine::Authorizer)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    /// Remove a registered driver
    DeregisterDriver,
    /// Replace the process-wide log sink
    SetLog,
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Permission::DeregisterDriver => f.write_str("deregisterDriver"),
            Permission::SetLog => f.write_str("setLog"),
        }
    }
}

/// Key/value properties handed to a driver's `connect`.
///
/// Conventionally carries at least `user` and `password`.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionProperties {
    #[serde(flatten)]
    values: BTreeMap<String, String>,
}

impl ConnectionProperties {
    pub const USER: &'static str = "user";
    pub const PASSWORD: &'static str = "password";

    pub fn new() -> Self {
        Self::default()
    }

    /// Builds properties from optional credentials. Missing values are
    /// simply left out.
    pub fn with_credentials(user: Option<&str>, password: Option<&str>) -> Self {
        let mut props = Self::new();
        if let Some(user) = user {
            props.set(Self::USER, user);
        }
        if let Some(password) = password {
            props.set(Self::PASSWORD, password);
        }
        props
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn user(&self) -> Option<&str> {
        self.get(Self::USER)
    }

    pub fn password(&self) -> Option<&str> {
        self.get(Self::PASSWORD)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

// Passwords never end up in logs or spans.
impl fmt::Debug for ConnectionProperties {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (key, value) in &self.values {
            if key == Self::PASSWORD {
                map.entry(key, &"***");
            } else {
                map.entry(key, value);
            }
        }
        map.finish()
    }
}

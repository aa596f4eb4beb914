//! Engine error types
//!
//! `EngineError` is what every public operation of the driver manager
//! returns. `DriverError` is what driver implementations and discovery
//! candidates report back to the engine.

use std::fmt;

use thiserror::Error;

use crate::engine::types::Permission;

/// SQL state reported when no connection could be established.
pub const SQLSTATE_UNABLE_TO_CONNECT: &str = "08001";

pub type EngineResult<T> = Result<T, EngineError>;

/// Failure raised by a driver (URL matching, connecting) or by a discovery
/// candidate while it is being materialized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverError {
    pub message: String,
    pub sql_state: Option<String>,
    pub driver: Option<String>,
}

impl DriverError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            sql_state: None,
            driver: None,
        }
    }

    pub fn with_sql_state(mut self, state: impl Into<String>) -> Self {
        self.sql_state = Some(state.into());
        self
    }

    pub fn with_driver(mut self, driver: impl Into<String>) -> Self {
        self.driver = Some(driver.into());
        self
    }
}

impl fmt::Display for DriverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ref driver) = self.driver {
            write!(f, "[{}] ", driver)?;
        }
        write!(f, "{}", self.message)?;
        if let Some(ref state) = self.sql_state {
            write!(f, " (SQLState {})", state)?;
        }
        Ok(())
    }
}

impl std::error::Error for DriverError {}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("The url cannot be null")]
    InvalidUrl,

    #[error("No suitable driver found for {url}")]
    NoSuitableDriver { url: String },

    /// Every candidate driver failed. `primary` is the first failure, later
    /// failures are kept in `suppressed` in the order they occurred.
    #[error("Connection failed: {primary}")]
    ConnectionFailed {
        #[source]
        primary: DriverError,
        suppressed: Vec<DriverError>,
    },

    #[error("Forbidden: missing permission '{permission}'")]
    Forbidden { permission: Permission },

    #[error("Cannot register a null driver")]
    NullDriver,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl EngineError {
    pub fn no_suitable_driver(url: impl Into<String>) -> Self {
        Self::NoSuitableDriver { url: url.into() }
    }

    pub fn connection_failed(primary: DriverError) -> Self {
        Self::ConnectionFailed {
            primary,
            suppressed: Vec::new(),
        }
    }

    pub fn forbidden(permission: Permission) -> Self {
        Self::Forbidden { permission }
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Attaches a secondary failure to a `ConnectionFailed` error.
    /// Other variants are left untouched.
    pub fn add_suppressed(&mut self, error: DriverError) {
        if let Self::ConnectionFailed { suppressed, .. } = self {
            suppressed.push(error);
        }
    }

    /// Secondary failures attached to this error, if any.
    pub fn suppressed(&self) -> &[DriverError] {
        match self {
            Self::ConnectionFailed { suppressed, .. } => suppressed,
            _ => &[],
        }
    }

    pub fn sql_state(&self) -> Option<&str> {
        match self {
            Self::InvalidUrl | Self::NoSuitableDriver { .. } => Some(SQLSTATE_UNABLE_TO_CONNECT),
            Self::ConnectionFailed { primary, .. } => primary.sql_state.as_deref(),
            _ => None,
        }
    }
}

//! Driver trait definitions
//!
//! These are the seams between the registry and the outside world: drivers
//! plug in through [`Driver`], get notified on removal through
//! [`DriverAction`], and sensitive operations are approved by an
//! [`Authorizer`].

use std::sync::Arc;

use async_trait::async_trait;

use crate::engine::error::DriverError;
use crate::engine::scope::Scope;
use crate::engine::types::{ConnectionProperties, Permission};

/// Shared handle to a registered driver.
///
/// The registry compares handles by pointer identity, never through any
/// equality the driver type itself might define.
pub type DriverHandle = Arc<dyn Driver>;

/// A live connection produced by a driver.
///
/// The registry only brokers connections; what can be done with one is up
/// to the driver.
pub trait Connection: Send + Sync {
    /// URL this connection was opened against
    fn url(&self) -> &str;

    /// Name of the driver that produced this connection
    fn driver_name(&self) -> &str;
}

/// Core trait that all pluggable drivers implement
#[async_trait]
pub trait Driver: Send + Sync {
    /// Returns a human-readable name for this driver (used in diagnostics)
    fn name(&self) -> &str;

    /// Scope the driver belongs to.
    ///
    /// `None` means the manager's default scope.
    fn scope(&self) -> Option<Scope> {
        None
    }

    /// Returns true if this driver thinks it can open a connection to `url`.
    ///
    /// An error here is treated by the registry as "does not accept".
    fn accepts_url(&self, url: &str) -> Result<bool, DriverError>;

    /// Attempts to open a connection.
    ///
    /// `Ok(None)` means the driver declines the URL, an error means it tried
    /// and failed.
    async fn connect(
        &self,
        url: &str,
        props: &ConnectionProperties,
    ) -> Result<Option<Box<dyn Connection>>, DriverError>;
}

/// Callback notified when its driver is deregistered
pub trait DriverAction: Send + Sync {
    fn deregister(&self);
}

impl<F> DriverAction for F
where
    F: Fn() + Send + Sync,
{
    fn deregister(&self) {
        self()
    }
}

/// Approves or denies sensitive registry operations
pub trait Authorizer: Send + Sync {
    /// General capability check, run before any registry state is touched
    fn check(&self, permission: Permission) -> bool;

    /// Entry-specific check: may code running in `requester` act on a
    /// driver that lives in `driver_scope`?
    ///
    /// The default approves when the requester can see an identical
    /// instance of the driver, i.e. the requester is the driver's scope or
    /// one of its descendants.
    fn is_driver_allowed(&self, driver_scope: &Scope, requester: &Scope) -> bool {
        requester.is_within(driver_scope)
    }
}

/// Authorizer that approves everything, including cross-scope access
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl Authorizer for AllowAll {
    fn check(&self, _permission: Permission) -> bool {
        true
    }

    fn is_driver_allowed(&self, _driver_scope: &Scope, _requester: &Scope) -> bool {
        true
    }
}

//! Driver resolution
//!
//! First-match probing of a scope's driver list against a URL.

use std::sync::Arc;

use tracing::debug;

use crate::engine::entry::DriverEntry;
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::settings::RuntimeSettings;
use crate::engine::traits::DriverHandle;

/// Returns the first driver in `entries` accepting `url`.
///
/// A driver whose `accepts_url` errors is treated as rejecting the URL; the
/// search always continues with the next entry.
pub fn find_driver(
    entries: &[DriverEntry],
    url: &str,
    settings: &RuntimeSettings,
) -> EngineResult<DriverHandle> {
    for entry in entries {
        let driver = entry.driver();
        match driver.accepts_url(url) {
            Ok(true) => {
                settings.trace(|| format!("getDriver returning {}", driver.name()));
                return Ok(Arc::clone(driver));
            }
            Ok(false) => {}
            Err(err) => {
                debug!(driver = driver.name(), error = %err, "accepts_url failed, skipping");
            }
        }
    }

    settings.println("getDriver: no suitable driver");
    Err(EngineError::no_suitable_driver(url))
}

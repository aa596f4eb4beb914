//! Connection brokering
//!
//! Tries each driver of a scope in order until one hands back a live
//! connection. Attempts are strictly sequential: a driver's `connect` runs
//! to completion before the next candidate is tried.
//!
//! - `Ok(Some(conn))` ends the search immediately.
//! - `Ok(None)` means the driver declined, move on.
//! - `Err(e)` is recorded. The first error becomes the primary cause, later
//!   ones are attached to it as suppressed causes.
//!
//! If nothing connects, the primary error is surfaced when there is one,
//! otherwise `NoSuitableDriver`.

use tracing::{debug, warn};

use crate::engine::entry::DriverEntry;
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::settings::RuntimeSettings;
use crate::engine::traits::Connection;
use crate::engine::types::ConnectionProperties;

pub async fn connect_first(
    entries: &[DriverEntry],
    url: &str,
    props: &ConnectionProperties,
    settings: &RuntimeSettings,
) -> EngineResult<Box<dyn Connection>> {
    let mut reason: Option<EngineError> = None;

    for entry in entries {
        let driver = entry.driver();
        settings.trace(|| format!("    trying {}", driver.name()));

        match driver.connect(url, props).await {
            Ok(Some(conn)) => {
                debug!(driver = driver.name(), "connection established");
                settings.trace(|| format!("getConnection returning {}", driver.name()));
                return Ok(conn);
            }
            Ok(None) => {
                debug!(driver = driver.name(), "driver declined url");
            }
            Err(err) => {
                debug!(driver = driver.name(), error = %err, "connection attempt failed");
                match reason.as_mut() {
                    Some(primary) => primary.add_suppressed(err),
                    None => reason = Some(EngineError::connection_failed(err)),
                }
            }
        }
    }

    if let Some(reason) = reason {
        warn!(error = %reason, suppressed = reason.suppressed().len(), "getConnection failed");
        settings.trace(|| format!("getConnection failed: {}", reason));
        return Err(reason);
    }

    settings.trace(|| format!("getConnection: no suitable driver found for {}", url));
    Err(EngineError::no_suitable_driver(url))
}

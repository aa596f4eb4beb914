// Driver Engine Module
// Scoped driver registry, resolution and connection brokering

pub mod broker;
pub mod discovery;
pub mod entry;
pub mod error;
pub mod manager;
pub mod registry;
pub mod resolver;
pub mod scope;
pub mod settings;
pub mod traits;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use discovery::{CatalogDiscovery, DriverDiscovery, NoDiscovery};
pub use entry::{same_driver, DriverEntry};
pub use error::{DriverError, EngineError, EngineResult};
pub use manager::{DriverManager, DriverManagerBuilder};
pub use registry::{ScopeRegistry, ScopeState};
pub use scope::Scope;
pub use settings::{LogSink, MemorySink, RuntimeSettings, TracingSink, WriterSink};
pub use traits::{AllowAll, Authorizer, Connection, Driver, DriverAction, DriverHandle};
pub use types::*;

// DriverScope - scoped driver registry
// Core library

pub mod config;
pub mod engine;
pub mod observability;
pub mod paths;
pub mod policy;

pub use config::ManagerConfig;
pub use engine::{
    AllowAll, Authorizer, CatalogDiscovery, Connection, ConnectionProperties, Driver,
    DriverAction, DriverDiscovery, DriverError, DriverHandle, DriverManager, EngineError,
    EngineResult, LogSink, Permission, Scope,
};
pub use policy::RegistryPolicy;

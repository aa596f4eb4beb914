//! Driver discovery
//!
//! Discovery enumerates the drivers a scope provides on its own (inherited
//! drivers come from the parent scope, not from discovery). Candidates are
//! materialized lazily and one failing candidate never hides the others.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::engine::error::DriverError;
use crate::engine::scope::Scope;
use crate::engine::traits::DriverHandle;
use crate::engine::types::ScopeId;

/// One discovered driver, or the reason it could not be materialized
pub type Candidate = Result<DriverHandle, DriverError>;

/// Factory producing a driver instance
pub type DriverFactory = Arc<dyn Fn() -> Candidate + Send + Sync>;

/// Enumerates the drivers available to a scope
pub trait DriverDiscovery: Send + Sync {
    /// Yields the candidates provided by `scope` itself
    fn discover<'a>(&'a self, scope: &Scope) -> Box<dyn Iterator<Item = Candidate> + 'a>;

    /// Force-loads a driver by identifier.
    ///
    /// Used for the startup driver list during root scope initialization.
    fn load_named(&self, scope: &Scope, name: &str) -> Candidate {
        let _ = scope;
        Err(DriverError::new(format!("Unknown driver '{}'", name)))
    }
}

/// Discovery that never finds anything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDiscovery;

impl DriverDiscovery for NoDiscovery {
    fn discover<'a>(&'a self, _scope: &Scope) -> Box<dyn Iterator<Item = Candidate> + 'a> {
        Box::new(std::iter::empty())
    }
}

/// In-memory catalog of driver providers keyed by scope, plus named
/// factories that can be force-loaded by identifier.
///
/// Named loads are memoized: loading the same name twice yields the same
/// driver instance.
#[derive(Default)]
pub struct CatalogDiscovery {
    providers: RwLock<HashMap<ScopeId, Vec<DriverFactory>>>,
    named: RwLock<HashMap<String, DriverFactory>>,
    loaded: Mutex<HashMap<String, DriverHandle>>,
}

impl CatalogDiscovery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a provider to `scope`. Each discovery run calls the factory once.
    pub fn provide<F>(&self, scope: &Scope, factory: F)
    where
        F: Fn() -> Candidate + Send + Sync + 'static,
    {
        self.providers
            .write()
            .entry(scope.id())
            .or_default()
            .push(Arc::new(factory));
    }

    /// Adds an already-built driver to `scope`
    pub fn provide_instance(&self, scope: &Scope, driver: DriverHandle) {
        self.provide(scope, move || Ok(Arc::clone(&driver)));
    }

    /// Makes a driver loadable by `name`
    pub fn register_named<F>(&self, name: impl Into<String>, factory: F)
    where
        F: Fn() -> Candidate + Send + Sync + 'static,
    {
        self.named.write().insert(name.into(), Arc::new(factory));
    }

    /// Number of providers registered for `scope`
    pub fn provider_count(&self, scope: &Scope) -> usize {
        self.providers
            .read()
            .get(&scope.id())
            .map(Vec::len)
            .unwrap_or(0)
    }
}

impl DriverDiscovery for CatalogDiscovery {
    fn discover<'a>(&'a self, scope: &Scope) -> Box<dyn Iterator<Item = Candidate> + 'a> {
        let factories = self
            .providers
            .read()
            .get(&scope.id())
            .cloned()
            .unwrap_or_default();
        Box::new(factories.into_iter().map(|factory| factory()))
    }

    fn load_named(&self, _scope: &Scope, name: &str) -> Candidate {
        let mut loaded = self.loaded.lock();
        if let Some(driver) = loaded.get(name) {
            return Ok(Arc::clone(driver));
        }

        let factory = self
            .named
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| DriverError::new(format!("Unknown driver '{}'", name)))?;

        let driver = factory()?;
        loaded.insert(name.to_string(), Arc::clone(&driver));
        Ok(driver)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::entry::same_driver;
    use crate::engine::testing::StubDriver;

    #[test]
    fn discovery_is_per_scope() {
        let catalog = CatalogDiscovery::new();
        let root = Scope::root("system");
        let app = root.child("app");
        catalog.provide_instance(&root, Arc::new(StubDriver::accepting("a", "a:")));

        assert_eq!(catalog.discover(&root).count(), 1);
        assert_eq!(catalog.discover(&app).count(), 0);
        assert_eq!(catalog.provider_count(&root), 1);
    }

    #[test]
    fn failing_candidate_does_not_hide_the_rest() {
        let catalog = CatalogDiscovery::new();
        let root = Scope::root("system");
        catalog.provide(&root, || Err(DriverError::new("provider failed to initialize")));
        catalog.provide_instance(&root, Arc::new(StubDriver::accepting("b", "b:")));

        let candidates: Vec<_> = catalog.discover(&root).collect();
        assert_eq!(candidates.len(), 2);
        assert!(candidates[0].is_err());
        assert!(candidates[1].is_ok());
    }

    #[test]
    fn named_loads_are_memoized() {
        let catalog = CatalogDiscovery::new();
        let root = Scope::root("system");
        catalog.register_named("stub", || {
            Ok(Arc::new(StubDriver::accepting("stub", "s:")) as DriverHandle)
        });

        let first = catalog.load_named(&root, "stub").expect("should load");
        let second = catalog.load_named(&root, "stub").expect("should load");
        assert!(same_driver(&first, &second));

        let err = catalog
            .load_named(&root, "missing")
            .err()
            .expect("unknown name should fail");
        assert!(err.message.contains("missing"));
    }
}

//! Scope Registry
//!
//! Process-wide map from scope to its driver state. State is created on
//! first access and initialized lazily: discovered drivers first, then the
//! startup driver list (system scope only), then everything the parent scope
//! sees.
//!
//! Every driver added to a scope's own list remembers that scope as its
//! home, which is where deregistration looks for it.
//!
//! ## Initialization and locking
//!
//! Each scope owns a monitor lock. Initialization is double-checked against
//! the `initialized` flag, and the parent is fully initialized (its own
//! monitor taken and released) *before* the child's monitor is acquired.
//! Since parent links form a tree, at most one monitor is ever held at a
//! time during initialization.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::{Mutex, MutexGuard};
use tracing::{debug, info, warn};

use crate::config::ManagerConfig;
use crate::engine::discovery::DriverDiscovery;
use crate::engine::entry::{driver_key, DriverEntry, DriverList};
use crate::engine::scope::Scope;
use crate::engine::settings::RuntimeSettings;
use crate::engine::traits::DriverHandle;
use crate::engine::types::ScopeId;

/// Driver state of a single scope
#[derive(Debug, Default)]
pub struct ScopeState {
    initialized: AtomicBool,
    monitor: Mutex<()>,
    drivers: DriverList,
}

impl ScopeState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    fn mark_initialized(&self) {
        self.initialized.store(true, Ordering::Release);
    }

    /// Takes the scope's monitor. Serializes initialization and
    /// deregistration for this scope only.
    pub fn lock(&self) -> MutexGuard<'_, ()> {
        self.monitor.lock()
    }

    pub fn drivers(&self) -> &DriverList {
        &self.drivers
    }

    pub fn snapshot(&self) -> Arc<Vec<DriverEntry>> {
        self.drivers.snapshot()
    }
}

pub struct ScopeRegistry {
    states: DashMap<ScopeId, Arc<ScopeState>>,
    /// Home scope of each driver, keyed by handle address
    homes: DashMap<usize, Scope>,
    /// Root scope that receives the startup driver list
    system: Scope,
    discovery: Arc<dyn DriverDiscovery>,
    config: ManagerConfig,
    settings: Arc<RuntimeSettings>,
}

impl ScopeRegistry {
    /// `system` may be any scope; the startup drivers go to its root.
    pub fn new(
        system: &Scope,
        discovery: Arc<dyn DriverDiscovery>,
        config: ManagerConfig,
        settings: Arc<RuntimeSettings>,
    ) -> Self {
        Self {
            states: DashMap::new(),
            homes: DashMap::new(),
            system: system.root_ancestor().clone(),
            discovery,
            config,
            settings,
        }
    }

    pub fn system_scope(&self) -> &Scope {
        &self.system
    }

    /// Returns the state for `scope`, creating it if needed. Racing callers
    /// always end up with the same instance.
    pub fn get_or_create(&self, scope: &Scope) -> Arc<ScopeState> {
        if let Some(state) = self.states.get(&scope.id()) {
            return Arc::clone(state.value());
        }
        let state = self
            .states
            .entry(scope.id())
            .or_insert_with(|| Arc::new(ScopeState::new()));
        Arc::clone(state.value())
    }

    /// Returns the state for `scope` once its driver list is complete
    pub fn ensure_initialized(&self, scope: &Scope) -> Arc<ScopeState> {
        let state = self.get_or_create(scope);
        if state.is_initialized() {
            return state;
        }

        // Parent first, with no lock of ours held.
        let parent = scope.parent().map(|parent| self.ensure_initialized(parent));

        {
            let _guard = state.lock();
            if !state.is_initialized() {
                self.load_discovered(scope, &state);
                if *scope == self.system {
                    self.load_initial_drivers(scope, &state);
                }
                // Parent list is read after discovery; drivers registered
                // there in the meantime are inherited as well.
                if let Some(parent) = parent {
                    let inherited = parent.snapshot();
                    let added = state.drivers().add_all_absent(inherited.iter().cloned());
                    debug!(scope = %scope, inherited = added, "inherited parent drivers");
                }
                state.mark_initialized();

                info!(scope = %scope, drivers = state.drivers().len(), "scope initialized");
                self.settings
                    .trace(|| format!("driver list initialized for {}", scope));
            }
        }

        state
    }

    /// State for `scope` if it was ever touched
    pub fn get(&self, scope: &Scope) -> Option<Arc<ScopeState>> {
        self.states.get(&scope.id()).map(|s| Arc::clone(s.value()))
    }

    pub fn is_initialized(&self, scope: &Scope) -> bool {
        self.get(scope).is_some_and(|s| s.is_initialized())
    }

    /// Number of scopes with state
    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Appends `entry` to the own list of `scope`. The first scope a driver
    /// is added to becomes its home.
    pub fn add_driver(&self, scope: &Scope, state: &ScopeState, entry: DriverEntry) -> bool {
        let key = driver_key(entry.driver());
        let added = state.drivers().add_if_absent(entry);
        if added {
            self.homes.entry(key).or_insert_with(|| scope.clone());
        }
        added
    }

    /// Scope whose own list `driver` was added to, if any
    pub fn home_of(&self, driver: &DriverHandle) -> Option<Scope> {
        self.homes
            .get(&driver_key(driver))
            .map(|home| home.value().clone())
    }

    /// Removes `driver` from the own list of `scope`. Copies already
    /// inherited by child scopes stay where they are.
    pub fn remove_driver(
        &self,
        scope: &Scope,
        state: &ScopeState,
        driver: &DriverHandle,
    ) -> Option<DriverEntry> {
        let removed = state.drivers().remove(driver)?;
        self.homes
            .remove_if(&driver_key(driver), |_, home| home == scope);
        Some(removed)
    }

    fn load_discovered(&self, scope: &Scope, state: &ScopeState) {
        let mut found = 0usize;
        for candidate in self.discovery.discover(scope) {
            match candidate {
                Ok(driver) => {
                    if self.add_driver(scope, state, DriverEntry::new(driver, None)) {
                        found += 1;
                    }
                }
                Err(err) => {
                    debug!(scope = %scope, error = %err, "skipping driver candidate");
                }
            }
        }
        debug!(scope = %scope, discovered = found, "discovery finished");
    }

    fn load_initial_drivers(&self, scope: &Scope, state: &ScopeState) {
        let names = self.config.initial_driver_names();
        self.settings.trace(|| {
            format!(
                "initializing {}: {} = {}",
                scope,
                self.config.drivers_env,
                names.join(self.config.separator.as_str())
            )
        });

        for name in &names {
            self.settings
                .trace(|| format!("loading startup driver {}", name));
            match self.discovery.load_named(scope, name) {
                Ok(driver) => {
                    self.add_driver(scope, state, DriverEntry::new(driver, None));
                }
                Err(err) => {
                    warn!(driver = %name, error = %err, "failed to load startup driver");
                    self.settings
                        .trace(|| format!("startup driver {} failed to load: {}", name, err));
                }
            }
        }
    }
}

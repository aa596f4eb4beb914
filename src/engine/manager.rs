//! Driver Manager
//!
//! Public entry point of the engine. Every operation resolves the scope it
//! acts on (the caller's, or the manager's default scope), obtains that
//! scope's state from the [`ScopeRegistry`] and delegates to the resolver or
//! the connection broker.

use std::sync::{Arc, OnceLock};

use tracing::{debug, field, info, instrument, Span};

use crate::config::ManagerConfig;
use crate::engine::broker;
use crate::engine::discovery::{DriverDiscovery, NoDiscovery};
use crate::engine::entry::DriverEntry;
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::registry::ScopeRegistry;
use crate::engine::resolver;
use crate::engine::scope::Scope;
use crate::engine::settings::{LogSink, RuntimeSettings};
use crate::engine::traits::{Authorizer, Connection, DriverAction, DriverHandle};
use crate::engine::types::{ConnectionProperties, Permission};
use crate::policy::RegistryPolicy;

/// Name of the default scope created when none is supplied
pub const SYSTEM_SCOPE_NAME: &str = "system";

static GLOBAL: OnceLock<DriverManager> = OnceLock::new();

pub struct DriverManagerBuilder {
    default_scope: Scope,
    discovery: Arc<dyn DriverDiscovery>,
    authorizer: Arc<dyn Authorizer>,
    config: ManagerConfig,
    log_sink: Option<Arc<dyn LogSink>>,
}

impl DriverManagerBuilder {
    pub fn new(default_scope: Scope) -> Self {
        Self {
            default_scope,
            discovery: Arc::new(NoDiscovery),
            authorizer: Arc::new(RegistryPolicy::default()),
            config: ManagerConfig::default(),
            log_sink: None,
        }
    }

    pub fn discovery(mut self, discovery: Arc<dyn DriverDiscovery>) -> Self {
        self.discovery = discovery;
        self
    }

    pub fn authorizer(mut self, authorizer: Arc<dyn Authorizer>) -> Self {
        self.authorizer = authorizer;
        self
    }

    pub fn config(mut self, config: ManagerConfig) -> Self {
        self.config = config;
        self
    }

    /// Initial log sink. Not subject to the `SetLog` permission.
    pub fn log_sink(mut self, sink: Arc<dyn LogSink>) -> Self {
        self.log_sink = Some(sink);
        self
    }

    pub fn build(self) -> DriverManager {
        let settings = Arc::new(RuntimeSettings::new(self.config.login_timeout_secs));
        settings.set_log_sink(self.log_sink);
        let registry = ScopeRegistry::new(
            &self.default_scope,
            self.discovery,
            self.config,
            Arc::clone(&settings),
        );

        DriverManager {
            registry,
            settings,
            authorizer: self.authorizer,
            default_scope: self.default_scope,
        }
    }
}

/// Scoped driver registry and connection broker
pub struct DriverManager {
    registry: ScopeRegistry,
    settings: Arc<RuntimeSettings>,
    authorizer: Arc<dyn Authorizer>,
    default_scope: Scope,
}

impl DriverManager {
    pub fn builder(default_scope: Scope) -> DriverManagerBuilder {
        DriverManagerBuilder::new(default_scope)
    }

    /// Manager with a fresh `system` root scope and no discovery
    pub fn new() -> Self {
        Self::builder(Scope::root(SYSTEM_SCOPE_NAME)).build()
    }

    /// Process-wide manager.
    ///
    /// Built on first use from the stored policy and default config unless
    /// [`install_global`](Self::install_global) ran first.
    pub fn global() -> &'static DriverManager {
        GLOBAL.get_or_init(|| {
            Self::builder(Scope::root(SYSTEM_SCOPE_NAME))
                .authorizer(Arc::new(RegistryPolicy::load()))
                .build()
        })
    }

    /// Installs `manager` as the process-wide instance. Fails if one is
    /// already in place.
    pub fn install_global(manager: DriverManager) -> EngineResult<&'static DriverManager> {
        GLOBAL
            .set(manager)
            .map_err(|_| EngineError::internal("Global driver manager already installed"))?;
        Ok(Self::global())
    }

    pub fn default_scope(&self) -> &Scope {
        &self.default_scope
    }

    pub fn registry(&self) -> &ScopeRegistry {
        &self.registry
    }

    pub fn settings(&self) -> &RuntimeSettings {
        &self.settings
    }

    fn resolve_scope<'a>(&'a self, scope: Option<&'a Scope>) -> &'a Scope {
        scope.unwrap_or(&self.default_scope)
    }

    /// Scope a new registration of `driver` goes to
    fn target_scope(&self, driver: &DriverHandle) -> Scope {
        driver
            .scope()
            .unwrap_or_else(|| self.default_scope.clone())
    }

    /// Scope a driver lives in: the scope it was first added to, be it by
    /// registration, discovery or the startup list.
    pub fn scope_of(&self, driver: &DriverHandle) -> Scope {
        self.registry
            .home_of(driver)
            .unwrap_or_else(|| self.target_scope(driver))
    }

    // ==================== Registration ====================

    /// Registers `driver` in its own scope. Registering the same instance
    /// again is a no-op.
    pub fn register_driver(&self, driver: Option<DriverHandle>) -> EngineResult<()> {
        self.register_driver_with_action(driver, None)
    }

    /// Registers `driver` with a callback run when it gets deregistered.
    ///
    /// Does not trigger initialization of the target scope.
    #[instrument(skip_all, fields(driver = field::Empty, scope = field::Empty))]
    pub fn register_driver_with_action(
        &self,
        driver: Option<DriverHandle>,
        action: Option<Arc<dyn DriverAction>>,
    ) -> EngineResult<()> {
        let driver = driver.ok_or(EngineError::NullDriver)?;
        let scope = self.target_scope(&driver);
        Span::current().record("driver", field::display(driver.name()));
        Span::current().record("scope", field::display(&scope));

        let state = self.registry.get_or_create(&scope);
        let added = self.registry.add_driver(
            &scope,
            &state,
            DriverEntry::new(Arc::clone(&driver), action),
        );

        debug!(added, "registerDriver");
        self.settings
            .trace(|| format!("registerDriver: {}", driver.name()));
        Ok(())
    }

    /// Removes `driver` from its home scope.
    ///
    /// `None` and unknown drivers are no-ops. The general `DeregisterDriver`
    /// permission is checked first; then, under the scope's lock, the
    /// requester must be allowed to see the driver. The entry's callback runs
    /// exactly once, before removal.
    #[instrument(skip_all, fields(driver = field::Empty, scope = field::Empty))]
    pub fn deregister_driver(
        &self,
        driver: Option<&DriverHandle>,
        requester: Option<&Scope>,
    ) -> EngineResult<()> {
        let Some(driver) = driver else {
            return Ok(());
        };

        if !self.authorizer.check(Permission::DeregisterDriver) {
            return Err(EngineError::forbidden(Permission::DeregisterDriver));
        }

        let scope = self.scope_of(driver);
        let requester = self.resolve_scope(requester);
        Span::current().record("driver", field::display(driver.name()));
        Span::current().record("scope", field::display(&scope));
        self.settings
            .trace(|| format!("deregisterDriver: {}", driver.name()));

        let state = self.registry.get_or_create(&scope);
        let _guard = state.lock();

        let Some(entry) = state.drivers().find(driver) else {
            self.settings.println("    couldn't find driver to unload");
            return Ok(());
        };

        if !self.authorizer.is_driver_allowed(&scope, requester) {
            return Err(EngineError::forbidden(Permission::DeregisterDriver));
        }

        if let Some(action) = entry.action() {
            action.deregister();
        }
        self.registry.remove_driver(&scope, &state, driver);

        info!("driver deregistered");
        Ok(())
    }

    // ==================== Resolution ====================

    /// Returns the first driver visible from `scope` that accepts `url`
    #[instrument(skip(self, scope), fields(scope = field::Empty))]
    pub fn get_driver(&self, url: &str, scope: Option<&Scope>) -> EngineResult<DriverHandle> {
        let scope = self.resolve_scope(scope);
        Span::current().record("scope", field::display(scope));
        self.settings
            .trace(|| format!("getDriver(\"{}\")", url));

        let state = self.registry.ensure_initialized(scope);
        resolver::find_driver(&state.snapshot(), url, &self.settings)
    }

    /// Opens a connection through the first driver visible from `scope`
    /// that produces one. A `None` url fails before any driver is consulted.
    #[instrument(skip(self, props, scope), fields(scope = field::Empty))]
    pub async fn get_connection(
        &self,
        url: Option<&str>,
        props: &ConnectionProperties,
        scope: Option<&Scope>,
    ) -> EngineResult<Box<dyn Connection>> {
        let url = url.ok_or(EngineError::InvalidUrl)?;
        let scope = self.resolve_scope(scope);
        Span::current().record("scope", field::display(scope));
        self.settings
            .trace(|| format!("getConnection(\"{}\")", url));

        let entries = self.registry.ensure_initialized(scope).snapshot();
        broker::connect_first(&entries, url, props, &self.settings).await
    }

    /// [`get_connection`](Self::get_connection) with `user`/`password`
    /// properties built from the given credentials
    pub async fn get_connection_with_credentials(
        &self,
        url: Option<&str>,
        user: Option<&str>,
        password: Option<&str>,
        scope: Option<&Scope>,
    ) -> EngineResult<Box<dyn Connection>> {
        let props = ConnectionProperties::with_credentials(user, password);
        self.get_connection(url, &props, scope).await
    }

    // ==================== Enumeration ====================

    /// Point-in-time list of the drivers visible from `scope`, in order
    pub fn get_drivers(&self, scope: Option<&Scope>) -> Vec<DriverHandle> {
        self.drivers(scope).collect()
    }

    /// Iterator over a snapshot of the drivers visible from `scope`
    pub fn drivers(&self, scope: Option<&Scope>) -> impl Iterator<Item = DriverHandle> {
        let state = self.registry.ensure_initialized(self.resolve_scope(scope));
        let drivers: Vec<DriverHandle> = state
            .snapshot()
            .iter()
            .map(|entry| Arc::clone(entry.driver()))
            .collect();
        drivers.into_iter()
    }

    /// Whether code in `scope` may act on `driver`
    pub fn is_driver_allowed(&self, driver: &DriverHandle, scope: Option<&Scope>) -> bool {
        self.authorizer
            .is_driver_allowed(&self.scope_of(driver), self.resolve_scope(scope))
    }

    // ==================== Settings ====================

    pub fn login_timeout(&self) -> u32 {
        self.settings.login_timeout()
    }

    pub fn set_login_timeout(&self, seconds: u32) {
        self.settings.set_login_timeout(seconds);
    }

    pub fn log_sink(&self) -> Option<Arc<dyn LogSink>> {
        self.settings.log_sink()
    }

    /// Replaces the diagnostic sink. Requires the `SetLog` permission.
    pub fn set_log_sink(&self, sink: Option<Arc<dyn LogSink>>) -> EngineResult<()> {
        if !self.authorizer.check(Permission::SetLog) {
            return Err(EngineError::forbidden(Permission::SetLog));
        }
        self.settings.set_log_sink(sink);
        Ok(())
    }

    /// Writes a line to the diagnostic sink, if any
    pub fn println(&self, message: &str) {
        self.settings.println(message);
    }
}

impl Default for DriverManager {
    fn default() -> Self {
        Self::new()
    }
}

//! Shared fixtures for integration tests

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use driverscope::{
    Connection, ConnectionProperties, Driver, DriverError, DriverHandle, DriverManager,
    ManagerConfig, Scope,
};
use driverscope::engine::DriverManagerBuilder;

pub struct TestConnection {
    url: String,
    driver: String,
}

impl Connection for TestConnection {
    fn url(&self) -> &str {
        &self.url
    }

    fn driver_name(&self) -> &str {
        &self.driver
    }
}

pub enum OnConnect {
    Open,
    Decline,
    Fail(&'static str),
}

pub struct FakeDriver {
    name: String,
    prefix: Option<String>,
    scope: Option<Scope>,
    on_connect: OnConnect,
    accept_calls: AtomicUsize,
    connect_calls: AtomicUsize,
}

impl FakeDriver {
    pub fn new(name: &str, prefix: Option<&str>, on_connect: OnConnect) -> Self {
        Self {
            name: name.to_string(),
            prefix: prefix.map(str::to_string),
            scope: None,
            on_connect,
            accept_calls: AtomicUsize::new(0),
            connect_calls: AtomicUsize::new(0),
        }
    }

    pub fn in_scope(mut self, scope: &Scope) -> Self {
        self.scope = Some(scope.clone());
        self
    }

    pub fn accept_calls(&self) -> usize {
        self.accept_calls.load(Ordering::SeqCst)
    }

    pub fn connect_calls(&self) -> usize {
        self.connect_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Driver for FakeDriver {
    fn name(&self) -> &str {
        &self.name
    }

    fn scope(&self) -> Option<Scope> {
        self.scope.clone()
    }

    fn accepts_url(&self, url: &str) -> Result<bool, DriverError> {
        self.accept_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .prefix
            .as_deref()
            .is_some_and(|prefix| url.starts_with(prefix)))
    }

    async fn connect(
        &self,
        url: &str,
        _props: &ConnectionProperties,
    ) -> Result<Option<Box<dyn Connection>>, DriverError> {
        self.connect_calls.fetch_add(1, Ordering::SeqCst);
        match self.on_connect {
            OnConnect::Open => Ok(Some(Box::new(TestConnection {
                url: url.to_string(),
                driver: self.name.clone(),
            }))),
            OnConnect::Decline => Ok(None),
            OnConnect::Fail(message) => {
                Err(DriverError::new(message).with_driver(self.name.clone()))
            }
        }
    }
}

pub fn handle(driver: &Arc<FakeDriver>) -> DriverHandle {
    Arc::clone(driver) as DriverHandle
}

pub fn names(drivers: &[DriverHandle]) -> Vec<String> {
    drivers.iter().map(|d| d.name().to_string()).collect()
}

/// Builder with no startup drivers, so tests never depend on the environment
pub fn builder(scope: Scope) -> DriverManagerBuilder {
    driverscope::observability::init_stderr_tracing();
    DriverManager::builder(scope)
        .config(ManagerConfig::default().with_initial_drivers(Vec::<String>::new()))
}

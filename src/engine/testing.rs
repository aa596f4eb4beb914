//! Stub drivers for unit tests

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::engine::error::DriverError;
use crate::engine::scope::Scope;
use crate::engine::traits::{Connection, Driver};
use crate::engine::types::ConnectionProperties;

pub struct StubConnection {
    url: String,
    driver: String,
}

impl Connection for StubConnection {
    fn url(&self) -> &str {
        &self.url
    }

    fn driver_name(&self) -> &str {
        &self.driver
    }
}

pub enum Accept {
    Prefix(String),
    Nothing,
    Fails,
}

pub enum Connect {
    Succeeds,
    Declines,
    Fails(DriverError),
}

pub struct StubDriver {
    name: String,
    scope: Option<Scope>,
    accept: Accept,
    connect: Connect,
    pub accept_calls: AtomicUsize,
    pub connect_calls: AtomicUsize,
}

impl StubDriver {
    pub fn new(name: &str, accept: Accept, connect: Connect) -> Self {
        Self {
            name: name.to_string(),
            scope: None,
            accept,
            connect,
            accept_calls: AtomicUsize::new(0),
            connect_calls: AtomicUsize::new(0),
        }
    }

    pub fn accepting(name: &str, prefix: &str) -> Self {
        Self::new(name, Accept::Prefix(prefix.to_string()), Connect::Succeeds)
    }

    pub fn in_scope(mut self, scope: &Scope) -> Self {
        self.scope = Some(scope.clone());
        self
    }

    pub fn accepts(&self) -> usize {
        self.accept_calls.load(Ordering::SeqCst)
    }

    pub fn connects(&self) -> usize {
        self.connect_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Driver for StubDriver {
    fn name(&self) -> &str {
        &self.name
    }

    fn scope(&self) -> Option<Scope> {
        self.scope.clone()
    }

    fn accepts_url(&self, url: &str) -> Result<bool, DriverError> {
        self.accept_calls.fetch_add(1, Ordering::SeqCst);
        match &self.accept {
            Accept::Prefix(prefix) => Ok(url.starts_with(prefix.as_str())),
            Accept::Nothing => Ok(false),
            Accept::Fails => Err(DriverError::new("cannot parse url").with_driver(&self.name)),
        }
    }

    async fn connect(
        &self,
        url: &str,
        _props: &ConnectionProperties,
    ) -> Result<Option<Box<dyn Connection>>, DriverError> {
        self.connect_calls.fetch_add(1, Ordering::SeqCst);
        match &self.connect {
            Connect::Succeeds => Ok(Some(Box::new(StubConnection {
                url: url.to_string(),
                driver: self.name.clone(),
            }))),
            Connect::Declines => Ok(None),
            Connect::Fails(err) => Err(err.clone()),
        }
    }
}

//! Dispatcher Registry - scheme-driven dispatcher creation
//!
//! A sink's URL scheme names its dispatcher. Unknown schemes and invalid
//! targets fail when the sink is built, never while it is running.
//!
//! # Example
//!
//! ```
//! use tally_config::SinkConfig;
//! use tally_sinks::default_registry;
//!
//! let registry = default_registry();
//! let dispatcher = registry.create("debug", &SinkConfig::new("null://")).unwrap();
//! assert_eq!(dispatcher.scheme(), "null");
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use tally_config::SinkConfig;

use crate::file::FileFactory;
use crate::memory::MemoryFactory;
use crate::null::NullFactory;
use crate::stdout::StdoutFactory;
use crate::udp::UdpFactory;
use crate::{Dispatcher, Result, SinkError};

/// Factory trait for creating dispatchers
pub trait DispatcherFactory: Send + Sync {
    /// Create a dispatcher for the named sink
    ///
    /// # Errors
    /// Returns `SinkError::Config` if the URL target or options are invalid
    fn create(&self, sink: &str, config: &SinkConfig) -> Result<Arc<dyn Dispatcher>>;

    /// URL scheme this factory serves
    fn scheme(&self) -> &'static str;
}

/// Registry for dispatcher factories, keyed by URL scheme
pub struct DispatcherRegistry {
    factories: HashMap<&'static str, Box<dyn DispatcherFactory>>,
}

impl DispatcherRegistry {
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Register a dispatcher factory under its scheme
    ///
    /// # Panics
    /// Panics if the scheme is already registered.
    /// Use `try_register` for fallible registration.
    pub fn register<F: DispatcherFactory + 'static>(&mut self, factory: F) {
        let scheme = factory.scheme();
        if self.factories.contains_key(scheme) {
            panic!("Dispatcher factory '{}' already registered", scheme);
        }
        self.factories.insert(scheme, Box::new(factory));
    }

    /// Returns `false` if the scheme is already registered
    pub fn try_register<F: DispatcherFactory + 'static>(&mut self, factory: F) -> bool {
        let scheme = factory.scheme();
        if self.factories.contains_key(scheme) {
            return false;
        }
        self.factories.insert(scheme, Box::new(factory));
        true
    }

    /// Create the dispatcher a sink config's URL names
    ///
    /// # Errors
    /// - `SinkError::Config` if the URL has no scheme
    /// - `SinkError::UnknownScheme` if no factory serves the scheme
    /// - whatever the factory reports for an invalid target
    pub fn create(&self, sink: &str, config: &SinkConfig) -> Result<Arc<dyn Dispatcher>> {
        let scheme = config.scheme().ok_or_else(|| {
            SinkError::config(sink, format!("url '{}' has no scheme (expected scheme://target)", config.url))
        })?;
        let factory = self.factories.get(scheme).ok_or_else(|| SinkError::UnknownScheme {
            sink: sink.to_string(),
            scheme: scheme.to_string(),
            available: self.available_schemes().join(", "),
        })?;
        factory.create(sink, config)
    }

    pub fn contains(&self, scheme: &str) -> bool {
        self.factories.contains_key(scheme)
    }

    /// Registered schemes, sorted
    pub fn available_schemes(&self) -> Vec<&'static str> {
        let mut schemes: Vec<&'static str> = self.factories.keys().copied().collect();
        schemes.sort_unstable();
        schemes
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

impl Default for DispatcherRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Create a registry with all built-in dispatchers registered
pub fn default_registry() -> DispatcherRegistry {
    let mut registry = DispatcherRegistry::new();
    registry.register(NullFactory);
    registry.register(StdoutFactory);
    registry.register(MemoryFactory::new());
    registry.register(UdpFactory);
    registry.register(FileFactory);
    registry
}

#[cfg(test)]
#[path = "registry_test.rs"]
mod tests;

//! Discovery sources
//!
//! A discovery source tells a pollster which resources to poll. Built-in
//! types:
//!
//! - `local_node` - the host this engine runs on
//! - `static` - a fixed `resources` list from configuration
//!
//! # Example
//!
//! ```toml
//! [polling.discovery.fixed]
//! type = "static"
//! resources = ["node-1", "node-2"]
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tally_config::DiscoveryConfig;

use crate::{CollectionError, Result, SourceError};

/// Supplies resource identifiers to poll
#[async_trait]
pub trait Discovery: Send + Sync {
    async fn discover(&self) -> std::result::Result<Vec<String>, CollectionError>;
}

/// Factory trait for creating discovery sources
pub trait DiscoveryFactory: Send + Sync {
    /// # Errors
    /// Returns `SourceError::Config` if the type-specific options are invalid
    fn create(&self, config: &DiscoveryConfig) -> Result<Arc<dyn Discovery>>;

    /// Type name used in `[polling.discovery.<name>]`
    fn discovery_type(&self) -> &'static str;
}

/// Registry for discovery factories, keyed by type name
pub struct DiscoveryRegistry {
    factories: HashMap<&'static str, Box<dyn DiscoveryFactory>>,
}

impl DiscoveryRegistry {
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// # Panics
    /// Panics if the type is already registered.
    pub fn register<F: DiscoveryFactory + 'static>(&mut self, factory: F) {
        let name = factory.discovery_type();
        if self.factories.contains_key(name) {
            panic!("Discovery factory '{}' already registered", name);
        }
        self.factories.insert(name, Box::new(factory));
    }

    /// Returns `false` if the type is already registered
    pub fn try_register<F: DiscoveryFactory + 'static>(&mut self, factory: F) -> bool {
        let name = factory.discovery_type();
        if self.factories.contains_key(name) {
            return false;
        }
        self.factories.insert(name, Box::new(factory));
        true
    }

    /// # Errors
    /// - `SourceError::UnknownDiscovery` if no factory serves the type
    /// - whatever the factory reports for invalid options
    pub fn create(&self, config: &DiscoveryConfig) -> Result<Arc<dyn Discovery>> {
        let factory = self
            .factories
            .get(config.discovery_type.as_str())
            .ok_or_else(|| SourceError::UnknownDiscovery {
                name: config.discovery_type.clone(),
                available: self.available_types().join(", "),
            })?;
        factory.create(config)
    }

    /// Registered types, sorted
    pub fn available_types(&self) -> Vec<&'static str> {
        let mut types: Vec<&'static str> = self.factories.keys().copied().collect();
        types.sort_unstable();
        types
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

impl Default for DiscoveryRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Create a registry with `local_node` and `static` registered
pub fn default_discovery() -> DiscoveryRegistry {
    let mut registry = DiscoveryRegistry::new();
    registry.register(LocalNodeFactory);
    registry.register(StaticFactory);
    registry
}

/// Host name of this machine
///
/// Reads `/etc/hostname`, then `HOSTNAME`, falling back to `localhost`.
pub fn local_node_name() -> String {
    std::fs::read_to_string("/etc/hostname")
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .or_else(|| std::env::var("HOSTNAME").ok().filter(|s| !s.is_empty()))
        .unwrap_or_else(|| "localhost".to_string())
}

/// Discovers the local host
#[derive(Debug, Clone)]
pub struct LocalNodeDiscovery {
    node: String,
}

impl LocalNodeDiscovery {
    pub fn new() -> Self {
        Self {
            node: local_node_name(),
        }
    }
}

impl Default for LocalNodeDiscovery {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Discovery for LocalNodeDiscovery {
    async fn discover(&self) -> std::result::Result<Vec<String>, CollectionError> {
        Ok(vec![self.node.clone()])
    }
}

pub struct LocalNodeFactory;

impl DiscoveryFactory for LocalNodeFactory {
    fn create(&self, _config: &DiscoveryConfig) -> Result<Arc<dyn Discovery>> {
        Ok(Arc::new(LocalNodeDiscovery::new()))
    }

    fn discovery_type(&self) -> &'static str {
        "local_node"
    }
}

/// Returns a configured list of resources
#[derive(Debug, Clone)]
pub struct StaticDiscovery {
    resources: Vec<String>,
}

impl StaticDiscovery {
    pub fn new(resources: Vec<String>) -> Self {
        Self { resources }
    }
}

#[async_trait]
impl Discovery for StaticDiscovery {
    async fn discover(&self) -> std::result::Result<Vec<String>, CollectionError> {
        Ok(self.resources.clone())
    }
}

pub struct StaticFactory;

impl DiscoveryFactory for StaticFactory {
    fn create(&self, config: &DiscoveryConfig) -> Result<Arc<dyn Discovery>> {
        let resources = config
            .get_string_array("resources")
            .ok_or_else(|| SourceError::config("static discovery requires a 'resources' list"))?;
        if resources.is_empty() {
            return Err(SourceError::config("static discovery 'resources' is empty"));
        }
        Ok(Arc::new(StaticDiscovery::new(resources)))
    }

    fn discovery_type(&self) -> &'static str {
        "static"
    }
}

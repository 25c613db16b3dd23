//! Pollster Registry - type-driven pollster creation
//!
//! A pollster is an adapter the scheduler invokes on every tick of its
//! interval. Pollster types are resolved when the scheduler is built, so a
//! misspelled type fails at load time rather than on the first tick.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tally_config::PollsterConfig;
use tally_metrics::PipelineMetricsProvider;
use tally_protocol::Sample;

use crate::engine::EngineFactory;
use crate::{CollectionError, Result, SourceError};

/// Produces samples when the scheduler ticks
#[async_trait]
pub trait Pollster: Send + Sync {
    /// Collect samples for the discovered resources
    ///
    /// `resources` is empty when the pollster has no discovery sources.
    async fn poll(&self, resources: &[String]) -> std::result::Result<Vec<Sample>, CollectionError>;
}

/// Factory trait for creating pollsters
pub trait PollsterFactory: Send + Sync {
    /// Create a pollster from its configuration
    ///
    /// # Errors
    /// Returns `SourceError::Config` if the type-specific options are invalid
    fn create(&self, config: &PollsterConfig) -> Result<Arc<dyn Pollster>>;

    /// Type name used in `[[polling.pollsters]]`
    fn pollster_type(&self) -> &'static str;
}

/// Registry for pollster factories, keyed by type name
pub struct PollsterRegistry {
    factories: HashMap<&'static str, Box<dyn PollsterFactory>>,
}

impl PollsterRegistry {
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Register a pollster factory under its type name
    ///
    /// # Panics
    /// Panics if the type is already registered.
    /// Use `try_register` for fallible registration.
    pub fn register<F: PollsterFactory + 'static>(&mut self, factory: F) {
        let name = factory.pollster_type();
        if self.factories.contains_key(name) {
            panic!("Pollster factory '{}' already registered", name);
        }
        self.factories.insert(name, Box::new(factory));
    }

    /// Returns `false` if the type is already registered
    pub fn try_register<F: PollsterFactory + 'static>(&mut self, factory: F) -> bool {
        let name = factory.pollster_type();
        if self.factories.contains_key(name) {
            return false;
        }
        self.factories.insert(name, Box::new(factory));
        true
    }

    /// Create the pollster a config entry names
    ///
    /// # Errors
    /// - `SourceError::UnknownPollster` if no factory serves the type
    /// - whatever the factory reports for invalid options
    pub fn create(&self, config: &PollsterConfig) -> Result<Arc<dyn Pollster>> {
        let factory = self
            .factories
            .get(config.pollster_type.as_str())
            .ok_or_else(|| SourceError::UnknownPollster {
                name: config.pollster_type.clone(),
                available: self.available_types().join(", "),
            })?;
        factory.create(config)
    }

    pub fn contains(&self, pollster_type: &str) -> bool {
        self.factories.contains_key(pollster_type)
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

impl Default for PollsterRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Create a registry with the built-in pollsters registered
///
/// The `engine` pollster reports the counters of the given provider,
/// normally the pipeline manager's metrics handle.
pub fn default_pollsters<P: PipelineMetricsProvider + 'static>(engine: P) -> PollsterRegistry {
    let mut registry = PollsterRegistry::new();
    registry.register(EngineFactory::new(Arc::new(engine)));
    registry
}

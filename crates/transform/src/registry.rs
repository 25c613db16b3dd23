//! Transformer Registry - Dynamic transformer creation
//!
//! The registry maps transformer type names to factories, enabling
//! configuration-driven stage instantiation. Unknown type names and invalid
//! options fail here, when a pipeline is built, never mid-pipeline.
//!
//! # Example
//!
//! ```
//! use tally_config::TransformerInstanceConfig;
//! use tally_transform::{NoopFactory, TransformerRegistry};
//!
//! let mut registry = TransformerRegistry::new();
//! registry.register("noop", NoopFactory);
//!
//! let transformer = registry.create(&TransformerInstanceConfig::new("noop")).unwrap();
//! assert_eq!(transformer.name(), "noop");
//! ```

use std::collections::HashMap;

use tally_config::TransformerInstanceConfig;

use crate::{
    AggregatorFactory, ArithmeticFactory, DeltaFactory, NoopFactory, RateOfChangeFactory,
    TransformError, TransformResult, Transformer, UnitConversionFactory,
};

#[cfg(test)]
#[path = "registry_test.rs"]
mod tests;

/// Factory trait for creating transformers
pub trait TransformerFactory: Send + Sync {
    /// Create a fresh transformer instance with its own state
    ///
    /// # Errors
    /// Returns `TransformError::Config` if the options are invalid
    fn create(&self, config: &TransformerInstanceConfig) -> TransformResult<Box<dyn Transformer>>;

    /// Human-readable name for this factory (for error messages)
    fn name(&self) -> &'static str;
}

/// Registry for transformer factories
pub struct TransformerRegistry {
    factories: HashMap<String, Box<dyn TransformerFactory>>,
}

impl TransformerRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Register a transformer factory
    ///
    /// # Panics
    /// Panics if a factory is already registered with this name.
    /// Use `try_register` for fallible registration.
    pub fn register<F: TransformerFactory + 'static>(&mut self, type_name: &str, factory: F) {
        if self.factories.contains_key(type_name) {
            panic!("Transformer factory '{}' already registered", type_name);
        }
        self.factories.insert(type_name.to_string(), Box::new(factory));
    }

    /// Try to register a transformer factory
    ///
    /// Returns `false` if a factory is already registered with this name.
    pub fn try_register<F: TransformerFactory + 'static>(
        &mut self,
        type_name: &str,
        factory: F,
    ) -> bool {
        if self.factories.contains_key(type_name) {
            return false;
        }
        self.factories.insert(type_name.to_string(), Box::new(factory));
        true
    }

    /// Create a transformer from an instance config
    ///
    /// # Errors
    /// - `TransformError::Config` if the type is not registered
    /// - `TransformError::Config` if the factory rejects the options
    pub fn create(
        &self,
        config: &TransformerInstanceConfig,
    ) -> TransformResult<Box<dyn Transformer>> {
        let type_name = config.transformer_type.as_str();
        let factory = self.factories.get(type_name).ok_or_else(|| {
            TransformError::config(format!(
                "unknown transformer type '{}', available: [{}]",
                type_name,
                self.available_types().join(", ")
            ))
        })?;

        factory.create(config).map_err(|e| match e {
            TransformError::Config(msg) => TransformError::config(format!("{type_name}: {msg}")),
            other => other,
        })
    }

    /// Create every stage of a pipeline, in order
    pub fn create_all(
        &self,
        configs: &[TransformerInstanceConfig],
    ) -> TransformResult<Vec<Box<dyn Transformer>>> {
        configs.iter().map(|c| self.create(c)).collect()
    }

    /// Check if a transformer type is registered
    pub fn contains(&self, type_name: &str) -> bool {
        self.factories.contains_key(type_name)
    }

    /// Registered transformer types, sorted
    pub fn available_types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self.factories.keys().map(|s| s.as_str()).collect();
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

impl Default for TransformerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Create a registry with all built-in transformers registered
pub fn default_registry() -> TransformerRegistry {
    let mut registry = TransformerRegistry::new();
    registry.register("noop", NoopFactory);
    registry.register("arithmetic", ArithmeticFactory);
    registry.register("unit_conversion", UnitConversionFactory);
    registry.register("delta", DeltaFactory);
    registry.register("rate_of_change", RateOfChangeFactory);
    registry.register("aggregator", AggregatorFactory);
    registry
}

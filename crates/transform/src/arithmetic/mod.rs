//! Arithmetic Transformer - Derive a meter from several others
//!
//! Caches the latest sample of every referenced meter per resource. Once a
//! resource has a value for all of them the expression is evaluated, one
//! derived sample is emitted and that resource's cache is cleared.
//!
//! # Example
//!
//! ```toml
//! [[pipelines.memory.transformers]]
//! type = "arithmetic"
//! expression = "$(memory.usage) * 100 / $(memory)"
//! target_name = "memory_util"
//! target_unit = "%"
//! ```

mod config;

pub use config::ArithmeticConfig;

use std::collections::HashMap;

use tally_config::TransformerInstanceConfig;
use tally_protocol::Sample;
use tracing::debug;

use crate::registry::TransformerFactory;
use crate::{TransformError, TransformResult, Transformer};

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;

/// Arithmetic transformer
///
/// State is keyed by resource id; each entry holds the latest sample per
/// referenced meter.
pub struct ArithmeticTransformer {
    config: ArithmeticConfig,
    cache: HashMap<String, HashMap<String, Sample>>,
}

impl ArithmeticTransformer {
    pub fn new(config: ArithmeticConfig) -> TransformResult<Self> {
        config.validate().map_err(TransformError::config)?;
        Ok(Self {
            config,
            cache: HashMap::new(),
        })
    }

    /// Resources currently waiting for more meters
    pub fn pending_resources(&self) -> usize {
        self.cache.len()
    }

    fn is_complete(&self, cached: &HashMap<String, Sample>) -> bool {
        self.config
            .expression
            .references()
            .iter()
            .all(|meter| cached.contains_key(meter))
    }

    fn evaluate(&self, cached: &HashMap<String, Sample>, trigger: &Sample) -> TransformResult<Sample> {
        let values: HashMap<String, f64> = cached
            .iter()
            .map(|(name, sample)| (name.clone(), sample.volume))
            .collect();
        let volume = self.config.expression.evaluate(&values)?;

        // Newest input carries the timestamp of the derived sample.
        let latest = cached
            .values()
            .max_by_key(|s| s.timestamp)
            .unwrap_or(trigger);

        Ok(latest.derive(
            self.config.target_name.clone(),
            self.config.target_type,
            self.config.target_unit.clone(),
            volume,
        ))
    }
}

impl Transformer for ArithmeticTransformer {
    fn transform(&mut self, sample: Sample) -> TransformResult<Vec<Sample>> {
        if !self.config.expression.references_meter(&sample.name) {
            return Ok(vec![sample]);
        }

        let cached = self.cache.entry(sample.resource_id.clone()).or_default();
        cached.insert(sample.name.clone(), sample.clone());

        let mut out = Vec::with_capacity(2);
        if self.config.passthrough {
            out.push(sample.clone());
        }

        let complete = self
            .cache
            .get(&sample.resource_id)
            .is_some_and(|cached| self.is_complete(cached));
        if !complete {
            return Ok(out);
        }

        // Evaluated or not, a complete resource starts over.
        let Some(cached) = self.cache.remove(&sample.resource_id) else {
            return Ok(out);
        };
        let derived = self.evaluate(&cached, &sample)?;
        debug!(
            target_name = %derived.name,
            resource_id = %derived.resource_id,
            volume = derived.volume,
            "arithmetic sample derived"
        );
        out.push(derived);
        Ok(out)
    }

    fn flush(&mut self) -> TransformResult<Vec<Sample>> {
        if self.cache.is_empty() {
            return Ok(Vec::new());
        }

        let mut resources: Vec<String> = self.cache.drain().map(|(resource, _)| resource).collect();
        resources.sort();
        Err(TransformError::Incomplete {
            target: self.config.target_name.clone(),
            resources,
        })
    }

    fn name(&self) -> &'static str {
        "arithmetic"
    }

    fn enabled(&self) -> bool {
        self.config.enabled
    }
}

/// Factory for the `arithmetic` type
#[derive(Debug, Clone, Copy, Default)]
pub struct ArithmeticFactory;

impl TransformerFactory for ArithmeticFactory {
    fn create(&self, config: &TransformerInstanceConfig) -> TransformResult<Box<dyn Transformer>> {
        let arithmetic = ArithmeticConfig::try_from(config).map_err(TransformError::config)?;
        Ok(Box::new(ArithmeticTransformer::new(arithmetic)?))
    }

    fn name(&self) -> &'static str {
        "arithmetic"
    }
}

//! Delta Transformer - Turn running totals into per-interval changes
//!
//! Cumulative samples become delta samples holding the change since the
//! previous sample for the same `(name, resource_id)`. Other types pass
//! through.
//!
//! - The first sample for a key only seeds state and is dropped.
//! - A sample older than the last accepted one is dropped.
//! - A decrease is a counter reset; the new value itself is the delta.
//! - Keys idle for `retention_secs` (default one hour) are forgotten.

use tally_config::TransformerInstanceConfig;
use tally_protocol::{Sample, SampleType};
use tracing::debug;

use crate::counter::{CounterState, Observation, retention_option};
use crate::registry::TransformerFactory;
use crate::{TransformError, TransformResult, Transformer};

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;

/// Delta transformer
#[derive(Debug)]
pub struct DeltaTransformer {
    enabled: bool,
    state: CounterState,
}

impl DeltaTransformer {
    pub fn new() -> Self {
        Self {
            enabled: true,
            state: CounterState::default(),
        }
    }

    /// Number of tracked `(name, resource_id)` keys
    pub fn tracked(&self) -> usize {
        self.state.len()
    }
}

impl Default for DeltaTransformer {
    fn default() -> Self {
        Self::new()
    }
}

impl Transformer for DeltaTransformer {
    fn transform(&mut self, sample: Sample) -> TransformResult<Vec<Sample>> {
        if sample.sample_type != SampleType::Cumulative {
            return Ok(vec![sample]);
        }

        match self.state.observe(&sample) {
            Observation::First => Ok(Vec::new()),
            Observation::OutOfOrder => {
                debug!(
                    meter = %sample.name,
                    resource_id = %sample.resource_id,
                    "dropping out-of-order cumulative sample"
                );
                Ok(Vec::new())
            }
            Observation::Step { previous, reset, .. } => {
                let delta = if reset {
                    sample.volume
                } else {
                    sample.volume - previous
                };
                Ok(vec![sample.derive(
                    sample.name.clone(),
                    SampleType::Delta,
                    sample.unit.clone(),
                    delta,
                )])
            }
        }
    }

    fn name(&self) -> &'static str {
        "delta"
    }

    fn enabled(&self) -> bool {
        self.enabled
    }
}

/// Factory for the `delta` type
#[derive(Debug, Clone, Copy, Default)]
pub struct DeltaFactory;

impl TransformerFactory for DeltaFactory {
    fn create(&self, config: &TransformerInstanceConfig) -> TransformResult<Box<dyn Transformer>> {
        let retention = retention_option(config).map_err(TransformError::config)?;
        let mut delta = DeltaTransformer::new();
        delta.enabled = config.enabled;
        delta.state = delta.state.with_retention(retention);
        Ok(Box::new(delta))
    }

    fn name(&self) -> &'static str {
        "delta"
    }
}

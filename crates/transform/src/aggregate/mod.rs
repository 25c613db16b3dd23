//! Aggregator Transformer - Accumulate samples and emit summaries
//!
//! Samples are folded into groups keyed by meter name, resource, unit and
//! type (plus any `group_by` fields). A group is emitted as one sample when
//! it reaches `size`, when it outlives `retention`, or when the pipeline
//! flushes.
//!
//! # Example
//!
//! ```toml
//! [[pipelines.api.transformers]]
//! type = "aggregator"
//! function = "sum"
//! size = 100
//! retention_secs = 60
//! group_by = ["project_id"]
//! ```

mod config;
mod state;

pub use config::{AggregateFunction, AggregatorConfig, GroupField};
pub use state::{AggregateGroup, AggregateState, compute_group_key};

use std::sync::atomic::{AtomicU64, Ordering};

use tally_config::TransformerInstanceConfig;
use tally_protocol::{Sample, SampleType};

use crate::registry::TransformerFactory;
use crate::{TransformError, TransformResult, Transformer};

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;

/// Metrics for the aggregator transformer
#[derive(Debug, Default)]
pub struct AggregatorMetrics {
    pub samples_received: AtomicU64,
    pub groups_created: AtomicU64,
    pub groups_emitted: AtomicU64,
}

/// Aggregator transformer
pub struct AggregatorTransformer {
    config: AggregatorConfig,
    state: AggregateState,
    metrics: AggregatorMetrics,
}

impl AggregatorTransformer {
    pub fn new(config: AggregatorConfig) -> TransformResult<Self> {
        config.validate().map_err(TransformError::config)?;
        Ok(Self {
            config,
            state: AggregateState::new(),
            metrics: AggregatorMetrics::default(),
        })
    }

    pub fn metrics(&self) -> &AggregatorMetrics {
        &self.metrics
    }

    pub fn group_count(&self) -> usize {
        self.state.group_count()
    }

    fn emit(&self, group: &AggregateGroup) -> Sample {
        let (sample_type, unit) = match self.config.function {
            AggregateFunction::Count => (SampleType::Gauge, "sample".to_string()),
            _ => (group.first.sample_type, group.first.unit.clone()),
        };
        let mut sample = group.first.derive(
            group.first.name.clone(),
            sample_type,
            unit,
            group.value(self.config.function),
        );
        sample.timestamp = group.last_timestamp;
        sample
    }

    fn emit_all(&self, groups: Vec<AggregateGroup>) -> Vec<Sample> {
        self.metrics
            .groups_emitted
            .fetch_add(groups.len() as u64, Ordering::Relaxed);
        groups.iter().map(|g| self.emit(g)).collect()
    }
}

impl Transformer for AggregatorTransformer {
    fn transform(&mut self, sample: Sample) -> TransformResult<Vec<Sample>> {
        self.metrics.samples_received.fetch_add(1, Ordering::Relaxed);

        let expired = self.state.take_expired(self.config.retention);
        let mut out = self.emit_all(expired);

        let key_hash = compute_group_key(&sample, &self.config.group_by);
        let (group, is_new) = self.state.add(key_hash, &sample);
        let full = group.should_emit_size(self.config.size);
        if is_new {
            self.metrics.groups_created.fetch_add(1, Ordering::Relaxed);
        }

        if full && let Some(group) = self.state.remove(key_hash) {
            out.extend(self.emit_all(vec![group]));
        }
        Ok(out)
    }

    fn flush(&mut self) -> TransformResult<Vec<Sample>> {
        let groups = self.state.drain();
        Ok(self.emit_all(groups))
    }

    fn name(&self) -> &'static str {
        "aggregator"
    }

    fn enabled(&self) -> bool {
        self.config.enabled
    }
}

impl std::fmt::Debug for AggregatorTransformer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AggregatorTransformer")
            .field("config", &self.config)
            .field("metrics", &self.metrics)
            .finish()
    }
}

/// Factory for the `aggregator` type
#[derive(Debug, Clone, Copy, Default)]
pub struct AggregatorFactory;

impl TransformerFactory for AggregatorFactory {
    fn create(&self, config: &TransformerInstanceConfig) -> TransformResult<Box<dyn Transformer>> {
        let aggregator = AggregatorConfig::try_from(config).map_err(TransformError::config)?;
        Ok(Box::new(AggregatorTransformer::new(aggregator)?))
    }

    fn name(&self) -> &'static str {
        "aggregator"
    }
}

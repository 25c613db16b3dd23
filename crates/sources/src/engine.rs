//! Engine pollster
//!
//! Reports the pipeline manager's own counters as samples, one set per
//! discovered resource (the local node when nothing is discovered). Running
//! totals are `cumulative`; the active generation is a `gauge`.

use std::sync::Arc;

use async_trait::async_trait;
use tally_config::PollsterConfig;
use tally_metrics::PipelineMetricsProvider;
use tally_protocol::{Sample, SampleType, Utc};

use crate::discovery::local_node_name;
use crate::pollster::{Pollster, PollsterFactory};
use crate::{CollectionError, Result, SourceError};

/// Default prefix for engine meter names
pub const DEFAULT_METER_PREFIX: &str = "tally";

pub struct EnginePollster {
    name: String,
    prefix: String,
    provider: Arc<dyn PipelineMetricsProvider>,
}

impl EnginePollster {
    pub fn new(
        name: impl Into<String>,
        prefix: impl Into<String>,
        provider: Arc<dyn PipelineMetricsProvider>,
    ) -> Self {
        Self {
            name: name.into(),
            prefix: prefix.into(),
            provider,
        }
    }

    fn samples_for(&self, resource: &str) -> Vec<Sample> {
        let snapshot = self.provider.pipeline_snapshot();
        let now = Utc::now();
        let counters = [
            ("dispatched", snapshot.dispatched),
            ("matched", snapshot.matched),
            ("unmatched", snapshot.unmatched),
            ("chain_errors", snapshot.chain_errors),
            ("publish_errors", snapshot.publish_errors),
            ("sequence_drops", snapshot.sequence_drops),
            ("flush_errors", snapshot.flush_errors),
            ("reloads", snapshot.reloads),
        ];

        let mut samples: Vec<Sample> = counters
            .into_iter()
            .map(|(meter, value)| {
                Sample::new(
                    format!("{}.{meter}", self.prefix),
                    SampleType::Cumulative,
                    "item",
                    value as f64,
                    resource,
                    now,
                )
                .with_source(self.name.clone())
            })
            .collect();
        samples.push(
            Sample::new(
                format!("{}.generation", self.prefix),
                SampleType::Gauge,
                "generation",
                snapshot.generation as f64,
                resource,
                now,
            )
            .with_source(self.name.clone()),
        );
        samples
    }
}

#[async_trait]
impl Pollster for EnginePollster {
    async fn poll(&self, resources: &[String]) -> std::result::Result<Vec<Sample>, CollectionError> {
        if resources.is_empty() {
            return Ok(self.samples_for(&local_node_name()));
        }
        Ok(resources.iter().flat_map(|r| self.samples_for(r)).collect())
    }
}

/// Creates `engine` pollsters over one metrics provider
pub struct EngineFactory {
    provider: Arc<dyn PipelineMetricsProvider>,
}

impl EngineFactory {
    pub fn new(provider: Arc<dyn PipelineMetricsProvider>) -> Self {
        Self { provider }
    }
}

impl PollsterFactory for EngineFactory {
    fn create(&self, config: &PollsterConfig) -> Result<Arc<dyn Pollster>> {
        let prefix = match config.options.get("meter_prefix") {
            None => DEFAULT_METER_PREFIX,
            Some(value) => value
                .as_str()
                .filter(|s| !s.is_empty())
                .ok_or_else(|| SourceError::config("engine 'meter_prefix' must be a non-empty string"))?,
        };
        Ok(Arc::new(EnginePollster::new(
            config.name.clone(),
            prefix,
            Arc::clone(&self.provider),
        )))
    }

    fn pollster_type(&self) -> &'static str {
        "engine"
    }
}

#[cfg(test)]
mod tests {
    use tally_metrics::PipelineSnapshot;

    use super::*;
    use crate::pollster::default_pollsters;

    struct Fixed(PipelineSnapshot);

    impl PipelineMetricsProvider for Fixed {
        fn pipeline_snapshot(&self) -> PipelineSnapshot {
            self.0
        }
    }

    fn provider() -> Fixed {
        Fixed(PipelineSnapshot {
            dispatched: 12,
            matched: 10,
            unmatched: 2,
            generation: 3,
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn test_reports_counters_per_resource() {
        let registry = default_pollsters(provider());
        let pollster = registry.create(&PollsterConfig::new("self", "engine")).unwrap();

        let samples = pollster
            .poll(&["node-1".to_string(), "node-2".to_string()])
            .await
            .unwrap();
        assert_eq!(samples.len(), 18);

        let dispatched = samples
            .iter()
            .find(|s| s.name == "tally.dispatched" && s.resource_id == "node-2")
            .unwrap();
        assert_eq!(dispatched.volume, 12.0);
        assert_eq!(dispatched.sample_type, SampleType::Cumulative);
        assert_eq!(dispatched.source, "self");

        let generation = samples.iter().find(|s| s.name == "tally.generation").unwrap();
        assert_eq!(generation.sample_type, SampleType::Gauge);
        assert_eq!(generation.volume, 3.0);
    }

    #[tokio::test]
    async fn test_falls_back_to_local_node() {
        let pollster = EnginePollster::new("self", "engine", Arc::new(provider()));
        let samples = pollster.poll(&[]).await.unwrap();
        assert_eq!(samples.len(), 9);
        assert_eq!(samples[0].resource_id, local_node_name());
        assert_eq!(samples[0].name, "engine.dispatched");
    }

    #[test]
    fn test_invalid_prefix_rejected() {
        let registry = default_pollsters(provider());
        let mut config = PollsterConfig::new("self", "engine");
        config
            .options
            .insert("meter_prefix".to_string(), toml::Value::Integer(1));
        assert!(matches!(registry.create(&config), Err(SourceError::Config(_))));
    }

    #[test]
    fn test_unknown_pollster_type() {
        let registry = default_pollsters(provider());
        let err = registry
            .create(&PollsterConfig::new("x", "libvirt"))
            .err()
            .unwrap();
        assert_eq!(err.to_string(), "unknown pollster type 'libvirt', available: [engine]");
    }
}

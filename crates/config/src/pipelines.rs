//! Pipeline definitions
//!
//! A declarative mapping of pipeline name to its source patterns, ordered
//! sink names and ordered transformer stages. Reload replaces the whole
//! mapping at once.
//!
//! # Example
//!
//! ```toml
//! [pipelines.cpu]
//! sources = ["cpu"]
//! sinks = ["store", "forward"]
//! on_sink_error = "continue"
//!
//! [[pipelines.cpu.transformers]]
//! type = "rate_of_change"
//! target_name = "cpu_util"
//!
//! [pipelines.instance_events]
//! kind = "event"
//! sources = ["compute.instance.*"]
//! sinks = ["store"]
//! ```

use serde::Deserialize;
use std::collections::BTreeMap;

use crate::TransformerInstanceConfig;

/// What a pipeline consumes
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PipelineKind {
    /// Samples, matched by meter name (default)
    #[default]
    Sample,
    /// Events, matched by event type
    Event,
}

/// What a pipeline does when one sink rejects a publish
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SinkErrorPolicy {
    /// Keep publishing to the remaining sinks (default)
    #[default]
    Continue,
    /// Skip the remaining sinks for this item
    Abort,
}

/// One pipeline definition
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub kind: PipelineKind,

    /// Meter-name (or event-type) patterns
    pub sources: Vec<String>,

    /// Ordered sink names
    pub sinks: Vec<String>,

    pub on_sink_error: SinkErrorPolicy,

    /// Ordered transformer stages
    pub transformers: Vec<TransformerInstanceConfig>,
}

impl PipelineConfig {
    /// Create a sample pipeline with no transformers
    pub fn new<S: Into<String>>(
        sources: impl IntoIterator<Item = S>,
        sinks: impl IntoIterator<Item = S>,
    ) -> Self {
        Self {
            sources: sources.into_iter().map(Into::into).collect(),
            sinks: sinks.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_kind(mut self, kind: PipelineKind) -> Self {
        self.kind = kind;
        self
    }

    #[must_use]
    pub fn with_transformer(mut self, transformer: TransformerInstanceConfig) -> Self {
        self.transformers.push(transformer);
        self
    }

    #[must_use]
    pub fn with_sink_error_policy(mut self, policy: SinkErrorPolicy) -> Self {
        self.on_sink_error = policy;
        self
    }
}

/// All pipelines, keyed by name
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PipelinesConfig {
    #[serde(flatten)]
    pipelines: BTreeMap<String, PipelineConfig>,
}

impl PipelinesConfig {
    pub fn get(&self, name: &str) -> Option<&PipelineConfig> {
        self.pipelines.get(name)
    }

    /// Iterate in name order
    pub fn iter(&self) -> impl Iterator<Item = (&String, &PipelineConfig)> {
        self.pipelines.iter()
    }

    pub fn len(&self) -> usize {
        self.pipelines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pipelines.is_empty()
    }

    /// Add or replace a pipeline
    pub fn insert(&mut self, name: impl Into<String>, pipeline: PipelineConfig) {
        self.pipelines.insert(name.into(), pipeline);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_pipelines() {
        let toml = r#"
[cpu]
sources = ["cpu", "cpu_util"]
sinks = ["store"]

[[cpu.transformers]]
type = "rate_of_change"
target_name = "cpu_util"

[events]
kind = "event"
sources = ["*"]
sinks = ["store"]
on_sink_error = "abort"
"#;
        let config: PipelinesConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.len(), 2);

        let cpu = config.get("cpu").unwrap();
        assert_eq!(cpu.kind, PipelineKind::Sample);
        assert_eq!(cpu.on_sink_error, SinkErrorPolicy::Continue);
        assert_eq!(cpu.transformers.len(), 1);
        assert_eq!(cpu.transformers[0].transformer_type, "rate_of_change");

        let events = config.get("events").unwrap();
        assert_eq!(events.kind, PipelineKind::Event);
        assert_eq!(events.on_sink_error, SinkErrorPolicy::Abort);
    }

    #[test]
    fn test_unknown_sink_error_policy_rejected() {
        let toml = r#"
[cpu]
sources = ["cpu"]
sinks = ["store"]
on_sink_error = "retry"
"#;
        assert!(toml::from_str::<PipelinesConfig>(toml).is_err());
    }

    #[test]
    fn test_builder() {
        let pipeline = PipelineConfig::new(["cpu"], ["store"])
            .with_transformer(TransformerInstanceConfig::new("noop"))
            .with_sink_error_policy(SinkErrorPolicy::Abort);
        assert_eq!(pipeline.sources, vec!["cpu"]);
        assert_eq!(pipeline.sinks, vec!["store"]);
        assert_eq!(pipeline.transformers.len(), 1);
        assert_eq!(pipeline.on_sink_error, SinkErrorPolicy::Abort);
    }
}

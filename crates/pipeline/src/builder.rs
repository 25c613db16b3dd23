//! Pipeline construction from definitions
//!
//! Everything that can be wrong with a definition is caught here, before a
//! generation goes live: bad patterns, unknown sinks, unknown transformer
//! types, invalid transformer options.

use std::sync::Arc;

use tally_config::{PipelineConfig, PipelineKind};
use tally_routing::MeterFilter;
use tally_transform::{Chain, TransformerRegistry};

use crate::metrics::PipelineMetrics;
use crate::{Pipeline, PipelineError, Result, SinkSet};

/// Build one pipeline with fresh transformer state
pub fn build_pipeline(
    name: &str,
    config: &PipelineConfig,
    sinks: &SinkSet,
    transformers: &TransformerRegistry,
    metrics: Arc<PipelineMetrics>,
) -> Result<Pipeline> {
    let filter = MeterFilter::compile(&config.sources).map_err(|source| PipelineError::routing(name, source))?;
    let bound = sinks.resolve(name, &config.sinks)?;

    if config.kind == PipelineKind::Event && !config.transformers.is_empty() {
        return Err(PipelineError::build(
            name,
            "event pipelines cannot configure transformers",
        ));
    }

    let stages = transformers
        .create_all(&config.transformers)
        .map_err(|source| PipelineError::Transformer {
            pipeline: name.to_string(),
            source,
        })?;

    Ok(Pipeline::new(
        name,
        config.kind,
        filter,
        Chain::new(stages),
        bound,
        config.on_sink_error,
        metrics,
    ))
}

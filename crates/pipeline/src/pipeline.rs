//! Pipeline - filter, transform, fan out
//!
//! One pipeline binds a compiled source filter, its own transformer chain
//! and an ordered list of publisher sinks. Items are processed one at a time
//! per pipeline so the chain's aggregation state stays consistent; separate
//! pipelines run in parallel.

use std::sync::Arc;

use parking_lot::Mutex;
use tally_config::{PipelineKind, SinkErrorPolicy};
use tally_protocol::{Datum, Sample};
use tally_routing::MeterFilter;
use tally_sinks::util::RateLimitedLogger;
use tally_sinks::{Batch, PublisherSink};
use tally_transform::Chain;
use tracing::{debug, warn};

use crate::metrics::PipelineMetrics;
use crate::sequence::SequenceGuard;
use crate::{PipelineError, Result};

/// What happened to one item in one pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteOutcome {
    /// Filter or kind did not match
    Skipped,
    /// Older than the last accepted sample for its key
    OutOfSequence,
    /// A transformer stage aborted the item
    ChainFailed,
    /// Chain ran and its outputs were offered to the sinks
    Published {
        /// Chain outputs (0 when a stage buffered the item)
        outputs: usize,
        /// Sinks that refused the publish
        failed_sinks: usize,
    },
}

/// Result of flushing a pipeline's chain
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushReport {
    /// Samples released by the flush and offered to the sinks
    pub samples: usize,
    /// Stage errors the flush reported
    pub errors: usize,
    /// Sinks that refused the flushed batch
    pub failed_sinks: usize,
}

impl FlushReport {
    pub(crate) fn merge(&mut self, other: FlushReport) {
        self.samples += other.samples;
        self.errors += other.errors;
        self.failed_sinks += other.failed_sinks;
    }
}

struct PipelineState {
    chain: Chain,
    sequence: SequenceGuard,
}

/// A named binding of a source filter, a transformer chain and its sinks
pub struct Pipeline {
    name: String,
    kind: PipelineKind,
    filter: MeterFilter,
    sinks: Vec<Arc<PublisherSink>>,
    on_sink_error: SinkErrorPolicy,
    state: Mutex<PipelineState>,
    metrics: Arc<PipelineMetrics>,
    failure_log: RateLimitedLogger,
}

impl Pipeline {
    pub fn new(
        name: impl Into<String>,
        kind: PipelineKind,
        filter: MeterFilter,
        chain: Chain,
        sinks: Vec<Arc<PublisherSink>>,
        on_sink_error: SinkErrorPolicy,
        metrics: Arc<PipelineMetrics>,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            filter,
            sinks,
            on_sink_error,
            state: Mutex::new(PipelineState {
                chain,
                sequence: SequenceGuard::new(),
            }),
            metrics,
            failure_log: RateLimitedLogger::default_interval(),
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn kind(&self) -> PipelineKind {
        self.kind
    }

    pub fn sink_names(&self) -> Vec<&str> {
        self.sinks.iter().map(|s| s.name()).collect()
    }

    pub fn transformer_names(&self) -> Vec<&'static str> {
        self.state.lock().chain.names()
    }

    /// Whether this pipeline accepts the item
    pub fn matches(&self, datum: &Datum) -> bool {
        let kind_matches = matches!(
            (self.kind, datum),
            (PipelineKind::Sample, Datum::Sample(_)) | (PipelineKind::Event, Datum::Event(_))
        );
        kind_matches && self.filter.matches(datum.name())
    }

    /// Route one item through this pipeline
    ///
    /// Never fails: chain errors and sink refusals are logged and counted
    /// here and do not reach the caller.
    pub fn route(&self, datum: &Datum) -> RouteOutcome {
        if !self.matches(datum) {
            return RouteOutcome::Skipped;
        }

        let mut state = self.state.lock();
        let outputs = match datum {
            Datum::Event(event) => Batch::from(Datum::from(event.clone())),
            Datum::Sample(sample) => {
                if !state.sequence.admit(sample) {
                    self.metrics.record_sequence_drop();
                    debug!(
                        pipeline = %self.name,
                        meter = %sample.name,
                        resource = %sample.resource_id,
                        timestamp = %sample.timestamp,
                        "sample out of sequence, dropped"
                    );
                    return RouteOutcome::OutOfSequence;
                }
                match self.transform(&mut state.chain, sample.clone()) {
                    Ok(samples) => Batch::from(samples),
                    Err(e) => {
                        self.metrics.record_chain_error();
                        warn!(
                            meter = %sample.name,
                            resource = %sample.resource_id,
                            error = %e,
                            "transformer chain aborted sample"
                        );
                        return RouteOutcome::ChainFailed;
                    }
                }
            }
        };

        // publish under the lock so each sink sees this pipeline's items in order
        let outputs_len = outputs.len();
        let failed_sinks = self.publish(outputs);
        RouteOutcome::Published {
            outputs: outputs_len,
            failed_sinks,
        }
    }

    /// Flush the chain and publish what it releases
    pub fn flush(&self) -> FlushReport {
        let mut state = self.state.lock();
        let outcome = state.chain.flush_all();
        self.metrics.record_flush(outcome.errors.len() as u64);

        for error in &outcome.errors {
            warn!(pipeline = %self.name, error = %error, "transformer flush failed");
        }

        let samples = outcome.samples.len();
        let failed_sinks = self.publish(Batch::from(outcome.samples));
        FlushReport {
            samples,
            errors: outcome.errors.len(),
            failed_sinks,
        }
    }

    fn transform(&self, chain: &mut Chain, sample: Sample) -> Result<Vec<Sample>> {
        chain.process(sample).map_err(|source| PipelineError::Chain {
            pipeline: self.name.clone(),
            source,
        })
    }

    /// Offer a batch to every sink in order; returns the number that refused it
    fn publish(&self, batch: Batch) -> usize {
        if batch.is_empty() {
            return 0;
        }

        let mut failed = 0;
        for (position, sink) in self.sinks.iter().enumerate() {
            let Err(source) = sink.publish(batch.clone()) else {
                continue;
            };
            failed += 1;
            self.metrics.record_publish_error();
            let error = PipelineError::Publish {
                pipeline: self.name.clone(),
                sink: sink.name().to_string(),
                source,
            };
            if let Some(count) = self.failure_log.record() {
                warn!(count, error = %error, "sink refused publish");
            }

            if self.on_sink_error == SinkErrorPolicy::Abort {
                let skipped = self.sinks.len() - position - 1;
                if skipped > 0 {
                    debug!(pipeline = %self.name, skipped, "aborting remaining sinks for item");
                }
                break;
            }
        }
        failed
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("sources", &self.filter.patterns())
            .field("sinks", &self.sink_names())
            .field("on_sink_error", &self.on_sink_error)
            .finish()
    }
}

#[cfg(test)]
#[path = "pipeline_test.rs"]
mod tests;

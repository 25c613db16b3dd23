//! Pipeline Manager - dispatch and atomic reload
//!
//! The active pipelines form a *generation* held behind an `ArcSwap`.
//! `dispatch` pins the current generation for the duration of one item, so
//! a reload never changes the pipelines an item is already travelling
//! through.
//!
//! ```text
//! dispatch() ──load()──> [Generation N] ──route()──> pipelines ──publish()──> sinks
//!                              │
//! reload() ──swap(N+1)─────────┘ wait for in-flight items, then flush N
//! ```
//!
//! The old generation is retired once its in-flight items have finished
//! and its chains are flushed so buffered aggregation state is published
//! rather than lost.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use arc_swap::ArcSwap;
use parking_lot::{Mutex, RwLock};
use tally_config::{Config, PipelinesConfig};
use tally_protocol::Datum;
use tally_sinks::DispatcherRegistry;
use tally_transform::TransformerRegistry;
use tracing::{info, trace};

use crate::builder::build_pipeline;
use crate::metrics::{PipelineMetrics, PipelineMetricsHandle};
use crate::pipeline::{FlushReport, RouteOutcome};
use crate::{Pipeline, Result, SinkSet};

/// One immutable set of pipelines
pub struct Generation {
    number: u64,
    pipelines: Vec<Arc<Pipeline>>,
    in_flight: RwLock<()>,
    retired: AtomicBool,
}

impl Generation {
    fn new(number: u64, pipelines: Vec<Arc<Pipeline>>) -> Self {
        Self {
            number,
            pipelines,
            in_flight: RwLock::new(()),
            retired: AtomicBool::new(false),
        }
    }

    #[inline]
    pub fn number(&self) -> u64 {
        self.number
    }

    pub fn pipelines(&self) -> &[Arc<Pipeline>] {
        &self.pipelines
    }

    pub fn names(&self) -> Vec<&str> {
        self.pipelines.iter().map(|p| p.name()).collect()
    }

    pub fn get(&self, name: &str) -> Option<&Arc<Pipeline>> {
        self.pipelines.iter().find(|p| p.name() == name)
    }

    /// Flush every pipeline's chain
    pub fn flush(&self) -> FlushReport {
        let mut report = FlushReport::default();
        for pipeline in &self.pipelines {
            report.merge(pipeline.flush());
        }
        report
    }

    /// Block until in-flight items finish, then refuse new ones
    fn retire(&self) {
        let _drained = self.in_flight.write();
        self.retired.store(true, Ordering::Release);
    }

    #[inline]
    fn is_retired(&self) -> bool {
        self.retired.load(Ordering::Acquire)
    }
}

/// Outcome of dispatching one item
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Generation the item was routed through
    pub generation: u64,
    /// Pipelines whose filter accepted the item
    pub matched: usize,
    /// Pipelines that dropped the item (chain failure or out of sequence)
    pub dropped: usize,
    /// Sink publishes that were refused
    pub failed_sinks: usize,
}

/// Outcome of a reload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReloadReport {
    /// Generation now active
    pub generation: u64,
    /// Pipelines in the new generation
    pub pipelines: usize,
    /// What flushing the retired generation released
    pub flushed: FlushReport,
}

/// Owns the active pipeline generation and the sinks every generation shares
pub struct PipelineManager {
    sinks: SinkSet,
    transformers: TransformerRegistry,
    current: ArcSwap<Generation>,
    reload_lock: Mutex<()>,
    metrics: Arc<PipelineMetrics>,
}

impl PipelineManager {
    /// Create a manager with an empty generation 0
    pub fn new(sinks: SinkSet, transformers: TransformerRegistry) -> Self {
        Self {
            sinks,
            transformers,
            current: ArcSwap::from_pointee(Generation::new(0, Vec::new())),
            reload_lock: Mutex::new(()),
            metrics: Arc::new(PipelineMetrics::new()),
        }
    }

    /// Build sinks and the first generation from a full config
    ///
    /// # Errors
    ///
    /// Fails if any sink or pipeline cannot be built; nothing is started.
    pub fn from_config(
        config: &Config,
        dispatchers: &DispatcherRegistry,
        transformers: TransformerRegistry,
    ) -> Result<Self> {
        let sinks = SinkSet::from_config(&config.sinks, dispatchers)?;
        let manager = Self::new(sinks, transformers);
        let first = manager.build_generation(1, &config.pipelines)?;
        info!(pipelines = ?first.names(), sinks = ?manager.sinks.names(), "pipelines built");
        manager.current.store(Arc::new(first));
        manager.metrics.set_generation(1);
        Ok(manager)
    }

    fn build_generation(&self, number: u64, config: &PipelinesConfig) -> Result<Generation> {
        let pipelines = config
            .iter()
            .map(|(name, definition)| {
                build_pipeline(
                    name,
                    definition,
                    &self.sinks,
                    &self.transformers,
                    Arc::clone(&self.metrics),
                )
                .map(Arc::new)
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Generation::new(number, pipelines))
    }

    /// Route one item through every pipeline that accepts it
    ///
    /// Failures inside a pipeline are absorbed there; an item no pipeline
    /// accepts is counted and otherwise ignored.
    pub fn dispatch(&self, datum: Datum) -> DispatchReport {
        self.metrics.record_dispatched();
        loop {
            let generation = self.current.load_full();
            let _in_flight = generation.in_flight.read();
            if generation.is_retired() {
                // swapped out between load and read; take the new one
                continue;
            }
            return self.route(&generation, &datum);
        }
    }

    /// Dispatch a sequence of items, summing their reports
    pub fn dispatch_all(&self, items: impl IntoIterator<Item = Datum>) -> DispatchReport {
        let mut total = DispatchReport::default();
        for datum in items {
            let report = self.dispatch(datum);
            total.generation = report.generation;
            total.matched += report.matched;
            total.dropped += report.dropped;
            total.failed_sinks += report.failed_sinks;
        }
        total
    }

    fn route(&self, generation: &Generation, datum: &Datum) -> DispatchReport {
        let mut report = DispatchReport {
            generation: generation.number,
            ..DispatchReport::default()
        };
        for pipeline in &generation.pipelines {
            match pipeline.route(datum) {
                RouteOutcome::Skipped => continue,
                RouteOutcome::OutOfSequence | RouteOutcome::ChainFailed => report.dropped += 1,
                RouteOutcome::Published { failed_sinks, .. } => report.failed_sinks += failed_sinks,
            }
            report.matched += 1;
        }

        if report.matched == 0 {
            self.metrics.record_unmatched();
            trace!(name = %datum.name(), kind = %datum.kind(), "no pipeline matched");
        } else {
            self.metrics.record_matched(report.matched as u64);
        }
        report
    }

    /// Atomically replace the pipeline set
    ///
    /// The new generation is fully built before anything changes; a bad
    /// definition leaves the running generation in place. After the swap
    /// this waits for items still travelling through the old generation,
    /// then flushes it.
    pub fn reload(&self, config: &PipelinesConfig) -> Result<ReloadReport> {
        let _serial = self.reload_lock.lock();

        let number = self.current.load().number + 1;
        let next = Arc::new(self.build_generation(number, config)?);
        let pipelines = next.pipelines.len();

        let old = self.current.swap(next);
        old.retire();
        let flushed = old.flush();

        self.metrics.record_reload(number);
        info!(
            generation = number,
            retired = old.number,
            pipelines,
            flushed = flushed.samples,
            flush_errors = flushed.errors,
            "pipelines reloaded"
        );
        Ok(ReloadReport {
            generation: number,
            pipelines,
            flushed,
        })
    }

    /// Flush every pipeline of the current generation
    ///
    /// Called at the end of each polling cycle and at shutdown.
    pub fn flush_all(&self) -> FlushReport {
        let generation = self.current.load_full();
        let report = generation.flush();
        if report.samples > 0 || report.errors > 0 {
            info!(
                generation = generation.number,
                samples = report.samples,
                errors = report.errors,
                "pipelines flushed"
            );
        }
        report
    }

    /// Currently active generation
    pub fn generation(&self) -> Arc<Generation> {
        self.current.load_full()
    }

    pub fn sinks(&self) -> &SinkSet {
        &self.sinks
    }

    pub fn metrics(&self) -> &PipelineMetrics {
        &self.metrics
    }

    /// Handle for the metrics reporter; valid across reloads
    pub fn metrics_handle(&self) -> PipelineMetricsHandle {
        PipelineMetricsHandle {
            metrics: Arc::clone(&self.metrics),
        }
    }
}

impl std::fmt::Debug for PipelineManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let generation = self.current.load();
        f.debug_struct("PipelineManager")
            .field("generation", &generation.number)
            .field("pipelines", &generation.names())
            .field("sinks", &self.sinks)
            .finish()
    }
}

#[cfg(test)]
#[path = "manager_test.rs"]
mod tests;

//! Pipeline manager metrics
//!
//! Atomic counters shared by the manager and every pipeline it builds.
//! All operations use relaxed ordering; values are eventually consistent.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tally_metrics::{PipelineMetricsProvider, PipelineSnapshot};

/// Counters for the pipeline manager and its pipelines
#[derive(Debug, Default)]
pub struct PipelineMetrics {
    dispatched: AtomicU64,
    matched: AtomicU64,
    unmatched: AtomicU64,
    chain_errors: AtomicU64,
    publish_errors: AtomicU64,
    sequence_drops: AtomicU64,
    flushes: AtomicU64,
    flush_errors: AtomicU64,
    reloads: AtomicU64,
    generation: AtomicU64,
}

impl PipelineMetrics {
    #[inline]
    pub const fn new() -> Self {
        Self {
            dispatched: AtomicU64::new(0),
            matched: AtomicU64::new(0),
            unmatched: AtomicU64::new(0),
            chain_errors: AtomicU64::new(0),
            publish_errors: AtomicU64::new(0),
            sequence_drops: AtomicU64::new(0),
            flushes: AtomicU64::new(0),
            flush_errors: AtomicU64::new(0),
            reloads: AtomicU64::new(0),
            generation: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn record_dispatched(&self) {
        self.dispatched.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_matched(&self, pipelines: u64) {
        self.matched.fetch_add(pipelines, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_unmatched(&self) {
        self.unmatched.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_chain_error(&self) {
        self.chain_errors.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_publish_error(&self) {
        self.publish_errors.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_sequence_drop(&self) {
        self.sequence_drops.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one chain flush and the stage errors it reported
    #[inline]
    pub fn record_flush(&self, errors: u64) {
        self.flushes.fetch_add(1, Ordering::Relaxed);
        self.flush_errors.fetch_add(errors, Ordering::Relaxed);
    }

    /// Record a completed reload into `generation`
    #[inline]
    pub fn record_reload(&self, generation: u64) {
        self.reloads.fetch_add(1, Ordering::Relaxed);
        self.generation.store(generation, Ordering::Relaxed);
    }

    /// Set the generation number without counting a reload
    #[inline]
    pub fn set_generation(&self, generation: u64) {
        self.generation.store(generation, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> PipelineSnapshot {
        PipelineSnapshot {
            dispatched: self.dispatched.load(Ordering::Relaxed),
            matched: self.matched.load(Ordering::Relaxed),
            unmatched: self.unmatched.load(Ordering::Relaxed),
            chain_errors: self.chain_errors.load(Ordering::Relaxed),
            publish_errors: self.publish_errors.load(Ordering::Relaxed),
            sequence_drops: self.sequence_drops.load(Ordering::Relaxed),
            flushes: self.flushes.load(Ordering::Relaxed),
            flush_errors: self.flush_errors.load(Ordering::Relaxed),
            reloads: self.reloads.load(Ordering::Relaxed),
            generation: self.generation.load(Ordering::Relaxed),
        }
    }
}

/// Handle for reading pipeline counters from the metrics reporter
///
/// Stays valid across reloads.
#[derive(Clone)]
pub struct PipelineMetricsHandle {
    pub(crate) metrics: Arc<PipelineMetrics>,
}

impl PipelineMetricsProvider for PipelineMetricsHandle {
    fn pipeline_snapshot(&self) -> PipelineSnapshot {
        self.metrics.snapshot()
    }
}

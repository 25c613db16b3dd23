//! Tally - Metrics
//!
//! Internal counters and periodic reporting.
//!
//! # Overview
//!
//! - Atomic counters for ingest sources
//! - Provider traits the pipeline manager, sinks and sources implement
//! - A reporter that logs snapshots in human or JSON form
//!
//! # Metrics Handle Pattern
//!
//! Components keep their counters in an `Arc<Metrics>` and hand out a
//! `metrics_handle()` implementing the matching provider trait. The handle
//! stays valid after `run()` consumes the component.
//!
//! ```text
//! Component (owns Arc<Metrics>)
//!     │
//!     ├──► metrics_handle() → Handle (clones Arc, implements Provider trait)
//!     │
//!     └──► run() [consumes self, Arc keeps metrics alive]
//! ```
//!
//! # Example
//!
//! ```ignore
//! use tally_metrics::{MetricsReporter, SinkMetricsProvider};
//! use std::sync::Arc;
//!
//! let handle: Arc<dyn SinkMetricsProvider> = Arc::new(sink.metrics_handle());
//! tokio::spawn(sink.run(cancel.clone()));
//!
//! let reporter = MetricsReporter::builder().sink(handle).build();
//! tokio::spawn(reporter.run(cancel));
//! ```

mod collected;
pub mod format;
mod reporter;
mod traits;

pub use collected::{
    CollectedMetrics, CollectedSink, CollectedSource, MetricsRates, SinkRates, SourceRates,
};
pub use format::{HumanFormatter, JsonFormatter, MetricsFormatter};
pub use reporter::{MetricsReporter, MetricsReporterBuilder};
pub use traits::{
    PipelineMetricsProvider, PipelineSnapshot, SinkMetricsProvider, SinkMetricsSnapshot,
    SourceMetrics, SourceMetricsProvider, SourceMetricsSnapshot,
};

use std::sync::atomic::{AtomicU64, Ordering};

/// A simple atomic counter
#[derive(Debug, Default)]
pub struct Counter(AtomicU64);

impl Counter {
    #[inline]
    pub const fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    /// Increment the counter by `val` (relaxed ordering)
    #[inline]
    pub fn add(&self, val: u64) {
        self.0.fetch_add(val, Ordering::Relaxed);
    }

    #[inline]
    pub fn inc(&self) {
        self.add(1);
    }

    #[inline]
    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }

    /// Store an absolute value (for gauges such as queue depth)
    #[inline]
    pub fn set(&self, val: u64) {
        self.0.store(val, Ordering::Relaxed);
    }

    /// Reset the counter to 0 and return the previous value
    #[inline]
    pub fn take(&self) -> u64 {
        self.0.swap(0, Ordering::Relaxed)
    }
}

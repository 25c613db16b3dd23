//! Publisher sink counters

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tally_metrics::{SinkMetricsProvider, SinkMetricsSnapshot};

/// Counters for one publisher sink
#[derive(Debug, Default)]
pub struct SinkMetrics {
    pub published: AtomicU64,
    pub overflow_dropped: AtomicU64,
    pub overflow_rejected: AtomicU64,
    pub delivered: AtomicU64,
    pub items_delivered: AtomicU64,
    pub transient_failures: AtomicU64,
    pub exhausted: AtomicU64,
    pub rejected: AtomicU64,
    pub discarded: AtomicU64,
    pub queue_depth: AtomicU64,
}

impl SinkMetrics {
    pub const fn new() -> Self {
        Self {
            published: AtomicU64::new(0),
            overflow_dropped: AtomicU64::new(0),
            overflow_rejected: AtomicU64::new(0),
            delivered: AtomicU64::new(0),
            items_delivered: AtomicU64::new(0),
            transient_failures: AtomicU64::new(0),
            exhausted: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
            discarded: AtomicU64::new(0),
            queue_depth: AtomicU64::new(0),
        }
    }

    #[inline]
    pub(crate) fn record_published(&self, evicted: usize) {
        self.published.fetch_add(1, Ordering::Relaxed);
        self.overflow_dropped.fetch_add(evicted as u64, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_rejected_overflow(&self) {
        self.overflow_rejected.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_delivered(&self, items: usize) {
        self.delivered.fetch_add(1, Ordering::Relaxed);
        self.items_delivered.fetch_add(items as u64, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_transient(&self) {
        self.transient_failures.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_exhausted(&self) {
        self.exhausted.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_permanent(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_discarded(&self, count: usize) {
        self.discarded.fetch_add(count as u64, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn set_queue_depth(&self, depth: usize) {
        self.queue_depth.store(depth as u64, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> SinkMetricsSnapshot {
        SinkMetricsSnapshot {
            published: self.published.load(Ordering::Relaxed),
            overflow_dropped: self.overflow_dropped.load(Ordering::Relaxed),
            overflow_rejected: self.overflow_rejected.load(Ordering::Relaxed),
            delivered: self.delivered.load(Ordering::Relaxed),
            items_delivered: self.items_delivered.load(Ordering::Relaxed),
            transient_failures: self.transient_failures.load(Ordering::Relaxed),
            exhausted: self.exhausted.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            discarded: self.discarded.load(Ordering::Relaxed),
            queue_depth: self.queue_depth.load(Ordering::Relaxed),
        }
    }
}

/// Handle for reporting a sink's metrics
///
/// Holds an Arc to the counters, so it stays valid after the sink's
/// delivery loop has finished.
#[derive(Clone)]
pub struct SinkMetricsHandle {
    pub(crate) id: String,
    pub(crate) sink_type: &'static str,
    pub(crate) metrics: Arc<SinkMetrics>,
}

impl SinkMetricsProvider for SinkMetricsHandle {
    fn sink_id(&self) -> &str {
        &self.id
    }

    fn sink_type(&self) -> &str {
        self.sink_type
    }

    fn snapshot(&self) -> SinkMetricsSnapshot {
        self.metrics.snapshot()
    }
}

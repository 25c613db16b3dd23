//! Metrics provider traits
//!
//! Traits for components to expose their counters to the reporter. The
//! pipeline manager, sinks and sources implement these so the reporter can
//! collect snapshots without knowing the concrete types.
//!
//! # Design
//!
//! - Traits use `&self`; counters are atomics, so no locks are needed
//! - All providers are `Send + Sync` for collection from the reporter task

use std::sync::atomic::{AtomicU64, Ordering};

/// Point-in-time snapshot of pipeline manager counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct PipelineSnapshot {
    /// Items handed to `dispatch`
    pub dispatched: u64,
    /// Pipeline matches (one item can match several pipelines)
    pub matched: u64,
    /// Items no pipeline accepted
    pub unmatched: u64,
    /// Items aborted by a transformer error
    pub chain_errors: u64,
    /// Sink publishes that failed
    pub publish_errors: u64,
    /// Samples dropped for arriving out of sequence
    pub sequence_drops: u64,
    /// Chain flushes performed
    pub flushes: u64,
    /// Stage errors reported during flushes
    pub flush_errors: u64,
    /// Successful reloads
    pub reloads: u64,
    /// Current generation number
    pub generation: u64,
}

/// Trait for the pipeline manager to provide metrics
pub trait PipelineMetricsProvider: Send + Sync {
    fn pipeline_snapshot(&self) -> PipelineSnapshot;
}

/// Counters for an ingest source or the poll scheduler
///
/// All fields use atomics for lock-free updates.
#[derive(Debug, Default)]
pub struct SourceMetrics {
    /// Messages, datagrams or polls received
    pub received: AtomicU64,
    /// Items handed on to the pipeline manager
    pub accepted: AtomicU64,
    /// Discarded as undecodable
    pub malformed: AtomicU64,
    /// Discarded for a missing or wrong signature
    pub unauthenticated: AtomicU64,
    /// Discarded as already seen
    pub duplicates: AtomicU64,
    /// Collection or I/O failures
    pub failures: AtomicU64,
}

impl SourceMetrics {
    /// Create new metrics with all counters at zero
    pub const fn new() -> Self {
        Self {
            received: AtomicU64::new(0),
            accepted: AtomicU64::new(0),
            malformed: AtomicU64::new(0),
            unauthenticated: AtomicU64::new(0),
            duplicates: AtomicU64::new(0),
            failures: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn record_received(&self) {
        self.received.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_accepted(&self, count: u64) {
        self.accepted.fetch_add(count, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_malformed(&self) {
        self.malformed.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_unauthenticated(&self) {
        self.unauthenticated.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_duplicate(&self) {
        self.duplicates.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_failure(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Take a snapshot of current values
    ///
    /// `disabled` is filled in by providers that track it.
    #[inline]
    pub fn snapshot(&self) -> SourceMetricsSnapshot {
        SourceMetricsSnapshot {
            received: self.received.load(Ordering::Relaxed),
            accepted: self.accepted.load(Ordering::Relaxed),
            malformed: self.malformed.load(Ordering::Relaxed),
            unauthenticated: self.unauthenticated.load(Ordering::Relaxed),
            duplicates: self.duplicates.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            disabled: 0,
        }
    }
}

/// Point-in-time snapshot of source metrics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct SourceMetricsSnapshot {
    pub received: u64,
    pub accepted: u64,
    pub malformed: u64,
    pub unauthenticated: u64,
    pub duplicates: u64,
    pub failures: u64,
    /// Pollsters currently disabled (scheduler only)
    pub disabled: u64,
}

/// Trait for sources to provide metrics to the reporter
pub trait SourceMetricsProvider: Send + Sync {
    /// Unique identifier for this source instance
    fn source_id(&self) -> &str;

    /// Source type (e.g., "udp", "notification", "scheduler")
    fn source_type(&self) -> &str;

    fn snapshot(&self) -> SourceMetricsSnapshot;
}

/// Point-in-time snapshot of publisher sink metrics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct SinkMetricsSnapshot {
    /// Batches accepted into the queue
    pub published: u64,
    /// Queued batches evicted by drop-oldest
    pub overflow_dropped: u64,
    /// Batches refused by drop-and-fail
    pub overflow_rejected: u64,
    /// Batches delivered
    pub delivered: u64,
    /// Items inside delivered batches
    pub items_delivered: u64,
    /// Transient write failures (each retried attempt)
    pub transient_failures: u64,
    /// Batches abandoned after the retry bound
    pub exhausted: u64,
    /// Batches the destination rejected permanently
    pub rejected: u64,
    /// Batches still queued when the shutdown grace ran out
    pub discarded: u64,
    /// Current queue length
    pub queue_depth: u64,
}

/// Trait for sinks to provide metrics to the reporter
pub trait SinkMetricsProvider: Send + Sync {
    /// Configured sink name
    fn sink_id(&self) -> &str;

    /// Dispatcher scheme (e.g., "udp", "file", "memory")
    fn sink_type(&self) -> &str;

    fn snapshot(&self) -> SinkMetricsSnapshot;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_metrics_snapshot() {
        let metrics = SourceMetrics::new();
        metrics.record_received();
        metrics.record_received();
        metrics.record_accepted(5);
        metrics.record_malformed();
        metrics.record_unauthenticated();
        metrics.record_duplicate();
        metrics.record_failure();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.received, 2);
        assert_eq!(snapshot.accepted, 5);
        assert_eq!(snapshot.malformed, 1);
        assert_eq!(snapshot.unauthenticated, 1);
        assert_eq!(snapshot.duplicates, 1);
        assert_eq!(snapshot.failures, 1);
        assert_eq!(snapshot.disabled, 0);
    }

    #[test]
    fn test_snapshots_default_to_zero() {
        assert_eq!(PipelineSnapshot::default().dispatched, 0);
        assert_eq!(SinkMetricsSnapshot::default().queue_depth, 0);
    }
}

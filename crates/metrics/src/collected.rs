//! Collected metrics snapshot and rate calculations

use std::time::Instant;

use crate::{PipelineSnapshot, SinkMetricsSnapshot, SourceMetricsSnapshot};

/// Collected source snapshot with metadata
#[derive(Debug, Clone)]
pub struct CollectedSource {
    pub id: String,
    pub source_type: String,
    pub snapshot: SourceMetricsSnapshot,
}

/// Collected sink snapshot with metadata
#[derive(Debug, Clone)]
pub struct CollectedSink {
    pub id: String,
    pub sink_type: String,
    pub snapshot: SinkMetricsSnapshot,
}

/// Complete metrics collection at a point in time
#[derive(Debug, Clone, Default)]
pub struct CollectedMetrics {
    /// When this collection was taken
    pub timestamp: Option<Instant>,
    pub pipeline: Option<PipelineSnapshot>,
    pub sources: Vec<CollectedSource>,
    pub sinks: Vec<CollectedSink>,
}

impl CollectedMetrics {
    /// Create a new empty collection
    pub fn new() -> Self {
        Self {
            timestamp: Some(Instant::now()),
            ..Default::default()
        }
    }

    /// Calculate rates by comparing with a previous collection
    ///
    /// Returns None if timestamps are missing or no time has passed.
    /// Components are matched by id; new ones get no rate yet.
    pub fn rates(&self, previous: &CollectedMetrics) -> Option<MetricsRates> {
        let elapsed = self.timestamp?.duration_since(previous.timestamp?);
        if elapsed.is_zero() {
            return None;
        }
        let secs = elapsed.as_secs_f64();

        let dispatched_per_sec = match (&self.pipeline, &previous.pipeline) {
            (Some(current), Some(prev)) => Some(rate(current.dispatched, prev.dispatched, secs)),
            _ => None,
        };

        let sources = self
            .sources
            .iter()
            .filter_map(|current| {
                let prev = previous.sources.iter().find(|p| p.id == current.id)?;
                Some(SourceRates {
                    id: current.id.clone(),
                    received_per_sec: rate(current.snapshot.received, prev.snapshot.received, secs),
                })
            })
            .collect();

        let sinks = self
            .sinks
            .iter()
            .filter_map(|current| {
                let prev = previous.sinks.iter().find(|p| p.id == current.id)?;
                Some(SinkRates {
                    id: current.id.clone(),
                    delivered_per_sec: rate(
                        current.snapshot.items_delivered,
                        prev.snapshot.items_delivered,
                        secs,
                    ),
                })
            })
            .collect();

        Some(MetricsRates {
            dispatched_per_sec,
            sources,
            sinks,
        })
    }
}

/// Per-second rates between two collections
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
pub struct MetricsRates {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dispatched_per_sec: Option<f64>,
    pub sources: Vec<SourceRates>,
    pub sinks: Vec<SinkRates>,
}

impl MetricsRates {
    pub fn source(&self, id: &str) -> Option<&SourceRates> {
        self.sources.iter().find(|s| s.id == id)
    }

    pub fn sink(&self, id: &str) -> Option<&SinkRates> {
        self.sinks.iter().find(|s| s.id == id)
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct SourceRates {
    pub id: String,
    pub received_per_sec: f64,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct SinkRates {
    pub id: String,
    pub delivered_per_sec: f64,
}

/// Counter delta per second; a counter that went backwards yields zero
#[inline]
fn rate(current: u64, previous: u64, secs: f64) -> f64 {
    current.saturating_sub(previous) as f64 / secs
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn collection(at: Instant, dispatched: u64, delivered: u64) -> CollectedMetrics {
        CollectedMetrics {
            timestamp: Some(at),
            pipeline: Some(PipelineSnapshot {
                dispatched,
                ..Default::default()
            }),
            sources: vec![],
            sinks: vec![CollectedSink {
                id: "warehouse".into(),
                sink_type: "file".into(),
                snapshot: SinkMetricsSnapshot {
                    items_delivered: delivered,
                    ..Default::default()
                },
            }],
        }
    }

    #[test]
    fn test_rates() {
        let start = Instant::now();
        let previous = collection(start, 100, 10);
        let current = collection(start + Duration::from_secs(10), 600, 110);

        let rates = current.rates(&previous).unwrap();
        assert_eq!(rates.dispatched_per_sec, Some(50.0));
        assert_eq!(rates.sink("warehouse").unwrap().delivered_per_sec, 10.0);
        assert!(rates.source("udp").is_none());
    }

    #[test]
    fn test_rates_need_elapsed_time() {
        let now = Instant::now();
        let a = collection(now, 1, 1);
        assert!(a.rates(&a).is_none());
        assert!(a.rates(&CollectedMetrics::default()).is_none());
    }

    #[test]
    fn test_counter_reset_rate_is_zero() {
        let start = Instant::now();
        let previous = collection(start, 100, 0);
        let current = collection(start + Duration::from_secs(1), 5, 0);
        assert_eq!(current.rates(&previous).unwrap().dispatched_per_sec, Some(0.0));
    }
}

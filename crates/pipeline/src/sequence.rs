//! Per-key timestamp ordering for sequenced meters
//!
//! Delta and cumulative samples must arrive with non-decreasing timestamps
//! per `(name, resource_id)`. A sample older than the last accepted one for
//! its key is refused; gauges are never checked.
//!
//! Keys idle for longer than the retention, measured against the newest
//! accepted timestamp, are swept periodically.

use std::collections::HashMap;
use std::time::Duration;

use tally_protocol::{DateTime, Sample, Utc};

/// Idle time after which a key is forgotten
pub const DEFAULT_SEQUENCE_RETENTION: Duration = Duration::from_secs(3600);

/// New keys between sweeps
const SWEEP_EVERY: usize = 1024;

/// Last accepted timestamp per sequence key
#[derive(Debug)]
pub struct SequenceGuard {
    last: HashMap<(String, String), DateTime<Utc>>,
    retention: Duration,
    newest: Option<DateTime<Utc>>,
    new_keys: usize,
}

impl Default for SequenceGuard {
    fn default() -> Self {
        Self {
            last: HashMap::new(),
            retention: DEFAULT_SEQUENCE_RETENTION,
            newest: None,
            new_keys: 0,
        }
    }
}

impl SequenceGuard {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_retention(mut self, retention: Duration) -> Self {
        self.retention = retention;
        self
    }

    /// Whether `sample` may proceed; records its timestamp when it may
    pub fn admit(&mut self, sample: &Sample) -> bool {
        if !sample.sample_type.is_sequenced() {
            return true;
        }
        let (name, resource) = sample.key();
        if let Some(last) = self.last.get_mut(&(name.to_string(), resource.to_string())) {
            if sample.timestamp < *last {
                return false;
            }
            *last = sample.timestamp;
            self.advance(sample.timestamp);
            return true;
        }
        self.last
            .insert((name.to_string(), resource.to_string()), sample.timestamp);
        self.advance(sample.timestamp);
        self.new_keys += 1;
        if self.new_keys >= SWEEP_EVERY {
            self.prune();
        }
        true
    }

    fn advance(&mut self, timestamp: DateTime<Utc>) {
        if self.newest.is_none_or(|newest| timestamp > newest) {
            self.newest = Some(timestamp);
        }
    }

    /// Forget keys idle for longer than the retention; returns how many
    pub fn prune(&mut self) -> usize {
        self.new_keys = 0;
        let Some(newest) = self.newest else {
            return 0;
        };
        let retention = self.retention;
        let before = self.last.len();
        self.last
            .retain(|_, at| (newest - *at).to_std().is_ok_and(|idle| idle <= retention));
        before - self.last.len()
    }

    /// Last accepted timestamp for a key
    pub fn last(&self, name: &str, resource_id: &str) -> Option<DateTime<Utc>> {
        self.last
            .get(&(name.to_string(), resource_id.to_string()))
            .copied()
    }

    pub fn len(&self) -> usize {
        self.last.len()
    }

    pub fn is_empty(&self) -> bool {
        self.last.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tally_protocol::SampleType;

    fn at(secs: i64, sample_type: SampleType, resource: &str) -> Sample {
        let ts = DateTime::<Utc>::from_timestamp(1_700_000_000 + secs, 0).unwrap();
        Sample::new("net.rx", sample_type, "B", 1.0, resource, ts)
    }

    #[test]
    fn test_increasing_timestamps_admitted() {
        let mut guard = SequenceGuard::new();
        assert!(guard.admit(&at(0, SampleType::Cumulative, "vm-1")));
        assert!(guard.admit(&at(10, SampleType::Cumulative, "vm-1")));
        assert!(guard.admit(&at(10, SampleType::Cumulative, "vm-1")));
        assert_eq!(
            guard.last("net.rx", "vm-1"),
            DateTime::<Utc>::from_timestamp(1_700_000_010, 0)
        );
    }

    #[test]
    fn test_earlier_timestamp_refused() {
        let mut guard = SequenceGuard::new();
        assert!(guard.admit(&at(10, SampleType::Delta, "vm-1")));
        assert!(!guard.admit(&at(5, SampleType::Delta, "vm-1")));
        // refusal leaves the watermark alone
        assert!(guard.admit(&at(10, SampleType::Delta, "vm-1")));
    }

    #[test]
    fn test_keys_are_independent() {
        let mut guard = SequenceGuard::new();
        assert!(guard.admit(&at(10, SampleType::Cumulative, "vm-1")));
        assert!(guard.admit(&at(5, SampleType::Cumulative, "vm-2")));
        assert_eq!(guard.len(), 2);
    }

    #[test]
    fn test_gauges_unchecked() {
        let mut guard = SequenceGuard::new();
        assert!(guard.admit(&at(10, SampleType::Gauge, "vm-1")));
        assert!(guard.admit(&at(5, SampleType::Gauge, "vm-1")));
        assert!(guard.is_empty());
    }

    #[test]
    fn test_idle_keys_are_pruned() {
        let mut guard = SequenceGuard::new().with_retention(Duration::from_secs(60));
        assert!(guard.admit(&at(0, SampleType::Cumulative, "vm-gone")));
        assert!(guard.admit(&at(90, SampleType::Cumulative, "vm-1")));

        assert_eq!(guard.prune(), 1);
        assert_eq!(guard.last("net.rx", "vm-gone"), None);
        assert_eq!(guard.len(), 1);
    }

    #[test]
    fn test_new_keys_trigger_sweep() {
        let mut guard = SequenceGuard::new().with_retention(Duration::from_secs(60));
        guard.admit(&at(0, SampleType::Delta, "vm-old"));
        for i in 0..SWEEP_EVERY - 1 {
            guard.admit(&at(3600, SampleType::Delta, &format!("vm-{i}")));
        }
        assert_eq!(guard.len(), SWEEP_EVERY - 1);
        assert_eq!(guard.last("net.rx", "vm-old"), None);
    }
}

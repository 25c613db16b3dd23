//! Previous-value tracking for cumulative meters
//!
//! Keys that have not produced a sample for `retention` (measured against
//! the newest timestamp seen) are forgotten, so resources that disappear
//! do not accumulate state. A forgotten key starts over as `First`.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tally_config::TransformerInstanceConfig;
use tally_protocol::Sample;

/// How long an idle key is remembered unless `retention_secs` says otherwise
pub(crate) const DEFAULT_RETENTION: Duration = Duration::from_secs(3600);

/// New keys between sweeps for idle ones
const SWEEP_EVERY: usize = 1024;

/// What the previous value says about a new cumulative sample
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Observation {
    /// No predecessor for this key; the sample only seeds state
    First,
    /// Timestamp precedes the last accepted one; state is unchanged
    OutOfOrder,
    /// A usable predecessor
    Step {
        previous: f64,
        elapsed_secs: f64,
        /// Value went backwards: the counter restarted
        reset: bool,
    },
}

/// Last accepted `(volume, timestamp)` per `(name, resource_id)`
#[derive(Debug)]
pub(crate) struct CounterState {
    last: HashMap<(String, String), (f64, DateTime<Utc>)>,
    retention: Duration,
    newest: Option<DateTime<Utc>>,
    new_keys: usize,
}

impl Default for CounterState {
    fn default() -> Self {
        Self {
            last: HashMap::new(),
            retention: DEFAULT_RETENTION,
            newest: None,
            new_keys: 0,
        }
    }
}

impl CounterState {
    pub(crate) fn with_retention(mut self, retention: Duration) -> Self {
        self.retention = retention;
        self
    }

    pub(crate) fn observe(&mut self, sample: &Sample) -> Observation {
        let key = (sample.name.clone(), sample.resource_id.clone());
        let current = (sample.volume, sample.timestamp);

        let Some(&(previous, at)) = self.last.get(&key) else {
            self.last.insert(key, current);
            self.advance(sample.timestamp);
            self.new_keys += 1;
            if self.new_keys >= SWEEP_EVERY {
                self.prune();
            }
            return Observation::First;
        };
        if sample.timestamp < at {
            return Observation::OutOfOrder;
        }

        self.last.insert(key, current);
        self.advance(sample.timestamp);
        let elapsed_secs = (sample.timestamp - at).num_milliseconds() as f64 / 1000.0;
        Observation::Step {
            previous,
            elapsed_secs,
            reset: sample.volume < previous,
        }
    }

    fn advance(&mut self, timestamp: DateTime<Utc>) {
        if self.newest.is_none_or(|newest| timestamp > newest) {
            self.newest = Some(timestamp);
        }
    }

    /// Forget keys idle for longer than the retention; returns how many
    pub(crate) fn prune(&mut self) -> usize {
        self.new_keys = 0;
        let Some(newest) = self.newest else {
            return 0;
        };
        let retention = self.retention;
        let before = self.last.len();
        self.last
            .retain(|_, (_, at)| (newest - *at).to_std().is_ok_and(|idle| idle <= retention));
        before - self.last.len()
    }

    pub(crate) fn len(&self) -> usize {
        self.last.len()
    }
}

/// Parse the optional `retention_secs` stage option
pub(crate) fn retention_option(config: &TransformerInstanceConfig) -> Result<Duration, String> {
    match config.get_float("retention_secs") {
        None => Ok(DEFAULT_RETENTION),
        Some(secs) if secs.is_finite() && secs > 0.0 => Ok(Duration::from_secs_f64(secs)),
        Some(_) => Err("retention_secs must be greater than 0".to_string()),
    }
}

//! Bounded retry with exponential backoff
//!
//! Retrying is ordinary control data: a [`RetryState`] counts attempts and
//! answers each failure with either the delay before the next attempt or a
//! terminal [`RetryDecision::GiveUp`].

use std::time::Duration;

use tally_config::SinkConfig;

/// Retry bounds for one sink
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts per batch, the first one included
    pub max_attempts: u32,

    /// Delay after the first failed attempt
    pub backoff: Duration,

    /// Growth factor applied after each further failure
    pub multiplier: f64,

    /// Upper bound on any single delay
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::from_millis(500),
            multiplier: 2.0,
            max_backoff: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts,
            backoff,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier;
        self
    }

    #[must_use]
    pub fn with_max_backoff(mut self, max_backoff: Duration) -> Self {
        self.max_backoff = max_backoff;
        self
    }

    pub fn from_config(config: &SinkConfig) -> Self {
        Self {
            max_attempts: config.max_retries,
            backoff: config.retry_backoff,
            multiplier: config.retry_backoff_multiplier,
            max_backoff: config.retry_backoff_max,
        }
    }

    /// Begin counting attempts for one batch
    pub fn start(&self) -> RetryState {
        RetryState {
            policy: *self,
            attempts: 0,
        }
    }

    /// Delay after the `failures`-th consecutive failure (1-based)
    pub fn delay_for(&self, failures: u32) -> Duration {
        let exponent = failures.saturating_sub(1).min(64) as i32;
        let factor = self.multiplier.max(1.0).powi(exponent);
        let nanos = self.backoff.as_nanos() as f64 * factor;
        if !nanos.is_finite() || nanos >= self.max_backoff.as_nanos() as f64 {
            return self.max_backoff;
        }
        Duration::from_nanos(nanos.round() as u64)
    }
}

/// What to do after a failed attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Sleep this long, then try again
    Retry(Duration),
    /// Attempt bound reached; the batch has failed terminally
    GiveUp { attempts: u32 },
}

/// Attempt counter for one batch
#[derive(Debug, Clone)]
pub struct RetryState {
    policy: RetryPolicy,
    attempts: u32,
}

impl RetryState {
    /// Record a failed attempt and decide what happens next
    pub fn next(&mut self) -> RetryDecision {
        self.attempts += 1;
        if self.attempts >= self.policy.max_attempts {
            RetryDecision::GiveUp {
                attempts: self.attempts,
            }
        } else {
            RetryDecision::Retry(self.policy.delay_for(self.attempts))
        }
    }

    /// Failed attempts recorded so far
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn is_exhausted(&self) -> bool {
        self.attempts >= self.policy.max_attempts
    }
}

#[cfg(test)]
#[path = "retry_test.rs"]
mod tests;

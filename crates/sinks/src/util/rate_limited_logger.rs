//! Rate-limited logging for hot-path failures
//!
//! A sink that is down or backlogged fails on every publish. Logging each
//! one floods the log, so this logs at most once per interval and reports
//! how many occurrences were folded into that line.
//!
//! # Example
//!
//! ```ignore
//! use tally_sinks::util::RateLimitedLogger;
//! use std::time::Duration;
//!
//! let logger = RateLimitedLogger::new(Duration::from_secs(10));
//! for _ in 0..1000 {
//!     logger.warn("store", "queue full", &err);
//! }
//! ```

use std::fmt::Display;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// Default interval between log lines
pub const DEFAULT_LOG_INTERVAL: Duration = Duration::from_secs(10);

/// Logs at most once per interval
///
/// Thread-safe: counters are atomic, the last log time is behind a mutex.
#[derive(Debug)]
pub struct RateLimitedLogger {
    min_interval: Duration,
    last_log_time: Mutex<Option<Instant>>,
    /// Occurrences since the last emitted line
    pending: AtomicU64,
    total: AtomicU64,
}

impl RateLimitedLogger {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_log_time: Mutex::new(None),
            pending: AtomicU64::new(0),
            total: AtomicU64::new(0),
        }
    }

    pub fn default_interval() -> Self {
        Self::new(DEFAULT_LOG_INTERVAL)
    }

    /// Count one occurrence
    ///
    /// Returns `Some(n)` when the caller should log now, where `n` is the
    /// number of occurrences this line stands for (this one included).
    pub fn record(&self) -> Option<u64> {
        self.pending.fetch_add(1, Ordering::Relaxed);
        self.total.fetch_add(1, Ordering::Relaxed);

        let should_log = {
            let mut last_time = self.last_log_time.lock();
            let now = Instant::now();
            match *last_time {
                Some(last) if now.duration_since(last) < self.min_interval => false,
                _ => {
                    *last_time = Some(now);
                    true
                }
            }
        };

        should_log.then(|| self.pending.swap(0, Ordering::Relaxed))
    }

    /// Count one occurrence and emit a warning if the interval allows
    ///
    /// Returns true if a line was logged.
    pub fn warn(&self, sink: &str, message: &str, error: &dyn Display) -> bool {
        let Some(occurrences) = self.record() else {
            return false;
        };
        let total = self.total.load(Ordering::Relaxed);
        if occurrences > 1 {
            tracing::warn!(
                sink = %sink,
                error = %error,
                suppressed_count = occurrences - 1,
                total,
                "{message} (rate-limited)"
            );
        } else {
            tracing::warn!(sink = %sink, error = %error, total, "{message}");
        }
        true
    }

    /// Occurrences not yet reported in a log line
    pub fn pending_count(&self) -> u64 {
        self.pending.load(Ordering::Relaxed)
    }

    pub fn total_count(&self) -> u64 {
        self.total.load(Ordering::Relaxed)
    }
}

impl Default for RateLimitedLogger {
    fn default() -> Self {
        Self::default_interval()
    }
}

//! Sink configuration types
//!
//! Sinks are named publisher instances. The URL scheme selects the
//! dispatcher (`null://`, `stdout://`, `memory://`, `udp://host:port`,
//! `file:///path`); everything else configures the queue and retry
//! discipline wrapped around it.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{ConfigError, Result};

/// Dispatcher schemes understood by the sink registry
pub const KNOWN_SINK_SCHEMES: &[&str] = &["null", "stdout", "memory", "udp", "file"];

/// Container for all sink configurations
///
/// Sinks are stored as a map of name -> config, ordered by name.
///
/// # Example
///
/// ```toml
/// [sinks.debug]
/// url = "stdout://"
///
/// [sinks.forward]
/// url = "udp://10.0.0.5:4952"
/// queue_size = 4096
/// overflow_policy = "drop-and-fail"
/// max_retries = 5
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SinksConfig {
    #[serde(flatten)]
    sinks: BTreeMap<String, SinkConfig>,
}

impl SinksConfig {
    /// Get a sink by name
    pub fn get(&self, name: &str) -> Option<&SinkConfig> {
        self.sinks.get(name)
    }

    /// Check if a sink exists
    pub fn contains(&self, name: &str) -> bool {
        self.sinks.contains_key(name)
    }

    /// Iterate over all sinks in name order
    pub fn iter(&self) -> impl Iterator<Item = (&String, &SinkConfig)> {
        self.sinks.iter()
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    /// Add or replace a sink
    pub fn insert(&mut self, name: impl Into<String>, sink: SinkConfig) {
        self.sinks.insert(name.into(), sink);
    }
}

/// Queue overflow policy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OverflowPolicy {
    /// Evict the oldest queued batches to make room (default)
    #[default]
    DropOldest,
    /// Reject the incoming batch
    DropAndFail,
}

impl OverflowPolicy {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::DropOldest => "drop-oldest",
            Self::DropAndFail => "drop-and-fail",
        }
    }
}

impl fmt::Display for OverflowPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OverflowPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "drop-oldest" => Ok(Self::DropOldest),
            "drop-and-fail" => Ok(Self::DropAndFail),
            other => Err(format!(
                "unrecognized policy '{other}', expected 'drop-oldest' or 'drop-and-fail'"
            )),
        }
    }
}

/// Configuration for a single sink instance
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SinkConfig {
    /// Default: true
    pub enabled: bool,

    /// Dispatcher URL; the scheme picks the dispatcher
    /// Required
    pub url: String,

    /// Maximum number of queued batches
    /// Default: 1024
    pub queue_size: usize,

    /// What `publish` does when the queue is full
    /// Default: drop-oldest when absent
    pub overflow_policy: Option<String>,

    /// Policy to use when `overflow_policy` is unrecognized
    /// Default: none, which makes an unrecognized policy a load error
    pub policy_fallback: Option<String>,

    /// Total delivery attempts per batch
    /// Default: 3
    pub max_retries: u32,

    /// Delay before the second attempt
    /// Default: 500ms
    #[serde(with = "humantime_serde")]
    pub retry_backoff: Duration,

    /// Growth factor applied to the delay after each failed attempt
    /// Default: 2.0
    pub retry_backoff_multiplier: f64,

    /// Upper bound on the delay between attempts
    /// Default: 30s
    #[serde(with = "humantime_serde")]
    pub retry_backoff_max: Duration,

    /// Idle wake-up interval of the delivery loop
    /// Default: 1s
    #[serde(with = "humantime_serde")]
    pub delivery_interval: Duration,

    /// Upper bound on a single dispatcher write
    /// Default: 10s
    #[serde(with = "humantime_serde")]
    pub write_timeout: Duration,

    /// Meter patterns this sink handles (empty = all)
    pub meters: Vec<String>,

    /// Meter patterns this sink drops without logging
    pub ignore: Vec<String>,

    /// Drop samples whose project_id equals this value
    pub filter_project: Option<String>,

    /// Signing key for dispatchers that sign what they send
    pub secret: Option<String>,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            url: String::new(),
            queue_size: 1024,
            overflow_policy: None,
            policy_fallback: None,
            max_retries: 3,
            retry_backoff: Duration::from_millis(500),
            retry_backoff_multiplier: 2.0,
            retry_backoff_max: Duration::from_secs(30),
            delivery_interval: Duration::from_secs(1),
            write_timeout: Duration::from_secs(10),
            meters: Vec::new(),
            ignore: Vec::new(),
            filter_project: None,
            secret: None,
        }
    }
}

impl SinkConfig {
    /// Create a config for a URL with all other fields defaulted
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    /// URL scheme, e.g. `udp` for `udp://host:port`
    pub fn scheme(&self) -> Option<&str> {
        self.url.split_once("://").map(|(scheme, _)| scheme)
    }

    /// URL without its scheme
    pub fn target(&self) -> &str {
        self.url.split_once("://").map_or("", |(_, rest)| rest)
    }

    /// Resolve the configured overflow policy
    ///
    /// An absent policy means drop-oldest. An unrecognized one is an error
    /// unless `policy_fallback` names a valid policy; callers can check
    /// [`SinkConfig::uses_policy_fallback`] to report the substitution.
    pub fn resolve_overflow_policy(&self, name: &str) -> Result<OverflowPolicy> {
        let Some(raw) = self.overflow_policy.as_deref() else {
            return Ok(OverflowPolicy::default());
        };
        match (raw.parse::<OverflowPolicy>(), self.policy_fallback.as_deref()) {
            (Ok(policy), _) => Ok(policy),
            (Err(_), Some(fallback)) => fallback.parse().map_err(|message| {
                ConfigError::invalid_value("sink", name, "policy_fallback", message)
            }),
            (Err(message), None) => Err(ConfigError::invalid_value(
                "sink",
                name,
                "overflow_policy",
                message,
            )),
        }
    }

    /// Whether the configured policy is unrecognized and the fallback applies
    pub fn uses_policy_fallback(&self) -> bool {
        self.overflow_policy
            .as_deref()
            .is_some_and(|raw| raw.parse::<OverflowPolicy>().is_err())
            && self.policy_fallback.is_some()
    }
}

//! Poll scheduler configuration
//!
//! # Example
//!
//! ```toml
//! [polling]
//! failure_threshold = 5
//! default_interval = "60s"
//!
//! [[polling.pollsters]]
//! name = "engine"
//! type = "engine"
//! interval = "30s"
//! discovery = ["local"]
//!
//! [polling.discovery.local]
//! type = "local_node"
//! ```

use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

/// Poll scheduler settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    /// Consecutive failures before a pollster is disabled
    /// Default: 5
    pub failure_threshold: u32,

    /// Interval for pollsters that do not set their own
    /// Default: 60s
    #[serde(with = "humantime_serde")]
    pub default_interval: Duration,

    /// Configured pollsters
    pub pollsters: Vec<PollsterConfig>,

    /// Named discovery sources
    pub discovery: BTreeMap<String, DiscoveryConfig>,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            default_interval: Duration::from_secs(60),
            pollsters: Vec::new(),
            discovery: BTreeMap::new(),
        }
    }
}

impl PollingConfig {
    /// Effective interval for a pollster
    pub fn interval_for(&self, pollster: &PollsterConfig) -> Duration {
        pollster.interval.unwrap_or(self.default_interval)
    }
}

/// One pollster instance
#[derive(Debug, Clone, Deserialize)]
pub struct PollsterConfig {
    /// Unique pollster name
    pub name: String,

    /// Pollster type resolved through the pollster registry
    #[serde(rename = "type")]
    pub pollster_type: String,

    /// Tick interval; pollsters sharing an interval share a tick group
    #[serde(default, with = "humantime_serde")]
    pub interval: Option<Duration>,

    /// Whether the pollster starts enabled (default: true)
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Discovery sources that supply the resources to poll
    #[serde(default)]
    pub discovery: Vec<String>,

    /// Type-specific options
    #[serde(flatten)]
    pub options: HashMap<String, toml::Value>,
}

impl PollsterConfig {
    pub fn new(name: impl Into<String>, pollster_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            pollster_type: pollster_type.into(),
            interval: None,
            enabled: true,
            discovery: Vec::new(),
            options: HashMap::new(),
        }
    }
}

/// One discovery source
#[derive(Debug, Clone, Deserialize)]
pub struct DiscoveryConfig {
    /// Discovery type resolved through the discovery registry
    #[serde(rename = "type")]
    pub discovery_type: String,

    /// Type-specific options
    #[serde(flatten)]
    pub options: HashMap<String, toml::Value>,
}

impl DiscoveryConfig {
    /// Get an array option as Vec<String>
    pub fn get_string_array(&self, key: &str) -> Option<Vec<String>> {
        self.options.get(key).and_then(|v| {
            v.as_array().map(|arr| {
                arr.iter()
                    .filter_map(|v| v.as_str().map(|s| s.to_string()))
                    .collect()
            })
        })
    }
}

fn default_true() -> bool {
    true
}

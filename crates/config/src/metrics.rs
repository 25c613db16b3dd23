//! Metrics reporting configuration
//!
//! Counters are always kept; this section controls how often and in which
//! format the reporter logs them.

use serde::Deserialize;
use std::time::Duration;

/// Metrics output format
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MetricsFormat {
    /// Human-readable output (default)
    #[default]
    Human,
    /// JSON structured output
    Json,
}

/// Metrics configuration
///
/// # Example
///
/// ```toml
/// [metrics]
/// enabled = true
/// interval = "60s"
/// format = "json"
/// include_sinks = false
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Default: true
    pub enabled: bool,

    /// Reporting interval
    /// Default: 60s
    #[serde(with = "humantime_serde")]
    pub interval: Duration,

    /// Default: human
    pub format: MetricsFormat,

    /// Include pipeline manager counters
    pub include_pipelines: bool,

    /// Include poll scheduler and listener counters
    pub include_sources: bool,

    /// Include per-sink delivery counters
    pub include_sinks: bool,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval: Duration::from_secs(60),
            format: MetricsFormat::Human,
            include_pipelines: true,
            include_sources: true,
            include_sinks: true,
        }
    }
}

//! Global configuration settings
//!
//! Process-wide timing knobs for startup, cycle flushing and shutdown.

use serde::Deserialize;
use std::time::Duration;

/// Global configuration that applies to all components
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GlobalConfig {
    /// How long sinks may keep draining their queues at shutdown
    /// Default: 10s
    #[serde(with = "humantime_serde")]
    pub shutdown_grace: Duration,

    /// How long to wait for each task group to stop before moving on
    /// Default: 30s
    #[serde(with = "humantime_serde")]
    pub shutdown_timeout: Duration,

    /// Flush transformer chains at the end of every polling cycle
    /// Default: true
    pub flush_on_cycle: bool,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            shutdown_grace: Duration::from_secs(10),
            shutdown_timeout: Duration::from_secs(30),
            flush_on_cycle: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_empty() {
        let config: GlobalConfig = toml::from_str("").unwrap();
        assert_eq!(config.shutdown_grace, Duration::from_secs(10));
        assert_eq!(config.shutdown_timeout, Duration::from_secs(30));
        assert!(config.flush_on_cycle);
    }

    #[test]
    fn test_deserialize_partial() {
        let toml = r#"
shutdown_grace = "2s"
flush_on_cycle = false
"#;
        let config: GlobalConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.shutdown_grace, Duration::from_secs(2));
        assert!(!config.flush_on_cycle);
        assert_eq!(config.shutdown_timeout, Duration::from_secs(30));
    }
}

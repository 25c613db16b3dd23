//! Tally Configuration
//!
//! TOML-based configuration loading with sensible defaults.
//! Minimal config should just work - only specify what you need to change.
//!
//! # Parsing
//!
//! Use the `FromStr` trait to parse configuration:
//!
//! ```
//! use tally_config::Config;
//! use std::str::FromStr;
//!
//! let config = Config::from_str("[sinks.debug]\nurl = \"stdout://\"").unwrap();
//! assert!(config.sinks.contains("debug"));
//! ```
//!
//! # Example Config
//!
//! ```toml
//! [sinks.store]
//! url = "memory://"
//!
//! [pipelines.cpu]
//! sources = ["cpu*"]
//! sinks = ["store"]
//!
//! [[polling.pollsters]]
//! name = "engine"
//! type = "engine"
//! ```

mod error;
mod global;
mod listeners;
mod logging;
mod metrics;
mod pipelines;
mod polling;
mod sinks;
mod transformers;
mod validation;

use std::fs;
use std::path::Path;
use std::str::FromStr;

pub use error::{ConfigError, Result};
pub use global::GlobalConfig;
pub use listeners::{ListenersConfig, NotificationListenerConfig, UdpListenerConfig};
pub use logging::{LogConfig, LogFormat, LogLevel, LogOutput};
pub use metrics::{MetricsConfig, MetricsFormat};
pub use pipelines::{PipelineConfig, PipelineKind, PipelinesConfig, SinkErrorPolicy};
pub use polling::{DiscoveryConfig, PollingConfig, PollsterConfig};
pub use sinks::{KNOWN_SINK_SCHEMES, OverflowPolicy, SinkConfig, SinksConfig};
pub use transformers::{
    KNOWN_TRANSFORMER_TYPES, TransformerInstanceConfig, is_known_transformer_type,
};

use serde::Deserialize;

/// Main configuration structure
///
/// All sections are optional with sensible defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Shutdown and cycle settings
    pub global: GlobalConfig,

    pub log: LogConfig,

    pub metrics: MetricsConfig,

    /// Named publisher sinks
    pub sinks: SinksConfig,

    /// Named pipelines
    pub pipelines: PipelinesConfig,

    /// Poll scheduler and pollsters
    pub polling: PollingConfig,

    /// UDP and notification listeners
    pub listeners: ListenersConfig,
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read, is not valid TOML, or
    /// fails validation.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::IoError {
            path: path.display().to_string(),
            source: e,
        })?;

        Self::from_str(&contents)
    }

    /// Parse configuration from a TOML string
    ///
    /// Prefer using the `FromStr` trait implementation.
    fn parse(s: &str) -> Result<Self> {
        let config: Config = toml::from_str(s).map_err(ConfigError::ParseError)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    ///
    /// Checks for:
    /// - Sinks referenced by pipelines exist
    /// - Queue, retry and overflow settings are usable
    /// - Transformer types and sink schemes are known
    /// - Pollster names are unique and thresholds non-zero
    pub fn validate(&self) -> Result<()> {
        validation::validate_config(self)
    }

    /// Names of enabled sinks
    pub fn enabled_sinks(&self) -> Vec<&str> {
        self.sinks
            .iter()
            .filter(|(_, sink)| sink.enabled)
            .map(|(name, _)| name.as_str())
            .collect()
    }
}

impl FromStr for Config {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

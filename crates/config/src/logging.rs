//! `[log]` section: level, format, destination and per-crate directives

use serde::Deserialize;

/// Log level
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    /// Normal operation (default)
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Filter directive for this level
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable console output (default)
    #[default]
    Console,
    /// JSON structured logging
    Json,
}

/// Log output destination
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    /// Write to stdout (default)
    #[default]
    Stdout,
    Stderr,
}

/// Logging configuration
///
/// ```toml
/// [log]
/// level = "info"
/// format = "json"
/// output = "stderr"
/// directives = ["tally_sinks=debug", "tally_sources::udp=trace"]
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: LogLevel,
    pub format: LogFormat,
    pub output: LogOutput,

    /// Extra `target=level` filter directives applied on top of `level`
    pub directives: Vec<String>,
}

impl LogConfig {
    /// Full filter string: the base level followed by the directives
    pub fn filter(&self, level_override: Option<&str>) -> String {
        let mut filter = level_override.unwrap_or(self.level.as_str()).to_string();
        for directive in &self.directives {
            filter.push(',');
            filter.push_str(directive);
        }
        filter
    }
}

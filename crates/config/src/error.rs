//! Configuration error types

use std::io;
use thiserror::Error;

/// Result type for configuration operations
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Errors that can occur when loading or validating configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read configuration file
    #[error("failed to read config file '{path}': {source}")]
    IoError {
        /// Path to the file
        path: String,
        /// Underlying IO error
        #[source]
        source: io::Error,
    },

    /// Failed to parse TOML
    #[error("failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// A pipeline references a sink that is not configured
    #[error("pipeline '{pipeline}' references unknown sink '{sink}'")]
    UnknownSink {
        /// Pipeline holding the reference
        pipeline: String,
        /// Name of the missing sink
        sink: String,
    },

    /// Two components of the same kind share a name
    #[error("duplicate {component} name '{name}'")]
    DuplicateName {
        /// Component type (e.g., "pipeline", "pollster")
        component: &'static str,
        /// The repeated name
        name: String,
    },

    /// Validation error - required field missing
    #[error("{component} '{name}' is missing required field '{field}'")]
    MissingField {
        /// Component type (e.g., "sink", "pipeline")
        component: &'static str,
        /// Name of the component
        name: String,
        /// Missing field name
        field: &'static str,
    },

    /// Validation error - invalid value
    #[error("{component} '{name}' has invalid {field}: {message}")]
    InvalidValue {
        /// Component type
        component: &'static str,
        /// Name of the component
        name: String,
        /// Field name
        field: &'static str,
        /// Error message
        message: String,
    },
}

impl ConfigError {
    /// Create an UnknownSink error
    pub fn unknown_sink(pipeline: impl Into<String>, sink: impl Into<String>) -> Self {
        Self::UnknownSink {
            pipeline: pipeline.into(),
            sink: sink.into(),
        }
    }

    /// Create a DuplicateName error
    pub fn duplicate_name(component: &'static str, name: impl Into<String>) -> Self {
        Self::DuplicateName {
            component,
            name: name.into(),
        }
    }

    /// Create a MissingField error
    pub fn missing_field(
        component: &'static str,
        name: impl Into<String>,
        field: &'static str,
    ) -> Self {
        Self::MissingField {
            component,
            name: name.into(),
            field,
        }
    }

    /// Create an InvalidValue error
    pub fn invalid_value(
        component: &'static str,
        name: impl Into<String>,
        field: &'static str,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidValue {
            component,
            name: name.into(),
            field,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_sink_error() {
        let err = ConfigError::unknown_sink("cpu", "store");
        assert!(err.to_string().contains("store"));
        assert!(err.to_string().contains("unknown sink"));
        assert!(err.to_string().contains("cpu"));
    }

    #[test]
    fn test_duplicate_name_error() {
        let err = ConfigError::duplicate_name("pipeline", "meters");
        assert!(err.to_string().contains("duplicate pipeline"));
        assert!(err.to_string().contains("meters"));
    }

    #[test]
    fn test_missing_field_error() {
        let err = ConfigError::missing_field("sink", "store", "url");
        assert!(err.to_string().contains("sink"));
        assert!(err.to_string().contains("store"));
        assert!(err.to_string().contains("url"));
    }

    #[test]
    fn test_invalid_value_error() {
        let err = ConfigError::invalid_value(
            "sink",
            "store",
            "overflow_policy",
            "must be 'drop-oldest' or 'drop-and-fail'",
        );
        assert!(err.to_string().contains("store"));
        assert!(err.to_string().contains("overflow_policy"));
    }
}

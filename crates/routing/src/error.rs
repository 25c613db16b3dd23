//! Routing error types

use thiserror::Error;

/// Result type for routing operations
pub type Result<T> = std::result::Result<T, RoutingError>;

/// Errors that can occur while compiling filters and sink references
#[derive(Debug, Error)]
pub enum RoutingError {
    /// Sink name not found in the sink table
    #[error("pipeline '{pipeline}' references unknown sink '{name}'")]
    UnknownSink {
        /// Pipeline holding the reference
        pipeline: String,
        /// Name of the missing sink
        name: String,
    },

    /// Sink registered twice
    #[error("duplicate sink '{name}'")]
    DuplicateSink { name: String },

    /// Pipeline lists no sinks
    #[error("pipeline '{pipeline}' has no sinks")]
    EmptySinks { pipeline: String },

    /// Filter has no patterns
    #[error("filter has no patterns")]
    EmptyFilter,

    /// Pattern set is contradictory or a pattern is malformed
    #[error("invalid pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// More sinks than `SinkId` can address
    #[error("too many sinks (max {max})")]
    TooManySinks { max: usize },
}

impl RoutingError {
    /// Create an UnknownSink error
    #[inline]
    pub fn unknown_sink(pipeline: impl Into<String>, name: impl Into<String>) -> Self {
        Self::UnknownSink {
            pipeline: pipeline.into(),
            name: name.into(),
        }
    }

    /// Create an EmptySinks error
    #[inline]
    pub fn empty_sinks(pipeline: impl Into<String>) -> Self {
        Self::EmptySinks {
            pipeline: pipeline.into(),
        }
    }

    /// Create an InvalidPattern error
    #[inline]
    pub fn invalid_pattern(pattern: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPattern {
            pattern: pattern.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_sink_error() {
        let err = RoutingError::unknown_sink("cpu", "gnocchi");
        assert!(err.to_string().contains("gnocchi"));
        assert!(err.to_string().contains("unknown sink"));
        assert!(err.to_string().contains("cpu"));
    }

    #[test]
    fn test_empty_sinks_error() {
        let err = RoutingError::empty_sinks("meters");
        assert!(err.to_string().contains("meters"));
        assert!(err.to_string().contains("no sinks"));
    }

    #[test]
    fn test_invalid_pattern_error() {
        let err = RoutingError::invalid_pattern("!*", "bad");
        assert!(err.to_string().contains("!*"));
    }
}

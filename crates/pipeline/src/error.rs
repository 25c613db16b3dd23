//! Pipeline error types

use thiserror::Error;

use tally_routing::RoutingError;
use tally_sinks::SinkError;
use tally_transform::{StageError, TransformError};

/// Pipeline errors
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Transformer chain aborted an item
    #[error("pipeline '{pipeline}': {source}")]
    Chain {
        pipeline: String,
        #[source]
        source: StageError,
    },

    /// A sink refused a publish
    #[error("pipeline '{pipeline}': sink '{sink}': {source}")]
    Publish {
        pipeline: String,
        sink: String,
        #[source]
        source: SinkError,
    },

    /// Filter or sink references failed to compile
    #[error("pipeline '{pipeline}': {source}")]
    Routing {
        pipeline: String,
        #[source]
        source: RoutingError,
    },

    /// Transformer stage could not be built
    #[error("pipeline '{pipeline}': {source}")]
    Transformer {
        pipeline: String,
        #[source]
        source: TransformError,
    },

    /// Definition is inconsistent
    #[error("pipeline '{pipeline}': {message}")]
    Build { pipeline: String, message: String },

    /// Sink could not be built
    #[error(transparent)]
    Sink(#[from] SinkError),
}

impl PipelineError {
    pub fn build(pipeline: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Build {
            pipeline: pipeline.into(),
            message: message.into(),
        }
    }

    pub fn routing(pipeline: impl Into<String>, source: RoutingError) -> Self {
        Self::Routing {
            pipeline: pipeline.into(),
            source,
        }
    }
}

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PipelineError::build("cpu", "event pipelines take no transformers");
        assert_eq!(err.to_string(), "pipeline 'cpu': event pipelines take no transformers");

        let err = PipelineError::routing("cpu", RoutingError::unknown_sink("cpu", "archive"));
        assert!(err.to_string().contains("unknown sink 'archive'"));

        let err = PipelineError::Publish {
            pipeline: "cpu".into(),
            sink: "store".into(),
            source: SinkError::Closed { sink: "store".into() },
        };
        assert!(err.to_string().contains("sink 'store' is closed"));
    }
}

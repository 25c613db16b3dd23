//! Transform error types

use thiserror::Error;

use crate::EvaluationError;

#[cfg(test)]
#[path = "error_test.rs"]
mod tests;

/// Errors that can occur during transformation
#[derive(Debug, Error)]
pub enum TransformError {
    /// Expression could not be computed
    #[error("evaluation failed: {0}")]
    Evaluation(#[from] EvaluationError),

    /// Transformation logic failed
    #[error("transform failed: {0}")]
    TransformFailed(String),

    /// Flush found resources still waiting for referenced meters
    #[error("{target}: {} resource(s) incomplete at flush: [{}]", .resources.len(), .resources.join(", "))]
    Incomplete {
        target: String,
        resources: Vec<String>,
    },

    /// Invalid configuration
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl TransformError {
    /// Create a transform failed error
    pub fn failed(msg: impl Into<String>) -> Self {
        Self::TransformFailed(msg.into())
    }

    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Whether this error came from expression evaluation
    pub fn is_evaluation(&self) -> bool {
        matches!(self, Self::Evaluation(_))
    }
}

/// A stage failure with its position in the chain
#[derive(Debug, Error)]
#[error("stage {position} ({stage}): {error}")]
pub struct StageError {
    /// Transformer name
    pub stage: &'static str,
    /// Zero-based index among the chain's active stages
    pub position: usize,
    #[source]
    pub error: TransformError,
}

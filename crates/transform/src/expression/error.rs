//! Expression evaluation errors

use thiserror::Error;

/// Errors from parsing or evaluating an expression
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvaluationError {
    /// Expression text is malformed
    #[error("parse error at offset {position}: {message}")]
    Parse { position: usize, message: String },

    /// A referenced meter has no current value
    #[error("meter '{0}' has no value")]
    MissingMeter(String),

    /// Division or remainder with a zero divisor
    #[error("division by zero")]
    DivisionByZero,

    /// Result (or an input) is NaN
    #[error("result is not a number")]
    NotANumber,

    /// Result (or an input) is infinite
    #[error("result is infinite")]
    Infinite,

    /// Expression references no meters where at least one is required
    #[error("expression references no meters")]
    NoReferences,

    /// Function name not recognized
    #[error("unknown function '{0}'")]
    UnknownFunction(String),

    /// Function called with the wrong number of arguments
    #[error("function '{function}' expects {expected} argument(s), got {got}")]
    Arity {
        function: &'static str,
        expected: &'static str,
        got: usize,
    },
}

impl EvaluationError {
    /// Create a parse error
    pub fn parse(position: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            position,
            message: message.into(),
        }
    }

    /// Classify a non-finite value
    ///
    /// Returns `None` for finite values.
    pub fn non_finite(value: f64) -> Option<Self> {
        if value.is_nan() {
            Some(Self::NotANumber)
        } else if value.is_infinite() {
            Some(Self::Infinite)
        } else {
            None
        }
    }
}

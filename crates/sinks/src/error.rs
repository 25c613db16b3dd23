//! Sink error types
//!
//! Two layers: [`DeliveryError`] is what a dispatcher reports for one write,
//! [`SinkError`] is what callers of a publisher sink see.

use thiserror::Error;

/// Result type for sink operations
pub type Result<T> = std::result::Result<T, SinkError>;

/// Outcome of a failed dispatcher write
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeliveryError {
    /// Destination temporarily unavailable; the write may be retried
    #[error("transient delivery failure: {0}")]
    Transient(String),

    /// Destination refused the data; retrying cannot help
    #[error("permanent delivery failure: {0}")]
    Permanent(String),
}

impl DeliveryError {
    #[inline]
    pub fn transient(reason: impl Into<String>) -> Self {
        Self::Transient(reason.into())
    }

    #[inline]
    pub fn permanent(reason: impl Into<String>) -> Self {
        Self::Permanent(reason.into())
    }

    #[inline]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }

    /// Reason text without the classification prefix
    pub fn reason(&self) -> &str {
        match self {
            Self::Transient(r) | Self::Permanent(r) => r,
        }
    }
}

impl From<std::io::Error> for DeliveryError {
    fn from(err: std::io::Error) -> Self {
        Self::Transient(err.to_string())
    }
}

/// Errors surfaced by publisher sinks and the dispatcher registry
#[derive(Debug, Error)]
pub enum SinkError {
    /// Invalid sink configuration
    #[error("sink '{sink}': {message}")]
    Config { sink: String, message: String },

    /// URL scheme no dispatcher factory is registered for
    #[error("sink '{sink}': unknown dispatcher scheme '{scheme}', available: [{available}]")]
    UnknownScheme {
        sink: String,
        scheme: String,
        available: String,
    },

    /// Queue full under the drop-and-fail policy
    #[error("sink '{sink}': queue full, refused batch of {dropped} items")]
    QueueOverflow { sink: String, dropped: usize },

    /// Sink has been drained and accepts nothing further
    #[error("sink '{sink}' is closed")]
    Closed { sink: String },
}

impl SinkError {
    pub fn config(sink: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Config {
            sink: sink.into(),
            message: message.into(),
        }
    }

    /// Whether this error is a queue overflow
    pub fn is_overflow(&self) -> bool {
        matches!(self, Self::QueueOverflow { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delivery_error_classification() {
        let transient = DeliveryError::transient("connection refused");
        assert!(transient.is_transient());
        assert_eq!(transient.reason(), "connection refused");

        let permanent = DeliveryError::permanent("schema mismatch");
        assert!(!permanent.is_transient());
        assert_eq!(permanent.to_string(), "permanent delivery failure: schema mismatch");
    }

    #[test]
    fn test_io_error_is_transient() {
        let err: DeliveryError = std::io::Error::other("broken pipe").into();
        assert!(err.is_transient());
    }

    #[test]
    fn test_sink_error_display() {
        let err = SinkError::QueueOverflow {
            sink: "store".into(),
            dropped: 4,
        };
        assert!(err.is_overflow());
        assert_eq!(err.to_string(), "sink 'store': queue full, refused batch of 4 items");
    }
}

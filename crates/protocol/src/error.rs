//! Protocol error types
//!
//! Errors that can occur when decoding, validating, or storing records.

use thiserror::Error;

/// Errors that can occur during protocol operations
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Payload could not be decoded into the expected record
    #[error("decode error: {0}")]
    Decode(String),

    /// Payload is not a JSON object
    #[error("payload is not an object")]
    NotAnObject,

    /// Signed payload expected but no signature present
    #[error("missing message signature")]
    MissingSignature,

    /// Signature does not match the shared secret
    #[error("message signature mismatch")]
    SignatureMismatch,

    /// Datagram exceeds the maximum size
    #[error("payload size {size} exceeds maximum {max}")]
    TooLarge { size: usize, max: usize },

    /// Two records share one message id
    #[error("duplicate message id: {message_id}")]
    DuplicateMessageId { message_id: String },

    /// Missing required field
    #[error("missing required field: {0}")]
    MissingField(&'static str),
}

impl ProtocolError {
    /// Create a decode error
    #[inline]
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    /// Create a duplicate message id error
    #[inline]
    pub fn duplicate(message_id: impl Into<String>) -> Self {
        Self::DuplicateMessageId {
            message_id: message_id.into(),
        }
    }

    /// Whether this error means the payload failed authentication
    pub fn is_unauthenticated(&self) -> bool {
        matches!(self, Self::MissingSignature | Self::SignatureMismatch)
    }
}

impl From<serde_json::Error> for ProtocolError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

/// Per-trait decode failure
///
/// Non-fatal to the event: the trait is dropped and the error reported.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TraitError {
    #[error("trait '{name}': unrecognized type '{type_name}'")]
    UnknownType { name: String, type_name: String },

    #[error("trait '{name}': value does not match type {expected}")]
    InvalidValue { name: String, expected: &'static str },

    #[error("trait '{name}': duplicate name")]
    Duplicate { name: String },
}

impl TraitError {
    /// Name of the trait that failed
    pub fn trait_name(&self) -> &str {
        match self {
            Self::UnknownType { name, .. }
            | Self::InvalidValue { name, .. }
            | Self::Duplicate { name } => name,
        }
    }
}

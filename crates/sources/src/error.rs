//! Source error types

use std::io;

use tally_protocol::ProtocolError;
use thiserror::Error;

/// A pollster or discovery source failed to produce data
///
/// The scheduler treats every variant the same way: the failure counts
/// toward disabling the pollster and the next tick tries again.
#[derive(Debug, Error)]
pub enum CollectionError {
    #[error("collection failed: {0}")]
    Failed(String),

    #[error("resource '{resource}' unavailable: {message}")]
    Resource { resource: String, message: String },

    #[error("collection timed out after {0:?}")]
    Timeout(std::time::Duration),
}

impl CollectionError {
    #[inline]
    pub fn failed(msg: impl Into<String>) -> Self {
        Self::Failed(msg.into())
    }

    #[inline]
    pub fn resource(resource: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Resource {
            resource: resource.into(),
            message: message.into(),
        }
    }
}

/// Errors that stop a source from being built or started
#[derive(Debug, Error)]
pub enum SourceError {
    /// Failed to bind a listener socket
    #[error("failed to bind to {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: io::Error,
    },

    #[error("invalid address '{address}': {message}")]
    InvalidAddress { address: String, message: String },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("unknown pollster type '{name}', available: [{available}]")]
    UnknownPollster { name: String, available: String },

    #[error("unknown discovery type '{name}', available: [{available}]")]
    UnknownDiscovery { name: String, available: String },

    #[error("configuration error: {0}")]
    Config(String),
}

impl SourceError {
    #[inline]
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

/// An inbound message was rejected
///
/// Always per message: the listener discards it and carries on.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("malformed message: {0}")]
    Malformed(String),

    #[error("message exceeds {max} bytes")]
    TooLarge { max: usize },

    #[error("missing message signature")]
    MissingSignature,

    #[error("message signature mismatch")]
    SignatureMismatch,

    #[error("unknown notification type '{0}'")]
    UnknownType(String),

    #[error("duplicate message id '{0}'")]
    Duplicate(String),
}

impl ValidationError {
    #[inline]
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::Malformed(msg.into())
    }

    /// Whether the message failed authentication rather than decoding
    pub fn is_unauthenticated(&self) -> bool {
        matches!(self, Self::MissingSignature | Self::SignatureMismatch)
    }
}

impl From<ProtocolError> for ValidationError {
    fn from(err: ProtocolError) -> Self {
        match err {
            ProtocolError::MissingSignature => Self::MissingSignature,
            ProtocolError::SignatureMismatch => Self::SignatureMismatch,
            ProtocolError::TooLarge { max, .. } => Self::TooLarge { max },
            other => Self::Malformed(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for ValidationError {
    fn from(err: serde_json::Error) -> Self {
        Self::Malformed(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, SourceError>;

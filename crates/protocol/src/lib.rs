//! Tally Protocol - core data types for the telemetry pipeline
//!
//! This crate provides the records that flow through the engine:
//! - `Sample` - one timestamped measurement of a named meter for a resource
//! - `Event` - a discrete occurrence with typed traits, keyed by message id
//! - `Datum` - either of the above, as handed to the pipeline manager
//! - `signature` - HMAC-SHA256 message signing over sorted payload fields
//! - `wire` - the datagram ingestion format (one signed sample per datagram)
//!
//! # Design Principles
//!
//! - **Immutable records**: transformers derive new samples, never edit inputs
//! - **Tagged decoding**: inbound trait values are classified into a closed
//!   set of types; unknown types are reported per trait, not coerced

mod datum;
mod error;
mod event;
mod sample;
pub mod signature;
pub mod wire;

pub use datum::{Datum, DatumKind};
pub use error::{ProtocolError, TraitError};
pub use event::{Event, RawEvent, RawTrait, Trait, TraitType, TraitValue, check_unique_message_ids};
pub use sample::{Sample, SampleType};

// Re-export chrono types used in public signatures
pub use chrono::{DateTime, Utc};

/// Result type for protocol operations
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Largest payload a single UDP datagram can carry
pub const MAX_DATAGRAM_SIZE: usize = 65_507;

/// Field carrying the signature inside signed payloads
pub const SIGNATURE_FIELD: &str = "message_signature";

#[cfg(test)]
mod event_test;
#[cfg(test)]
mod sample_test;
#[cfg(test)]
mod signature_test;
#[cfg(test)]
mod wire_test;

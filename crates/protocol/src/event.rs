//! Event and trait types
//!
//! Inbound events are decoded leniently through [`RawEvent`]: each trait is
//! classified into one of the closed set of [`TraitType`]s and anything
//! unrecognized is reported as a [`TraitError`] for that trait alone.

use std::collections::HashSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{ProtocolError, Result, TraitError};

/// Recognized trait value types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TraitType {
    Text,
    Int,
    Float,
    Datetime,
}

impl TraitType {
    /// Parse a type name; `None` for anything outside the closed set
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "text" => Some(Self::Text),
            "int" => Some(Self::Int),
            "float" => Some(Self::Float),
            "datetime" => Some(Self::Datetime),
            _ => None,
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Int => "int",
            Self::Float => "float",
            Self::Datetime => "datetime",
        }
    }
}

impl fmt::Display for TraitType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A typed trait value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum TraitValue {
    Text(String),
    Int(i64),
    Float(f64),
    Datetime(DateTime<Utc>),
}

impl TraitValue {
    pub fn trait_type(&self) -> TraitType {
        match self {
            Self::Text(_) => TraitType::Text,
            Self::Int(_) => TraitType::Int,
            Self::Float(_) => TraitType::Float,
            Self::Datetime(_) => TraitType::Datetime,
        }
    }

    /// Decode a JSON value as the given type without coercion
    ///
    /// Integers are accepted for `float`; nothing else crosses types.
    fn decode(
        name: &str,
        ty: TraitType,
        value: &serde_json::Value,
    ) -> std::result::Result<Self, TraitError> {
        let invalid = || TraitError::InvalidValue {
            name: name.to_string(),
            expected: ty.as_str(),
        };
        match ty {
            TraitType::Text => value.as_str().map(|s| Self::Text(s.to_string())).ok_or_else(invalid),
            TraitType::Int => value.as_i64().map(Self::Int).ok_or_else(invalid),
            TraitType::Float => value
                .as_f64()
                .filter(|f| f.is_finite())
                .map(Self::Float)
                .ok_or_else(invalid),
            TraitType::Datetime => value
                .as_str()
                .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
                .map(|dt| Self::Datetime(dt.with_timezone(&Utc)))
                .ok_or_else(invalid),
        }
    }
}

/// A named, typed attribute of an event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trait {
    pub name: String,
    #[serde(flatten)]
    pub value: TraitValue,
}

impl Trait {
    pub fn new(name: impl Into<String>, value: TraitValue) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }

    /// Classify a raw trait into a typed one
    pub fn decode(raw: &RawTrait) -> std::result::Result<Self, TraitError> {
        let ty = TraitType::parse(&raw.type_name).ok_or_else(|| TraitError::UnknownType {
            name: raw.name.clone(),
            type_name: raw.type_name.clone(),
        })?;
        let value = TraitValue::decode(&raw.name, ty, &raw.value)?;
        Ok(Self::new(raw.name.clone(), value))
    }
}

/// Discrete occurrence record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub event_type: String,
    pub message_id: String,
    pub generated: DateTime<Utc>,
    /// Ordered by first appearance; names are unique
    #[serde(default)]
    pub traits: Vec<Trait>,
}

impl Event {
    pub fn new(
        event_type: impl Into<String>,
        message_id: impl Into<String>,
        generated: DateTime<Utc>,
    ) -> Self {
        Self {
            event_type: event_type.into(),
            message_id: message_id.into(),
            generated,
            traits: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_trait(mut self, name: impl Into<String>, value: TraitValue) -> Self {
        self.traits.push(Trait::new(name, value));
        self
    }

    /// Look up a trait by name
    pub fn get_trait(&self, name: &str) -> Option<&TraitValue> {
        self.traits.iter().find(|t| t.name == name).map(|t| &t.value)
    }

    /// Decode an inbound event
    ///
    /// Returns the event with every trait that decoded cleanly, plus one
    /// error per rejected trait. Fails only when required envelope fields
    /// are missing.
    pub fn decode(raw: RawEvent) -> Result<(Self, Vec<TraitError>)> {
        if raw.event_type.is_empty() {
            return Err(ProtocolError::MissingField("event_type"));
        }
        if raw.message_id.is_empty() {
            return Err(ProtocolError::MissingField("message_id"));
        }

        let mut seen = HashSet::with_capacity(raw.traits.len());
        let mut traits = Vec::with_capacity(raw.traits.len());
        let mut errors = Vec::new();

        for raw_trait in &raw.traits {
            if !seen.insert(raw_trait.name.as_str()) {
                errors.push(TraitError::Duplicate {
                    name: raw_trait.name.clone(),
                });
                continue;
            }
            match Trait::decode(raw_trait) {
                Ok(t) => traits.push(t),
                Err(e) => errors.push(e),
            }
        }

        let event = Self {
            event_type: raw.event_type,
            message_id: raw.message_id,
            generated: raw.generated.unwrap_or_else(Utc::now),
            traits,
        };
        Ok((event, errors))
    }
}

/// Undecoded trait as it arrives on the wire
#[derive(Debug, Clone, Deserialize)]
pub struct RawTrait {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default)]
    pub value: serde_json::Value,
}

/// Undecoded event envelope
#[derive(Debug, Clone, Deserialize)]
pub struct RawEvent {
    #[serde(default)]
    pub event_type: String,
    #[serde(default)]
    pub message_id: String,
    #[serde(default)]
    pub generated: Option<DateTime<Utc>>,
    #[serde(default)]
    pub traits: Vec<RawTrait>,
}

/// Verify that no two stored events share a message id
///
/// Reading events back from storage must yield at most one authoritative
/// record per id; a duplicate is a protocol violation, never merged.
pub fn check_unique_message_ids(events: &[Event]) -> Result<()> {
    let mut seen = HashSet::with_capacity(events.len());
    for event in events {
        if !seen.insert(event.message_id.as_str()) {
            return Err(ProtocolError::duplicate(&event.message_id));
        }
    }
    Ok(())
}

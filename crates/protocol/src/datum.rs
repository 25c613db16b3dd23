//! Datum: the unit handed to the pipeline manager

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Event, Sample};

/// Which kind of record a datum carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatumKind {
    Sample,
    Event,
}

impl DatumKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Sample => "sample",
            Self::Event => "event",
        }
    }
}

impl fmt::Display for DatumKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A sample or an event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "record", rename_all = "lowercase")]
pub enum Datum {
    Sample(Sample),
    Event(Event),
}

impl Datum {
    /// Name used for filter matching: meter name or event type
    pub fn name(&self) -> &str {
        match self {
            Self::Sample(s) => &s.name,
            Self::Event(e) => &e.event_type,
        }
    }

    pub fn kind(&self) -> DatumKind {
        match self {
            Self::Sample(_) => DatumKind::Sample,
            Self::Event(_) => DatumKind::Event,
        }
    }

    /// Resource the datum belongs to; events have none
    pub fn resource_id(&self) -> Option<&str> {
        match self {
            Self::Sample(s) => Some(&s.resource_id),
            Self::Event(_) => None,
        }
    }

    pub fn as_sample(&self) -> Option<&Sample> {
        match self {
            Self::Sample(s) => Some(s),
            Self::Event(_) => None,
        }
    }

    pub fn as_event(&self) -> Option<&Event> {
        match self {
            Self::Event(e) => Some(e),
            Self::Sample(_) => None,
        }
    }
}

impl From<Sample> for Datum {
    fn from(sample: Sample) -> Self {
        Self::Sample(sample)
    }
}

impl From<Event> for Datum {
    fn from(event: Event) -> Self {
        Self::Event(event)
    }
}

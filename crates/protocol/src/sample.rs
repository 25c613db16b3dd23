//! Sample type
//!
//! A `Sample` is one measurement of a named meter for one resource. Samples
//! are immutable once produced; transformers derive new ones through
//! [`Sample::derive`] instead of editing their inputs.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ProtocolError;

/// How a meter's values relate over time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SampleType {
    /// Point-in-time value
    Gauge,
    /// Change since the previous sample
    Delta,
    /// Monotonic running total
    Cumulative,
}

impl SampleType {
    /// Get string representation
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Gauge => "gauge",
            Self::Delta => "delta",
            Self::Cumulative => "cumulative",
        }
    }

    /// Whether samples of this type must arrive in timestamp order per key
    #[inline]
    pub const fn is_sequenced(&self) -> bool {
        matches!(self, Self::Delta | Self::Cumulative)
    }
}

impl fmt::Display for SampleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SampleType {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "gauge" => Ok(Self::Gauge),
            "delta" => Ok(Self::Delta),
            "cumulative" => Ok(Self::Cumulative),
            other => Err(ProtocolError::decode(format!("unknown sample type '{other}'"))),
        }
    }
}

/// One timestamped measurement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Meter name, e.g. `cpu_util`
    pub name: String,

    #[serde(rename = "type")]
    pub sample_type: SampleType,

    pub unit: String,

    /// Measured value
    #[serde(alias = "value")]
    pub volume: f64,

    pub resource_id: String,

    pub timestamp: DateTime<Utc>,

    /// Origin of the measurement (pollster or publisher name)
    #[serde(default)]
    pub source: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl Sample {
    /// Create a sample with empty source and metadata
    pub fn new(
        name: impl Into<String>,
        sample_type: SampleType,
        unit: impl Into<String>,
        volume: f64,
        resource_id: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            name: name.into(),
            sample_type,
            unit: unit.into(),
            volume,
            resource_id: resource_id.into(),
            timestamp,
            source: String::new(),
            user_id: None,
            project_id: None,
            metadata: BTreeMap::new(),
        }
    }

    /// Set the source
    #[must_use]
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    /// Set the project id
    #[must_use]
    pub fn with_project(mut self, project_id: impl Into<String>) -> Self {
        self.project_id = Some(project_id.into());
        self
    }

    /// Set the user id
    #[must_use]
    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Add a metadata entry
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Derive a new sample from this one
    ///
    /// Copies identity fields (resource, owner, source, metadata) and
    /// replaces the measurement.
    pub fn derive(
        &self,
        name: impl Into<String>,
        sample_type: SampleType,
        unit: impl Into<String>,
        volume: f64,
    ) -> Self {
        Self {
            name: name.into(),
            sample_type,
            unit: unit.into(),
            volume,
            resource_id: self.resource_id.clone(),
            timestamp: self.timestamp,
            source: self.source.clone(),
            user_id: self.user_id.clone(),
            project_id: self.project_id.clone(),
            metadata: self.metadata.clone(),
        }
    }

    /// Sequence key: `(name, resource_id)`
    #[inline]
    pub fn key(&self) -> (&str, &str) {
        (&self.name, &self.resource_id)
    }
}

//! Aggregator transformer configuration

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use tally_config::TransformerInstanceConfig;

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;

/// How a group's values are combined
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AggregateFunction {
    #[default]
    Sum,
    Avg,
    Min,
    Max,
    Last,
    Count,
}

impl AggregateFunction {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Sum => "sum",
            Self::Avg => "avg",
            Self::Min => "min",
            Self::Max => "max",
            Self::Last => "last",
            Self::Count => "count",
        }
    }
}

impl fmt::Display for AggregateFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AggregateFunction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sum" => Ok(Self::Sum),
            "avg" => Ok(Self::Avg),
            "min" => Ok(Self::Min),
            "max" => Ok(Self::Max),
            "last" => Ok(Self::Last),
            "count" => Ok(Self::Count),
            other => Err(format!(
                "unknown aggregate function '{other}', expected one of: sum, avg, min, max, last, count"
            )),
        }
    }
}

/// Optional sample fields that split groups further
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GroupField {
    ProjectId,
    UserId,
    Source,
}

impl FromStr for GroupField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "project_id" => Ok(Self::ProjectId),
            "user_id" => Ok(Self::UserId),
            "source" => Ok(Self::Source),
            other => Err(format!(
                "cannot group by '{other}', expected project_id, user_id or source"
            )),
        }
    }
}

/// Configuration for the aggregator transformer
///
/// Groups always split on meter name, resource, unit and type; `group_by`
/// adds more fields.
#[derive(Debug, Clone)]
pub struct AggregatorConfig {
    pub enabled: bool,

    pub function: AggregateFunction,

    /// Emit a group as soon as it holds this many samples
    pub size: Option<usize>,

    /// Emit a group once it is this old, checked as samples arrive
    pub retention: Option<Duration>,

    pub group_by: Vec<GroupField>,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            function: AggregateFunction::Sum,
            size: None,
            retention: None,
            group_by: Vec::new(),
        }
    }
}

impl AggregatorConfig {
    pub fn new(function: AggregateFunction) -> Self {
        Self {
            function,
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_size(mut self, size: usize) -> Self {
        self.size = Some(size);
        self
    }

    #[must_use]
    pub fn with_retention(mut self, retention: Duration) -> Self {
        self.retention = Some(retention);
        self
    }

    #[must_use]
    pub fn with_group_by(mut self, fields: Vec<GroupField>) -> Self {
        self.group_by = fields;
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.size == Some(0) {
            return Err("size must be at least 1".to_string());
        }
        if self.retention.is_some_and(|r| r.is_zero()) {
            return Err("retention_secs must be greater than 0".to_string());
        }
        Ok(())
    }
}

impl TryFrom<&TransformerInstanceConfig> for AggregatorConfig {
    type Error = String;

    fn try_from(config: &TransformerInstanceConfig) -> Result<Self, Self::Error> {
        let mut aggregator = AggregatorConfig {
            enabled: config.enabled,
            ..Default::default()
        };

        if let Some(function) = config.get_str("function") {
            aggregator.function = function.parse()?;
        }

        if let Some(size) = config.get_int("size") {
            if size < 1 {
                return Err("size must be at least 1".to_string());
            }
            aggregator.size = Some(size as usize);
        }

        if let Some(secs) = config.get_float("retention_secs") {
            if !secs.is_finite() || secs <= 0.0 {
                return Err("retention_secs must be greater than 0".to_string());
            }
            aggregator.retention = Some(Duration::from_secs_f64(secs));
        }

        if let Some(fields) = config.get_string_array("group_by") {
            aggregator.group_by = fields
                .iter()
                .map(|f| f.parse())
                .collect::<Result<Vec<GroupField>, String>>()?;
        }

        aggregator.validate()?;
        Ok(aggregator)
    }
}

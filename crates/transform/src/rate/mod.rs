//! Rate of Change Transformer - Per-second rate of a cumulative meter
//!
//! Each cumulative sample becomes a gauge holding
//! `(volume - previous) / elapsed_seconds`, optionally rescaled.
//!
//! # Example
//!
//! ```toml
//! [[pipelines.cpu.transformers]]
//! type = "rate_of_change"
//! source = "cpu"
//! target_name = "cpu_util"
//! target_unit = "%"
//! scale = "100.0 / (10**9 * 4)"
//! ```

use tally_config::TransformerInstanceConfig;
use tally_protocol::{Sample, SampleType};
use tracing::debug;

use crate::counter::{CounterState, Observation, retention_option};
use crate::registry::TransformerFactory;
use crate::{Scale, TransformError, TransformResult, Transformer};

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;

/// Configuration for the rate of change transformer
#[derive(Debug, Clone)]
pub struct RateOfChangeConfig {
    pub enabled: bool,

    /// Only convert this meter (default: every cumulative meter)
    pub source: Option<String>,

    /// Name of the rate meter (default: `<name>.rate`)
    pub target_name: Option<String>,

    /// Unit of the rate meter (default: `<unit>/s`)
    pub target_unit: Option<String>,

    pub scale: Scale,
}

impl Default for RateOfChangeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            source: None,
            target_name: None,
            target_unit: None,
            scale: Scale::identity(),
        }
    }
}

impl RateOfChangeConfig {
    #[must_use]
    pub fn with_source(mut self, meter: impl Into<String>) -> Self {
        self.source = Some(meter.into());
        self
    }

    #[must_use]
    pub fn with_target(mut self, name: impl Into<String>, unit: impl Into<String>) -> Self {
        self.target_name = Some(name.into());
        self.target_unit = Some(unit.into());
        self
    }

    #[must_use]
    pub fn with_scale(mut self, scale: Scale) -> Self {
        self.scale = scale;
        self
    }
}

impl TryFrom<&TransformerInstanceConfig> for RateOfChangeConfig {
    type Error = String;

    fn try_from(config: &TransformerInstanceConfig) -> Result<Self, Self::Error> {
        let mut rate = RateOfChangeConfig {
            enabled: config.enabled,
            ..Default::default()
        };
        rate.source = config.get_str("source").map(str::to_string);
        rate.target_name = config.get_str("target_name").map(str::to_string);
        rate.target_unit = config.get_str("target_unit").map(str::to_string);
        if let Some(scale) = config.get("scale") {
            rate.scale = Scale::from_toml(scale)?;
        }
        Ok(rate)
    }
}

/// Rate of change transformer
#[derive(Debug)]
pub struct RateOfChangeTransformer {
    config: RateOfChangeConfig,
    state: CounterState,
}

impl RateOfChangeTransformer {
    pub fn new(config: RateOfChangeConfig) -> Self {
        Self {
            config,
            state: CounterState::default(),
        }
    }

    fn applies_to(&self, sample: &Sample) -> bool {
        sample.sample_type == SampleType::Cumulative
            && self.config.source.as_deref().is_none_or(|s| s == sample.name)
    }

    fn rate_sample(&self, sample: &Sample, rate: f64) -> Sample {
        let name = match &self.config.target_name {
            Some(name) => name.clone(),
            None => format!("{}.rate", sample.name),
        };
        let unit = match &self.config.target_unit {
            Some(unit) => unit.clone(),
            None => format!("{}/s", sample.unit),
        };
        sample.derive(name, SampleType::Gauge, unit, rate)
    }
}

impl Transformer for RateOfChangeTransformer {
    fn transform(&mut self, sample: Sample) -> TransformResult<Vec<Sample>> {
        if !self.applies_to(&sample) {
            return Ok(vec![sample]);
        }

        let (previous, elapsed_secs, reset) = match self.state.observe(&sample) {
            Observation::First => return Ok(Vec::new()),
            Observation::OutOfOrder => {
                debug!(
                    meter = %sample.name,
                    resource_id = %sample.resource_id,
                    "dropping out-of-order cumulative sample"
                );
                return Ok(Vec::new());
            }
            Observation::Step {
                previous,
                elapsed_secs,
                reset,
            } => (previous, elapsed_secs, reset),
        };

        // No time passed: nothing meaningful to divide by.
        if elapsed_secs <= 0.0 {
            return Ok(Vec::new());
        }

        let previous = if reset { 0.0 } else { previous };
        let rate = (sample.volume - previous) / elapsed_secs;
        let scaled = self.config.scale.apply(rate)?;
        Ok(vec![self.rate_sample(&sample, scaled)])
    }

    fn name(&self) -> &'static str {
        "rate_of_change"
    }

    fn enabled(&self) -> bool {
        self.config.enabled
    }
}

/// Factory for the `rate_of_change` type
#[derive(Debug, Clone, Copy, Default)]
pub struct RateOfChangeFactory;

impl TransformerFactory for RateOfChangeFactory {
    fn create(&self, config: &TransformerInstanceConfig) -> TransformResult<Box<dyn Transformer>> {
        let rate = RateOfChangeConfig::try_from(config).map_err(TransformError::config)?;
        let retention = retention_option(config).map_err(TransformError::config)?;
        let mut transformer = RateOfChangeTransformer::new(rate);
        transformer.state = transformer.state.with_retention(retention);
        Ok(Box::new(transformer))
    }

    fn name(&self) -> &'static str {
        "rate_of_change"
    }
}

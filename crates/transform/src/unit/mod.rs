//! Unit Conversion Transformer - Rescale and rename a meter
//!
//! Stateless: every matching sample is turned into one converted sample.
//!
//! # Example
//!
//! ```toml
//! [[pipelines.disk.transformers]]
//! type = "unit_conversion"
//! source = "disk.read.bytes"
//! target_name = "disk.read.kilobytes"
//! target_unit = "KB"
//! scale = "$(volume) / 1024"
//! ```

use tally_config::TransformerInstanceConfig;
use tally_protocol::{Sample, SampleType};

use crate::registry::TransformerFactory;
use crate::{Scale, TransformError, TransformResult, Transformer};

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;

/// Configuration for the unit conversion transformer
#[derive(Debug, Clone, Default)]
pub struct UnitConversionConfig {
    pub enabled: bool,

    /// Only convert this meter; others pass through untouched (default: all)
    pub source: Option<String>,

    /// New meter name (default: keep)
    pub target_name: Option<String>,

    /// New unit (default: keep)
    pub target_unit: Option<String>,

    /// New type (default: keep)
    pub target_type: Option<SampleType>,

    pub scale: Scale,
}

impl UnitConversionConfig {
    pub fn new() -> Self {
        Self {
            enabled: true,
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_source(mut self, meter: impl Into<String>) -> Self {
        self.source = Some(meter.into());
        self
    }

    #[must_use]
    pub fn with_target_name(mut self, name: impl Into<String>) -> Self {
        self.target_name = Some(name.into());
        self
    }

    #[must_use]
    pub fn with_target_unit(mut self, unit: impl Into<String>) -> Self {
        self.target_unit = Some(unit.into());
        self
    }

    #[must_use]
    pub fn with_target_type(mut self, sample_type: SampleType) -> Self {
        self.target_type = Some(sample_type);
        self
    }

    #[must_use]
    pub fn with_scale(mut self, scale: Scale) -> Self {
        self.scale = scale;
        self
    }

    fn matches(&self, sample: &Sample) -> bool {
        self.source.as_deref().is_none_or(|source| source == sample.name)
    }
}

impl TryFrom<&TransformerInstanceConfig> for UnitConversionConfig {
    type Error = String;

    fn try_from(config: &TransformerInstanceConfig) -> Result<Self, Self::Error> {
        let mut unit = UnitConversionConfig::new();
        unit.enabled = config.enabled;
        unit.source = config.get_str("source").map(str::to_string);
        unit.target_name = config.get_str("target_name").map(str::to_string);
        unit.target_unit = config.get_str("target_unit").map(str::to_string);
        if let Some(ty) = config.get_str("target_type") {
            unit.target_type = Some(ty.parse().map_err(|e| format!("target_type: {e}"))?);
        }
        if let Some(scale) = config.get("scale") {
            unit.scale = Scale::from_toml(scale)?;
        }
        Ok(unit)
    }
}

/// Unit conversion transformer
pub struct UnitConversionTransformer {
    config: UnitConversionConfig,
}

impl UnitConversionTransformer {
    pub fn new(config: UnitConversionConfig) -> Self {
        Self { config }
    }
}

impl Transformer for UnitConversionTransformer {
    fn transform(&mut self, sample: Sample) -> TransformResult<Vec<Sample>> {
        if !self.config.matches(&sample) {
            return Ok(vec![sample]);
        }

        let volume = self.config.scale.apply(sample.volume)?;
        let converted = sample.derive(
            self.config.target_name.as_deref().unwrap_or(&sample.name),
            self.config.target_type.unwrap_or(sample.sample_type),
            self.config.target_unit.as_deref().unwrap_or(&sample.unit),
            volume,
        );
        Ok(vec![converted])
    }

    fn name(&self) -> &'static str {
        "unit_conversion"
    }

    fn enabled(&self) -> bool {
        self.config.enabled
    }
}

/// Factory for the `unit_conversion` type
#[derive(Debug, Clone, Copy, Default)]
pub struct UnitConversionFactory;

impl TransformerFactory for UnitConversionFactory {
    fn create(&self, config: &TransformerInstanceConfig) -> TransformResult<Box<dyn Transformer>> {
        let unit = UnitConversionConfig::try_from(config).map_err(TransformError::config)?;
        Ok(Box::new(UnitConversionTransformer::new(unit)))
    }

    fn name(&self) -> &'static str {
        "unit_conversion"
    }
}

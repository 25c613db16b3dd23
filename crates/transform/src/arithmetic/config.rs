//! Arithmetic transformer configuration

use tally_config::TransformerInstanceConfig;
use tally_protocol::SampleType;

use crate::Expression;

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;

/// Configuration for the arithmetic transformer
#[derive(Debug, Clone)]
pub struct ArithmeticConfig {
    pub enabled: bool,

    /// Expression over `$(meter)` references; at least one is required
    pub expression: Expression,

    /// Name of the derived meter
    pub target_name: String,

    /// Unit of the derived meter (default: empty)
    pub target_unit: String,

    /// Type of the derived meter (default: gauge)
    pub target_type: SampleType,

    /// Also forward the referenced input samples (default: false)
    pub passthrough: bool,
}

impl ArithmeticConfig {
    /// Create a config, rejecting expressions without meter references
    pub fn new(expression: &str, target_name: impl Into<String>) -> Result<Self, String> {
        let expression = Expression::parse_referencing(expression)
            .map_err(|e| format!("expression '{expression}': {e}"))?;
        let config = Self {
            enabled: true,
            expression,
            target_name: target_name.into(),
            target_unit: String::new(),
            target_type: SampleType::Gauge,
            passthrough: false,
        };
        config.validate()?;
        Ok(config)
    }

    #[must_use]
    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.target_unit = unit.into();
        self
    }

    #[must_use]
    pub fn with_type(mut self, sample_type: SampleType) -> Self {
        self.target_type = sample_type;
        self
    }

    #[must_use]
    pub fn with_passthrough(mut self, passthrough: bool) -> Self {
        self.passthrough = passthrough;
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.target_name.is_empty() {
            return Err("target_name must not be empty".to_string());
        }
        if self.expression.references().is_empty() {
            return Err("expression must reference at least one meter".to_string());
        }
        if self.expression.references_meter(&self.target_name) {
            return Err(format!(
                "expression references its own target '{}'",
                self.target_name
            ));
        }
        Ok(())
    }
}

impl TryFrom<&TransformerInstanceConfig> for ArithmeticConfig {
    type Error = String;

    fn try_from(config: &TransformerInstanceConfig) -> Result<Self, Self::Error> {
        let expression = config
            .get_str("expression")
            .ok_or("arithmetic transformer requires 'expression'")?;
        let target_name = config
            .get_str("target_name")
            .ok_or("arithmetic transformer requires 'target_name'")?;

        let mut arithmetic = ArithmeticConfig::new(expression, target_name)?;
        arithmetic.enabled = config.enabled;

        if let Some(unit) = config.get_str("target_unit") {
            arithmetic.target_unit = unit.to_string();
        }
        if let Some(ty) = config.get_str("target_type") {
            arithmetic.target_type = ty.parse().map_err(|e| format!("target_type: {e}"))?;
        }
        if let Some(passthrough) = config.get_bool("passthrough") {
            arithmetic.passthrough = passthrough;
        }

        Ok(arithmetic)
    }
}

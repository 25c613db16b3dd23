//! Transformer configuration
//!
//! Each pipeline lists its transformer stages in order. A stage has a type
//! plus type-specific options that are handed to the transformer factory.
//!
//! # Example
//!
//! ```toml
//! [[pipelines.cpu.transformers]]
//! type = "rate_of_change"
//! target_name = "cpu_util"
//! target_unit = "%"
//! scale = "100.0 / (10**9 * 4)"
//!
//! [[pipelines.cpu.transformers]]
//! type = "noop"
//! ```

use serde::Deserialize;
use std::collections::HashMap;

/// Configuration for a single transformer instance
#[derive(Debug, Clone, Deserialize)]
pub struct TransformerInstanceConfig {
    /// Transformer type (e.g., "arithmetic", "aggregator")
    #[serde(rename = "type")]
    pub transformer_type: String,

    /// Whether this transformer is enabled (default: true)
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Type-specific configuration options
    #[serde(flatten)]
    pub options: HashMap<String, toml::Value>,
}

fn default_true() -> bool {
    true
}

impl TransformerInstanceConfig {
    /// Create a config of the given type with no options
    pub fn new(transformer_type: impl Into<String>) -> Self {
        Self {
            transformer_type: transformer_type.into(),
            enabled: true,
            options: HashMap::new(),
        }
    }

    /// Add an option
    #[must_use]
    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<toml::Value>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    /// Get an array option as Vec<String>
    pub fn get_string_array(&self, key: &str) -> Option<Vec<String>> {
        self.options.get(key).and_then(|v| {
            v.as_array().map(|arr| {
                arr.iter()
                    .filter_map(|v| v.as_str().map(|s| s.to_string()))
                    .collect()
            })
        })
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.options.get(key).and_then(|v| v.as_bool())
    }

    /// Get an option as f64, accepting integers
    pub fn get_float(&self, key: &str) -> Option<f64> {
        self.options.get(key).and_then(|v| match v {
            toml::Value::Float(f) => Some(*f),
            toml::Value::Integer(i) => Some(*i as f64),
            _ => None,
        })
    }

    pub fn get_int(&self, key: &str) -> Option<i64> {
        self.options.get(key).and_then(|v| v.as_integer())
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.options.get(key).and_then(|v| v.as_str())
    }

    /// Raw option value
    pub fn get(&self, key: &str) -> Option<&toml::Value> {
        self.options.get(key)
    }
}

/// Known transformer types for validation
pub const KNOWN_TRANSFORMER_TYPES: &[&str] = &[
    "noop",
    "arithmetic",
    "unit_conversion",
    "delta",
    "rate_of_change",
    "aggregator",
];

/// Check if a transformer type is known
pub fn is_known_transformer_type(transformer_type: &str) -> bool {
    KNOWN_TRANSFORMER_TYPES.contains(&transformer_type)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_noop() {
        let config: TransformerInstanceConfig = toml::from_str(r#"type = "noop""#).unwrap();
        assert_eq!(config.transformer_type, "noop");
        assert!(config.enabled);
        assert!(config.options.is_empty());
    }

    #[test]
    fn test_deserialize_arithmetic() {
        let toml = r#"
type = "arithmetic"
expression = "$(memory.usage) * 100 / $(memory)"
target_name = "memory_util"
passthrough = true
"#;
        let config: TransformerInstanceConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.transformer_type, "arithmetic");
        assert_eq!(
            config.get_str("expression"),
            Some("$(memory.usage) * 100 / $(memory)")
        );
        assert_eq!(config.get_bool("passthrough"), Some(true));
    }

    #[test]
    fn test_get_float_accepts_integer() {
        let config = TransformerInstanceConfig::new("unit_conversion").with_option("scale", 1024);
        assert_eq!(config.get_float("scale"), Some(1024.0));
        assert_eq!(config.get_int("scale"), Some(1024));
    }

    #[test]
    fn test_get_string_array() {
        let toml = r#"
type = "aggregator"
group_by = ["project_id", "user_id"]
"#;
        let config: TransformerInstanceConfig = toml::from_str(toml).unwrap();
        assert_eq!(
            config.get_string_array("group_by"),
            Some(vec!["project_id".to_string(), "user_id".to_string()])
        );
    }

    #[test]
    fn test_deserialize_disabled() {
        let toml = r#"
type = "delta"
enabled = false
"#;
        let config: TransformerInstanceConfig = toml::from_str(toml).unwrap();
        assert!(!config.enabled);
    }

    #[test]
    fn test_known_types() {
        assert!(is_known_transformer_type("arithmetic"));
        assert!(is_known_transformer_type("rate_of_change"));
        assert!(!is_known_transformer_type("pattern_matcher"));
    }
}

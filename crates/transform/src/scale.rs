//! Value scaling shared by conversion stages
//!
//! A scale is either a plain factor or an expression. An expression that
//! references `$(volume)` is evaluated with the input value bound to it and
//! its result replaces the value; one without references is a constant
//! factor computed once at load.

use crate::{EvaluationError, Expression};

/// Meter name bound to the incoming value inside scale expressions
pub const VOLUME: &str = "volume";

/// How a stage rescales a value
#[derive(Debug, Clone, PartialEq)]
pub enum Scale {
    Factor(f64),
    Expression(Expression),
}

impl Scale {
    /// Identity scale
    pub const fn identity() -> Self {
        Self::Factor(1.0)
    }

    /// Parse a scale from a config value
    ///
    /// Accepts a number or an expression string. Expressions may only
    /// reference `$(volume)`.
    pub fn from_toml(value: &toml::Value) -> Result<Self, String> {
        match value {
            toml::Value::Float(f) => Self::factor(*f),
            toml::Value::Integer(i) => Self::factor(*i as f64),
            toml::Value::String(s) => Self::parse(s),
            other => Err(format!("scale must be a number or expression, got {}", other.type_str())),
        }
    }

    /// Parse a scale expression
    pub fn parse(source: &str) -> Result<Self, String> {
        let expr = Expression::parse(source).map_err(|e| format!("scale: {e}"))?;
        if let Some(other) = expr.references().iter().find(|r| *r != VOLUME) {
            return Err(format!(
                "scale may only reference $({VOLUME}), found $({other})"
            ));
        }
        if expr.references().is_empty() {
            let factor = expr
                .evaluate(&[] as &[(&str, f64)])
                .map_err(|e| format!("scale: {e}"))?;
            return Self::factor(factor);
        }
        Ok(Self::Expression(expr))
    }

    fn factor(value: f64) -> Result<Self, String> {
        if value.is_finite() {
            Ok(Self::Factor(value))
        } else {
            Err("scale must be finite".into())
        }
    }

    /// Apply the scale to a value
    pub fn apply(&self, value: f64) -> Result<f64, EvaluationError> {
        match self {
            Self::Factor(f) => {
                let scaled = value * f;
                match EvaluationError::non_finite(scaled) {
                    Some(err) => Err(err),
                    None => Ok(scaled),
                }
            }
            Self::Expression(expr) => expr.evaluate(&[(VOLUME, value)]),
        }
    }
}

impl Default for Scale {
    fn default() -> Self {
        Self::identity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_expression_folds_to_factor() {
        let Scale::Factor(f) = Scale::parse("100.0 / (10**9 * 4)").unwrap() else {
            panic!("expected a constant factor");
        };
        assert!((f - 2.5e-8).abs() < 1e-20);
    }

    #[test]
    fn test_volume_expression() {
        let scale = Scale::parse("$(volume) / 1024").unwrap();
        assert_eq!(scale.apply(2048.0), Ok(2.0));
    }

    #[test]
    fn test_foreign_reference_rejected() {
        let err = Scale::parse("$(other) * 2").unwrap_err();
        assert!(err.contains("$(other)"));
    }

    #[test]
    fn test_from_toml_number() {
        assert_eq!(Scale::from_toml(&toml::Value::Integer(8)), Ok(Scale::Factor(8.0)));
        assert!(Scale::from_toml(&toml::Value::Boolean(true)).is_err());
    }

    #[test]
    fn test_division_by_zero_in_constant_rejected() {
        assert!(Scale::parse("1 / 0").is_err());
    }

    #[test]
    fn test_apply_factor_overflow() {
        let scale = Scale::Factor(f64::MAX);
        assert_eq!(scale.apply(10.0), Err(EvaluationError::Infinite));
    }
}

//! Arithmetic expressions over meter values
//!
//! Expressions reference meters as `$(name)` and combine them with
//! `+ - * / % **`, unary minus, parentheses and the functions `min`, `max`,
//! `abs`, `sum` and `avg`.
//!
//! Evaluation never coerces a bad value: a zero divisor fails with
//! [`EvaluationError::DivisionByZero`], and any NaN or infinite intermediate
//! result fails with [`EvaluationError::NotANumber`] or
//! [`EvaluationError::Infinite`].
//!
//! # Example
//!
//! ```
//! use std::collections::HashMap;
//! use tally_transform::Expression;
//!
//! let expr = Expression::parse("$(a) + $(b)").unwrap();
//! let values = HashMap::from([("a".to_string(), 2.0), ("b".to_string(), 3.0)]);
//! assert_eq!(expr.evaluate(&values).unwrap(), 5.0);
//! ```

mod error;
mod lexer;
mod parser;

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;

use std::collections::{BTreeMap, HashMap};
use std::fmt;

pub use error::EvaluationError;

use parser::{BinaryOp, Function, Node, Parser};

/// Result type for expression operations
pub type EvalResult<T> = std::result::Result<T, EvaluationError>;

/// Source of current meter values
pub trait MeterValues {
    fn value_of(&self, meter: &str) -> Option<f64>;
}

impl MeterValues for HashMap<String, f64> {
    fn value_of(&self, meter: &str) -> Option<f64> {
        self.get(meter).copied()
    }
}

impl MeterValues for BTreeMap<String, f64> {
    fn value_of(&self, meter: &str) -> Option<f64> {
        self.get(meter).copied()
    }
}

impl MeterValues for [(&str, f64)] {
    fn value_of(&self, meter: &str) -> Option<f64> {
        self.iter().find(|(name, _)| *name == meter).map(|(_, v)| *v)
    }
}

impl<const N: usize> MeterValues for [(&str, f64); N] {
    fn value_of(&self, meter: &str) -> Option<f64> {
        self.as_slice().value_of(meter)
    }
}

/// A parsed expression
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    source: String,
    root: Node,
    references: Vec<String>,
}

impl Expression {
    /// Parse expression text
    pub fn parse(source: &str) -> EvalResult<Self> {
        let tokens = lexer::tokenize(source)?;
        let (root, references) = Parser::new(&tokens, source.len()).parse()?;
        Ok(Self {
            source: source.to_string(),
            root,
            references,
        })
    }

    /// Parse and require at least one meter reference
    pub fn parse_referencing(source: &str) -> EvalResult<Self> {
        let expr = Self::parse(source)?;
        if expr.references.is_empty() {
            return Err(EvaluationError::NoReferences);
        }
        Ok(expr)
    }

    /// Referenced meter names, in order of first appearance
    pub fn references(&self) -> &[String] {
        &self.references
    }

    /// Whether the expression references `meter`
    pub fn references_meter(&self, meter: &str) -> bool {
        self.references.iter().any(|r| r == meter)
    }

    /// Original expression text
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Evaluate against current meter values
    pub fn evaluate<V: MeterValues + ?Sized>(&self, values: &V) -> EvalResult<f64> {
        let mut resolved = Vec::with_capacity(self.references.len());
        for name in &self.references {
            let value = values
                .value_of(name)
                .ok_or_else(|| EvaluationError::MissingMeter(name.clone()))?;
            check(value)?;
            resolved.push(value);
        }
        eval(&self.root, &resolved)
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl std::str::FromStr for Expression {
    type Err = EvaluationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[inline]
fn check(value: f64) -> EvalResult<f64> {
    match EvaluationError::non_finite(value) {
        Some(err) => Err(err),
        None => Ok(value),
    }
}

fn eval(node: &Node, values: &[f64]) -> EvalResult<f64> {
    match node {
        Node::Number(n) => check(*n),
        Node::Meter(idx) => Ok(values[*idx]),
        Node::Neg(inner) => Ok(-eval(inner, values)?),
        Node::Binary { op, lhs, rhs } => {
            let l = eval(lhs, values)?;
            let r = eval(rhs, values)?;
            let result = match op {
                BinaryOp::Add => l + r,
                BinaryOp::Sub => l - r,
                BinaryOp::Mul => l * r,
                BinaryOp::Div | BinaryOp::Rem if r == 0.0 => {
                    return Err(EvaluationError::DivisionByZero);
                }
                BinaryOp::Div => l / r,
                BinaryOp::Rem => l % r,
                BinaryOp::Pow => l.powf(r),
            };
            check(result)
        }
        Node::Call { function, args } => {
            let mut evaluated = Vec::with_capacity(args.len());
            for arg in args {
                evaluated.push(eval(arg, values)?);
            }
            let result = match function {
                Function::Min => evaluated.iter().copied().fold(f64::INFINITY, f64::min),
                Function::Max => evaluated.iter().copied().fold(f64::NEG_INFINITY, f64::max),
                Function::Abs => evaluated[0].abs(),
                Function::Sum => evaluated.iter().sum(),
                Function::Avg => evaluated.iter().sum::<f64>() / evaluated.len() as f64,
            };
            check(result)
        }
    }
}

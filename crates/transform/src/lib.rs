//! Tally - Transform
//!
//! Transformer stages and the ordered chain that runs them for one pipeline.
//!
//! # Overview
//!
//! Transformers derive new samples from the ones flowing through a pipeline.
//! A stage may:
//! - Combine several meters into one (`arithmetic`)
//! - Rescale or rename a meter (`unit_conversion`)
//! - Turn running totals into deltas or per-second rates (`delta`, `rate_of_change`)
//! - Accumulate samples and emit a summary on flush (`aggregator`)
//!
//! # Architecture
//!
//! ```text
//! [Sample] → [Stage 1] → [Stage 2] → ... → [Sample']*
//!                                    flush_all() ↴
//!               buffered state drains through the later stages
//! ```
//!
//! Every stage instance is owned by exactly one `Chain`, and a chain by
//! exactly one pipeline. Two pipelines configuring the same transformer
//! type get independent state.
//!
//! # Adding a New Transformer
//!
//! 1. Create a config struct implementing `TryFrom<&TransformerInstanceConfig>`
//!    with `type Error = String`, validating every option.
//! 2. Implement [`Transformer`] on the stage.
//! 3. Add a factory and register it in [`default_registry`], and add the
//!    type name to `KNOWN_TRANSFORMER_TYPES` in `tally-config`.
//!
//! # Example
//!
//! ```
//! use tally_config::TransformerInstanceConfig;
//! use tally_transform::{default_registry, Chain};
//!
//! let registry = default_registry();
//! let config = TransformerInstanceConfig::new("arithmetic")
//!     .with_option("expression", "$(a) + $(b)")
//!     .with_option("target_name", "a_plus_b");
//! let chain = Chain::new(vec![registry.create(&config).unwrap()]);
//! assert_eq!(chain.names(), vec!["arithmetic"]);
//! ```

mod chain;
mod counter;
mod error;
mod scale;
pub mod aggregate;
pub mod arithmetic;
pub mod delta;
pub mod expression;
pub mod noop;
pub mod rate;
pub mod registry;
pub mod unit;

pub use aggregate::{
    AggregateFunction, AggregatorConfig, AggregatorFactory, AggregatorMetrics, AggregatorTransformer,
    GroupField,
};
pub use arithmetic::{ArithmeticConfig, ArithmeticFactory, ArithmeticTransformer};
pub use chain::{Chain, FlushOutcome};
pub use delta::{DeltaFactory, DeltaTransformer};
pub use error::{StageError, TransformError};
pub use expression::{EvalResult, EvaluationError, Expression, MeterValues};
pub use noop::{NoopFactory, NoopTransformer};
pub use rate::{RateOfChangeConfig, RateOfChangeFactory, RateOfChangeTransformer};
pub use registry::{TransformerFactory, TransformerRegistry, default_registry};
pub use scale::Scale;
pub use unit::{UnitConversionConfig, UnitConversionFactory, UnitConversionTransformer};

use tally_protocol::Sample;

/// Result type for transformer operations
pub type TransformResult<T> = Result<T, TransformError>;

/// A single transformation policy
///
/// Stages are driven by exactly one pipeline at a time through `&mut self`,
/// so implementations keep plain owned state and need no locking.
pub trait Transformer: Send {
    /// Transform one sample into zero or more samples
    ///
    /// An error aborts this sample's trip through the chain; the pipeline
    /// carries on with the next one.
    fn transform(&mut self, sample: Sample) -> TransformResult<Vec<Sample>>;

    /// Emit whatever the stage has buffered
    ///
    /// Called at pipeline flush boundaries (end of a polling cycle, reload,
    /// shutdown). Stateless stages return nothing.
    fn flush(&mut self) -> TransformResult<Vec<Sample>> {
        Ok(Vec::new())
    }

    /// Name of this transformer for logging and metrics
    fn name(&self) -> &'static str;

    /// Whether this transformer is enabled
    ///
    /// Disabled transformers are filtered out of chains at construction time.
    fn enabled(&self) -> bool {
        true
    }
}

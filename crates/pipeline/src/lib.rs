//! Tally - Pipeline
//!
//! Routes samples and events from sources through per-pipeline transformer
//! chains to publisher sinks.
//!
//! # Architecture
//!
//! ```text
//! [Sources]                 [PipelineManager]                        [Sinks]
//!   Poll Scheduler ──┐                                          ┌──→ store
//!   UDP listener ────┼──→ dispatch() ──→ Generation ──→ Pipeline ┼──→ forward
//!   Notifications ───┘                    (ArcSwap)    filter    └──→ debug
//!                                                      chain
//! ```
//!
//! # Key Design
//!
//! - **Compiled at load**: filters, sink references and transformer stages
//!   are built before a generation goes live; nothing is looked up by name
//!   per item
//! - **Per-pipeline ordering**: each pipeline processes one item at a time,
//!   so aggregation state is never shared or raced
//! - **Contained failures**: a chain error drops one item in one pipeline; a
//!   refused publish affects one sink (or, under `abort`, the rest of that
//!   item's sinks in that pipeline)
//! - **Atomic reload**: a new generation is swapped in whole; items already
//!   travelling finish on the generation they started with
//!
//! # Example
//!
//! ```ignore
//! use tally_pipeline::PipelineManager;
//!
//! let manager = PipelineManager::from_config(&config, &dispatchers, transformers)?;
//! manager.dispatch(sample.into());
//! manager.reload(&new_config.pipelines)?;
//! ```

mod builder;
mod error;
mod manager;
mod metrics;
mod pipeline;
mod sequence;
mod sink_set;

pub use builder::build_pipeline;
pub use error::{PipelineError, Result};
pub use manager::{DispatchReport, Generation, PipelineManager, ReloadReport};
pub use metrics::{PipelineMetrics, PipelineMetricsHandle};
pub use pipeline::{FlushReport, Pipeline, RouteOutcome};
pub use sequence::{DEFAULT_SEQUENCE_RETENTION, SequenceGuard};
pub use sink_set::SinkSet;

//! Tally - Sinks
//!
//! Publisher sinks: each owns a bounded queue, a delivery loop with bounded
//! retry, and a dispatcher that writes to the actual destination.
//!
//! # Architecture
//!
//! ```text
//! [Pipeline] --publish--> [BoundedQueue] --deliver--> [ResourceFilter]
//!                                                          |
//!                          [Dispatcher] <--retry/backoff--  split by resource
//! ```
//!
//! A full queue either evicts its oldest batch or refuses the new one,
//! depending on the sink's overflow policy. Dispatchers classify failures
//! as transient (retried up to `max_retries` attempts) or permanent
//! (dropped at once).
//!
//! # Available Dispatchers
//!
//! | Scheme | Purpose |
//! |--------|---------|
//! | `null` | Benchmarking (discard all) |
//! | `stdout` | Debug output |
//! | `memory` | In-process store for tests and embedding |
//! | `udp` | Signed datagram forwarding to another collector |
//! | `file` | JSON lines appended to a local file |
//!
//! # Example
//!
//! ```ignore
//! use tally_sinks::{PublisherSink, default_registry};
//!
//! let sink = Arc::new(PublisherSink::from_config("debug", &config, &default_registry())?);
//! tokio::spawn(Arc::clone(&sink).run(cancel.clone(), grace));
//! sink.publish(samples)?;
//! ```

mod batch;
mod dispatcher;
mod error;
mod filter;
mod metrics;
mod queue;
mod registry;
mod retry;
mod sink;

/// Shared sink utilities
pub mod util;

/// Null dispatcher - discards all data (for benchmarking)
pub mod null;

/// Stdout dispatcher - human-readable debug output
pub mod stdout;

/// Memory dispatcher - in-process store
pub mod memory;

/// UDP dispatcher - signed datagram forwarding
pub mod udp;

/// File dispatcher - JSON lines
pub mod file;

pub use batch::Batch;
pub use dispatcher::Dispatcher;
pub use error::{DeliveryError, Result, SinkError};
pub use filter::{ResourceFilter, Verdict, split_by_resource};
pub use metrics::{SinkMetrics, SinkMetricsHandle};
pub use queue::{BoundedQueue, Pushed, QueueEntry, Refused};
pub use registry::{DispatcherFactory, DispatcherRegistry, default_registry};
pub use retry::{RetryDecision, RetryPolicy, RetryState};
pub use sink::{
    DeliveryOutcome, DeliveryReport, DrainReport, PublishOutcome, PublisherSink, SinkOptions,
};

pub use memory::MemoryDispatcher;
pub use null::NullDispatcher;

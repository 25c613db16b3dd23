//! Tally Sources - everything that feeds the pipeline manager
//!
//! # Available Sources
//!
//! - **Poll Scheduler** - invokes pollsters on their intervals, disabling
//!   any that fail too many times in a row
//! - **Notification Ingest** - signed, newline-delimited JSON notifications
//!   over TCP, deduplicated by message id
//! - **UDP** - one (optionally signed) sample per datagram
//!
//! # Design Principles
//!
//! - **Per-message containment**: a bad message, datagram or poll is
//!   counted and logged; the source keeps running
//! - **Load-time resolution**: pollster types resolve through a registry
//!   when the scheduler is built; unusable discovery sources are skipped
//! - **Cancellation**: every run loop selects on a `CancellationToken` so
//!   shutdown can stop sources before flushing pipelines
//!
//! # Example
//!
//! ```ignore
//! use tally_sources::{PollScheduler, default_discovery, default_pollsters};
//!
//! let pollsters = default_pollsters(manager.metrics_handle());
//! let scheduler = PollScheduler::from_config(&config.polling, &pollsters, &default_discovery(), manager)?;
//! tokio::spawn(scheduler.run(cancel.clone()));
//! ```

mod dedup;
mod error;

pub mod discovery;
pub mod engine;
pub mod notification;
pub mod pollster;
pub mod scheduler;
pub mod udp;

pub use dedup::DedupCache;
pub use discovery::{
    Discovery, DiscoveryFactory, DiscoveryRegistry, LocalNodeDiscovery, StaticDiscovery,
    default_discovery, local_node_name,
};
pub use engine::{EngineFactory, EnginePollster};
pub use error::{CollectionError, Result, SourceError, ValidationError};
pub use notification::{NotificationIngest, NotificationMetricsHandle, encode_notification};
pub use pollster::{Pollster, PollsterFactory, PollsterRegistry, default_pollsters};
pub use scheduler::{CycleReport, PollScheduler, PollsterState, SchedulerHandle, SchedulerMetricsHandle};
pub use udp::{UdpListener, UdpMetricsHandle};

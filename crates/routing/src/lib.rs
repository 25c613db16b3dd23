//! Tally Routing
//!
//! Load-time compiled matching and sink resolution for pipelines.
//!
//! # Design
//!
//! Routing decisions are compiled when a pipeline generation is built, not
//! per datum:
//! - `MeterFilter` turns a pipeline's source patterns into compiled regexes
//! - `SinkTable` assigns each configured sink a `SinkId` and resolves a
//!   pipeline's sink names to ids, rejecting unknown names up front
//!
//! # Example
//!
//! ```
//! use tally_routing::{MeterFilter, SinkTable};
//!
//! let filter = MeterFilter::compile(&["cpu*", "memory"]).unwrap();
//! assert!(filter.matches("cpu_util"));
//! assert!(!filter.matches("disk.read.bytes"));
//!
//! let mut table = SinkTable::new();
//! table.register("store").unwrap();
//! let ids = table.resolve("cpu_pipeline", &["store"]).unwrap();
//! assert_eq!(table.name(ids[0]), Some("store"));
//! ```

mod error;
mod filter;
mod sink_id;
mod table;


pub use error::{Result, RoutingError};
pub use filter::MeterFilter;
pub use sink_id::SinkId;
pub use table::SinkTable;

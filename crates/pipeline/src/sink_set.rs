//! Sink set - the publisher sinks shared by every pipeline generation
//!
//! Sinks are built once at startup and indexed by `SinkId`. Reloads rebuild
//! pipelines only; the new generation resolves its sink names against the
//! same set, so queues and delivery loops survive a reload untouched.

use std::sync::Arc;

use tally_config::SinksConfig;
use tally_routing::{SinkId, SinkTable};
use tally_sinks::{DispatcherRegistry, PublisherSink};
use tracing::info;

use crate::{PipelineError, Result};

/// Named publisher sinks, addressable by `SinkId`
#[derive(Default)]
pub struct SinkSet {
    table: SinkTable,
    sinks: Vec<Arc<PublisherSink>>,
}

impl SinkSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build every enabled sink in the config
    ///
    /// # Errors
    ///
    /// Fails on the first sink whose dispatcher URL or options are invalid.
    pub fn from_config(config: &SinksConfig, registry: &DispatcherRegistry) -> Result<Self> {
        let mut set = Self::new();
        for (name, sink_config) in config.iter() {
            if !sink_config.enabled {
                info!(sink = %name, "sink disabled, skipping");
                continue;
            }
            let sink = PublisherSink::from_config(name, sink_config, registry)?;
            set.insert(Arc::new(sink))?;
        }
        Ok(set)
    }

    /// Add a sink under its own name
    pub fn insert(&mut self, sink: Arc<PublisherSink>) -> Result<SinkId> {
        let id = self
            .table
            .register(sink.name())
            .map_err(|source| PipelineError::routing(sink.name(), source))?;
        self.sinks.push(sink);
        Ok(id)
    }

    /// Resolve a pipeline's ordered sink names
    ///
    /// # Errors
    ///
    /// Fails if the list is empty or names a sink that does not exist.
    pub fn resolve<S: AsRef<str>>(&self, pipeline: &str, names: &[S]) -> Result<Vec<Arc<PublisherSink>>> {
        let ids = self
            .table
            .resolve(pipeline, names)
            .map_err(|source| PipelineError::routing(pipeline, source))?;
        Ok(ids.into_iter().filter_map(|id| self.by_id(id)).cloned().collect())
    }

    #[inline]
    pub fn by_id(&self, id: SinkId) -> Option<&Arc<PublisherSink>> {
        self.sinks.get(id.as_usize())
    }

    pub fn get(&self, name: &str) -> Option<&Arc<PublisherSink>> {
        self.table.get(name).and_then(|id| self.by_id(id))
    }

    /// Sinks in registration order
    pub fn iter(&self) -> impl Iterator<Item = &Arc<PublisherSink>> {
        self.sinks.iter()
    }

    pub fn names(&self) -> &[String] {
        self.table.names()
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl std::fmt::Debug for SinkSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.table.names()).finish()
    }
}

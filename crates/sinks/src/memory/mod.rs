//! Memory dispatcher - in-process store
//!
//! Keeps everything it is handed so tests and embedders can read it back.
//! Events are keyed by message id: a batch carrying an id the store already
//! holds (or carrying the same id twice) is refused as a whole.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tally_config::SinkConfig;
use tally_protocol::{Datum, Event, Sample, check_unique_message_ids};

use crate::{Batch, DeliveryError, Dispatcher, DispatcherFactory, Result};

#[derive(Debug, Default)]
struct Store {
    samples: Vec<Sample>,
    events: Vec<Event>,
    message_ids: HashSet<String>,
    writes: u64,
}

/// Shared in-memory destination
///
/// Clones share one store.
#[derive(Debug, Clone, Default)]
pub struct MemoryDispatcher {
    store: Arc<Mutex<Store>>,
}

impl MemoryDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stored samples in arrival order
    pub fn samples(&self) -> Vec<Sample> {
        self.store.lock().samples.clone()
    }

    /// Stored events in arrival order
    pub fn events(&self) -> Vec<Event> {
        self.store.lock().events.clone()
    }

    /// Number of successful writes
    pub fn writes(&self) -> u64 {
        self.store.lock().writes
    }

    /// Total stored items
    pub fn len(&self) -> usize {
        let store = self.store.lock();
        store.samples.len() + store.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Verify the stored events hold one record per message id
    pub fn check_events(&self) -> tally_protocol::Result<()> {
        check_unique_message_ids(&self.store.lock().events)
    }

    pub fn clear(&self) {
        let mut store = self.store.lock();
        store.samples.clear();
        store.events.clear();
        store.message_ids.clear();
    }
}

#[async_trait]
impl Dispatcher for MemoryDispatcher {
    async fn write(&self, batch: &Batch) -> std::result::Result<(), DeliveryError> {
        let mut store = self.store.lock();

        let mut incoming = HashSet::new();
        for event in batch.events() {
            if store.message_ids.contains(&event.message_id) || !incoming.insert(event.message_id.as_str()) {
                return Err(DeliveryError::permanent(format!(
                    "duplicate message id '{}'",
                    event.message_id
                )));
            }
        }

        for datum in batch.items() {
            match datum {
                Datum::Sample(sample) => store.samples.push(sample.clone()),
                Datum::Event(event) => {
                    store.message_ids.insert(event.message_id.clone());
                    store.events.push(event.clone());
                }
            }
        }
        store.writes += 1;
        Ok(())
    }

    fn scheme(&self) -> &'static str {
        "memory"
    }
}

/// Factory for `memory://`
///
/// By default each sink gets its own store. A factory built with
/// [`MemoryFactory::shared`] hands every sink the same one.
#[derive(Debug, Default)]
pub struct MemoryFactory {
    shared: Option<MemoryDispatcher>,
}

impl MemoryFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared(store: MemoryDispatcher) -> Self {
        Self { shared: Some(store) }
    }
}

impl DispatcherFactory for MemoryFactory {
    fn create(&self, _sink: &str, _config: &SinkConfig) -> Result<Arc<dyn Dispatcher>> {
        let store = self.shared.clone().unwrap_or_default();
        Ok(Arc::new(store))
    }

    fn scheme(&self) -> &'static str {
        "memory"
    }
}

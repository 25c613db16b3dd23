//! Null dispatcher - discards everything it is handed
//!
//! Used for benchmarking the pipeline without I/O and for validating
//! routing configs. Every write succeeds.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tally_config::SinkConfig;

use crate::{Batch, DeliveryError, Dispatcher, DispatcherFactory, Result};

/// Dispatcher that counts and drops batches
#[derive(Debug, Default)]
pub struct NullDispatcher {
    batches: AtomicU64,
    items: AtomicU64,
}

impl NullDispatcher {
    pub const fn new() -> Self {
        Self {
            batches: AtomicU64::new(0),
            items: AtomicU64::new(0),
        }
    }

    /// Batches written so far
    pub fn batches(&self) -> u64 {
        self.batches.load(Ordering::Relaxed)
    }

    /// Items written so far
    pub fn items(&self) -> u64 {
        self.items.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl Dispatcher for NullDispatcher {
    async fn write(&self, batch: &Batch) -> std::result::Result<(), DeliveryError> {
        self.batches.fetch_add(1, Ordering::Relaxed);
        self.items.fetch_add(batch.len() as u64, Ordering::Relaxed);
        Ok(())
    }

    fn scheme(&self) -> &'static str {
        "null"
    }
}

/// Factory for `null://`
pub struct NullFactory;

impl DispatcherFactory for NullFactory {
    fn create(&self, _sink: &str, _config: &SinkConfig) -> Result<Arc<dyn Dispatcher>> {
        Ok(Arc::new(NullDispatcher::new()))
    }

    fn scheme(&self) -> &'static str {
        "null"
    }
}

//! Dispatcher trait
//!
//! A dispatcher is the external destination a publisher sink writes to.
//! It classifies every failure as transient or permanent; the sink owns
//! the retry decision.

use async_trait::async_trait;

use crate::{Batch, DeliveryError};

/// Destination a publisher sink delivers to
///
/// Implementations re-establish their own connections lazily inside
/// `write`: after a transient failure the sink simply calls `write` again.
#[async_trait]
pub trait Dispatcher: Send + Sync {
    /// Establish the connection before the delivery loop starts
    ///
    /// Stateless dispatchers keep the default.
    async fn connect(&self) -> Result<(), DeliveryError> {
        Ok(())
    }

    /// Write one batch
    ///
    /// # Errors
    ///
    /// `DeliveryError::Transient` when the destination may accept the same
    /// batch later, `DeliveryError::Permanent` when it never will.
    async fn write(&self, batch: &Batch) -> Result<(), DeliveryError>;

    /// URL scheme this dispatcher serves
    fn scheme(&self) -> &'static str;
}

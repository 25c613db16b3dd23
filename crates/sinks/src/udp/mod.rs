//! UDP dispatcher - forwards samples as signed datagrams
//!
//! Each sample becomes one datagram in the ingestion wire format
//! (`tally_protocol::wire`), signed with the sink's `secret` when one is
//! configured. Events cannot travel over this transport and are refused.
//!
//! ```toml
//! [sinks.forward]
//! url = "udp://collector.internal:4952"
//! secret = "shared-key"
//! ```

use std::io;
use std::sync::Arc;

use async_trait::async_trait;
use tally_config::SinkConfig;
use tally_protocol::wire;
use tokio::net::UdpSocket;
use tokio::sync::Mutex;

use crate::{Batch, DeliveryError, Dispatcher, DispatcherFactory, Result, SinkError};

/// Dispatcher sending one datagram per sample
pub struct UdpDispatcher {
    target: String,
    secret: Option<Vec<u8>>,
    socket: Mutex<Option<UdpSocket>>,
}

impl UdpDispatcher {
    pub fn new(target: impl Into<String>, secret: Option<Vec<u8>>) -> Self {
        Self {
            target: target.into(),
            secret,
            socket: Mutex::new(None),
        }
    }

    /// Destination `host:port`
    pub fn target(&self) -> &str {
        &self.target
    }

    async fn open(&self) -> io::Result<UdpSocket> {
        let addr = tokio::net::lookup_host(&self.target)
            .await?
            .next()
            .ok_or_else(|| io::Error::other(format!("'{}' resolved to no address", self.target)))?;
        let bind = if addr.is_ipv4() { "0.0.0.0:0" } else { "[::]:0" };
        let socket = UdpSocket::bind(bind).await?;
        socket.connect(addr).await?;
        Ok(socket)
    }

    fn encode(&self, batch: &Batch) -> std::result::Result<Vec<Vec<u8>>, DeliveryError> {
        if let Some(event) = batch.events().next() {
            return Err(DeliveryError::permanent(format!(
                "udp transport carries samples only, got event '{}'",
                event.event_type
            )));
        }
        batch
            .samples()
            .map(|sample| {
                wire::encode_sample(sample, self.secret.as_deref())
                    .map_err(|e| DeliveryError::permanent(format!("encode {}: {e}", sample.name)))
            })
            .collect()
    }
}

#[async_trait]
impl Dispatcher for UdpDispatcher {
    async fn connect(&self) -> std::result::Result<(), DeliveryError> {
        let socket = self.open().await?;
        *self.socket.lock().await = Some(socket);
        Ok(())
    }

    async fn write(&self, batch: &Batch) -> std::result::Result<(), DeliveryError> {
        let datagrams = self.encode(batch)?;

        let mut guard = self.socket.lock().await;
        if guard.is_none() {
            *guard = Some(self.open().await?);
        }
        let Some(socket) = guard.as_ref() else {
            return Err(DeliveryError::transient("socket unavailable"));
        };

        for datagram in &datagrams {
            if let Err(e) = socket.send(datagram).await {
                // reopened on the next write
                *guard = None;
                return Err(e.into());
            }
        }
        Ok(())
    }

    fn scheme(&self) -> &'static str {
        "udp"
    }
}

/// Factory for `udp://host:port`
pub struct UdpFactory;

impl DispatcherFactory for UdpFactory {
    fn create(&self, sink: &str, config: &SinkConfig) -> Result<Arc<dyn Dispatcher>> {
        let target = config.target();
        let valid_port = target
            .rsplit_once(':')
            .is_some_and(|(host, port)| !host.is_empty() && port.parse::<u16>().is_ok());
        if !valid_port {
            return Err(SinkError::config(
                sink,
                format!("udp url needs host:port, got '{}'", config.url),
            ));
        }
        let secret = config.secret.as_ref().map(|s| s.as_bytes().to_vec());
        Ok(Arc::new(UdpDispatcher::new(target, secret)))
    }

    fn scheme(&self) -> &'static str {
        "udp"
    }
}

//! UDP Ingestion - one sample per datagram
//!
//! Datagrams use the wire format in `tally_protocol::wire`. When a secret is
//! configured, unsigned and mis-signed datagrams are dropped. Undecodable
//! datagrams are dropped too; both are counted and logged (rate-limited)
//! without stopping the listener.
//!
//! # Example
//!
//! ```ignore
//! use tally_sources::UdpListener;
//!
//! let listener = UdpListener::new(config, manager);
//! listener.run(cancel).await?;
//! ```

use std::net::SocketAddr;
use std::sync::Arc;

use socket2::{Domain, Protocol, Socket, Type};
use tally_config::UdpListenerConfig;
use tally_metrics::{SourceMetrics, SourceMetricsProvider, SourceMetricsSnapshot};
use tally_pipeline::PipelineManager;
use tally_protocol::{Datum, MAX_DATAGRAM_SIZE, ProtocolError, wire};
use tally_sinks::util::RateLimitedLogger;
use tokio::net::UdpSocket;
use tokio_util::sync::CancellationToken;

use crate::{Result, SourceError};

#[cfg(test)]
#[path = "udp_test.rs"]
mod tests;

/// Receives sample datagrams and dispatches them
pub struct UdpListener {
    config: UdpListenerConfig,
    manager: Arc<PipelineManager>,
    metrics: Arc<SourceMetrics>,
    rejections: RateLimitedLogger,
}

impl UdpListener {
    pub fn new(config: UdpListenerConfig, manager: Arc<PipelineManager>) -> Self {
        Self {
            config,
            manager,
            metrics: Arc::new(SourceMetrics::new()),
            rejections: RateLimitedLogger::default_interval(),
        }
    }

    /// Get the bind address as a string
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.config.address, self.config.port)
    }

    pub fn metrics(&self) -> &SourceMetrics {
        &self.metrics
    }

    /// Get a metrics handle for the reporter
    pub fn metrics_handle(&self) -> UdpMetricsHandle {
        UdpMetricsHandle {
            metrics: Arc::clone(&self.metrics),
        }
    }

    /// Bind the socket with address reuse and the configured receive buffer
    pub fn bind(&self) -> Result<UdpSocket> {
        let address = self.bind_address();
        let addr: SocketAddr = address.parse().map_err(|e: std::net::AddrParseError| {
            SourceError::InvalidAddress {
                address: address.clone(),
                message: e.to_string(),
            }
        })?;
        self.create_socket(addr)
            .map_err(|e| SourceError::Bind { address, source: e })
    }

    fn create_socket(&self, addr: SocketAddr) -> std::io::Result<UdpSocket> {
        let domain = if addr.is_ipv4() {
            Domain::IPV4
        } else {
            Domain::IPV6
        };

        let socket = Socket::new(domain, Type::DGRAM, Some(Protocol::UDP))?;
        socket.set_reuse_address(true)?;

        if let Some(size) = self.config.buffer_size
            && let Err(e) = socket.set_recv_buffer_size(size)
        {
            tracing::warn!(error = %e, requested_size = size, "failed to set UDP SO_RCVBUF");
        }

        socket.bind(&addr.into())?;
        socket.set_nonblocking(true)?;

        let std_socket: std::net::UdpSocket = socket.into();
        UdpSocket::from_std(std_socket)
    }

    /// Bind and receive until cancelled
    pub async fn run(self, cancel: CancellationToken) -> Result<()> {
        let socket = self.bind()?;
        self.serve(socket, cancel).await;
        Ok(())
    }

    /// Receive on an already-bound socket until cancelled
    pub async fn serve(self, socket: UdpSocket, cancel: CancellationToken) {
        let address = socket
            .local_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| self.bind_address());
        tracing::info!(
            address = %address,
            signed = self.config.secret.is_some(),
            "UDP listener started"
        );

        // one byte over the limit so oversize datagrams are detectable
        let mut buf = vec![0u8; MAX_DATAGRAM_SIZE + 1];

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                recv = socket.recv_from(&mut buf) => match recv {
                    Ok((len, peer)) => self.handle_datagram(&buf[..len], peer),
                    Err(e) => {
                        self.metrics.record_failure();
                        tracing::debug!(error = %e, "UDP recv error");
                    }
                },
            }
        }

        tracing::info!(address = %address, "UDP listener stopped");
    }

    /// Decode one datagram and dispatch it
    pub fn handle_datagram(&self, payload: &[u8], peer: SocketAddr) {
        self.metrics.record_received();
        let secret = self.config.secret.as_deref().map(str::as_bytes);

        match wire::decode_sample(payload, secret) {
            Ok(sample) => {
                self.metrics.record_accepted(1);
                self.manager.dispatch(Datum::Sample(sample));
            }
            Err(e) => {
                if e.is_unauthenticated() {
                    self.metrics.record_unauthenticated();
                } else {
                    self.metrics.record_malformed();
                }
                self.log_rejection(peer, &e);
            }
        }
    }

    fn log_rejection(&self, peer: SocketAddr, error: &ProtocolError) {
        let Some(occurrences) = self.rejections.record() else {
            return;
        };
        tracing::warn!(
            source_id = "udp",
            peer = %peer,
            error = %error,
            suppressed_count = occurrences.saturating_sub(1),
            "datagram dropped"
        );
    }
}

/// Handle for accessing UDP listener metrics
#[derive(Clone)]
pub struct UdpMetricsHandle {
    metrics: Arc<SourceMetrics>,
}

impl SourceMetricsProvider for UdpMetricsHandle {
    fn source_id(&self) -> &str {
        "udp"
    }

    fn source_type(&self) -> &str {
        "udp"
    }

    fn snapshot(&self) -> SourceMetricsSnapshot {
        self.metrics.snapshot()
    }
}

//! Notification Ingest - signed notifications over TCP
//!
//! Each connection carries newline-delimited JSON notifications:
//!
//! ```json
//! {"type": "sample", "message_id": "7f3c...", "payload": {...}, "signature": "ab12..."}
//! ```
//!
//! The signature is HMAC-SHA256 (see `tally_protocol::signature`) over
//! `type`, `message_id` and `payload`, so the id used for duplicate
//! detection is as authentic as the payload. An event payload that carries
//! its own `message_id` must agree with the envelope. A message is
//! dispatched only after its signature verifies, its payload decodes and
//! its id has not been seen within the dedup window. Anything else is
//! discarded and counted; the connection and the listener carry on.

use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::{Map, Value};
use tally_config::NotificationListenerConfig;
use tally_metrics::{SourceMetrics, SourceMetricsProvider, SourceMetricsSnapshot};
use tally_pipeline::{DispatchReport, PipelineManager};
use tally_protocol::{Datum, Event, RawEvent, Sample, signature};
use tally_sinks::util::RateLimitedLogger;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;

use crate::dedup::DedupCache;
use crate::{Result, SourceError, ValidationError};

#[cfg(test)]
#[path = "notification_test.rs"]
mod tests;

#[derive(Debug, Deserialize)]
struct Notification {
    #[serde(rename = "type")]
    kind: String,
    message_id: String,
    payload: Map<String, Value>,
    #[serde(default)]
    signature: Option<String>,
}

/// Serialize and sign one notification line, newline included
pub fn encode_notification(
    datum: &Datum,
    message_id: &str,
    secret: &[u8],
) -> std::result::Result<Vec<u8>, ValidationError> {
    let payload = match datum {
        Datum::Sample(s) => serde_json::to_value(s)?,
        Datum::Event(e) => serde_json::to_value(e)?,
    };
    let Value::Object(payload) = payload else {
        return Err(ValidationError::malformed("payload is not an object"));
    };
    let kind = datum.kind().as_str();
    let signature = signature::compute(&signed_fields(kind, message_id, &payload), secret)?;

    let envelope = serde_json::json!({
        "type": kind,
        "message_id": message_id,
        "payload": payload,
        "signature": signature,
    });
    let mut line = serde_json::to_vec(&envelope)?;
    line.push(b'\n');
    Ok(line)
}

/// Consumes signed notifications and dispatches them
pub struct NotificationIngest {
    config: NotificationListenerConfig,
    manager: Arc<PipelineManager>,
    dedup: Mutex<DedupCache>,
    metrics: Arc<SourceMetrics>,
    rejections: RateLimitedLogger,
}

impl NotificationIngest {
    /// # Errors
    /// Returns `SourceError::Config` if no secret is configured
    pub fn new(config: NotificationListenerConfig, manager: Arc<PipelineManager>) -> Result<Self> {
        if config.secret.is_empty() {
            return Err(SourceError::config("notification listener requires a secret"));
        }
        let dedup = DedupCache::new(config.dedup_window, config.dedup_capacity);
        Ok(Self {
            config,
            manager,
            dedup: Mutex::new(dedup),
            metrics: Arc::new(SourceMetrics::new()),
            rejections: RateLimitedLogger::default_interval(),
        })
    }

    /// Get the bind address as a string
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.config.address, self.config.port)
    }

    pub fn metrics(&self) -> &SourceMetrics {
        &self.metrics
    }

    /// Get a metrics handle for the reporter
    pub fn metrics_handle(&self) -> NotificationMetricsHandle {
        NotificationMetricsHandle {
            metrics: Arc::clone(&self.metrics),
        }
    }

    /// Validate, decode and dispatch one message
    ///
    /// Every outcome is counted; a rejection is also logged (rate-limited).
    pub fn ingest(&self, message: &[u8]) -> std::result::Result<DispatchReport, ValidationError> {
        self.metrics.record_received();
        match self.accept(message) {
            Ok(datum) => {
                self.metrics.record_accepted(1);
                Ok(self.manager.dispatch(datum))
            }
            Err(e) => {
                match &e {
                    ValidationError::Duplicate(_) => self.metrics.record_duplicate(),
                    e if e.is_unauthenticated() => self.metrics.record_unauthenticated(),
                    _ => self.metrics.record_malformed(),
                }
                self.log_rejection(&e);
                Err(e)
            }
        }
    }

    fn accept(&self, message: &[u8]) -> std::result::Result<Datum, ValidationError> {
        if message.len() > self.config.max_message_size {
            return Err(ValidationError::TooLarge {
                max: self.config.max_message_size,
            });
        }

        let notification: Notification = serde_json::from_slice(message)?;
        if notification.message_id.is_empty() {
            return Err(ValidationError::malformed("empty message_id"));
        }

        let Some(sig) = notification.signature.as_deref() else {
            return Err(ValidationError::MissingSignature);
        };
        let signed = signed_fields(&notification.kind, &notification.message_id, &notification.payload);
        if !signature::verify(&signed, self.config.secret.as_bytes(), sig) {
            return Err(ValidationError::SignatureMismatch);
        }

        let datum = decode_payload(&notification)?;

        let now = Instant::now();
        let mut dedup = self.dedup.lock();
        if dedup.contains(&notification.message_id, now) {
            return Err(ValidationError::Duplicate(notification.message_id));
        }
        dedup.insert(&notification.message_id, now);
        Ok(datum)
    }

    fn log_rejection(&self, error: &ValidationError) {
        let Some(occurrences) = self.rejections.record() else {
            return;
        };
        tracing::warn!(
            source_id = "notification",
            error = %error,
            suppressed_count = occurrences.saturating_sub(1),
            "notification discarded"
        );
    }

    /// Bind the listener socket
    pub async fn bind(&self) -> Result<TcpListener> {
        let address = self.bind_address();
        TcpListener::bind(&address)
            .await
            .map_err(|e| SourceError::Bind { address, source: e })
    }

    /// Bind and serve until cancelled
    pub async fn run(self: Arc<Self>, cancel: CancellationToken) -> Result<()> {
        let listener = self.bind().await?;
        self.serve(listener, cancel).await;
        Ok(())
    }

    /// Accept connections on an already-bound listener until cancelled
    pub async fn serve(self: Arc<Self>, listener: TcpListener, cancel: CancellationToken) {
        let address = listener
            .local_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| self.bind_address());
        tracing::info!(address = %address, "notification listener started");

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                result = listener.accept() => match result {
                    Ok((stream, peer)) => {
                        let ingest = Arc::clone(&self);
                        let cancel = cancel.clone();
                        tokio::spawn(async move {
                            if let Err(e) = ingest.handle_connection(stream, cancel).await {
                                tracing::debug!(peer = %peer, error = %e, "notification connection error");
                            }
                        });
                    }
                    Err(e) => {
                        // transient accept errors
                        tracing::warn!(error = %e, "accept error");
                        self.metrics.record_failure();
                    }
                },
            }
        }

        tracing::info!("notification listener stopped");
    }

    async fn handle_connection(&self, stream: TcpStream, cancel: CancellationToken) -> std::io::Result<()> {
        let mut reader = BufReader::new(stream);
        let mut line = Vec::with_capacity(4096);

        loop {
            line.clear();
            let frame = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Ok(()),
                frame = read_frame(&mut reader, &mut line, self.config.max_message_size) => frame?,
            };
            match frame {
                Frame::Eof => return Ok(()),
                Frame::Oversize => {
                    self.metrics.record_received();
                    self.metrics.record_malformed();
                    self.log_rejection(&ValidationError::TooLarge {
                        max: self.config.max_message_size,
                    });
                }
                Frame::Line => {
                    let message = trim_line(&line);
                    if !message.is_empty() {
                        let _ = self.ingest(message);
                    }
                }
            }
        }
    }
}

/// Envelope fields covered by the signature
fn signed_fields(kind: &str, message_id: &str, payload: &Map<String, Value>) -> Map<String, Value> {
    let mut fields = Map::new();
    fields.insert("type".to_string(), Value::String(kind.to_string()));
    fields.insert("message_id".to_string(), Value::String(message_id.to_string()));
    fields.insert("payload".to_string(), Value::Object(payload.clone()));
    fields
}

fn decode_payload(notification: &Notification) -> std::result::Result<Datum, ValidationError> {
    let payload = Value::Object(notification.payload.clone());
    match notification.kind.as_str() {
        "sample" => {
            let sample: Sample = serde_json::from_value(payload)?;
            Ok(Datum::Sample(sample))
        }
        "event" => {
            let mut raw: RawEvent = serde_json::from_value(payload)?;
            if raw.message_id.is_empty() {
                raw.message_id = notification.message_id.clone();
            } else if raw.message_id != notification.message_id {
                return Err(ValidationError::malformed(format!(
                    "event message_id '{}' does not match envelope '{}'",
                    raw.message_id, notification.message_id
                )));
            }
            let (event, trait_errors) = Event::decode(raw)?;
            for error in &trait_errors {
                tracing::warn!(
                    message_id = %event.message_id,
                    event_type = %event.event_type,
                    error = %error,
                    "event trait rejected"
                );
            }
            Ok(Datum::Event(event))
        }
        other => Err(ValidationError::UnknownType(other.to_string())),
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Frame {
    Line,
    Oversize,
    Eof,
}

/// Read one newline-terminated frame of at most `max` bytes
///
/// An oversize frame is consumed through its newline and reported without
/// its contents.
async fn read_frame<R: AsyncBufRead + Unpin>(
    reader: &mut R,
    line: &mut Vec<u8>,
    max: usize,
) -> std::io::Result<Frame> {
    let limit = max as u64 + 1;
    let read = (&mut *reader).take(limit).read_until(b'\n', line).await?;
    if read == 0 {
        return Ok(Frame::Eof);
    }
    if line.last() == Some(&b'\n') || line.len() <= max {
        return Ok(Frame::Line);
    }

    let mut discard = Vec::with_capacity(4096);
    loop {
        discard.clear();
        let read = (&mut *reader).take(64 * 1024).read_until(b'\n', &mut discard).await?;
        if read == 0 || discard.last() == Some(&b'\n') {
            return Ok(Frame::Oversize);
        }
    }
}

fn trim_line(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

/// Handle for accessing notification listener metrics
#[derive(Clone)]
pub struct NotificationMetricsHandle {
    metrics: Arc<SourceMetrics>,
}

impl SourceMetricsProvider for NotificationMetricsHandle {
    fn source_id(&self) -> &str {
        "notification"
    }

    fn source_type(&self) -> &str {
        "notification"
    }

    fn snapshot(&self) -> SourceMetricsSnapshot {
        self.metrics.snapshot()
    }
}

impl std::fmt::Debug for NotificationIngest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationIngest")
            .field("address", &self.bind_address())
            .field("dedup_window", &self.config.dedup_window)
            .finish()
    }
}

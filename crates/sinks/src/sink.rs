//! Publisher sink
//!
//! Wraps one dispatcher with a bounded queue, an overflow policy and a
//! bounded retry discipline.
//!
//! ```text
//! pipelines --publish()--> [BoundedQueue] --deliver()--> [Dispatcher]
//!                              │                             │
//!                       overflow policy              retry / backoff
//! ```
//!
//! `publish` only enqueues, so a slow or dead destination never stalls the
//! pipelines feeding it. `deliver` runs on the sink's own task; its backoff
//! sleeps block nothing but that task.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tally_config::{OverflowPolicy, SinkConfig};
use tokio::sync::Notify;
use tokio::time::{MissedTickBehavior, interval, sleep, timeout};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::filter::split_by_resource;
use crate::metrics::{SinkMetrics, SinkMetricsHandle};
use crate::queue::{BoundedQueue, Pushed, Refused};
use crate::registry::DispatcherRegistry;
use crate::util::RateLimitedLogger;
use crate::{
    Batch, DeliveryError, Dispatcher, ResourceFilter, Result, RetryDecision, RetryPolicy, SinkError,
};

/// Queue, retry and filter settings for one sink
#[derive(Debug, Clone)]
pub struct SinkOptions {
    pub queue_size: usize,
    pub overflow_policy: OverflowPolicy,
    pub retry: RetryPolicy,
    /// Idle wake-up of the delivery loop
    pub delivery_interval: Duration,
    /// Upper bound on one dispatcher write; exceeding it is a transient failure
    pub write_timeout: Duration,
    pub filter: ResourceFilter,
}

impl Default for SinkOptions {
    fn default() -> Self {
        Self {
            queue_size: 1024,
            overflow_policy: OverflowPolicy::DropOldest,
            retry: RetryPolicy::default(),
            delivery_interval: Duration::from_secs(1),
            write_timeout: Duration::from_secs(10),
            filter: ResourceFilter::accept_all(),
        }
    }
}

impl SinkOptions {
    /// Resolve options from a sink config
    ///
    /// # Errors
    ///
    /// Fails on an unrecognized overflow policy without a fallback, or on
    /// invalid `meters`/`ignore` patterns.
    pub fn from_config(name: &str, config: &SinkConfig) -> Result<Self> {
        let overflow_policy = config
            .resolve_overflow_policy(name)
            .map_err(|e| SinkError::config(name, e.to_string()))?;
        if config.uses_policy_fallback() {
            warn!(
                sink = %name,
                configured = config.overflow_policy.as_deref().unwrap_or_default(),
                fallback = %overflow_policy,
                "unrecognized overflow policy, using configured fallback"
            );
        }

        Ok(Self {
            queue_size: config.queue_size,
            overflow_policy,
            retry: RetryPolicy::from_config(config),
            delivery_interval: config.delivery_interval,
            write_timeout: config.write_timeout,
            filter: ResourceFilter::from_config(name, config)?,
        })
    }

    #[must_use]
    pub fn with_queue_size(mut self, queue_size: usize) -> Self {
        self.queue_size = queue_size;
        self
    }

    #[must_use]
    pub fn with_overflow_policy(mut self, policy: OverflowPolicy) -> Self {
        self.overflow_policy = policy;
        self
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    #[must_use]
    pub fn with_write_timeout(mut self, write_timeout: Duration) -> Self {
        self.write_timeout = write_timeout;
        self
    }

    #[must_use]
    pub fn with_delivery_interval(mut self, delivery_interval: Duration) -> Self {
        self.delivery_interval = delivery_interval;
        self
    }

    #[must_use]
    pub fn with_filter(mut self, filter: ResourceFilter) -> Self {
        self.filter = filter;
        self
    }
}

/// What `publish` did with a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishOutcome {
    Queued,
    /// Queued after evicting the oldest batches
    QueuedAfterEviction { evicted: usize },
    /// Nothing left after the sink's resource filter
    Filtered,
}

/// Terminal state of one batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Delivered { attempts: u32 },
    /// Every allowed attempt failed transiently
    Exhausted { attempts: u32, reason: String },
    /// The destination refused the batch; not retried
    Rejected { reason: String },
}

/// Counts from one `deliver` pass (per dispatcher write group)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    pub delivered: u64,
    pub exhausted: u64,
    pub rejected: u64,
}

impl DeliveryReport {
    fn record(&mut self, outcome: &DeliveryOutcome) {
        match outcome {
            DeliveryOutcome::Delivered { .. } => self.delivered += 1,
            DeliveryOutcome::Exhausted { .. } => self.exhausted += 1,
            DeliveryOutcome::Rejected { .. } => self.rejected += 1,
        }
    }

    pub fn is_clean(&self) -> bool {
        self.exhausted == 0 && self.rejected == 0
    }
}

/// Result of draining a sink at shutdown
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainReport {
    /// Dispatcher writes delivered during the drain
    pub delivered: u64,
    /// Batches abandoned when the grace period ran out
    pub discarded: u64,
    pub timed_out: bool,
}

/// Queued, retrying delivery endpoint
pub struct PublisherSink {
    name: String,
    dispatcher: Arc<dyn Dispatcher>,
    queue: BoundedQueue<Batch>,
    options: SinkOptions,
    notify: Notify,
    metrics: Arc<SinkMetrics>,
    overflow_log: RateLimitedLogger,
}

impl PublisherSink {
    pub fn new(name: impl Into<String>, dispatcher: Arc<dyn Dispatcher>, options: SinkOptions) -> Self {
        Self {
            name: name.into(),
            dispatcher,
            queue: BoundedQueue::new(options.queue_size),
            options,
            notify: Notify::new(),
            metrics: Arc::new(SinkMetrics::new()),
            overflow_log: RateLimitedLogger::default_interval(),
        }
    }

    /// Build a sink from config, resolving its dispatcher by URL scheme
    pub fn from_config(name: &str, config: &SinkConfig, registry: &DispatcherRegistry) -> Result<Self> {
        let dispatcher = registry.create(name, config)?;
        let options = SinkOptions::from_config(name, config)?;
        Ok(Self::new(name, dispatcher, options))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn scheme(&self) -> &'static str {
        self.dispatcher.scheme()
    }

    pub fn options(&self) -> &SinkOptions {
        &self.options
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    /// Copy of the queued batches, oldest first
    pub fn queued(&self) -> Vec<Batch> {
        self.queue.snapshot()
    }

    pub fn metrics(&self) -> &SinkMetrics {
        &self.metrics
    }

    pub fn metrics_handle(&self) -> SinkMetricsHandle {
        SinkMetricsHandle {
            id: self.name.clone(),
            sink_type: self.dispatcher.scheme(),
            metrics: Arc::clone(&self.metrics),
        }
    }

    /// Stop accepting batches
    pub fn close(&self) {
        self.queue.close();
    }

    pub fn is_closed(&self) -> bool {
        self.queue.is_closed()
    }

    /// Enqueue a batch for delivery
    ///
    /// # Errors
    ///
    /// `SinkError::QueueOverflow` when the queue is full under
    /// drop-and-fail, `SinkError::Closed` after shutdown began.
    pub fn publish(&self, batch: impl Into<Batch>) -> Result<PublishOutcome> {
        if self.is_closed() {
            return Err(SinkError::Closed {
                sink: self.name.clone(),
            });
        }

        let batch = self.options.filter.apply(&self.name, batch.into());
        if batch.is_empty() {
            return Ok(PublishOutcome::Filtered);
        }
        let items = batch.len();

        let outcome = match self.queue.push(batch, self.options.overflow_policy) {
            Ok(Pushed::Queued) => PublishOutcome::Queued,
            Ok(Pushed::Evicted(evicted)) => {
                self.overflow_log.warn(
                    &self.name,
                    "queue full, dropped oldest batches",
                    &format_args!("dropped {evicted} batches"),
                );
                PublishOutcome::QueuedAfterEviction { evicted }
            }
            Err(Refused::Closed(_)) => {
                return Err(SinkError::Closed {
                    sink: self.name.clone(),
                });
            }
            Err(Refused::Full(_)) => {
                self.metrics.record_rejected_overflow();
                self.overflow_log.warn(
                    &self.name,
                    "queue full, refused batch",
                    &format_args!("dropped {items} items"),
                );
                return Err(SinkError::QueueOverflow {
                    sink: self.name.clone(),
                    dropped: items,
                });
            }
        };

        let evicted = match outcome {
            PublishOutcome::QueuedAfterEviction { evicted } => evicted,
            _ => 0,
        };
        self.metrics.record_published(evicted);
        self.metrics.set_queue_depth(self.queue.len());
        self.notify.notify_one();
        Ok(outcome)
    }

    /// Deliver queued batches until the queue is empty
    ///
    /// Each batch is split per resource and every group gets its own
    /// bounded retry, so one resource's rejection does not sink the rest.
    /// Delivered entries are gone from the queue and never re-sent.
    pub async fn deliver(&self) -> DeliveryReport {
        let mut report = DeliveryReport::default();

        while let Some(entry) = self.queue.pop() {
            self.metrics.set_queue_depth(self.queue.len());
            trace!(
                sink = %self.name,
                items = entry.payload.len(),
                queued_ms = entry.enqueued_at.elapsed().as_millis() as u64,
                "delivering batch"
            );

            let mut in_flight = InFlight::new(&self.name, &self.metrics);
            for group in split_by_resource(entry.payload) {
                let outcome = self.deliver_batch(&group).await;
                report.record(&outcome);
            }
            in_flight.finish();
        }

        report
    }

    /// Deliver one batch with bounded retry
    pub async fn deliver_batch(&self, batch: &Batch) -> DeliveryOutcome {
        let mut retry = self.options.retry.start();

        loop {
            let reason = match timeout(self.options.write_timeout, self.dispatcher.write(batch)).await {
                Ok(Ok(())) => {
                    self.metrics.record_delivered(batch.len());
                    return DeliveryOutcome::Delivered {
                        attempts: retry.attempts() + 1,
                    };
                }
                Ok(Err(DeliveryError::Permanent(reason))) => {
                    self.metrics.record_permanent();
                    error!(
                        sink = %self.name,
                        items = batch.len(),
                        reason = %reason,
                        "batch rejected by destination, not retrying"
                    );
                    return DeliveryOutcome::Rejected { reason };
                }
                Ok(Err(DeliveryError::Transient(reason))) => reason,
                Err(_) => format!("write timed out after {:?}", self.options.write_timeout),
            };

            self.metrics.record_transient();
            match retry.next() {
                RetryDecision::Retry(delay) => {
                    warn!(
                        sink = %self.name,
                        attempt = retry.attempts(),
                        max_attempts = self.options.retry.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %reason,
                        "transient delivery failure, will retry"
                    );
                    sleep(delay).await;
                }
                RetryDecision::GiveUp { attempts } => {
                    self.metrics.record_exhausted();
                    error!(
                        sink = %self.name,
                        attempts,
                        items = batch.len(),
                        error = %reason,
                        "delivery retries exhausted, dropping batch"
                    );
                    return DeliveryOutcome::Exhausted { attempts, reason };
                }
            }
        }
    }

    /// Connect the dispatcher with bounded retry
    ///
    /// Returns false if the connection could not be established; the sink
    /// keeps running and its dispatcher reconnects on the next write.
    pub async fn connect(&self, cancel: &CancellationToken) -> bool {
        let mut retry = self.options.retry.start();

        loop {
            let reason = match self.dispatcher.connect().await {
                Ok(()) => {
                    debug!(sink = %self.name, scheme = self.scheme(), "dispatcher connected");
                    return true;
                }
                Err(DeliveryError::Permanent(reason)) => {
                    error!(sink = %self.name, reason = %reason, "dispatcher refused connection");
                    return false;
                }
                Err(DeliveryError::Transient(reason)) => reason,
            };

            match retry.next() {
                RetryDecision::Retry(delay) => {
                    warn!(
                        sink = %self.name,
                        attempt = retry.attempts(),
                        delay_ms = delay.as_millis() as u64,
                        error = %reason,
                        "dispatcher connection failed, will retry"
                    );
                    tokio::select! {
                        _ = cancel.cancelled() => return false,
                        _ = sleep(delay) => {}
                    }
                }
                RetryDecision::GiveUp { attempts } => {
                    warn!(
                        sink = %self.name,
                        attempts,
                        error = %reason,
                        "startup connection retries exhausted, will retry on each batch"
                    );
                    return false;
                }
            }
        }
    }

    /// Run the delivery loop until cancelled, then drain within `grace`
    ///
    /// A delivery already in progress when cancellation arrives keeps
    /// going; it and the rest of the queue share the grace period.
    pub async fn run(self: Arc<Self>, cancel: CancellationToken, grace: Duration) -> DrainReport {
        info!(
            sink = %self.name,
            scheme = self.scheme(),
            queue_size = self.queue.capacity(),
            overflow_policy = %self.options.overflow_policy,
            max_attempts = self.options.retry.max_attempts,
            "publisher sink starting"
        );

        self.connect(&cancel).await;

        let mut ticker = interval(self.options.delivery_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return self.drain(grace).await,
                _ = self.notify.notified() => {}
                _ = ticker.tick() => {}
            }

            let mut delivery = Box::pin(self.deliver());
            let cancelled = tokio::select! {
                _ = &mut delivery => false,
                _ = cancel.cancelled() => true,
            };
            if cancelled {
                return self.finish(delivery, grace).await;
            }
        }
    }

    /// Close the sink and deliver what is queued within `grace`
    ///
    /// Whatever is still queued or in flight when the grace period ends is
    /// discarded and counted.
    pub async fn drain(&self, grace: Duration) -> DrainReport {
        self.finish(self.deliver(), grace).await
    }

    async fn finish(&self, delivery: impl Future<Output = DeliveryReport>, grace: Duration) -> DrainReport {
        self.close();
        let before = self.metrics.snapshot();

        let timed_out = timeout(grace, delivery).await.is_err();
        let leftover = self.queue.clear();
        self.metrics.record_discarded(leftover);
        self.metrics.set_queue_depth(0);

        let after = self.metrics.snapshot();
        let report = DrainReport {
            delivered: after.delivered - before.delivered,
            discarded: after.discarded - before.discarded,
            timed_out,
        };

        if report.discarded > 0 {
            warn!(
                sink = %self.name,
                discarded = report.discarded,
                delivered = report.delivered,
                grace_ms = grace.as_millis() as u64,
                "shutdown grace expired, discarding undelivered batches"
            );
        } else {
            info!(sink = %self.name, delivered = report.delivered, "publisher sink drained");
        }
        report
    }
}

impl std::fmt::Debug for PublisherSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PublisherSink")
            .field("name", &self.name)
            .field("scheme", &self.dispatcher.scheme())
            .field("queued", &self.queue.len())
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// Counts a popped batch as discarded if its delivery is abandoned
struct InFlight<'a> {
    sink: &'a str,
    metrics: &'a SinkMetrics,
    done: bool,
}

impl<'a> InFlight<'a> {
    fn new(sink: &'a str, metrics: &'a SinkMetrics) -> Self {
        Self {
            sink,
            metrics,
            done: false,
        }
    }

    fn finish(&mut self) {
        self.done = true;
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if !self.done {
            self.metrics.record_discarded(1);
            warn!(sink = %self.sink, "in-flight batch abandoned");
        }
    }
}

#[cfg(test)]
#[path = "sink_test.rs"]
mod tests;

//! Poll Scheduler
//!
//! Invokes pollsters on their configured interval and hands the samples to
//! the pipeline manager. Pollsters sharing an interval share one tick group
//! task; groups run independently of each other.
//!
//! Each pollster is `enabled` or `disabled`. A failed poll increments its
//! consecutive-failure counter; reaching the threshold disables it and it
//! is skipped on every later tick until re-enabled through a
//! [`SchedulerHandle`]. A successful poll resets the counter.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::Duration;

use tally_config::PollingConfig;
use tally_metrics::{SourceMetrics, SourceMetricsProvider, SourceMetricsSnapshot};
use tally_pipeline::PipelineManager;
use tally_protocol::Datum;
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::Result;
use crate::discovery::{Discovery, DiscoveryRegistry};
use crate::pollster::{Pollster, PollsterRegistry};

#[cfg(test)]
#[path = "scheduler_test.rs"]
mod tests;

/// Pollster state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollsterState {
    Enabled,
    Disabled,
}

struct PollsterEntry {
    name: String,
    interval: Duration,
    pollster: Arc<dyn Pollster>,
    discovery: Vec<(String, Arc<dyn Discovery>)>,
    enabled: AtomicBool,
    failures: AtomicU32,
}

impl PollsterEntry {
    fn state(&self) -> PollsterState {
        if self.enabled.load(Ordering::Acquire) {
            PollsterState::Enabled
        } else {
            PollsterState::Disabled
        }
    }

    fn record_success(&self) {
        self.failures.store(0, Ordering::Relaxed);
    }

    /// Count a failure; returns the new count and whether this one disabled it
    fn record_failure(&self, threshold: u32) -> (u32, bool) {
        let failures = self.failures.fetch_add(1, Ordering::Relaxed) + 1;
        let disabled = failures >= threshold && self.enabled.swap(false, Ordering::AcqRel);
        (failures, disabled)
    }

    fn enable(&self) {
        self.failures.store(0, Ordering::Relaxed);
        self.enabled.store(true, Ordering::Release);
    }
}

/// What one pass over a set of pollsters did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Pollsters that returned samples
    pub polled: usize,
    /// Pollsters whose poll failed
    pub failed: usize,
    /// Pollsters disabled by this pass
    pub disabled: usize,
    /// Disabled pollsters not invoked
    pub skipped: usize,
    /// Samples handed to the pipeline manager
    pub samples: usize,
}

/// Drives pollsters on their intervals
pub struct PollScheduler {
    entries: Vec<Arc<PollsterEntry>>,
    manager: Arc<PipelineManager>,
    failure_threshold: u32,
    flush_on_cycle: bool,
    metrics: Arc<SourceMetrics>,
}

impl PollScheduler {
    /// Create a scheduler with no pollsters
    ///
    /// A threshold of zero is treated as one.
    pub fn new(manager: Arc<PipelineManager>, failure_threshold: u32) -> Self {
        Self {
            entries: Vec::new(),
            manager,
            failure_threshold: failure_threshold.max(1),
            flush_on_cycle: false,
            metrics: Arc::new(SourceMetrics::new()),
        }
    }

    /// Flush every pipeline chain after each tick that polled something
    #[must_use]
    pub fn with_flush_on_cycle(mut self, flush: bool) -> Self {
        self.flush_on_cycle = flush;
        self
    }

    /// Build the scheduler from the `[polling]` section
    ///
    /// Unknown pollster types fail. Discovery names that are undefined or
    /// whose type cannot be built are skipped with a warning.
    pub fn from_config(
        config: &PollingConfig,
        pollsters: &PollsterRegistry,
        discovery: &DiscoveryRegistry,
        manager: Arc<PipelineManager>,
    ) -> Result<Self> {
        let mut scheduler = Self::new(manager, config.failure_threshold);

        for pollster_config in &config.pollsters {
            let pollster = pollsters.create(pollster_config)?;

            let mut sources = Vec::with_capacity(pollster_config.discovery.len());
            for name in &pollster_config.discovery {
                let Some(definition) = config.discovery.get(name) else {
                    warn!(
                        pollster = %pollster_config.name,
                        discovery = %name,
                        "discovery source is not defined, skipping"
                    );
                    continue;
                };
                match discovery.create(definition) {
                    Ok(source) => sources.push((name.clone(), source)),
                    Err(e) => warn!(
                        pollster = %pollster_config.name,
                        discovery = %name,
                        error = %e,
                        "discovery source unavailable, skipping"
                    ),
                }
            }

            scheduler.add_pollster(
                pollster_config.name.clone(),
                config.interval_for(pollster_config),
                pollster,
                sources,
            );
            if !pollster_config.enabled
                && let Some(entry) = scheduler.entries.last()
            {
                entry.enabled.store(false, Ordering::Release);
            }
        }

        Ok(scheduler)
    }

    /// Add a pollster; it starts enabled
    pub fn add_pollster(
        &mut self,
        name: impl Into<String>,
        interval: Duration,
        pollster: Arc<dyn Pollster>,
        discovery: Vec<(String, Arc<dyn Discovery>)>,
    ) {
        self.entries.push(Arc::new(PollsterEntry {
            name: name.into(),
            interval,
            pollster,
            discovery,
            enabled: AtomicBool::new(true),
            failures: AtomicU32::new(0),
        }));
    }

    /// Number of pollsters
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Handle for inspecting and re-enabling pollsters
    ///
    /// Sees the pollsters added before it was taken.
    pub fn handle(&self) -> SchedulerHandle {
        SchedulerHandle {
            entries: self.entries.clone(),
        }
    }

    pub fn metrics(&self) -> &SourceMetrics {
        &self.metrics
    }

    /// Get a metrics handle for the reporter
    pub fn metrics_handle(&self) -> SchedulerMetricsHandle {
        SchedulerMetricsHandle {
            metrics: Arc::clone(&self.metrics),
            entries: self.entries.clone(),
        }
    }

    /// Poll every pollster once, regardless of interval
    pub async fn poll_once(&self) -> CycleReport {
        self.run_cycle(&self.entries).await
    }

    /// Run the tick groups until cancelled
    ///
    /// A poll in progress when cancellation arrives is abandoned.
    pub async fn run(self, cancel: CancellationToken) {
        let mut groups: BTreeMap<Duration, Vec<Arc<PollsterEntry>>> = BTreeMap::new();
        for entry in &self.entries {
            groups.entry(entry.interval).or_default().push(Arc::clone(entry));
        }

        info!(
            pollsters = self.entries.len(),
            groups = groups.len(),
            threshold = self.failure_threshold,
            "poll scheduler started"
        );

        let scheduler = Arc::new(self);
        let mut tasks = JoinSet::new();
        for (interval, entries) in groups {
            let scheduler = Arc::clone(&scheduler);
            let cancel = cancel.clone();
            tasks.spawn(async move { scheduler.run_group(interval, entries, cancel).await });
        }

        while let Some(result) = tasks.join_next().await {
            if let Err(e) = result {
                warn!(error = %e, "tick group task failed");
            }
        }

        info!("poll scheduler stopped");
    }

    async fn run_group(
        &self,
        interval: Duration,
        entries: Vec<Arc<PollsterEntry>>,
        cancel: CancellationToken,
    ) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                report = self.run_cycle(&entries) => {
                    debug!(
                        interval = ?interval,
                        polled = report.polled,
                        failed = report.failed,
                        skipped = report.skipped,
                        samples = report.samples,
                        "poll cycle complete"
                    );
                }
            }
        }
    }

    async fn run_cycle(&self, entries: &[Arc<PollsterEntry>]) -> CycleReport {
        let mut report = CycleReport::default();

        for entry in entries {
            if entry.state() == PollsterState::Disabled {
                report.skipped += 1;
                continue;
            }
            self.poll_entry(entry, &mut report).await;
        }

        if self.flush_on_cycle && report.polled > 0 {
            let flushed = self.manager.flush_all();
            if flushed.errors > 0 {
                debug!(errors = flushed.errors, "stage errors while flushing after poll cycle");
            }
        }

        report
    }

    async fn poll_entry(&self, entry: &PollsterEntry, report: &mut CycleReport) {
        let resources = self.discover(entry).await;
        self.metrics.record_received();

        match entry.pollster.poll(&resources).await {
            Ok(samples) => {
                entry.record_success();
                let count = samples.len();
                self.manager.dispatch_all(samples.into_iter().map(Datum::from));
                self.metrics.record_accepted(count as u64);
                report.polled += 1;
                report.samples += count;
                debug!(pollster = %entry.name, samples = count, "poll succeeded");
            }
            Err(e) => {
                self.metrics.record_failure();
                report.failed += 1;
                let (failures, disabled) = entry.record_failure(self.failure_threshold);
                if disabled {
                    report.disabled += 1;
                    warn!(
                        pollster = %entry.name,
                        failures,
                        error = %e,
                        "pollster disabled after consecutive failures"
                    );
                } else {
                    warn!(
                        pollster = %entry.name,
                        failures,
                        threshold = self.failure_threshold,
                        error = %e,
                        "poll failed"
                    );
                }
            }
        }
    }

    async fn discover(&self, entry: &PollsterEntry) -> Vec<String> {
        let mut resources: Vec<String> = Vec::new();
        for (name, source) in &entry.discovery {
            match source.discover().await {
                Ok(found) => {
                    for resource in found {
                        if !resources.contains(&resource) {
                            resources.push(resource);
                        }
                    }
                }
                Err(e) => warn!(
                    pollster = %entry.name,
                    discovery = %name,
                    error = %e,
                    "discovery failed, skipping"
                ),
            }
        }
        resources
    }
}

impl fmt::Debug for PollScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PollScheduler")
            .field("pollsters", &self.entries.iter().map(|e| e.name.as_str()).collect::<Vec<_>>())
            .field("failure_threshold", &self.failure_threshold)
            .field("flush_on_cycle", &self.flush_on_cycle)
            .finish()
    }
}

/// Inspects and re-enables pollsters while the scheduler runs
#[derive(Clone)]
pub struct SchedulerHandle {
    entries: Vec<Arc<PollsterEntry>>,
}

impl SchedulerHandle {
    fn find(&self, name: &str) -> Option<&Arc<PollsterEntry>> {
        self.entries.iter().find(|e| e.name == name)
    }

    /// Re-enable a pollster and reset its failure counter
    ///
    /// Returns false if no pollster has that name.
    pub fn enable(&self, name: &str) -> bool {
        let Some(entry) = self.find(name) else {
            return false;
        };
        entry.enable();
        info!(pollster = %name, "pollster re-enabled");
        true
    }

    pub fn state(&self, name: &str) -> Option<PollsterState> {
        self.find(name).map(|e| e.state())
    }

    /// Consecutive failures since the last success
    pub fn failures(&self, name: &str) -> Option<u32> {
        self.find(name).map(|e| e.failures.load(Ordering::Relaxed))
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.name.as_str()).collect()
    }
}

/// Handle for accessing scheduler metrics
#[derive(Clone)]
pub struct SchedulerMetricsHandle {
    metrics: Arc<SourceMetrics>,
    entries: Vec<Arc<PollsterEntry>>,
}

impl SourceMetricsProvider for SchedulerMetricsHandle {
    fn source_id(&self) -> &str {
        "scheduler"
    }

    fn source_type(&self) -> &str {
        "scheduler"
    }

    fn snapshot(&self) -> SourceMetricsSnapshot {
        let mut snapshot = self.metrics.snapshot();
        snapshot.disabled = self
            .entries
            .iter()
            .filter(|e| e.state() == PollsterState::Disabled)
            .count() as u64;
        snapshot
    }
}

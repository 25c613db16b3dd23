//! Metrics reporter
//!
//! Collects snapshots from every registered provider at the configured
//! interval and logs them through tracing, one line per component group.

use std::sync::Arc;
use std::time::Instant;

use tally_config::{MetricsConfig, MetricsFormat};
use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::format::MetricsFormatter;
use crate::{
    CollectedMetrics, CollectedSink, CollectedSource, HumanFormatter, JsonFormatter,
    PipelineMetricsProvider, SinkMetricsProvider, SourceMetricsProvider,
};

/// Builder for constructing a MetricsReporter
#[derive(Default)]
pub struct MetricsReporterBuilder {
    config: Option<MetricsConfig>,
    pipeline: Option<Arc<dyn PipelineMetricsProvider>>,
    sources: Vec<Arc<dyn SourceMetricsProvider>>,
    sinks: Vec<Arc<dyn SinkMetricsProvider>>,
}

impl MetricsReporterBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(mut self, config: MetricsConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn pipeline(mut self, provider: Arc<dyn PipelineMetricsProvider>) -> Self {
        self.pipeline = Some(provider);
        self
    }

    pub fn source(mut self, provider: Arc<dyn SourceMetricsProvider>) -> Self {
        self.sources.push(provider);
        self
    }

    pub fn sources(mut self, providers: Vec<Arc<dyn SourceMetricsProvider>>) -> Self {
        self.sources.extend(providers);
        self
    }

    pub fn sink(mut self, provider: Arc<dyn SinkMetricsProvider>) -> Self {
        self.sinks.push(provider);
        self
    }

    pub fn sinks(mut self, providers: Vec<Arc<dyn SinkMetricsProvider>>) -> Self {
        self.sinks.extend(providers);
        self
    }

    pub fn build(self) -> MetricsReporter {
        let config = self.config.unwrap_or_default();
        let formatter: Box<dyn MetricsFormatter> = match config.format {
            MetricsFormat::Human => Box::new(HumanFormatter::new()),
            MetricsFormat::Json => Box::new(JsonFormatter::new()),
        };

        MetricsReporter {
            config,
            formatter,
            pipeline: self.pipeline,
            sources: self.sources,
            sinks: self.sinks,
            previous: None,
        }
    }
}

/// Periodic metrics reporter
pub struct MetricsReporter {
    config: MetricsConfig,
    formatter: Box<dyn MetricsFormatter>,
    pipeline: Option<Arc<dyn PipelineMetricsProvider>>,
    sources: Vec<Arc<dyn SourceMetricsProvider>>,
    sinks: Vec<Arc<dyn SinkMetricsProvider>>,
    previous: Option<CollectedMetrics>,
}

impl MetricsReporter {
    pub fn builder() -> MetricsReporterBuilder {
        MetricsReporterBuilder::new()
    }

    /// Run the reporter until cancellation
    ///
    /// Emits one last report on the way out so shutdown counters
    /// (discarded batches in particular) are visible.
    pub async fn run(mut self, cancel: CancellationToken) {
        if !self.config.enabled {
            info!("metrics reporting disabled");
            return;
        }

        let mut ticker = interval(self.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // First tick completes immediately; skip it so the first report
        // covers a full interval.
        ticker.tick().await;

        info!(
            interval_secs = self.config.interval.as_secs(),
            format = ?self.config.format,
            "metrics reporter started"
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    self.report();
                    info!("metrics reporter shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    self.report();
                }
            }
        }
    }

    /// Collect and log metrics once
    pub fn report(&mut self) {
        let output = self.render();
        for line in output.lines() {
            info!("{}", line);
        }
    }

    /// Collect and format metrics, remembering them for the next rate
    pub fn render(&mut self) -> String {
        let metrics = self.collect();
        let rates = self.previous.as_ref().and_then(|prev| metrics.rates(prev));
        let output = self.formatter.format(&metrics, rates.as_ref());
        self.previous = Some(metrics);
        output
    }

    /// Collect metrics from all registered providers
    fn collect(&self) -> CollectedMetrics {
        let mut metrics = CollectedMetrics::new();

        if self.config.include_pipelines
            && let Some(ref provider) = self.pipeline
        {
            metrics.pipeline = Some(provider.pipeline_snapshot());
        }

        if self.config.include_sources {
            metrics.sources = self
                .sources
                .iter()
                .map(|s| CollectedSource {
                    id: s.source_id().to_string(),
                    source_type: s.source_type().to_string(),
                    snapshot: s.snapshot(),
                })
                .collect();
        }

        if self.config.include_sinks {
            metrics.sinks = self
                .sinks
                .iter()
                .map(|s| CollectedSink {
                    id: s.sink_id().to_string(),
                    sink_type: s.sink_type().to_string(),
                    snapshot: s.snapshot(),
                })
                .collect();
        }

        metrics
    }

    /// Add a source provider after construction
    pub fn add_source(&mut self, provider: Arc<dyn SourceMetricsProvider>) {
        self.sources.push(provider);
    }

    /// Add a sink provider after construction
    pub fn add_sink(&mut self, provider: Arc<dyn SinkMetricsProvider>) {
        self.sinks.push(provider);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{PipelineSnapshot, SinkMetricsSnapshot, SourceMetrics, SourceMetricsSnapshot};
    use std::time::Duration;

    struct TestPipeline;

    impl PipelineMetricsProvider for TestPipeline {
        fn pipeline_snapshot(&self) -> PipelineSnapshot {
            PipelineSnapshot {
                dispatched: 42,
                generation: 1,
                ..Default::default()
            }
        }
    }

    struct TestSource(SourceMetrics);

    impl SourceMetricsProvider for TestSource {
        fn source_id(&self) -> &str {
            "udp"
        }
        fn source_type(&self) -> &str {
            "udp"
        }
        fn snapshot(&self) -> SourceMetricsSnapshot {
            self.0.snapshot()
        }
    }

    struct TestSink;

    impl SinkMetricsProvider for TestSink {
        fn sink_id(&self) -> &str {
            "warehouse"
        }
        fn sink_type(&self) -> &str {
            "memory"
        }
        fn snapshot(&self) -> SinkMetricsSnapshot {
            SinkMetricsSnapshot {
                queue_depth: 2,
                ..Default::default()
            }
        }
    }

    #[test]
    fn test_render_all_groups() {
        let source = TestSource(SourceMetrics::new());
        source.0.record_received();

        let mut reporter = MetricsReporter::builder()
            .pipeline(Arc::new(TestPipeline))
            .source(Arc::new(source))
            .sink(Arc::new(TestSink))
            .build();

        let output = reporter.render();
        assert!(output.contains("dispatched: 42"));
        assert!(output.contains("udp (1)"));
        assert!(output.contains("warehouse (0, queue 2)"));
    }

    #[test]
    fn test_include_flags() {
        let config = MetricsConfig {
            include_pipelines: false,
            include_sinks: false,
            ..Default::default()
        };
        let mut reporter = MetricsReporter::builder()
            .config(config)
            .pipeline(Arc::new(TestPipeline))
            .sink(Arc::new(TestSink))
            .build();

        assert!(reporter.render().is_empty());
    }

    #[test]
    fn test_json_format() {
        let config = MetricsConfig {
            format: MetricsFormat::Json,
            ..Default::default()
        };
        let mut reporter = MetricsReporter::builder()
            .config(config)
            .pipeline(Arc::new(TestPipeline))
            .build();

        let value: serde_json::Value = serde_json::from_str(&reporter.render()).unwrap();
        assert_eq!(value["pipeline"]["dispatched"], 42);
    }

    #[tokio::test]
    async fn test_run_stops_on_cancel() {
        let config = MetricsConfig {
            interval: Duration::from_millis(10),
            ..Default::default()
        };
        let reporter = MetricsReporter::builder()
            .config(config)
            .pipeline(Arc::new(TestPipeline))
            .build();

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(reporter.run(cancel.clone()));
        tokio::time::sleep(Duration::from_millis(30)).await;
        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_run_disabled_returns() {
        let config = MetricsConfig {
            enabled: false,
            ..Default::default()
        };
        let reporter = MetricsReporter::builder().config(config).build();
        tokio::time::timeout(Duration::from_secs(1), reporter.run(CancellationToken::new()))
            .await
            .unwrap();
    }
}

//! Serve command - run the engine
//!
//! Startup builds everything before anything runs: sinks, the first
//! pipeline generation, the scheduler and the listeners. Shutdown is
//! staged:
//!
//! 1. stop the poll scheduler and the listeners
//! 2. flush every pipeline's transformer chain
//! 3. drain each sink within the grace period, counting what is discarded

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tally_config::Config;
use tally_metrics::{MetricsReporter, SinkMetricsProvider, SourceMetricsProvider};
use tally_pipeline::{FlushReport, PipelineManager};
use tally_sinks::DrainReport;
use tally_sources::{
    NotificationIngest, PollScheduler, SchedulerHandle, UdpListener, default_discovery,
    default_pollsters,
};
use tokio::signal;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Run the serve command
pub async fn run(config_path: Option<PathBuf>) -> Result<()> {
    info!(
        version = env!("CARGO_PKG_VERSION"),
        platform = std::env::consts::OS,
        arch = std::env::consts::ARCH,
        "Tally starting"
    );

    let (config, loaded_from) = super::load_config(config_path.as_deref())?;

    let engine = Engine::start(&config).await?;
    let reload_task = loaded_from.map(|path| spawn_reload_handler(Arc::clone(&engine.manager), path));

    info!(
        generation = engine.manager.generation().number(),
        pipelines = engine.manager.generation().pipelines().len(),
        sinks = engine.manager.sinks().len(),
        pollsters = engine.pollsters.as_ref().map(|h| h.names().len()).unwrap_or(0),
        "Tally running"
    );

    wait_for_shutdown().await;
    info!("shutdown signal received, stopping engine...");

    if let Some(task) = reload_task {
        task.abort();
    }

    let report = engine
        .shutdown(config.global.shutdown_grace, config.global.shutdown_timeout)
        .await;
    if report.discarded > 0 {
        warn!(
            discarded = report.discarded,
            delivered = report.delivered,
            "shutdown discarded undelivered batches"
        );
    }

    info!("Tally shutdown complete");
    Ok(())
}

/// What shutdown released and lost
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ShutdownReport {
    /// Final chain flush
    pub flushed: FlushReport,
    /// Dispatcher writes made while draining
    pub delivered: u64,
    /// Batches abandoned when the grace period ran out
    pub discarded: u64,
    /// Sinks whose drain task did not report back in time
    pub unresponsive_sinks: usize,
}

/// Running engine: the manager plus every task feeding or draining it
struct Engine {
    manager: Arc<PipelineManager>,
    pollsters: Option<SchedulerHandle>,
    sources_cancel: CancellationToken,
    sinks_cancel: CancellationToken,
    metrics_cancel: CancellationToken,
    source_tasks: Vec<(&'static str, JoinHandle<()>)>,
    sink_tasks: Vec<(String, JoinHandle<DrainReport>)>,
    metrics_task: Option<JoinHandle<()>>,
}

impl Engine {
    /// Build every component, then start the tasks
    ///
    /// Nothing is spawned until every component has been built and every
    /// listener socket bound.
    async fn start(config: &Config) -> Result<Self> {
        let dispatchers = tally_sinks::default_registry();
        let manager = Arc::new(
            PipelineManager::from_config(config, &dispatchers, tally_transform::default_registry())
                .context("failed to build pipelines")?,
        );

        let pollsters = default_pollsters(manager.metrics_handle());
        let scheduler = PollScheduler::from_config(
            &config.polling,
            &pollsters,
            &default_discovery(),
            Arc::clone(&manager),
        )
        .context("failed to build poll scheduler")?
        .with_flush_on_cycle(config.global.flush_on_cycle);

        let udp = match &config.listeners.udp {
            Some(udp) if udp.enabled => {
                let listener = UdpListener::new(udp.clone(), Arc::clone(&manager));
                let socket = listener.bind().context("failed to start UDP listener")?;
                Some((listener, socket))
            }
            _ => None,
        };

        let notification = match &config.listeners.notification {
            Some(n) if n.enabled => {
                let ingest = Arc::new(
                    NotificationIngest::new(n.clone(), Arc::clone(&manager))
                        .context("failed to build notification listener")?,
                );
                let listener = ingest
                    .bind()
                    .await
                    .context("failed to start notification listener")?;
                Some((ingest, listener))
            }
            _ => None,
        };

        let sources_cancel = CancellationToken::new();
        let sinks_cancel = CancellationToken::new();
        let metrics_cancel = CancellationToken::new();

        let mut source_metrics: Vec<Arc<dyn SourceMetricsProvider>> = Vec::new();
        let mut source_tasks = Vec::new();

        let pollster_handle = if scheduler.is_empty() {
            None
        } else {
            source_metrics.push(Arc::new(scheduler.metrics_handle()));
            let handle = scheduler.handle();
            source_tasks.push(("scheduler", tokio::spawn(scheduler.run(sources_cancel.clone()))));
            Some(handle)
        };

        if let Some((listener, socket)) = udp {
            source_metrics.push(Arc::new(listener.metrics_handle()));
            source_tasks.push(("udp", tokio::spawn(listener.serve(socket, sources_cancel.clone()))));
        }

        if let Some((ingest, listener)) = notification {
            source_metrics.push(Arc::new(ingest.metrics_handle()));
            source_tasks.push((
                "notification",
                tokio::spawn(ingest.serve(listener, sources_cancel.clone())),
            ));
        }

        let mut sink_metrics: Vec<Arc<dyn SinkMetricsProvider>> = Vec::new();
        let mut sink_tasks = Vec::new();
        for sink in manager.sinks().iter() {
            sink_metrics.push(Arc::new(sink.metrics_handle()));
            let task = tokio::spawn(Arc::clone(sink).run(sinks_cancel.clone(), config.global.shutdown_grace));
            sink_tasks.push((sink.name().to_string(), task));
        }

        let metrics_task = if config.metrics.enabled {
            let reporter = MetricsReporter::builder()
                .config(config.metrics.clone())
                .pipeline(Arc::new(manager.metrics_handle()))
                .sources(source_metrics)
                .sinks(sink_metrics)
                .build();
            Some(tokio::spawn(reporter.run(metrics_cancel.clone())))
        } else {
            info!("metrics reporting disabled");
            None
        };

        Ok(Self {
            manager,
            pollsters: pollster_handle,
            sources_cancel,
            sinks_cancel,
            metrics_cancel,
            source_tasks,
            sink_tasks,
            metrics_task,
        })
    }

    /// Stop sources, flush chains, then drain sinks
    async fn shutdown(self, grace: Duration, stage_timeout: Duration) -> ShutdownReport {
        let mut report = ShutdownReport::default();

        info!("stopping scheduler and listeners...");
        self.sources_cancel.cancel();
        for (name, task) in self.source_tasks {
            match tokio::time::timeout(stage_timeout, task).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!(source = name, error = %e, "source task panicked during shutdown"),
                Err(_) => warn!(source = name, "source did not stop within timeout, continuing shutdown"),
            }
        }

        info!("flushing transformer chains...");
        report.flushed = self.manager.flush_all();
        info!(
            samples = report.flushed.samples,
            errors = report.flushed.errors,
            "transformer chains flushed"
        );

        info!(grace_ms = grace.as_millis() as u64, "draining sinks...");
        self.sinks_cancel.cancel();
        for (name, task) in self.sink_tasks {
            match tokio::time::timeout(grace + stage_timeout, task).await {
                Ok(Ok(drain)) => {
                    report.delivered += drain.delivered;
                    report.discarded += drain.discarded;
                }
                Ok(Err(e)) => {
                    report.unresponsive_sinks += 1;
                    warn!(sink = %name, error = %e, "sink task panicked during drain");
                }
                Err(_) => {
                    report.unresponsive_sinks += 1;
                    warn!(sink = %name, "sink did not finish draining within timeout");
                }
            }
        }

        // the reporter emits a final report on cancel
        self.metrics_cancel.cancel();
        if let Some(task) = self.metrics_task {
            let _ = tokio::time::timeout(stage_timeout, task).await;
        }

        report
    }
}

/// Reload the pipeline section on SIGHUP
///
/// An unreadable or invalid file keeps the running generation. Sinks are
/// built once at startup; changes to `[sinks]` need a restart.
fn spawn_reload_handler(manager: Arc<PipelineManager>, path: PathBuf) -> JoinHandle<()> {
    tokio::spawn(async move {
        #[cfg(unix)]
        {
            let mut hangup = match signal::unix::signal(signal::unix::SignalKind::hangup()) {
                Ok(sig) => sig,
                Err(e) => {
                    warn!(error = %e, "failed to install SIGHUP handler, reload disabled");
                    return;
                }
            };
            info!(config = %path.display(), "SIGHUP handler installed for pipeline reload");
            while hangup.recv().await.is_some() {
                reload_pipelines(&manager, &path);
            }
        }
        #[cfg(not(unix))]
        {
            let _ = (manager, path);
        }
    })
}

fn reload_pipelines(manager: &PipelineManager, path: &Path) {
    let config = match Config::from_file(path) {
        Ok(config) => config,
        Err(e) => {
            error!(config = %path.display(), error = %e, "SIGHUP: invalid configuration, keeping current pipelines");
            return;
        }
    };
    match manager.reload(&config.pipelines) {
        Ok(report) => info!(
            generation = report.generation,
            pipelines = report.pipelines,
            flushed = report.flushed.samples,
            "SIGHUP: pipelines reloaded"
        ),
        Err(e) => error!(error = %e, "SIGHUP: failed to build pipelines, keeping current generation"),
    }
}

/// Wait for SIGINT or SIGTERM
async fn wait_for_shutdown() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[cfg(test)]
#[path = "serve_test.rs"]
mod tests;

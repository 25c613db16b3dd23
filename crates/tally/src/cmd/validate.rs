//! Validate command - load and build a configuration without running it
//!
//! Everything the serve command builds before spawning is built here too:
//! dispatchers, pipelines, the poll scheduler and the notification ingest.
//! Nothing is bound or connected.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use tally_config::Config;
use tally_pipeline::PipelineManager;
use tally_sources::{NotificationIngest, PollScheduler, default_discovery, default_pollsters};

/// Run the validate command
pub fn run(config_path: Option<&Path>) -> Result<()> {
    let (config, loaded_from) = super::load_config(config_path)?;
    let summary = build(&config)?;

    match loaded_from {
        Some(path) => println!("configuration OK: {}", path.display()),
        None => println!("configuration OK: built-in defaults"),
    }
    println!("  sinks:     {}", summary.sinks.join(", "));
    println!("  pipelines: {}", summary.pipelines.join(", "));
    println!("  pollsters: {}", summary.pollsters);
    println!(
        "  listeners: udp={} notification={}",
        on_off(summary.udp),
        on_off(summary.notification)
    );
    Ok(())
}

/// What a configuration builds into
#[derive(Debug)]
struct Summary {
    sinks: Vec<String>,
    pipelines: Vec<String>,
    pollsters: usize,
    udp: bool,
    notification: bool,
}

fn build(config: &Config) -> Result<Summary> {
    let manager = Arc::new(
        PipelineManager::from_config(
            config,
            &tally_sinks::default_registry(),
            tally_transform::default_registry(),
        )
        .context("failed to build pipelines")?,
    );

    let scheduler = PollScheduler::from_config(
        &config.polling,
        &default_pollsters(manager.metrics_handle()),
        &default_discovery(),
        Arc::clone(&manager),
    )
    .context("failed to build poll scheduler")?;

    let notification = match &config.listeners.notification {
        Some(n) if n.enabled => {
            NotificationIngest::new(n.clone(), Arc::clone(&manager))
                .context("failed to build notification listener")?;
            true
        }
        _ => false,
    };

    let generation = manager.generation();
    Ok(Summary {
        sinks: manager.sinks().names().iter().map(|n| n.to_string()).collect(),
        pipelines: generation.names().iter().map(|n| n.to_string()).collect(),
        pollsters: scheduler.len(),
        udp: config.listeners.udp.as_ref().is_some_and(|u| u.enabled),
        notification,
    })
}

fn on_off(enabled: bool) -> &'static str {
    if enabled { "on" } else { "off" }
}

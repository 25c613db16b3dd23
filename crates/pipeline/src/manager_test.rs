use std::str::FromStr;
use std::sync::{Arc, Barrier};
use std::thread;

use tally_config::{Config, PipelineConfig, PipelineKind, PipelinesConfig, TransformerInstanceConfig};
use tally_metrics::PipelineMetricsProvider;
use tally_protocol::{Datum, Event, Sample, SampleType, Utc};
use tally_sinks::{MemoryDispatcher, PublisherSink, SinkOptions, default_registry as dispatchers};
use tally_transform::{
    NoopFactory, TransformResult, Transformer, TransformerFactory, TransformerRegistry,
    default_registry,
};

use super::*;

fn sample(name: &str, value: f64) -> Datum {
    Sample::new(name, SampleType::Gauge, "%", value, "vm-1", Utc::now()).into()
}

fn sink_set(names: &[&str]) -> SinkSet {
    let mut set = SinkSet::new();
    for name in names {
        let sink = PublisherSink::new(*name, Arc::new(MemoryDispatcher::new()), SinkOptions::default());
        set.insert(Arc::new(sink)).unwrap();
    }
    set
}

fn queued_items(manager: &PipelineManager, sink: &str) -> usize {
    manager
        .sinks()
        .get(sink)
        .unwrap()
        .queued()
        .iter()
        .map(|b| b.len())
        .sum()
}

fn pipelines(entries: Vec<(&str, PipelineConfig)>) -> PipelinesConfig {
    let mut config = PipelinesConfig::default();
    for (name, pipeline) in entries {
        config.insert(name, pipeline);
    }
    config
}

fn manager_with(sinks: &[&str], config: PipelinesConfig) -> PipelineManager {
    let manager = PipelineManager::new(sink_set(sinks), default_registry());
    manager.reload(&config).unwrap();
    manager
}

#[test]
fn test_new_manager_starts_empty() {
    let manager = PipelineManager::new(sink_set(&["store"]), default_registry());
    assert_eq!(manager.generation().number(), 0);
    let report = manager.dispatch(sample("cpu", 1.0));
    assert_eq!(report.matched, 0);
    assert_eq!(manager.metrics().snapshot().unmatched, 1);
}

#[test]
fn test_dispatch_fans_out_to_matching_pipelines() {
    let manager = manager_with(
        &["a", "b"],
        pipelines(vec![
            ("cpu", PipelineConfig::new(["cpu*"], ["a"])),
            ("everything", PipelineConfig::new(["*"], ["b"])),
            ("memory", PipelineConfig::new(["memory"], ["a"])),
        ]),
    );

    let report = manager.dispatch(sample("cpu_util", 3.0));
    assert_eq!(report.matched, 2);
    assert_eq!(report.dropped, 0);
    assert_eq!(queued_items(&manager, "a"), 1);
    assert_eq!(queued_items(&manager, "b"), 1);

    let snapshot = manager.metrics_handle().pipeline_snapshot();
    assert_eq!(snapshot.dispatched, 1);
    assert_eq!(snapshot.matched, 2);
}

#[test]
fn test_chain_failure_in_one_pipeline_spares_the_other() {
    let ratio = PipelineConfig::new(["a", "b"], ["derived"]).with_transformer(
        TransformerInstanceConfig::new("arithmetic")
            .with_option("expression", "$(a) / ($(a) + $(b))")
            .with_option("target_name", "ratio"),
    );
    let manager = manager_with(
        &["derived", "raw"],
        pipelines(vec![
            ("ratio", ratio),
            ("raw", PipelineConfig::new(["a", "b"], ["raw"])),
        ]),
    );

    manager.dispatch(sample("a", 1.0));
    let report = manager.dispatch(sample("b", -1.0));

    assert_eq!(report.matched, 2);
    assert_eq!(report.dropped, 1);
    assert_eq!(queued_items(&manager, "derived"), 0);
    assert_eq!(queued_items(&manager, "raw"), 2);
    assert_eq!(manager.metrics().snapshot().chain_errors, 1);
}

#[test]
fn test_events_routed_to_event_pipelines_only() {
    let manager = manager_with(
        &["store", "samples"],
        pipelines(vec![
            (
                "events",
                PipelineConfig::new(["compute.*"], ["store"]).with_kind(PipelineKind::Event),
            ),
            ("all_samples", PipelineConfig::new(["*"], ["samples"])),
        ]),
    );

    let event: Datum = Event::new("compute.instance.create", "m-1", Utc::now()).into();
    let report = manager.dispatch(event);
    assert_eq!(report.matched, 1);
    assert_eq!(queued_items(&manager, "store"), 1);
    assert_eq!(queued_items(&manager, "samples"), 0);
}

#[test]
fn test_reload_swaps_generation() {
    let manager = manager_with(&["a", "b"], pipelines(vec![("cpu", PipelineConfig::new(["cpu"], ["a"]))]));
    assert_eq!(manager.generation().number(), 1);

    let report = manager
        .reload(&pipelines(vec![("cpu", PipelineConfig::new(["cpu"], ["b"]))]))
        .unwrap();
    assert_eq!(report.generation, 2);
    assert_eq!(report.pipelines, 1);

    manager.dispatch(sample("cpu", 1.0));
    assert_eq!(queued_items(&manager, "a"), 0);
    assert_eq!(queued_items(&manager, "b"), 1);

    let snapshot = manager.metrics().snapshot();
    assert_eq!(snapshot.reloads, 2);
    assert_eq!(snapshot.generation, 2);
}

#[test]
fn test_invalid_reload_keeps_running_generation() {
    let manager = manager_with(&["a"], pipelines(vec![("cpu", PipelineConfig::new(["cpu"], ["a"]))]));

    let err = manager
        .reload(&pipelines(vec![("cpu", PipelineConfig::new(["cpu"], ["missing"]))]))
        .unwrap_err();
    assert!(err.to_string().contains("unknown sink 'missing'"));
    assert_eq!(manager.generation().number(), 1);

    manager.dispatch(sample("cpu", 1.0));
    assert_eq!(queued_items(&manager, "a"), 1);
}

#[test]
fn test_event_pipeline_with_transformers_rejected() {
    let manager = PipelineManager::new(sink_set(&["a"]), default_registry());
    let bad = PipelineConfig::new(["*"], ["a"])
        .with_kind(PipelineKind::Event)
        .with_transformer(TransformerInstanceConfig::new("noop"));
    assert!(manager.reload(&pipelines(vec![("events", bad)])).is_err());
}

#[test]
fn test_reload_flushes_retired_generation() {
    let summing = PipelineConfig::new(["requests"], ["store"])
        .with_transformer(TransformerInstanceConfig::new("aggregator").with_option("function", "sum"));
    let manager = manager_with(&["store"], pipelines(vec![("sum", summing)]));

    manager.dispatch(sample("requests", 2.0));
    manager.dispatch(sample("requests", 5.0));
    assert_eq!(queued_items(&manager, "store"), 0);

    let report = manager
        .reload(&pipelines(vec![("sum", PipelineConfig::new(["requests"], ["store"]))]))
        .unwrap();
    assert_eq!(report.flushed.samples, 1);

    let batches = manager.sinks().get("store").unwrap().queued();
    let total = batches[0].samples().next().unwrap();
    assert_eq!(total.volume, 7.0);
}

#[test]
fn test_flush_all_reports_incomplete_arithmetic() {
    let ratio = PipelineConfig::new(["a", "b"], ["store"]).with_transformer(
        TransformerInstanceConfig::new("arithmetic")
            .with_option("expression", "$(a) + $(b)")
            .with_option("target_name", "sum"),
    );
    let manager = manager_with(&["store"], pipelines(vec![("ratio", ratio)]));

    manager.dispatch(sample("a", 1.0));
    let report = manager.flush_all();
    assert_eq!(report.errors, 1);
    assert_eq!(report.samples, 0);

    // cache cleared; the next flush is clean
    assert_eq!(manager.flush_all().errors, 0);
    assert_eq!(manager.metrics().snapshot().flush_errors, 1);
}

#[test]
fn test_from_config() {
    let config = Config::from_str(
        r#"
[sinks.store]
url = "memory://"

[pipelines.cpu]
sources = ["cpu*"]
sinks = ["store"]
"#,
    )
    .unwrap();
    let manager = PipelineManager::from_config(&config, &dispatchers(), default_registry()).unwrap();
    assert_eq!(manager.generation().number(), 1);
    assert_eq!(manager.generation().names(), vec!["cpu"]);
    assert_eq!(manager.metrics().snapshot().reloads, 0);
    assert!(manager.dispatch(sample("cpu_util", 1.0)).matched == 1);
}

/// Holds the first sample until the test releases it
struct Gate {
    entered: Arc<Barrier>,
    release: Arc<Barrier>,
}

impl Transformer for Gate {
    fn transform(&mut self, sample: Sample) -> TransformResult<Vec<Sample>> {
        self.entered.wait();
        self.release.wait();
        Ok(vec![sample])
    }

    fn name(&self) -> &'static str {
        "gate"
    }
}

struct GateFactory {
    entered: Arc<Barrier>,
    release: Arc<Barrier>,
}

impl TransformerFactory for GateFactory {
    fn create(&self, _config: &TransformerInstanceConfig) -> TransformResult<Box<dyn Transformer>> {
        Ok(Box::new(Gate {
            entered: Arc::clone(&self.entered),
            release: Arc::clone(&self.release),
        }))
    }

    fn name(&self) -> &'static str {
        "gate"
    }
}

#[test]
fn test_in_flight_item_finishes_on_old_generation() {
    let entered = Arc::new(Barrier::new(2));
    let release = Arc::new(Barrier::new(2));
    let mut transformers = TransformerRegistry::new();
    transformers.register(
        "gate",
        GateFactory {
            entered: Arc::clone(&entered),
            release: Arc::clone(&release),
        },
    );
    transformers.register("noop", NoopFactory);

    let manager = Arc::new(PipelineManager::new(sink_set(&["store"]), transformers));
    let with_stage = |stage: &str| {
        pipelines(vec![(
            "cpu",
            PipelineConfig::new(["cpu"], ["store"]).with_transformer(TransformerInstanceConfig::new(stage)),
        )])
    };
    manager.reload(&with_stage("gate")).unwrap();

    let worker = {
        let manager = Arc::clone(&manager);
        thread::spawn(move || manager.dispatch(sample("cpu", 1.0)))
    };
    entered.wait();

    let reloader = {
        let manager = Arc::clone(&manager);
        let config = with_stage("noop");
        thread::spawn(move || manager.reload(&config).unwrap())
    };
    while manager.generation().number() != 2 {
        thread::yield_now();
    }

    // new items use the new generation while the old one is still busy
    let fresh = manager.dispatch(sample("cpu", 2.0));
    assert_eq!(fresh.generation, 2);
    assert_eq!(fresh.matched, 1);

    release.wait();
    let in_flight = worker.join().unwrap();
    assert_eq!(in_flight.generation, 1);
    assert_eq!(in_flight.matched, 1);
    assert_eq!(reloader.join().unwrap().generation, 2);

    // each item delivered exactly once
    assert_eq!(queued_items(&manager, "store"), 2);
}

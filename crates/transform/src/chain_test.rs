//! Tests for the transformer chain

use chrono::{TimeZone, Utc};
use tally_protocol::SampleType;

use super::*;
use crate::{
    AggregateFunction, AggregatorConfig, AggregatorTransformer, ArithmeticConfig,
    ArithmeticTransformer, NoopTransformer, TransformError, TransformResult,
};

fn gauge(name: &str, volume: f64) -> Sample {
    let ts = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
    Sample::new(name, SampleType::Gauge, "u", volume, "vm-1", ts)
}

/// Emits each sample twice with the second renamed
struct Fanout;

impl Transformer for Fanout {
    fn transform(&mut self, sample: Sample) -> TransformResult<Vec<Sample>> {
        let copy = sample.derive(
            format!("{}.copy", sample.name),
            sample.sample_type,
            sample.unit.clone(),
            sample.volume,
        );
        Ok(vec![sample, copy])
    }

    fn name(&self) -> &'static str {
        "fanout"
    }
}

/// Fails on transform and flush
struct Broken;

impl Transformer for Broken {
    fn transform(&mut self, _sample: Sample) -> TransformResult<Vec<Sample>> {
        Err(TransformError::failed("broken stage"))
    }

    fn flush(&mut self) -> TransformResult<Vec<Sample>> {
        Err(TransformError::failed("broken flush"))
    }

    fn name(&self) -> &'static str {
        "broken"
    }
}

/// Doubles values
struct Doubler;

impl Transformer for Doubler {
    fn transform(&mut self, sample: Sample) -> TransformResult<Vec<Sample>> {
        let volume = sample.volume * 2.0;
        Ok(vec![sample.derive(
            sample.name.clone(),
            sample.sample_type,
            sample.unit.clone(),
            volume,
        )])
    }

    fn name(&self) -> &'static str {
        "doubler"
    }
}

fn sum_aggregator() -> Box<dyn Transformer> {
    Box::new(AggregatorTransformer::new(AggregatorConfig::new(AggregateFunction::Sum)).unwrap())
}

#[test]
fn test_empty_chain_passes_through() {
    let mut chain = Chain::empty();
    assert!(chain.is_empty());
    let input = gauge("cpu", 1.0);
    assert_eq!(chain.process(input.clone()).unwrap(), vec![input]);
    assert!(chain.flush_all().samples.is_empty());
}

#[test]
fn test_disabled_stages_filtered() {
    let chain = Chain::new(vec![
        Box::new(NoopTransformer::new()),
        Box::new(NoopTransformer::disabled()),
        Box::new(Doubler),
    ]);
    assert_eq!(chain.len(), 2);
    assert_eq!(chain.names(), vec!["noop", "doubler"]);
}

#[test]
fn test_fanout_feeds_every_output_to_next_stage() {
    let mut chain = Chain::new(vec![Box::new(Fanout), Box::new(Doubler)]);
    let out = chain.process(gauge("cpu", 3.0)).unwrap();
    let got: Vec<_> = out.iter().map(|s| (s.name.as_str(), s.volume)).collect();
    assert_eq!(got, vec![("cpu", 6.0), ("cpu.copy", 6.0)]);
}

#[test]
fn test_process_fails_fast_with_position() {
    let mut chain = Chain::new(vec![Box::new(Doubler), Box::new(Broken), Box::new(Fanout)]);
    let err = chain.process(gauge("cpu", 1.0)).unwrap_err();
    assert_eq!(err.stage, "broken");
    assert_eq!(err.position, 1);
}

#[test]
fn test_evaluation_error_aborts_sample() {
    let arithmetic = ArithmeticTransformer::new(
        ArithmeticConfig::new("$(a) / ($(a) + $(b))", "ratio").unwrap(),
    )
    .unwrap();
    let mut chain = Chain::new(vec![Box::new(arithmetic), Box::new(Doubler)]);

    assert!(chain.process(gauge("a", 1.0)).unwrap().is_empty());
    let err = chain.process(gauge("b", -1.0)).unwrap_err();
    assert!(err.error.is_evaluation());

    // The chain keeps working for the next sample.
    let out = chain.process(gauge("c", 2.0)).unwrap();
    assert_eq!(out[0].volume, 4.0);
}

#[test]
fn test_flush_output_runs_through_later_stages() {
    let mut chain = Chain::new(vec![sum_aggregator(), Box::new(Doubler)]);
    assert!(chain.process(gauge("req", 1.0)).unwrap().is_empty());
    assert!(chain.process(gauge("req", 2.0)).unwrap().is_empty());

    let outcome = chain.flush_all();
    assert!(outcome.is_clean());
    assert_eq!(outcome.samples.len(), 1);
    assert_eq!(outcome.samples[0].volume, 6.0);
}

#[test]
fn test_flush_continues_past_errors() {
    let mut chain = Chain::new(vec![sum_aggregator(), Box::new(Broken), sum_aggregator()]);
    chain.process(gauge("req", 1.0)).unwrap();

    let outcome = chain.flush_all();
    // Broken rejects the flushed sample and fails its own flush.
    assert_eq!(outcome.errors.len(), 2);
    assert!(outcome.errors.iter().all(|e| e.stage == "broken" && e.position == 1));
    assert!(outcome.samples.is_empty());
}

#[test]
fn test_flush_collects_from_stage_after_failure() {
    let mut downstream = AggregatorTransformer::new(AggregatorConfig::default()).unwrap();
    downstream.transform(gauge("late", 5.0)).unwrap();

    let mut chain = Chain::new(vec![Box::new(Broken), Box::new(downstream)]);
    let outcome = chain.flush_all();
    assert_eq!(outcome.errors.len(), 1);
    assert_eq!(outcome.samples.len(), 1);
    assert_eq!(outcome.samples[0].name, "late");
}

#[test]
fn test_debug_lists_stages() {
    let chain = Chain::new(vec![Box::new(NoopTransformer::new())]);
    assert_eq!(format!("{chain:?}"), r#"Chain { stages: ["noop"] }"#);
}

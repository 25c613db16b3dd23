use chrono::{Duration, TimeZone, Utc};
use tally_protocol::SampleType;

use super::*;
use crate::EvaluationError;

fn at(secs: i64) -> chrono::DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
}

fn gauge(name: &str, volume: f64, resource: &str, secs: i64) -> Sample {
    Sample::new(name, SampleType::Gauge, "B", volume, resource, at(secs))
}

fn transformer(expression: &str) -> ArithmeticTransformer {
    ArithmeticTransformer::new(ArithmeticConfig::new(expression, "derived").unwrap()).unwrap()
}

#[test]
fn test_sum_of_two_meters() {
    let mut t = transformer("$(a) + $(b)");

    assert!(t.transform(gauge("a", 2.0, "vm-1", 0)).unwrap().is_empty());
    let out = t.transform(gauge("b", 3.0, "vm-1", 1)).unwrap();

    assert_eq!(out.len(), 1);
    assert_eq!(out[0].name, "derived");
    assert_eq!(out[0].volume, 5.0);
    assert_eq!(out[0].resource_id, "vm-1");
    assert_eq!(out[0].sample_type, SampleType::Gauge);
    assert_eq!(out[0].timestamp, at(1));
    assert_eq!(t.pending_resources(), 0);
}

#[test]
fn test_division_by_zero_is_error() {
    let mut t = transformer("$(a) / ($(a) + $(b))");

    t.transform(gauge("a", 1.0, "vm-1", 0)).unwrap();
    let err = t.transform(gauge("b", -1.0, "vm-1", 1)).unwrap_err();

    assert!(matches!(
        err,
        TransformError::Evaluation(EvaluationError::DivisionByZero)
    ));
    assert_eq!(t.pending_resources(), 0);
}

#[test]
fn test_resources_are_independent() {
    let mut t = transformer("$(a) * $(b)");

    t.transform(gauge("a", 2.0, "vm-1", 0)).unwrap();
    t.transform(gauge("a", 5.0, "vm-2", 0)).unwrap();
    let out = t.transform(gauge("b", 10.0, "vm-2", 1)).unwrap();

    assert_eq!(out.len(), 1);
    assert_eq!(out[0].volume, 50.0);
    assert_eq!(out[0].resource_id, "vm-2");
    assert_eq!(t.pending_resources(), 1);
}

#[test]
fn test_latest_value_wins() {
    let mut t = transformer("$(a) - $(b)");

    t.transform(gauge("a", 1.0, "vm-1", 0)).unwrap();
    t.transform(gauge("a", 7.0, "vm-1", 1)).unwrap();
    let out = t.transform(gauge("b", 2.0, "vm-1", 2)).unwrap();

    assert_eq!(out[0].volume, 5.0);
}

#[test]
fn test_unreferenced_meter_passes_through() {
    let mut t = transformer("$(a) + $(b)");
    let other = gauge("c", 1.0, "vm-1", 0);
    assert_eq!(t.transform(other.clone()).unwrap(), vec![other]);
}

#[test]
fn test_passthrough_forwards_inputs() {
    let config = ArithmeticConfig::new("$(a) + $(b)", "sum")
        .unwrap()
        .with_passthrough(true);
    let mut t = ArithmeticTransformer::new(config).unwrap();

    let a = gauge("a", 1.0, "vm-1", 0);
    assert_eq!(t.transform(a.clone()).unwrap(), vec![a]);

    let out = t.transform(gauge("b", 2.0, "vm-1", 0)).unwrap();
    assert_eq!(out.len(), 2);
    assert_eq!(out[0].name, "b");
    assert_eq!(out[1].name, "sum");
}

#[test]
fn test_target_unit_and_type() {
    let config = ArithmeticConfig::new("$(a)", "a_total")
        .unwrap()
        .with_unit("GB")
        .with_type(SampleType::Cumulative);
    let mut t = ArithmeticTransformer::new(config).unwrap();

    let out = t.transform(gauge("a", 4.0, "vm-1", 0)).unwrap();
    assert_eq!(out[0].unit, "GB");
    assert_eq!(out[0].sample_type, SampleType::Cumulative);
}

#[test]
fn test_derived_keeps_identity() {
    let mut t = transformer("$(a) + $(b)");
    let a = gauge("a", 1.0, "vm-1", 0).with_project("p1").with_source("compute");
    let b = gauge("b", 1.0, "vm-1", 0).with_project("p1").with_source("compute");

    t.transform(a).unwrap();
    let out = t.transform(b).unwrap();
    assert_eq!(out[0].project_id.as_deref(), Some("p1"));
    assert_eq!(out[0].source, "compute");
}

#[test]
fn test_flush_reports_incomplete() {
    let mut t = transformer("$(a) + $(b)");
    t.transform(gauge("a", 1.0, "vm-2", 0)).unwrap();
    t.transform(gauge("a", 1.0, "vm-1", 0)).unwrap();

    let err = t.flush().unwrap_err();
    match err {
        TransformError::Incomplete { target, resources } => {
            assert_eq!(target, "derived");
            assert_eq!(resources, vec!["vm-1".to_string(), "vm-2".to_string()]);
        }
        other => panic!("unexpected error: {other}"),
    }

    assert_eq!(t.pending_resources(), 0);
    assert!(t.flush().unwrap().is_empty());
}

#[test]
fn test_timestamp_is_newest_input() {
    let mut t = transformer("$(a) + $(b)");
    t.transform(gauge("a", 1.0, "vm-1", 0)).unwrap();
    let mut b = gauge("b", 1.0, "vm-1", 0);
    b.timestamp = at(0) - Duration::seconds(5);
    let out = t.transform(b).unwrap();
    assert_eq!(out[0].timestamp, at(0));
}

#[test]
fn test_factory_rejects_constant_expression() {
    let config = TransformerInstanceConfig::new("arithmetic")
        .with_option("expression", "1 + 1")
        .with_option("target_name", "two");
    assert!(matches!(
        ArithmeticFactory.create(&config),
        Err(TransformError::Config(_))
    ));
}

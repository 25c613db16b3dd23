//! Tests for Sample and SampleType

use crate::{Sample, SampleType};
use chrono::{TimeZone, Utc};
use std::str::FromStr;

fn cpu_sample(volume: f64) -> Sample {
    Sample::new(
        "cpu",
        SampleType::Cumulative,
        "ns",
        volume,
        "vm-1",
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
    )
}

#[test]
fn test_sample_type_from_str() {
    assert_eq!(SampleType::from_str("gauge").unwrap(), SampleType::Gauge);
    assert_eq!(SampleType::from_str("delta").unwrap(), SampleType::Delta);
    assert_eq!(
        SampleType::from_str("cumulative").unwrap(),
        SampleType::Cumulative
    );
    assert!(SampleType::from_str("counter").is_err());
}

#[test]
fn test_sample_type_sequenced() {
    assert!(!SampleType::Gauge.is_sequenced());
    assert!(SampleType::Delta.is_sequenced());
    assert!(SampleType::Cumulative.is_sequenced());
}

#[test]
fn test_derive_keeps_identity() {
    let input = cpu_sample(100.0)
        .with_source("engine")
        .with_project("p1")
        .with_metadata("flavor", serde_json::json!("m1.small"));

    let derived = input.derive("cpu_util", SampleType::Gauge, "%", 42.0);

    assert_eq!(derived.name, "cpu_util");
    assert_eq!(derived.sample_type, SampleType::Gauge);
    assert_eq!(derived.volume, 42.0);
    assert_eq!(derived.resource_id, "vm-1");
    assert_eq!(derived.project_id.as_deref(), Some("p1"));
    assert_eq!(derived.source, "engine");
    assert_eq!(derived.metadata.get("flavor"), Some(&serde_json::json!("m1.small")));
    // input untouched
    assert_eq!(input.name, "cpu");
    assert_eq!(input.volume, 100.0);
}

#[test]
fn test_sample_json_shape() {
    let json = serde_json::to_value(cpu_sample(5.0)).unwrap();
    assert_eq!(json["type"], "cumulative");
    assert_eq!(json["volume"], 5.0);
    assert!(json.get("project_id").is_none());
    assert!(json.get("metadata").is_none());
}

#[test]
fn test_sample_accepts_value_alias() {
    let json = r#"{
        "name": "memory", "type": "gauge", "unit": "MB", "value": 512,
        "resource_id": "vm-2", "timestamp": "2024-05-01T12:00:00Z"
    }"#;
    let sample: Sample = serde_json::from_str(json).unwrap();
    assert_eq!(sample.volume, 512.0);
    assert_eq!(sample.source, "");
}

#[test]
fn test_sample_key() {
    let sample = cpu_sample(1.0);
    assert_eq!(sample.key(), ("cpu", "vm-1"));
}

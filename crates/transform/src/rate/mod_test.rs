use chrono::{TimeZone, Utc};

use super::*;

fn cpu(volume: f64, secs: i64) -> Sample {
    let ts = Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap();
    Sample::new("cpu", SampleType::Cumulative, "ns", volume, "vm-1", ts)
}

#[test]
fn test_rate_per_second() {
    let mut t = RateOfChangeTransformer::new(RateOfChangeConfig::default());
    assert!(t.transform(cpu(0.0, 0)).unwrap().is_empty());

    let out = t.transform(cpu(1000.0, 10)).unwrap();
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].name, "cpu.rate");
    assert_eq!(out[0].unit, "ns/s");
    assert_eq!(out[0].sample_type, SampleType::Gauge);
    assert_eq!(out[0].volume, 100.0);
}

#[test]
fn test_scaled_to_percent() {
    let config = RateOfChangeConfig::default()
        .with_target("cpu_util", "%")
        .with_scale(Scale::parse("100.0 / (10**9 * 4)").unwrap());
    let mut t = RateOfChangeTransformer::new(config);

    t.transform(cpu(0.0, 0)).unwrap();
    // Two of four cores busy for 10s.
    let out = t.transform(cpu(2e10, 10)).unwrap();
    assert_eq!(out[0].name, "cpu_util");
    assert_eq!(out[0].unit, "%");
    assert!((out[0].volume - 50.0).abs() < 1e-9);
}

#[test]
fn test_reset_counts_from_zero() {
    let mut t = RateOfChangeTransformer::new(RateOfChangeConfig::default());
    t.transform(cpu(5000.0, 0)).unwrap();
    let out = t.transform(cpu(200.0, 10)).unwrap();
    assert_eq!(out[0].volume, 20.0);
}

#[test]
fn test_equal_timestamp_dropped() {
    let mut t = RateOfChangeTransformer::new(RateOfChangeConfig::default());
    t.transform(cpu(0.0, 0)).unwrap();
    assert!(t.transform(cpu(10.0, 0)).unwrap().is_empty());
}

#[test]
fn test_out_of_order_dropped() {
    let mut t = RateOfChangeTransformer::new(RateOfChangeConfig::default());
    t.transform(cpu(100.0, 10)).unwrap();
    assert!(t.transform(cpu(50.0, 5)).unwrap().is_empty());
}

#[test]
fn test_source_filter_and_non_cumulative_pass() {
    let mut t = RateOfChangeTransformer::new(RateOfChangeConfig::default().with_source("disk"));
    let input = cpu(1.0, 0);
    assert_eq!(t.transform(input.clone()).unwrap(), vec![input]);

    let mut t = RateOfChangeTransformer::new(RateOfChangeConfig::default());
    let gauge = Sample::new("load", SampleType::Gauge, "", 1.5, "vm-1", Utc::now());
    assert_eq!(t.transform(gauge.clone()).unwrap(), vec![gauge]);
}

#[test]
fn test_from_instance_config() {
    let instance = TransformerInstanceConfig::new("rate_of_change")
        .with_option("target_name", "cpu_util")
        .with_option("target_unit", "%")
        .with_option("scale", "100.0 / (10**9 * 4)");
    let config = RateOfChangeConfig::try_from(&instance).unwrap();
    assert_eq!(config.target_name.as_deref(), Some("cpu_util"));
    assert!(matches!(config.scale, Scale::Factor(_)));
}

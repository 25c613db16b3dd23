use tally_protocol::Utc;

use super::*;
use crate::EvaluationError;

fn bytes(volume: f64) -> Sample {
    Sample::new("disk.read.bytes", SampleType::Cumulative, "B", volume, "vm-1", Utc::now())
}

#[test]
fn test_scale_expression() {
    let config = UnitConversionConfig::new()
        .with_target_name("disk.read.kilobytes")
        .with_target_unit("KB")
        .with_scale(Scale::parse("$(volume) / 1024").unwrap());
    let mut t = UnitConversionTransformer::new(config);

    let out = t.transform(bytes(4096.0)).unwrap();
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].name, "disk.read.kilobytes");
    assert_eq!(out[0].unit, "KB");
    assert_eq!(out[0].volume, 4.0);
    assert_eq!(out[0].sample_type, SampleType::Cumulative);
}

#[test]
fn test_factor_and_type() {
    let config = UnitConversionConfig::new()
        .with_scale(Scale::Factor(8.0))
        .with_target_unit("bit")
        .with_target_type(SampleType::Gauge);
    let mut t = UnitConversionTransformer::new(config);

    let out = t.transform(bytes(2.0)).unwrap();
    assert_eq!(out[0].name, "disk.read.bytes");
    assert_eq!(out[0].volume, 16.0);
    assert_eq!(out[0].sample_type, SampleType::Gauge);
}

#[test]
fn test_source_filter() {
    let config = UnitConversionConfig::new()
        .with_source("memory")
        .with_scale(Scale::Factor(2.0));
    let mut t = UnitConversionTransformer::new(config);

    let input = bytes(3.0);
    assert_eq!(t.transform(input.clone()).unwrap(), vec![input]);
}

#[test]
fn test_evaluation_error_propagates() {
    let config = UnitConversionConfig::new().with_scale(Scale::parse("1 / $(volume)").unwrap());
    let mut t = UnitConversionTransformer::new(config);

    assert!(matches!(
        t.transform(bytes(0.0)),
        Err(TransformError::Evaluation(EvaluationError::DivisionByZero))
    ));
}

#[test]
fn test_from_instance_config() {
    let instance = TransformerInstanceConfig::new("unit_conversion")
        .with_option("target_unit", "MB")
        .with_option("scale", "$(volume) / 1048576")
        .with_option("target_type", "gauge");
    let config = UnitConversionConfig::try_from(&instance).unwrap();
    assert_eq!(config.target_unit.as_deref(), Some("MB"));
    assert_eq!(config.target_type, Some(SampleType::Gauge));
    assert!(matches!(config.scale, Scale::Expression(_)));
}

#[test]
fn test_bad_scale_reference_rejected() {
    let instance = TransformerInstanceConfig::new("unit_conversion")
        .with_option("scale", "$(memory) * 2");
    assert!(UnitConversionFactory.create(&instance).is_err());
}

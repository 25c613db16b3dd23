use super::*;

#[test]
fn test_defaults() {
    let config = AggregatorConfig::default();
    assert!(config.enabled);
    assert_eq!(config.function, AggregateFunction::Sum);
    assert!(config.size.is_none());
    assert!(config.retention.is_none());
    assert!(config.validate().is_ok());
}

#[test]
fn test_from_instance_config() {
    let instance = TransformerInstanceConfig::new("aggregator")
        .with_option("function", "avg")
        .with_option("size", 10)
        .with_option("retention_secs", 30)
        .with_option("group_by", toml::Value::Array(vec!["project_id".into()]));

    let config = AggregatorConfig::try_from(&instance).unwrap();
    assert_eq!(config.function, AggregateFunction::Avg);
    assert_eq!(config.size, Some(10));
    assert_eq!(config.retention, Some(Duration::from_secs(30)));
    assert_eq!(config.group_by, vec![GroupField::ProjectId]);
}

#[test]
fn test_unknown_function() {
    let instance = TransformerInstanceConfig::new("aggregator").with_option("function", "median");
    assert!(AggregatorConfig::try_from(&instance).unwrap_err().contains("median"));
}

#[test]
fn test_zero_size_rejected() {
    let instance = TransformerInstanceConfig::new("aggregator").with_option("size", 0);
    assert!(AggregatorConfig::try_from(&instance).is_err());
    assert!(AggregatorConfig::default().with_size(0).validate().is_err());
}

#[test]
fn test_bad_retention_rejected() {
    let instance = TransformerInstanceConfig::new("aggregator").with_option("retention_secs", -1);
    assert!(AggregatorConfig::try_from(&instance).is_err());
}

#[test]
fn test_bad_group_field_rejected() {
    let instance = TransformerInstanceConfig::new("aggregator")
        .with_option("group_by", toml::Value::Array(vec!["hostname".into()]));
    assert!(AggregatorConfig::try_from(&instance).unwrap_err().contains("hostname"));
}

#[test]
fn test_function_round_trip_names() {
    for name in ["sum", "avg", "min", "max", "last", "count"] {
        let function: AggregateFunction = name.parse().unwrap();
        assert_eq!(function.to_string(), name);
    }
}

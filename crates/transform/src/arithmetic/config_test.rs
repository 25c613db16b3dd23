use super::*;

#[test]
fn test_from_instance_config() {
    let instance = TransformerInstanceConfig::new("arithmetic")
        .with_option("expression", "$(memory.usage) * 100 / $(memory)")
        .with_option("target_name", "memory_util")
        .with_option("target_unit", "%")
        .with_option("passthrough", true);

    let config = ArithmeticConfig::try_from(&instance).unwrap();
    assert!(config.enabled);
    assert_eq!(config.target_name, "memory_util");
    assert_eq!(config.target_unit, "%");
    assert_eq!(config.target_type, SampleType::Gauge);
    assert!(config.passthrough);
    assert_eq!(
        config.expression.references(),
        &["memory.usage".to_string(), "memory".to_string()]
    );
}

#[test]
fn test_zero_references_rejected() {
    let instance = TransformerInstanceConfig::new("arithmetic")
        .with_option("expression", "2 + 3")
        .with_option("target_name", "five");

    let err = ArithmeticConfig::try_from(&instance).unwrap_err();
    assert!(err.contains("references no meters"), "{err}");
}

#[test]
fn test_missing_expression() {
    let instance = TransformerInstanceConfig::new("arithmetic").with_option("target_name", "x");
    assert!(ArithmeticConfig::try_from(&instance).unwrap_err().contains("expression"));
}

#[test]
fn test_missing_target_name() {
    let instance = TransformerInstanceConfig::new("arithmetic").with_option("expression", "$(a)");
    assert!(ArithmeticConfig::try_from(&instance).unwrap_err().contains("target_name"));
}

#[test]
fn test_bad_target_type() {
    let instance = TransformerInstanceConfig::new("arithmetic")
        .with_option("expression", "$(a)")
        .with_option("target_name", "b")
        .with_option("target_type", "histogram");
    assert!(ArithmeticConfig::try_from(&instance).unwrap_err().contains("target_type"));
}

#[test]
fn test_self_reference_rejected() {
    assert!(ArithmeticConfig::new("$(a) * 2", "a").is_err());
}

#[test]
fn test_parse_error_mentions_expression() {
    let err = ArithmeticConfig::new("$(a) +", "b").unwrap_err();
    assert!(err.starts_with("expression '$(a) +'"), "{err}");
}

#[test]
fn test_builders() {
    let config = ArithmeticConfig::new("$(a)", "b")
        .unwrap()
        .with_unit("B")
        .with_type(SampleType::Delta)
        .with_passthrough(true);
    assert_eq!(config.target_unit, "B");
    assert_eq!(config.target_type, SampleType::Delta);
    assert!(config.passthrough);
}

//! Tests for configuration validation

use crate::{Config, ConfigError};
use std::str::FromStr;

const SINKS: &str = r#"
[sinks.store]
url = "memory://"
"#;

fn parse(extra: &str) -> crate::Result<Config> {
    Config::from_str(&format!("{SINKS}\n{extra}"))
}

#[test]
fn test_valid_minimal_config() {
    let config = parse(
        r#"
[pipelines.cpu]
sources = ["cpu"]
sinks = ["store"]
"#,
    );
    assert!(config.is_ok());
}

#[test]
fn test_pipeline_unknown_sink() {
    let err = parse(
        r#"
[pipelines.cpu]
sources = ["cpu"]
sinks = ["store", "nowhere"]
"#,
    )
    .unwrap_err();
    assert!(matches!(err, ConfigError::UnknownSink { ref sink, .. } if sink == "nowhere"));
}

#[test]
fn test_pipeline_disabled_sink() {
    let err = Config::from_str(
        r#"
[sinks.off]
url = "null://"
enabled = false

[pipelines.cpu]
sources = ["cpu"]
sinks = ["off"]
"#,
    )
    .unwrap_err();
    assert!(err.to_string().contains("disabled"));
}

#[test]
fn test_pipeline_without_sources() {
    let err = parse(
        r#"
[pipelines.cpu]
sinks = ["store"]
"#,
    )
    .unwrap_err();
    assert!(matches!(err, ConfigError::MissingField { field: "sources", .. }));
}

#[test]
fn test_pipeline_without_sinks() {
    let err = parse(
        r#"
[pipelines.cpu]
sources = ["cpu"]
"#,
    )
    .unwrap_err();
    assert!(matches!(err, ConfigError::MissingField { field: "sinks", .. }));
}

#[test]
fn test_unknown_transformer_type() {
    let err = parse(
        r#"
[pipelines.cpu]
sources = ["cpu"]
sinks = ["store"]

[[pipelines.cpu.transformers]]
type = "magic"
"#,
    )
    .unwrap_err();
    assert!(err.to_string().contains("unknown transformer type 'magic'"));
}

#[test]
fn test_event_pipeline_rejects_transformers() {
    let err = parse(
        r#"
[pipelines.events]
kind = "event"
sources = ["*"]
sinks = ["store"]

[[pipelines.events.transformers]]
type = "noop"
"#,
    )
    .unwrap_err();
    assert!(err.to_string().contains("event pipelines"));
}

#[test]
fn test_sink_missing_url() {
    let err = Config::from_str("[sinks.x]\nqueue_size = 3").unwrap_err();
    assert!(matches!(err, ConfigError::MissingField { field: "url", .. }));
}

#[test]
fn test_sink_unknown_scheme() {
    let err = Config::from_str("[sinks.x]\nurl = \"kafka://broker\"").unwrap_err();
    assert!(err.to_string().contains("unknown scheme 'kafka'"));
}

#[test]
fn test_sink_zero_queue() {
    let err = Config::from_str("[sinks.x]\nurl = \"null://\"\nqueue_size = 0").unwrap_err();
    assert!(matches!(err, ConfigError::InvalidValue { field: "queue_size", .. }));
}

#[test]
fn test_sink_zero_retries() {
    let err = Config::from_str("[sinks.x]\nurl = \"null://\"\nmax_retries = 0").unwrap_err();
    assert!(matches!(err, ConfigError::InvalidValue { field: "max_retries", .. }));
}

#[test]
fn test_sink_unrecognized_policy_rejected_at_load() {
    let err = Config::from_str(
        r#"
[sinks.x]
url = "null://"
overflow_policy = "block"
"#,
    )
    .unwrap_err();
    assert!(matches!(err, ConfigError::InvalidValue { field: "overflow_policy", .. }));
}

#[test]
fn test_sink_unrecognized_policy_with_fallback_loads() {
    let config = Config::from_str(
        r#"
[sinks.x]
url = "null://"
overflow_policy = "block"
policy_fallback = "drop-oldest"
"#,
    );
    assert!(config.is_ok());
}

#[test]
fn test_disabled_sink_skips_validation() {
    let config = Config::from_str("[sinks.x]\nurl = \"\"\nenabled = false");
    assert!(config.is_ok());
}

#[test]
fn test_duplicate_pollster_names() {
    let err = Config::from_str(
        r#"
[[polling.pollsters]]
name = "a"
type = "engine"

[[polling.pollsters]]
name = "a"
type = "engine"
"#,
    )
    .unwrap_err();
    assert!(matches!(err, ConfigError::DuplicateName { component: "pollster", .. }));
}

#[test]
fn test_zero_failure_threshold() {
    let err = Config::from_str("[polling]\nfailure_threshold = 0").unwrap_err();
    assert!(err.to_string().contains("failure_threshold"));
}

#[test]
fn test_notification_listener_requires_secret() {
    let err = Config::from_str("[listeners.notification]\nport = 4953").unwrap_err();
    assert!(matches!(err, ConfigError::MissingField { field: "secret", .. }));

    let ok = Config::from_str("[listeners.notification]\nsecret = \"s\"");
    assert!(ok.is_ok());
}

//! Configuration validation
//!
//! Validates config consistency before anything is built:
//! - Sinks referenced by pipelines exist and are enabled
//! - Sink URLs name a known scheme; queue, retry and overflow settings are usable
//! - Pipelines have sources and sinks; event pipelines have no transformers
//! - Transformer types are known
//! - Pollster names are unique; threshold and intervals are non-zero
//! - The notification listener has a secret and a usable dedup capacity

use crate::Config;
use crate::error::{ConfigError, Result};
use crate::pipelines::PipelineKind;
use crate::sinks::KNOWN_SINK_SCHEMES;
use crate::transformers::is_known_transformer_type;
use std::collections::HashSet;

/// Validate the entire configuration
pub fn validate_config(config: &Config) -> Result<()> {
    validate_sinks(config)?;
    validate_pipelines(config)?;
    validate_polling(config)?;
    validate_listeners(config)?;
    Ok(())
}

fn validate_sinks(config: &Config) -> Result<()> {
    for (name, sink) in config.sinks.iter() {
        if !sink.enabled {
            continue;
        }

        if sink.url.is_empty() {
            return Err(ConfigError::missing_field("sink", name, "url"));
        }
        match sink.scheme() {
            Some(scheme) if KNOWN_SINK_SCHEMES.contains(&scheme) => {}
            Some(scheme) => {
                return Err(ConfigError::invalid_value(
                    "sink",
                    name,
                    "url",
                    format!(
                        "unknown scheme '{scheme}', expected one of: {}",
                        KNOWN_SINK_SCHEMES.join(", ")
                    ),
                ));
            }
            None => {
                return Err(ConfigError::invalid_value(
                    "sink",
                    name,
                    "url",
                    "expected '<scheme>://<target>'",
                ));
            }
        }

        if sink.queue_size == 0 {
            return Err(ConfigError::invalid_value(
                "sink",
                name,
                "queue_size",
                "must be at least 1",
            ));
        }
        if sink.max_retries == 0 {
            return Err(ConfigError::invalid_value(
                "sink",
                name,
                "max_retries",
                "must be at least 1",
            ));
        }
        if !(sink.retry_backoff_multiplier.is_finite() && sink.retry_backoff_multiplier >= 1.0) {
            return Err(ConfigError::invalid_value(
                "sink",
                name,
                "retry_backoff_multiplier",
                "must be a finite number >= 1.0",
            ));
        }
        if sink.retry_backoff > sink.retry_backoff_max {
            return Err(ConfigError::invalid_value(
                "sink",
                name,
                "retry_backoff",
                "cannot exceed retry_backoff_max",
            ));
        }
        if sink.delivery_interval.is_zero() {
            return Err(ConfigError::invalid_value(
                "sink",
                name,
                "delivery_interval",
                "must be greater than 0",
            ));
        }

        sink.resolve_overflow_policy(name)?;
    }

    Ok(())
}

fn validate_pipelines(config: &Config) -> Result<()> {
    for (name, pipeline) in config.pipelines.iter() {
        if pipeline.sources.is_empty() {
            return Err(ConfigError::missing_field("pipeline", name, "sources"));
        }
        if pipeline.sinks.is_empty() {
            return Err(ConfigError::missing_field("pipeline", name, "sinks"));
        }

        for sink_name in &pipeline.sinks {
            match config.sinks.get(sink_name) {
                Some(sink) if sink.enabled => {}
                Some(_) => {
                    return Err(ConfigError::invalid_value(
                        "pipeline",
                        name,
                        "sinks",
                        format!("sink '{sink_name}' is disabled"),
                    ));
                }
                None => return Err(ConfigError::unknown_sink(name, sink_name)),
            }
        }

        if pipeline.kind == PipelineKind::Event && !pipeline.transformers.is_empty() {
            return Err(ConfigError::invalid_value(
                "pipeline",
                name,
                "transformers",
                "event pipelines cannot have transformers",
            ));
        }

        for transformer in &pipeline.transformers {
            if !is_known_transformer_type(&transformer.transformer_type) {
                return Err(ConfigError::invalid_value(
                    "pipeline",
                    name,
                    "transformers",
                    format!(
                        "unknown transformer type '{}'",
                        transformer.transformer_type
                    ),
                ));
            }
        }
    }

    Ok(())
}

fn validate_polling(config: &Config) -> Result<()> {
    let polling = &config.polling;
    if polling.failure_threshold == 0 {
        return Err(ConfigError::invalid_value(
            "polling",
            "polling",
            "failure_threshold",
            "must be at least 1",
        ));
    }
    if polling.default_interval.is_zero() {
        return Err(ConfigError::invalid_value(
            "polling",
            "polling",
            "default_interval",
            "must be greater than 0",
        ));
    }

    let mut names = HashSet::new();
    for pollster in &polling.pollsters {
        if pollster.name.is_empty() {
            return Err(ConfigError::missing_field("pollster", "<unnamed>", "name"));
        }
        if !names.insert(pollster.name.as_str()) {
            return Err(ConfigError::duplicate_name("pollster", &pollster.name));
        }
        if pollster.interval.is_some_and(|i| i.is_zero()) {
            return Err(ConfigError::invalid_value(
                "pollster",
                &pollster.name,
                "interval",
                "must be greater than 0",
            ));
        }
    }

    Ok(())
}

fn validate_listeners(config: &Config) -> Result<()> {
    if let Some(ref notification) = config.listeners.notification
        && notification.enabled
    {
        if notification.secret.is_empty() {
            return Err(ConfigError::missing_field(
                "listener",
                "notification",
                "secret",
            ));
        }
        if notification.dedup_capacity == 0 {
            return Err(ConfigError::invalid_value(
                "listener",
                "notification",
                "dedup_capacity",
                "must be at least 1",
            ));
        }
    }

    Ok(())
}

#[cfg(test)]
#[path = "validation_test.rs"]
mod tests;

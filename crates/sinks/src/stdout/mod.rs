//! Stdout dispatcher - human-readable debug output
//!
//! Not intended for production use at high throughput.
//!
//! # Example Output
//!
//! ```text
//! 07:34:59.161 debug sample cpu_util vm-1 42.5 % gauge
//! 07:34:59.162 debug event  compute.instance.create msg-7 {"host":"node-1"}
//! ```

use std::io::IsTerminal;
use std::sync::Arc;

use async_trait::async_trait;
use owo_colors::{OwoColorize, Style};
use tally_config::SinkConfig;
use tally_protocol::{Datum, Event, Sample, TraitValue};
use tokio::io::AsyncWriteExt;

use crate::{Batch, DeliveryError, Dispatcher, DispatcherFactory, Result};

/// Output options for the stdout dispatcher
#[derive(Debug, Clone)]
pub struct StdoutConfig {
    /// Enable colored output
    pub color: bool,

    /// Print one JSON document per item instead of columns
    pub json: bool,
}

impl Default for StdoutConfig {
    fn default() -> Self {
        Self {
            color: std::io::stdout().is_terminal(),
            json: false,
        }
    }
}

impl StdoutConfig {
    /// Config with colors disabled (for piped output)
    pub fn no_color() -> Self {
        Self {
            color: false,
            json: false,
        }
    }

    /// Config printing JSON lines
    pub fn json() -> Self {
        Self {
            color: false,
            json: true,
        }
    }
}

struct Styles {
    timestamp: Style,
    label: Style,
    value: Style,
    payload: Style,
}

impl Styles {
    fn new(enabled: bool) -> Self {
        if enabled {
            Self {
                timestamp: Style::new().dimmed(),
                label: Style::new().dimmed(),
                value: Style::new().green(),
                payload: Style::new().dimmed(),
            }
        } else {
            Self {
                timestamp: Style::new(),
                label: Style::new(),
                value: Style::new(),
                payload: Style::new(),
            }
        }
    }
}

/// Dispatcher printing each item on its own line
pub struct StdoutDispatcher {
    name: String,
    config: StdoutConfig,
}

impl StdoutDispatcher {
    pub fn new(name: impl Into<String>, config: StdoutConfig) -> Self {
        Self {
            name: name.into(),
            config,
        }
    }

    /// Render a batch as the text this dispatcher would print
    pub fn render(&self, batch: &Batch) -> std::result::Result<String, DeliveryError> {
        let styles = Styles::new(self.config.color);
        let mut out = String::new();
        for datum in batch.items() {
            let line = if self.config.json {
                serde_json::to_string(datum).map_err(|e| DeliveryError::permanent(e.to_string()))?
            } else {
                match datum {
                    Datum::Sample(sample) => self.format_sample(sample, &styles),
                    Datum::Event(event) => self.format_event(event, &styles),
                }
            };
            out.push_str(&line);
            out.push('\n');
        }
        Ok(out)
    }

    fn format_sample(&self, sample: &Sample, styles: &Styles) -> String {
        let ts = sample.timestamp.format("%H:%M:%S%.3f").to_string();
        format!(
            "{} {} {} {} {} {} {} {}",
            ts.style(styles.timestamp),
            self.name.style(styles.label),
            "sample".style(styles.label),
            sample.name,
            sample.resource_id,
            sample.volume.style(styles.value),
            sample.unit,
            sample.sample_type.style(styles.label),
        )
    }

    fn format_event(&self, event: &Event, styles: &Styles) -> String {
        let ts = event.generated.format("%H:%M:%S%.3f").to_string();
        let traits: serde_json::Map<String, serde_json::Value> = event
            .traits
            .iter()
            .map(|t| (t.name.clone(), trait_json(&t.value)))
            .collect();
        let payload = serde_json::Value::Object(traits).to_string();
        format!(
            "{} {} {} {} {} {}",
            ts.style(styles.timestamp),
            self.name.style(styles.label),
            "event ".style(styles.label),
            event.event_type,
            event.message_id.style(styles.label),
            payload.style(styles.payload),
        )
    }
}

fn trait_json(value: &TraitValue) -> serde_json::Value {
    match value {
        TraitValue::Text(s) => serde_json::Value::String(s.clone()),
        TraitValue::Int(i) => serde_json::Value::from(*i),
        TraitValue::Float(f) => serde_json::Value::from(*f),
        TraitValue::Datetime(dt) => serde_json::Value::String(dt.to_rfc3339()),
    }
}

#[async_trait]
impl Dispatcher for StdoutDispatcher {
    async fn write(&self, batch: &Batch) -> std::result::Result<(), DeliveryError> {
        let text = self.render(batch)?;
        let mut stdout = tokio::io::stdout();
        stdout.write_all(text.as_bytes()).await?;
        stdout.flush().await?;
        Ok(())
    }

    fn scheme(&self) -> &'static str {
        "stdout"
    }
}

/// Factory for `stdout://`; `stdout://json` prints JSON lines
pub struct StdoutFactory;

impl DispatcherFactory for StdoutFactory {
    fn create(&self, sink: &str, config: &SinkConfig) -> Result<Arc<dyn Dispatcher>> {
        let output = match config.target() {
            "" => StdoutConfig::default(),
            "json" => StdoutConfig::json(),
            other => {
                return Err(crate::SinkError::config(
                    sink,
                    format!("unknown stdout format '{other}', expected 'json' or nothing"),
                ));
            }
        };
        Ok(Arc::new(StdoutDispatcher::new(sink, output)))
    }

    fn scheme(&self) -> &'static str {
        "stdout"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tally_protocol::{DateTime, SampleType, Utc};

    fn at() -> DateTime<Utc> {
        "2024-03-01T07:34:59Z".parse().unwrap()
    }

    #[test]
    fn test_render_sample_columns() {
        let dispatcher = StdoutDispatcher::new("debug", StdoutConfig::no_color());
        let sample = Sample::new("cpu_util", SampleType::Gauge, "%", 42.5, "vm-1", at());
        let text = dispatcher.render(&Batch::from(vec![sample])).unwrap();
        assert_eq!(text, "07:34:59.000 debug sample cpu_util vm-1 42.5 % gauge\n");
    }

    #[test]
    fn test_render_event_traits() {
        let dispatcher = StdoutDispatcher::new("debug", StdoutConfig::no_color());
        let event = Event::new("compute.instance.create", "msg-7", at())
            .with_trait("host", TraitValue::Text("node-1".into()));
        let text = dispatcher.render(&Batch::from(Datum::from(event))).unwrap();
        assert!(text.starts_with("07:34:59.000 debug event  compute.instance.create msg-7 "));
        assert!(text.ends_with("{\"host\":\"node-1\"}\n"));
    }

    #[test]
    fn test_render_json_lines() {
        let dispatcher = StdoutDispatcher::new("debug", StdoutConfig::json());
        let sample = Sample::new("cpu_util", SampleType::Gauge, "%", 1.0, "vm-1", at());
        let text = dispatcher.render(&Batch::from(vec![sample.clone(), sample])).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        let parsed: Datum = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(parsed.name(), "cpu_util");
    }

    #[test]
    fn test_factory_rejects_unknown_format() {
        let err = StdoutFactory
            .create("debug", &SinkConfig::new("stdout://xml"))
            .err()
            .unwrap();
        assert!(err.to_string().contains("unknown stdout format 'xml'"));
    }
}

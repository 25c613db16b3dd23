//! JSON metrics formatter
//!
//! One JSON object per report, for machine parsing:
//!
//! ```json
//! {
//!   "type": "tally_metrics",
//!   "pipeline": { "dispatched": 84000, "unmatched": 12, ... },
//!   "sources": [{ "id": "udp", "type": "udp", "received": 9000, ... }],
//!   "sinks": [{ "id": "warehouse", "type": "file", "queue_depth": 4, ... }],
//!   "rates": { "dispatched_per_sec": 1200.0, ... }
//! }
//! ```

use serde::Serialize;

use super::MetricsFormatter;
use crate::{CollectedMetrics, MetricsRates, PipelineSnapshot, SinkMetricsSnapshot, SourceMetricsSnapshot};

/// JSON metrics formatter
#[derive(Debug, Clone, Default)]
pub struct JsonFormatter;

impl JsonFormatter {
    pub fn new() -> Self {
        Self
    }
}

#[derive(Serialize)]
struct ReportJson<'a> {
    #[serde(rename = "type")]
    report_type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pipeline: Option<&'a PipelineSnapshot>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    sources: Vec<SourceJson<'a>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    sinks: Vec<SinkJson<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    rates: Option<&'a MetricsRates>,
}

#[derive(Serialize)]
struct SourceJson<'a> {
    id: &'a str,
    #[serde(rename = "type")]
    source_type: &'a str,
    #[serde(flatten)]
    snapshot: &'a SourceMetricsSnapshot,
}

#[derive(Serialize)]
struct SinkJson<'a> {
    id: &'a str,
    #[serde(rename = "type")]
    sink_type: &'a str,
    #[serde(flatten)]
    snapshot: &'a SinkMetricsSnapshot,
}

impl MetricsFormatter for JsonFormatter {
    fn format(&self, metrics: &CollectedMetrics, rates: Option<&MetricsRates>) -> String {
        let report = ReportJson {
            report_type: "tally_metrics",
            pipeline: metrics.pipeline.as_ref(),
            sources: metrics
                .sources
                .iter()
                .map(|s| SourceJson {
                    id: &s.id,
                    source_type: &s.source_type,
                    snapshot: &s.snapshot,
                })
                .collect(),
            sinks: metrics
                .sinks
                .iter()
                .map(|s| SinkJson {
                    id: &s.id,
                    sink_type: &s.sink_type,
                    snapshot: &s.snapshot,
                })
                .collect(),
            rates,
        };
        serde_json::to_string(&report).unwrap_or_else(|e| format!(r#"{{"error":"{e}"}}"#))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CollectedSink;

    #[test]
    fn test_format_json() {
        let metrics = CollectedMetrics {
            timestamp: None,
            pipeline: Some(PipelineSnapshot {
                dispatched: 5,
                reloads: 1,
                ..Default::default()
            }),
            sources: vec![],
            sinks: vec![CollectedSink {
                id: "warehouse".into(),
                sink_type: "memory".into(),
                snapshot: SinkMetricsSnapshot {
                    discarded: 3,
                    ..Default::default()
                },
            }],
        };

        let output = JsonFormatter::new().format(&metrics, None);
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["type"], "tally_metrics");
        assert_eq!(value["pipeline"]["dispatched"], 5);
        assert_eq!(value["pipeline"]["reloads"], 1);
        assert_eq!(value["sinks"][0]["id"], "warehouse");
        assert_eq!(value["sinks"][0]["type"], "memory");
        assert_eq!(value["sinks"][0]["discarded"], 3);
        assert!(value.get("sources").is_none());
        assert!(value.get("rates").is_none());
    }
}

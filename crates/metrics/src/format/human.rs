//! Human-readable metrics formatter
//!
//! # Example Output
//!
//! ```text
//! [metrics] pipelines: 1.2K/s | dispatched: 84.0K | unmatched: 12 | chain err: 0 | seq drop: 3 | gen: 2
//! [metrics] sources: udp (850/s, 2 malformed) | scheduler (40/s, 1 disabled)
//! [metrics] sinks: warehouse (1.1K/s, queue 4) | audit (0/s, queue 100, 12 dropped, 2 exhausted)
//! ```
//!
//! Problem counters only appear once they are non-zero.

use std::fmt::Write;

use super::{MetricsFormatter, format_count, format_rate};
use crate::{CollectedMetrics, MetricsRates};

/// Human-readable metrics formatter
#[derive(Debug, Clone, Default)]
pub struct HumanFormatter;

impl HumanFormatter {
    pub fn new() -> Self {
        Self
    }

    fn format_pipeline(&self, metrics: &CollectedMetrics, rates: Option<&MetricsRates>) -> Option<String> {
        let p = metrics.pipeline.as_ref()?;
        let mut output = String::from("[metrics] pipelines:");

        if let Some(rate) = rates.and_then(|r| r.dispatched_per_sec) {
            let _ = write!(output, " {} |", format_rate(rate));
        }
        let _ = write!(
            output,
            " dispatched: {} | unmatched: {} | chain err: {} | publish err: {} | seq drop: {} | gen: {}",
            format_count(p.dispatched),
            format_count(p.unmatched),
            p.chain_errors,
            p.publish_errors,
            p.sequence_drops,
            p.generation,
        );
        if p.flush_errors > 0 {
            let _ = write!(output, " | flush err: {}", p.flush_errors);
        }
        Some(output)
    }

    fn format_sources(&self, metrics: &CollectedMetrics, rates: Option<&MetricsRates>) -> Option<String> {
        if metrics.sources.is_empty() {
            return None;
        }

        let mut output = String::from("[metrics] sources:");
        for (i, source) in metrics.sources.iter().enumerate() {
            if i > 0 {
                output.push_str(" |");
            }
            let s = &source.snapshot;
            let _ = write!(output, " {} (", source.id);
            match rates.and_then(|r| r.source(&source.id)) {
                Some(rate) => output.push_str(&format_rate(rate.received_per_sec)),
                None => output.push_str(&format_count(s.received)),
            }
            for (count, label) in [
                (s.malformed, "malformed"),
                (s.unauthenticated, "unauth"),
                (s.duplicates, "dup"),
                (s.failures, "err"),
                (s.disabled, "disabled"),
            ] {
                if count > 0 {
                    let _ = write!(output, ", {count} {label}");
                }
            }
            output.push(')');
        }
        Some(output)
    }

    fn format_sinks(&self, metrics: &CollectedMetrics, rates: Option<&MetricsRates>) -> Option<String> {
        if metrics.sinks.is_empty() {
            return None;
        }

        let mut output = String::from("[metrics] sinks:");
        for (i, sink) in metrics.sinks.iter().enumerate() {
            if i > 0 {
                output.push_str(" |");
            }
            let s = &sink.snapshot;
            let _ = write!(output, " {} (", sink.id);
            match rates.and_then(|r| r.sink(&sink.id)) {
                Some(rate) => output.push_str(&format_rate(rate.delivered_per_sec)),
                None => output.push_str(&format_count(s.items_delivered)),
            }
            let _ = write!(output, ", queue {}", s.queue_depth);
            for (count, label) in [
                (s.overflow_dropped, "dropped"),
                (s.overflow_rejected, "refused"),
                (s.exhausted, "exhausted"),
                (s.rejected, "rejected"),
                (s.discarded, "discarded"),
            ] {
                if count > 0 {
                    let _ = write!(output, ", {count} {label}");
                }
            }
            output.push(')');
        }
        Some(output)
    }
}

impl MetricsFormatter for HumanFormatter {
    fn format(&self, metrics: &CollectedMetrics, rates: Option<&MetricsRates>) -> String {
        [
            self.format_pipeline(metrics, rates),
            self.format_sources(metrics, rates),
            self.format_sinks(metrics, rates),
        ]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join("\n")
    }
}

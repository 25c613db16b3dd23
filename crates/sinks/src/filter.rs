//! Per-sink resource definitions
//!
//! A sink may narrow what it stores: `meters` lists the meters it handles,
//! `ignore` lists meters it drops without comment, and `filter_project`
//! drops the service's own activity. Events are not filtered here.

use std::collections::BTreeMap;

use tally_config::SinkConfig;
use tally_protocol::{Datum, Sample};
use tally_routing::MeterFilter;
use tracing::debug;

use crate::{Batch, Result, SinkError};

/// Why a sample was kept out of a sink
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Accept,
    /// Meter matches an `ignore` pattern
    Ignored,
    /// Meter is not among the sink's `meters`
    Unhandled,
    /// Sample belongs to the filtered project
    ServiceActivity,
}

/// Compiled resource definitions for one sink
#[derive(Debug, Clone, Default)]
pub struct ResourceFilter {
    meters: Option<MeterFilter>,
    ignore: Option<MeterFilter>,
    filter_project: Option<String>,
}

impl ResourceFilter {
    /// Filter that accepts everything
    pub fn accept_all() -> Self {
        Self::default()
    }

    pub fn from_config(sink: &str, config: &SinkConfig) -> Result<Self> {
        let compile = |patterns: &[String]| -> Result<Option<MeterFilter>> {
            if patterns.is_empty() {
                return Ok(None);
            }
            MeterFilter::compile(patterns)
                .map(Some)
                .map_err(|e| SinkError::config(sink, e.to_string()))
        };
        Ok(Self {
            meters: compile(&config.meters)?,
            ignore: compile(&config.ignore)?,
            filter_project: config.filter_project.clone().filter(|p| !p.is_empty()),
        })
    }

    /// Classify one sample
    pub fn verdict(&self, sample: &Sample) -> Verdict {
        if let Some(ignore) = &self.ignore
            && ignore.matches(&sample.name)
        {
            return Verdict::Ignored;
        }
        if let Some(meters) = &self.meters
            && !meters.matches(&sample.name)
        {
            return Verdict::Unhandled;
        }
        if let Some(project) = &self.filter_project
            && sample.project_id.as_deref() == Some(project.as_str())
        {
            return Verdict::ServiceActivity;
        }
        Verdict::Accept
    }

    /// Whether the filter lets everything through
    pub fn is_pass_through(&self) -> bool {
        self.meters.is_none() && self.ignore.is_none() && self.filter_project.is_none()
    }

    /// Keep only what this sink accepts
    pub fn apply(&self, sink: &str, batch: Batch) -> Batch {
        if self.is_pass_through() {
            return batch;
        }
        batch
            .into_items()
            .into_iter()
            .filter(|item| {
                let Datum::Sample(sample) = item else {
                    return true;
                };
                match self.verdict(sample) {
                    Verdict::Accept => true,
                    Verdict::Ignored => false,
                    Verdict::Unhandled => {
                        debug!(sink = %sink, meter = %sample.name, "meter not handled by sink, skipping");
                        false
                    }
                    Verdict::ServiceActivity => {
                        debug!(
                            sink = %sink,
                            meter = %sample.name,
                            resource = %sample.resource_id,
                            "dropping service activity sample"
                        );
                        false
                    }
                }
            })
            .collect()
    }
}

/// Split a batch into per-resource groups
///
/// Samples are grouped by `resource_id` (in id order) and ordered by meter
/// name within a group, keeping arrival order for equal names. Events form
/// one trailing group.
pub fn split_by_resource(batch: Batch) -> Vec<Batch> {
    let mut resources: BTreeMap<String, Vec<Sample>> = BTreeMap::new();
    let mut events = Vec::new();

    for item in batch.into_items() {
        match item {
            Datum::Sample(sample) => resources
                .entry(sample.resource_id.clone())
                .or_default()
                .push(sample),
            event @ Datum::Event(_) => events.push(event),
        }
    }

    let mut groups: Vec<Batch> = resources
        .into_values()
        .map(|mut samples| {
            samples.sort_by(|a, b| a.name.cmp(&b.name));
            Batch::from(samples)
        })
        .collect();
    if !events.is_empty() {
        groups.push(Batch::new(events));
    }
    groups
}

#[cfg(test)]
#[path = "filter_test.rs"]
mod tests;

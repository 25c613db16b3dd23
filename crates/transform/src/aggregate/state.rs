//! Aggregation state management
//!
//! Handles grouping of samples and emission conditions.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::hash::{Hash, Hasher};
use std::time::{Duration, Instant};

use siphasher::sip::SipHasher13;
use tally_protocol::Sample;

use super::{AggregateFunction, GroupField};

#[cfg(test)]
#[path = "state_test.rs"]
mod tests;

/// Running values for one group
#[derive(Debug)]
pub struct AggregateGroup {
    /// First sample of the group; identity for the emitted sample
    pub first: Sample,

    /// Order of creation, for stable emission
    pub seq: u64,

    pub created_at: Instant,

    pub count: u64,
    pub sum: f64,
    pub min: f64,
    pub max: f64,
    pub last: f64,
    pub last_timestamp: chrono::DateTime<chrono::Utc>,
}

impl AggregateGroup {
    pub fn new(sample: &Sample, seq: u64) -> Self {
        Self {
            first: sample.clone(),
            seq,
            created_at: Instant::now(),
            count: 1,
            sum: sample.volume,
            min: sample.volume,
            max: sample.volume,
            last: sample.volume,
            last_timestamp: sample.timestamp,
        }
    }

    /// Fold another sample into the group
    pub fn add(&mut self, sample: &Sample) {
        self.count += 1;
        self.sum += sample.volume;
        self.min = self.min.min(sample.volume);
        self.max = self.max.max(sample.volume);
        if sample.timestamp >= self.last_timestamp {
            self.last = sample.volume;
            self.last_timestamp = sample.timestamp;
        }
    }

    /// Aggregated value
    pub fn value(&self, function: AggregateFunction) -> f64 {
        match function {
            AggregateFunction::Sum => self.sum,
            AggregateFunction::Avg => self.sum / self.count as f64,
            AggregateFunction::Min => self.min,
            AggregateFunction::Max => self.max,
            AggregateFunction::Last => self.last,
            AggregateFunction::Count => self.count as f64,
        }
    }

    #[inline]
    pub fn should_emit_size(&self, size: Option<usize>) -> bool {
        size.is_some_and(|size| self.count as usize >= size)
    }

    #[inline]
    pub fn should_emit_age(&self, retention: Option<Duration>) -> bool {
        retention.is_some_and(|r| self.created_at.elapsed() >= r)
    }
}

/// State container for all active groups
#[derive(Debug, Default)]
pub struct AggregateState {
    groups: HashMap<u64, AggregateGroup>,
    next_seq: u64,
}

impl AggregateState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a sample to its group, creating it if needed
    ///
    /// Returns (group, is_new).
    pub fn add(&mut self, key_hash: u64, sample: &Sample) -> (&mut AggregateGroup, bool) {
        match self.groups.entry(key_hash) {
            Entry::Occupied(entry) => {
                let group = entry.into_mut();
                group.add(sample);
                (group, false)
            }
            Entry::Vacant(entry) => {
                let seq = self.next_seq;
                self.next_seq += 1;
                (entry.insert(AggregateGroup::new(sample, seq)), true)
            }
        }
    }

    pub fn remove(&mut self, key_hash: u64) -> Option<AggregateGroup> {
        self.groups.remove(&key_hash)
    }

    /// Remove groups older than `retention`, oldest first
    pub fn take_expired(&mut self, retention: Option<Duration>) -> Vec<AggregateGroup> {
        if retention.is_none() {
            return Vec::new();
        }
        let expired: Vec<u64> = self
            .groups
            .iter()
            .filter(|(_, group)| group.should_emit_age(retention))
            .map(|(&hash, _)| hash)
            .collect();
        let mut groups: Vec<_> = expired.into_iter().filter_map(|h| self.groups.remove(&h)).collect();
        groups.sort_by_key(|g| g.seq);
        groups
    }

    /// Remove every group, oldest first
    pub fn drain(&mut self) -> Vec<AggregateGroup> {
        let mut groups: Vec<_> = self.groups.drain().map(|(_, group)| group).collect();
        groups.sort_by_key(|g| g.seq);
        groups
    }

    #[inline]
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

/// Compute a group key hash
///
/// Always covers name, resource, unit and type, then each `group_by` field
/// (an absent optional field hashes differently from an empty one).
pub fn compute_group_key(sample: &Sample, group_by: &[GroupField]) -> u64 {
    let mut hasher = SipHasher13::new();

    sample.name.hash(&mut hasher);
    sample.resource_id.hash(&mut hasher);
    sample.unit.hash(&mut hasher);
    sample.sample_type.hash(&mut hasher);

    for field in group_by {
        field.hash(&mut hasher);
        match field {
            GroupField::ProjectId => sample.project_id.hash(&mut hasher),
            GroupField::UserId => sample.user_id.hash(&mut hasher),
            GroupField::Source => sample.source.hash(&mut hasher),
        }
    }

    hasher.finish()
}

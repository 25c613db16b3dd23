use chrono::{TimeZone, Utc};
use tally_protocol::SampleType;

use super::*;

fn sample(volume: f64, secs: i64) -> Sample {
    let ts = Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap();
    Sample::new("requests", SampleType::Delta, "req", volume, "api-1", ts)
}

#[test]
fn test_group_values() {
    let mut group = AggregateGroup::new(&sample(4.0, 0), 0);
    group.add(&sample(10.0, 2));
    group.add(&sample(1.0, 1));

    assert_eq!(group.value(AggregateFunction::Sum), 15.0);
    assert_eq!(group.value(AggregateFunction::Avg), 5.0);
    assert_eq!(group.value(AggregateFunction::Min), 1.0);
    assert_eq!(group.value(AggregateFunction::Max), 10.0);
    assert_eq!(group.value(AggregateFunction::Count), 3.0);
    // Newest timestamp, not arrival order.
    assert_eq!(group.value(AggregateFunction::Last), 10.0);
}

#[test]
fn test_should_emit_size() {
    let mut group = AggregateGroup::new(&sample(1.0, 0), 0);
    assert!(!group.should_emit_size(None));
    assert!(!group.should_emit_size(Some(2)));
    group.add(&sample(1.0, 1));
    assert!(group.should_emit_size(Some(2)));
}

#[test]
fn test_state_add_and_drain_in_creation_order() {
    let mut state = AggregateState::new();
    let (_, new) = state.add(2, &sample(1.0, 0));
    assert!(new);
    state.add(1, &sample(2.0, 0));
    let (group, new) = state.add(2, &sample(3.0, 1));
    assert!(!new);
    assert_eq!(group.count, 2);
    assert_eq!(state.group_count(), 2);

    let drained = state.drain();
    assert_eq!(drained.iter().map(|g| g.seq).collect::<Vec<_>>(), vec![0, 1]);
    assert!(state.is_empty());
}

#[test]
fn test_take_expired_without_retention() {
    let mut state = AggregateState::new();
    state.add(1, &sample(1.0, 0));
    assert!(state.take_expired(None).is_empty());
    assert_eq!(state.take_expired(Some(Duration::ZERO)).len(), 1);
    assert!(state.is_empty());
}

#[test]
fn test_group_key_fields() {
    let a = sample(1.0, 0);
    let b = sample(9.0, 5);
    assert_eq!(compute_group_key(&a, &[]), compute_group_key(&b, &[]));

    let other_resource = Sample {
        resource_id: "api-2".into(),
        ..a.clone()
    };
    assert_ne!(compute_group_key(&a, &[]), compute_group_key(&other_resource, &[]));

    let p1 = a.clone().with_project("p1");
    let p2 = a.clone().with_project("p2");
    assert_eq!(compute_group_key(&p1, &[]), compute_group_key(&p2, &[]));
    assert_ne!(
        compute_group_key(&p1, &[GroupField::ProjectId]),
        compute_group_key(&p2, &[GroupField::ProjectId])
    );
}

//! Tests for Event decoding and duplicate detection

use crate::{
    Event, ProtocolError, RawEvent, TraitError, TraitType, TraitValue, check_unique_message_ids,
};
use chrono::{TimeZone, Utc};

fn raw(json: &str) -> RawEvent {
    serde_json::from_str(json).unwrap()
}

// =============================================================================
// Trait decoding
// =============================================================================

#[test]
fn test_decode_all_trait_types() {
    let (event, errors) = Event::decode(raw(
        r#"{
            "event_type": "compute.instance.create.end",
            "message_id": "m-1",
            "generated": "2024-05-01T12:00:00Z",
            "traits": [
                {"name": "host", "type": "text", "value": "node-1"},
                {"name": "vcpus", "type": "int", "value": 4},
                {"name": "load", "type": "float", "value": 0.5},
                {"name": "launched_at", "type": "datetime", "value": "2024-05-01T11:59:00Z"}
            ]
        }"#,
    ))
    .unwrap();

    assert!(errors.is_empty());
    assert_eq!(event.traits.len(), 4);
    assert_eq!(event.get_trait("host"), Some(&TraitValue::Text("node-1".into())));
    assert_eq!(event.get_trait("vcpus"), Some(&TraitValue::Int(4)));
    assert_eq!(event.get_trait("load"), Some(&TraitValue::Float(0.5)));
    assert_eq!(
        event.get_trait("launched_at").map(TraitValue::trait_type),
        Some(TraitType::Datetime)
    );
}

#[test]
fn test_unknown_trait_type_is_rejected_per_trait() {
    let (event, errors) = Event::decode(raw(
        r#"{
            "event_type": "volume.create",
            "message_id": "m-2",
            "traits": [
                {"name": "size", "type": "int", "value": 10},
                {"name": "blob", "type": "binary", "value": "AAEC"}
            ]
        }"#,
    ))
    .unwrap();

    assert_eq!(event.traits.len(), 1);
    assert_eq!(event.traits[0].name, "size");
    assert_eq!(
        errors,
        vec![TraitError::UnknownType {
            name: "blob".into(),
            type_name: "binary".into()
        }]
    );
}

#[test]
fn test_mismatched_value_is_not_coerced() {
    let (event, errors) = Event::decode(raw(
        r#"{
            "event_type": "x",
            "message_id": "m-3",
            "traits": [{"name": "count", "type": "int", "value": "12"}]
        }"#,
    ))
    .unwrap();

    assert!(event.traits.is_empty());
    assert!(matches!(
        &errors[0],
        TraitError::InvalidValue { name, expected: "int" } if name == "count"
    ));
}

#[test]
fn test_float_accepts_integer_value() {
    let (event, errors) = Event::decode(raw(
        r#"{"event_type": "x", "message_id": "m", "traits": [{"name": "f", "type": "float", "value": 3}]}"#,
    ))
    .unwrap();
    assert!(errors.is_empty());
    assert_eq!(event.get_trait("f"), Some(&TraitValue::Float(3.0)));
}

#[test]
fn test_duplicate_trait_name_keeps_first() {
    let (event, errors) = Event::decode(raw(
        r#"{
            "event_type": "x",
            "message_id": "m-4",
            "traits": [
                {"name": "a", "type": "int", "value": 1},
                {"name": "a", "type": "int", "value": 2}
            ]
        }"#,
    ))
    .unwrap();

    assert_eq!(event.get_trait("a"), Some(&TraitValue::Int(1)));
    assert_eq!(errors[0].trait_name(), "a");
}

#[test]
fn test_missing_envelope_fields_fail() {
    let err = Event::decode(raw(r#"{"message_id": "m"}"#)).unwrap_err();
    assert!(matches!(err, ProtocolError::MissingField("event_type")));

    let err = Event::decode(raw(r#"{"event_type": "x"}"#)).unwrap_err();
    assert!(matches!(err, ProtocolError::MissingField("message_id")));
}

#[test]
fn test_event_serde_shape() {
    let event = Event::new("x", "m-5", Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())
        .with_trait("n", TraitValue::Int(7));
    let json = serde_json::to_value(&event).unwrap();
    assert_eq!(json["traits"][0]["name"], "n");
    assert_eq!(json["traits"][0]["type"], "int");
    assert_eq!(json["traits"][0]["value"], 7);

    let back: Event = serde_json::from_value(json).unwrap();
    assert_eq!(back, event);
}

// =============================================================================
// Storage-side uniqueness
// =============================================================================

#[test]
fn test_duplicate_message_ids_are_a_violation() {
    let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let events = vec![
        Event::new("a", "same-id", at),
        Event::new("b", "other", at),
        Event::new("a", "same-id", at).with_trait("extra", TraitValue::Int(1)),
    ];

    let err = check_unique_message_ids(&events).unwrap_err();
    assert!(matches!(
        err,
        ProtocolError::DuplicateMessageId { ref message_id } if message_id == "same-id"
    ));
}

#[test]
fn test_unique_message_ids_pass() {
    let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let events = vec![Event::new("a", "1", at), Event::new("a", "2", at)];
    assert!(check_unique_message_ids(&events).is_ok());
}

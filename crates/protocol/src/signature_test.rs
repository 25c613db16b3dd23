//! Tests for message signatures

use crate::{SIGNATURE_FIELD, signature};
use serde_json::{Map, Value, json};

fn payload() -> Map<String, Value> {
    match json!({"name": "cpu", "volume": 1.5, "resource_id": "vm-1"}) {
        Value::Object(map) => map,
        _ => unreachable!(),
    }
}

#[test]
fn test_sign_then_verify() {
    let mut fields = payload();
    signature::sign(&mut fields, b"secret").unwrap();

    let sig = fields[SIGNATURE_FIELD].as_str().unwrap().to_string();
    assert_eq!(sig.len(), 64);
    assert!(signature::verify(&fields, b"secret", &sig));
}

#[test]
fn test_wrong_secret_fails() {
    let fields = payload();
    let sig = signature::compute(&fields, b"secret").unwrap();
    assert!(!signature::verify(&fields, b"other", &sig));
}

#[test]
fn test_tampered_field_fails() {
    let mut fields = payload();
    let sig = signature::compute(&fields, b"secret").unwrap();
    fields.insert("volume".into(), json!(2.5));
    assert!(!signature::verify(&fields, b"secret", &sig));
}

#[test]
fn test_field_order_does_not_matter() {
    let a = payload();
    let mut b = Map::new();
    b.insert("resource_id".into(), json!("vm-1"));
    b.insert("volume".into(), json!(1.5));
    b.insert("name".into(), json!("cpu"));

    assert_eq!(
        signature::compute(&a, b"k").unwrap(),
        signature::compute(&b, b"k").unwrap()
    );
}

#[test]
fn test_garbage_signature_fails() {
    assert!(!signature::verify(&payload(), b"secret", "not-hex"));
    assert!(!signature::verify(&payload(), b"secret", "abcd"));
}

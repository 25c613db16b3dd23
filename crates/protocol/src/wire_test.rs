//! Tests for the datagram wire format

use crate::{MAX_DATAGRAM_SIZE, ProtocolError, Sample, SampleType, wire};
use chrono::{TimeZone, Utc};

fn sample() -> Sample {
    Sample::new(
        "network.incoming.bytes",
        SampleType::Cumulative,
        "B",
        1024.0,
        "vm-1/tap0",
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
    )
}

#[test]
fn test_signed_datagram_is_accepted() {
    let bytes = wire::encode_sample(&sample(), Some(b"s3cret")).unwrap();
    let decoded = wire::decode_sample(&bytes, Some(b"s3cret")).unwrap();
    assert_eq!(decoded, sample());
}

#[test]
fn test_signed_datagram_accepts_arbitrary_volumes() {
    let mut volumes = vec![985.6906946328695, 0.1 + 0.2, 1e-310, 123456789.98765433, f64::MAX];
    // deterministic spread over [0, 1000)
    let mut state: u64 = 0x9e37_79b9_7f4a_7c15;
    for _ in 0..2000 {
        state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        volumes.push((state >> 11) as f64 / (1u64 << 53) as f64 * 1000.0);
    }

    for volume in volumes {
        let mut sample = sample();
        sample.volume = volume;
        let bytes = wire::encode_sample(&sample, Some(b"s3cret")).unwrap();
        let decoded = wire::decode_sample(&bytes, Some(b"s3cret"))
            .unwrap_or_else(|e| panic!("volume {volume} rejected: {e}"));
        assert_eq!(decoded.volume.to_bits(), volume.to_bits());
    }
}

#[test]
fn test_unsigned_datagram_rejected_when_secret_set() {
    let bytes = wire::encode_sample(&sample(), None).unwrap();
    let err = wire::decode_sample(&bytes, Some(b"s3cret")).unwrap_err();
    assert!(matches!(err, ProtocolError::MissingSignature));
    assert!(err.is_unauthenticated());
}

#[test]
fn test_wrong_secret_rejected() {
    let bytes = wire::encode_sample(&sample(), Some(b"a")).unwrap();
    let err = wire::decode_sample(&bytes, Some(b"b")).unwrap_err();
    assert!(matches!(err, ProtocolError::SignatureMismatch));
}

#[test]
fn test_signature_ignored_without_secret() {
    let bytes = wire::encode_sample(&sample(), Some(b"a")).unwrap();
    assert!(wire::decode_sample(&bytes, None).is_ok());
}

#[test]
fn test_garbage_is_a_decode_error() {
    let err = wire::decode_sample(b"\x00\x01not json", None).unwrap_err();
    assert!(matches!(err, ProtocolError::Decode(_)));

    let err = wire::decode_sample(b"[1,2,3]", None).unwrap_err();
    assert!(matches!(err, ProtocolError::NotAnObject));

    let err = wire::decode_sample(br#"{"name": "cpu"}"#, None).unwrap_err();
    assert!(matches!(err, ProtocolError::Decode(_)));
}

#[test]
fn test_oversized_payload_rejected() {
    let big = vec![b' '; MAX_DATAGRAM_SIZE + 1];
    let err = wire::decode_sample(&big, None).unwrap_err();
    assert!(matches!(err, ProtocolError::TooLarge { .. }));
}

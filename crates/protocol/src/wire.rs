//! Datagram ingestion wire format
//!
//! One self-contained JSON object per datagram, describing one `Sample`.
//! When a shared secret is configured the object carries a
//! `message_signature` field (see [`crate::signature`]) and unsigned or
//! mis-signed datagrams are rejected.

use serde_json::Value;

use crate::{MAX_DATAGRAM_SIZE, ProtocolError, Result, SIGNATURE_FIELD, Sample, signature};

/// Encode a sample as one datagram payload, signing it when a secret is given
pub fn encode_sample(sample: &Sample, secret: Option<&[u8]>) -> Result<Vec<u8>> {
    let Value::Object(mut fields) = serde_json::to_value(sample)? else {
        return Err(ProtocolError::NotAnObject);
    };
    if let Some(secret) = secret {
        signature::sign(&mut fields, secret)?;
    }

    let bytes = serde_json::to_vec(&Value::Object(fields))?;
    if bytes.len() > MAX_DATAGRAM_SIZE {
        return Err(ProtocolError::TooLarge {
            size: bytes.len(),
            max: MAX_DATAGRAM_SIZE,
        });
    }
    Ok(bytes)
}

/// Decode one datagram payload, verifying its signature when a secret is given
pub fn decode_sample(payload: &[u8], secret: Option<&[u8]>) -> Result<Sample> {
    if payload.len() > MAX_DATAGRAM_SIZE {
        return Err(ProtocolError::TooLarge {
            size: payload.len(),
            max: MAX_DATAGRAM_SIZE,
        });
    }

    let Value::Object(mut fields) = serde_json::from_slice::<Value>(payload)? else {
        return Err(ProtocolError::NotAnObject);
    };

    let provided = fields.remove(SIGNATURE_FIELD);
    if let Some(secret) = secret {
        let Some(Value::String(sig)) = provided else {
            return Err(ProtocolError::MissingSignature);
        };
        if !signature::verify(&fields, secret, &sig) {
            return Err(ProtocolError::SignatureMismatch);
        }
    }

    Ok(serde_json::from_value(Value::Object(fields))?)
}

//! Message signatures
//!
//! HMAC-SHA256 over a payload's fields in sorted key order. Each field
//! contributes its name followed by its value text (strings raw, everything
//! else as compact JSON). The signature field itself is skipped.
//!
//! Numbers are hashed in their shortest round-trip text, so both ends must
//! parse floats exactly; the workspace enables serde_json's
//! `float_roundtrip` for this.

use hmac::{Hmac, Mac};
use serde_json::{Map, Value};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::{ProtocolError, Result, SIGNATURE_FIELD};

type HmacSha256 = Hmac<Sha256>;

/// Compute the hex signature of a payload
pub fn compute(fields: &Map<String, Value>, secret: &[u8]) -> Result<String> {
    digest(fields, secret).map(hex::encode)
}

/// Check a hex signature in constant time
pub fn verify(fields: &Map<String, Value>, secret: &[u8], signature: &str) -> bool {
    let Ok(provided) = hex::decode(signature) else {
        return false;
    };
    let Ok(expected) = digest(fields, secret) else {
        return false;
    };
    provided.len() == expected.len() && bool::from(provided.ct_eq(&expected))
}

/// Sign a payload in place by adding the signature field
pub fn sign(fields: &mut Map<String, Value>, secret: &[u8]) -> Result<()> {
    let signature = compute(fields, secret)?;
    fields.insert(SIGNATURE_FIELD.to_string(), Value::String(signature));
    Ok(())
}

fn digest(fields: &Map<String, Value>, secret: &[u8]) -> Result<Vec<u8>> {
    let mut mac = HmacSha256::new_from_slice(secret)
        .map_err(|e| ProtocolError::decode(format!("invalid signing key: {e}")))?;

    let mut keys: Vec<&String> = fields.keys().collect();
    keys.sort();

    for key in keys {
        if key == SIGNATURE_FIELD {
            continue;
        }
        mac.update(key.as_bytes());
        match &fields[key] {
            Value::String(s) => mac.update(s.as_bytes()),
            other => mac.update(other.to_string().as_bytes()),
        }
    }

    Ok(mac.finalize().into_bytes().to_vec())
}

//! Canonical JSON serialization, used for both Op hashing and
//! registration-payload hashing.
//!
//! Any deviation here breaks signature/hash verification against the
//! orchestrator, so this is deliberately the only place that produces
//! a canonical byte string from a [`serde_json::Value`].

use serde_json::Value;

/// Render a JSON value with object keys sorted recursively, no
/// insignificant whitespace. This is the stable wire format used for
/// hashing — not for the request/response bodies themselves, which use
/// ordinary `serde_json` serialization.
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&serde_json::to_string(key).expect("string keys always serialize"));
                out.push(':');
                write_canonical(&map[*key], out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        other => {
            out.push_str(&other.to_string());
        }
    }
}

/// sha1 hex digest of the canonical JSON rendering of `value`.
pub fn sha1_hex(value: &Value) -> String {
    use sha1::{Digest, Sha1};
    let mut hasher = Sha1::new();
    hasher.update(canonical_json(value).as_bytes());
    hex::encode(hasher.finalize())
}

/// sha256 hex digest of the canonical JSON rendering of `value`, used
/// for the registration payload's `hash` field.
pub fn sha256_hex(value: &Value) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(canonical_json(value).as_bytes());
    hex::encode(hasher.finalize())
}

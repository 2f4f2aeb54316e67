//! Plan Fingerprints - SHA-256 over Canonical JSON
//!
//! Staged paths are random, so fingerprints cover only what decides the
//! output: tools, members and their tokens.

use serde::Serialize;
use serde_json::{to_string, Value};
use sha2::{Digest, Sha256};

pub fn sha256_hex(data: &[u8]) -> String {
    Sha256::digest(data)
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}

/// Keys sorted at every depth, no whitespace.
pub fn canonical_json<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    to_string(&canonicalize(serde_json::to_value(value)?))
}

fn canonicalize(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|(a, _), (b, _)| a.cmp(b));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(key, inner)| (key, canonicalize(inner)))
                    .collect(),
            )
        }
        Value::Array(items) => Value::Array(items.into_iter().map(canonicalize).collect()),
        other => other,
    }
}

/// `sha256(canonical plan + ":" + format + ":" + engine version)`
pub fn compute_plan_fingerprint(
    plan: &impl Serialize,
    format: &str,
    engine_version: &str,
) -> Result<String, serde_json::Error> {
    let canonical = canonical_json(plan)?;
    let combined = format!("{}:{}:{}", canonical, format, engine_version);
    Ok(sha256_hex(combined.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn canonical_json_sorted() {
        let obj = json!({"z": 1, "a": 2, "m": {"b": 1, "a": [{"y": 0, "x": 1}]}});
        assert_eq!(
            canonical_json(&obj).unwrap(),
            r#"{"a":2,"m":{"a":[{"x":1,"y":0}],"b":1},"z":1}"#
        );
    }

    #[test]
    fn sha256_known_vector() {
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn fingerprint_tracks_format() {
        let plan = json!([{"tool": "convert", "members": ["sepia", "blur"]}]);
        let png = compute_plan_fingerprint(&plan, "png", "1.0.0").unwrap();
        assert_eq!(png, compute_plan_fingerprint(&plan, "png", "1.0.0").unwrap());
        assert_ne!(png, compute_plan_fingerprint(&plan, "jpg", "1.0.0").unwrap());
    }
}

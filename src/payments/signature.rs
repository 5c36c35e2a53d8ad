//! IPN callback authenticity
//!
//! The provider signs callbacks with HMAC-SHA512 over the JSON body with
//! object keys sorted alphabetically at every level, hex encoded, in the
//! `x-nowpayments-sig` header. Verification recomputes the digest over the
//! canonical form and compares in constant time.

use hmac::{Hmac, Mac};
use serde_json::Value as JsonValue;
use sha2::Sha512;

type HmacSha512 = Hmac<Sha512>;

/// Serialize a JSON value with object keys sorted at every nesting level.
pub fn canonical_json(value: &JsonValue) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &JsonValue, out: &mut String) {
    match value {
        JsonValue::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&JsonValue::String((*key).clone()).to_string());
                out.push(':');
                write_canonical(&map[*key], out);
            }
            out.push('}');
        }
        JsonValue::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        other => out.push_str(&other.to_string()),
    }
}

/// Compute the hex HMAC-SHA512 signature for a callback payload.
pub fn sign_ipn(payload: &JsonValue, secret: &str) -> String {
    let mut mac = match HmacSha512::new_from_slice(secret.as_bytes()) {
        Ok(v) => v,
        // HMAC accepts keys of any length; unreachable in practice
        Err(_) => return String::new(),
    };
    mac.update(canonical_json(payload).as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Verify a callback signature against the shared IPN secret.
pub fn verify_ipn_signature(payload: &JsonValue, secret: &str, signature: &str) -> bool {
    let computed = sign_ipn(payload, secret);
    if computed.is_empty() {
        return false;
    }
    secure_eq(computed.as_bytes(), signature.trim().as_bytes())
}

pub fn secure_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter()
        .zip(b.iter())
        .fold(0_u8, |acc, (x, y)| acc | (x ^ y))
        == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn secure_eq_behaves_correctly() {
        assert!(secure_eq(b"abc", b"abc"));
        assert!(!secure_eq(b"abc", b"abd"));
        assert!(!secure_eq(b"abc", b"ab"));
    }

    #[test]
    fn canonical_json_sorts_keys_at_every_level() {
        let value = json!({
            "payment_status": "finished",
            "payment_id": 5077125051_i64,
            "meta": {"b": 1, "a": 2}
        });

        assert_eq!(
            canonical_json(&value),
            r#"{"meta":{"a":2,"b":1},"payment_id":5077125051,"payment_status":"finished"}"#
        );
    }

    #[test]
    fn signature_is_key_order_independent() {
        let a = json!({"payment_id": 1, "payment_status": "finished"});
        let b = json!({"payment_status": "finished", "payment_id": 1});

        assert_eq!(sign_ipn(&a, "secret"), sign_ipn(&b, "secret"));
    }

    #[test]
    fn round_trip_verification() {
        let payload = json!({
            "payment_id": 5077125051_i64,
            "payment_status": "finished",
            "pay_address": "TNDFkUNA6SPWEG5nhBg1DNmdBpCNknvj4r"
        });
        let signature = sign_ipn(&payload, "ipn_secret");

        assert!(verify_ipn_signature(&payload, "ipn_secret", &signature));
    }

    #[test]
    fn corrupted_signature_rejected() {
        let payload = json!({"payment_id": 1, "payment_status": "finished"});
        let mut signature = sign_ipn(&payload, "ipn_secret");
        signature.replace_range(0..1, if signature.starts_with('0') { "1" } else { "0" });

        assert!(!verify_ipn_signature(&payload, "ipn_secret", &signature));
    }

    #[test]
    fn wrong_secret_rejected() {
        let payload = json!({"payment_id": 1, "payment_status": "finished"});
        let signature = sign_ipn(&payload, "ipn_secret");

        assert!(!verify_ipn_signature(&payload, "other_secret", &signature));
    }
}

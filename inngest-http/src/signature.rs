//! HMAC-SHA256 request/response signing (§4.5 "Signature discipline"),
//! using the RustCrypto `hmac`+`sha2` crates rather than a hand-rolled
//! implementation.

use crate::error::SignatureError;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// The replay-protection window: a signature older than this is
/// rejected (§4.5, §8).
pub const MAX_SIGNATURE_AGE_SECONDS: i64 = 5 * 60;

/// A parsed `X-Inngest-Signature` header: `t=<unix-seconds>&s=<hex>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedSignature {
    /// The claimed signing timestamp, Unix seconds.
    pub timestamp: i64,
    /// The hex-encoded HMAC digest.
    pub signature: String,
}

/// Parse `t=<seconds>&s=<hex>`. Order of the two fields does not
/// matter; any other shape is malformed.
pub fn parse_header(value: &str) -> Result<ParsedSignature, SignatureError> {
    let mut timestamp = None;
    let mut signature = None;
    for part in value.split('&') {
        let mut kv = part.splitn(2, '=');
        match (kv.next(), kv.next()) {
            (Some("t"), Some(v)) => {
                timestamp = v.parse::<i64>().ok();
            }
            (Some("s"), Some(v)) => {
                signature = Some(v.to_string());
            }
            _ => {}
        }
    }
    match (timestamp, signature) {
        (Some(timestamp), Some(signature)) => Ok(ParsedSignature { timestamp, signature }),
        _ => Err(SignatureError::Malformed),
    }
}

/// Render a parsed signature back into header form.
pub fn format_header(parsed: &ParsedSignature) -> String {
    format!("t={}&s={}", parsed.timestamp, parsed.signature)
}

/// Strip a signing key's `signkey-<env>-` prefix, returning the raw hex
/// key material used as the HMAC key (§4.5 "signing_key_minus_prefix").
fn key_material(signing_key: &str) -> Result<Vec<u8>, SignatureError> {
    let hex_part = signing_key.rsplit('-').next().unwrap_or(signing_key);
    hex::decode(hex_part).map_err(|_| SignatureError::Mismatch)
}

fn hmac_hex(key: &[u8], body: &[u8], timestamp: i64) -> Result<String, SignatureError> {
    let mut mac = HmacSha256::new_from_slice(key).map_err(|_| SignatureError::Mismatch)?;
    mac.update(body);
    mac.update(timestamp.to_string().as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Verify `header` against `body`, trying `signing_key` then
/// `fallback_key` (for key rotation, §4.5 step 4). `allow_expired`
/// disables the replay-protection window, matching the test hook named
/// in spec.md §8 scenario 6.
pub fn verify(
    header: Option<&str>,
    body: &[u8],
    signing_key: Option<&str>,
    fallback_key: Option<&str>,
    now: DateTime<Utc>,
    allow_expired: bool,
) -> Result<(), SignatureError> {
    let signing_key = signing_key.ok_or(SignatureError::NoSigningKey)?;
    let header = header.ok_or(SignatureError::Missing)?;
    let parsed = parse_header(header)?;

    if !allow_expired {
        let age = now.timestamp() - parsed.timestamp;
        if age.abs() > MAX_SIGNATURE_AGE_SECONDS {
            return Err(SignatureError::Expired);
        }
    }

    for key in [Some(signing_key), fallback_key].into_iter().flatten() {
        let material = key_material(key)?;
        if let Ok(expected) = hmac_hex(&material, body, parsed.timestamp) {
            if constant_time_eq(expected.as_bytes(), parsed.signature.as_bytes()) {
                return Ok(());
            }
        }
    }

    Err(SignatureError::Mismatch)
}

/// Sign an outgoing response body with `signing_key`, returning the
/// `X-Inngest-Signature` header value (§4.5 step 5).
pub fn sign(body: &[u8], signing_key: &str, timestamp: i64) -> Result<String, SignatureError> {
    let material = key_material(signing_key)?;
    let signature = hmac_hex(&material, body, timestamp)?;
    Ok(format_header(&ParsedSignature { timestamp, signature }))
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const TEST_KEY: &str = "signkey-test-f00f3005a3666b359a79c2bc3380ce2715e62727ac461ae1a2618f8766029c9f";

    #[test]
    fn parses_well_formed_header() {
        let parsed = parse_header("t=1687306735&s=abc123").unwrap();
        assert_eq!(parsed.timestamp, 1687306735);
        assert_eq!(parsed.signature, "abc123");
    }

    #[test]
    fn rejects_malformed_header() {
        assert!(matches!(parse_header("garbage"), Err(SignatureError::Malformed)));
    }

    #[test]
    fn sign_then_verify_round_trips() {
        let body = br#"{"hello":"world"}"#;
        let now = Utc.timestamp_opt(1687306735, 0).unwrap();
        let header = sign(body, TEST_KEY, now.timestamp()).unwrap();
        assert!(verify(Some(&header), body, Some(TEST_KEY), None, now, false).is_ok());
    }

    #[test]
    fn altered_body_fails_verification() {
        let body = br#"{"hello":"world"}"#;
        let now = Utc.timestamp_opt(1687306735, 0).unwrap();
        let header = sign(body, TEST_KEY, now.timestamp()).unwrap();
        let altered = br#"{"hello":"mars"}"#;
        assert!(matches!(
            verify(Some(&header), altered, Some(TEST_KEY), None, now, false),
            Err(SignatureError::Mismatch)
        ));
    }

    #[test]
    fn expired_signature_rejected_by_default() {
        let body = b"{}";
        let signed_at = Utc.timestamp_opt(1687306735, 0).unwrap();
        let header = sign(body, TEST_KEY, signed_at.timestamp()).unwrap();
        let much_later = signed_at + chrono::Duration::seconds(MAX_SIGNATURE_AGE_SECONDS + 1);
        assert!(matches!(
            verify(Some(&header), body, Some(TEST_KEY), None, much_later, false),
            Err(SignatureError::Expired)
        ));
    }

    #[test]
    fn expired_signature_allowed_with_test_hook() {
        let body = b"{}";
        let signed_at = Utc.timestamp_opt(1687306735, 0).unwrap();
        let header = sign(body, TEST_KEY, signed_at.timestamp()).unwrap();
        let much_later = signed_at + chrono::Duration::days(365);
        assert!(verify(Some(&header), body, Some(TEST_KEY), None, much_later, true).is_ok());
    }

    #[test]
    fn missing_header_is_rejected() {
        let now = Utc::now();
        assert!(matches!(
            verify(None, b"{}", Some(TEST_KEY), None, now, false),
            Err(SignatureError::Missing)
        ));
    }

    #[test]
    fn falls_back_to_secondary_key_during_rotation() {
        let body = b"{}";
        let now = Utc.timestamp_opt(1687306735, 0).unwrap();
        let fallback_key = "signkey-test-00112233445566778899aabbccddeeff00112233445566778899aabbccddeeff";
        let header = sign(body, fallback_key, now.timestamp()).unwrap();
        assert!(verify(Some(&header), body, Some(TEST_KEY), Some(fallback_key), now, false).is_ok());
    }
}

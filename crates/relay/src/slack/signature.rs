//! HMAC-SHA256 request verification for Slack Events API.
//!
//! Slack signs every webhook request with an HMAC-SHA256 signature using
//! the app's signing secret. We verify this to ensure requests are authentic
//! and recent.

use axum::http::HeaderMap;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::error::RelayError;

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "x-slack-signature";
pub const TIMESTAMP_HEADER: &str = "x-slack-request-timestamp";

/// Maximum allowed skew of a Slack request timestamp (5 minutes).
pub const MAX_TIMESTAMP_AGE_SECS: i64 = 300;

const VERSION: &str = "v0";

/// Verify an inbound request from its headers and raw body.
pub fn verify_request(
    signing_secret: &str,
    headers: &HeaderMap,
    body: &[u8],
) -> Result<(), RelayError> {
    let timestamp = header_str(headers, TIMESTAMP_HEADER)?;
    let signature = header_str(headers, SIGNATURE_HEADER)?;
    verify_slack_signature(
        signing_secret,
        timestamp,
        body,
        signature,
        chrono::Utc::now().timestamp(),
    )
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Result<&'a str, RelayError> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| RelayError::SignatureInvalid(format!("missing {} header", name)))
}

/// Check `signature` against `v0=HMAC-SHA256(secret, "v0:{timestamp}:{body}")`.
///
/// `now` is the current Unix time in seconds; the timestamp must be within
/// [`MAX_TIMESTAMP_AGE_SECS`] of it in either direction.
pub fn verify_slack_signature(
    signing_secret: &str,
    timestamp: &str,
    body: &[u8],
    signature: &str,
    now: i64,
) -> Result<(), RelayError> {
    let ts: i64 = timestamp
        .trim()
        .parse()
        .map_err(|_| RelayError::SignatureInvalid("invalid timestamp".to_string()))?;
    if now.abs_diff(ts) > MAX_TIMESTAMP_AGE_SECS as u64 {
        return Err(RelayError::SignatureInvalid(
            "request timestamp outside freshness window".to_string(),
        ));
    }

    let computed = compute_signature(signing_secret, timestamp, body)?;
    if !constant_time_eq(computed.as_bytes(), signature.as_bytes()) {
        return Err(RelayError::SignatureInvalid(
            "signature mismatch".to_string(),
        ));
    }

    Ok(())
}

/// Compute the `v0=<hex>` signature Slack would send for this timestamp and body.
///
/// The body is signed exactly as received; it must not be re-serialized.
pub fn compute_signature(
    signing_secret: &str,
    timestamp: &str,
    body: &[u8],
) -> Result<String, RelayError> {
    let mut mac = HmacSha256::new_from_slice(signing_secret.as_bytes())
        .map_err(|e| RelayError::Internal(format!("HMAC init failed: {}", e)))?;
    mac.update(VERSION.as_bytes());
    mac.update(b":");
    mac.update(timestamp.as_bytes());
    mac.update(b":");
    mac.update(body);
    Ok(format!("{}={}", VERSION, hex::encode(mac.finalize().into_bytes())))
}

/// Length-checked comparison that inspects every byte regardless of where they differ.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.ct_eq(b).unwrap_u8() == 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    const SECRET: &str = "8f742231b10e8888abcd99yyyzzz85a5";

    fn signed_headers(secret: &str, timestamp: &str, body: &[u8]) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(TIMESTAMP_HEADER, HeaderValue::from_str(timestamp).unwrap());
        let sig = compute_signature(secret, timestamp, body).unwrap();
        headers.insert(SIGNATURE_HEADER, HeaderValue::from_str(&sig).unwrap());
        headers
    }

    #[test]
    fn valid_signature_passes() {
        let timestamp = chrono::Utc::now().timestamp().to_string();
        let body = br#"{"type":"event_callback","event":{"type":"message"}}"#;
        let headers = signed_headers(SECRET, &timestamp, body);
        assert!(verify_request(SECRET, &headers, body).is_ok());
    }

    #[test]
    fn known_vector_matches() {
        // Example published in Slack's request-signing documentation.
        let body = b"token=xyzz0WbapA4vBCDEFasx0q6G&team_id=T1DC2JH3J&team_domain=testteamnow&channel_id=G8PSS9T3V&channel_name=foobar&user_id=U2CERLKJA&user_name=roadrunner&command=%2Fwebhook-collect&text=&response_url=https%3A%2F%2Fhooks.slack.com%2Fcommands%2FT1DC2JH3J%2F397700885554%2F96rGlfmibIGlgcZRskXaIFfN&trigger_id=398738663015.47445629121.803a0bc887a14d10d2c447fce8b6703c";
        let sig = compute_signature(SECRET, "1531420618", body).unwrap();
        assert_eq!(
            sig,
            "v0=a2114d57b48eac39b9ad189dd8316235a7b4a8d21a10bd27519666489c69b503"
        );
        assert!(verify_slack_signature(SECRET, "1531420618", body, &sig, 1531420618).is_ok());
    }

    #[test]
    fn invalid_signature_fails() {
        let timestamp = chrono::Utc::now().timestamp().to_string();
        let body = b"some body";
        let mut headers = signed_headers(SECRET, &timestamp, body);
        headers.insert(
            SIGNATURE_HEADER,
            HeaderValue::from_static(
                "v0=deadbeefdeadbeefdeadbeefdeadbeefdeadbeefdeadbeefdeadbeefdeadbeef",
            ),
        );
        match verify_request(SECRET, &headers, body) {
            Err(RelayError::SignatureInvalid(msg)) => assert!(msg.contains("mismatch")),
            other => panic!("expected SignatureInvalid, got: {:?}", other),
        }
    }

    #[test]
    fn tampered_body_fails() {
        let timestamp = chrono::Utc::now().timestamp().to_string();
        let headers = signed_headers(SECRET, &timestamp, br#"{"text":"a"}"#);
        assert!(verify_request(SECRET, &headers, br#"{"text":"b"}"#).is_err());
        // Same JSON with different whitespace is a different byte string.
        assert!(verify_request(SECRET, &headers, br#"{"text": "a"}"#).is_err());
    }

    #[test]
    fn wrong_secret_fails() {
        let timestamp = chrono::Utc::now().timestamp().to_string();
        let headers = signed_headers("other-secret", &timestamp, b"body");
        assert!(verify_request(SECRET, &headers, b"body").is_err());
    }

    #[test]
    fn old_timestamp_rejected() {
        let now = 1_700_000_000;
        let old_ts = (now - 301).to_string();
        let sig = compute_signature(SECRET, &old_ts, b"body").unwrap();
        match verify_slack_signature(SECRET, &old_ts, b"body", &sig, now) {
            Err(RelayError::SignatureInvalid(msg)) => assert!(msg.contains("freshness")),
            other => panic!("expected SignatureInvalid, got: {:?}", other),
        }
    }

    #[test]
    fn future_timestamp_rejected() {
        let now = 1_700_000_000;
        let future_ts = (now + 301).to_string();
        let sig = compute_signature(SECRET, &future_ts, b"body").unwrap();
        assert!(verify_slack_signature(SECRET, &future_ts, b"body", &sig, now).is_err());
    }

    #[test]
    fn timestamp_at_window_edge_accepted() {
        let now = 1_700_000_000;
        let edge_ts = (now - MAX_TIMESTAMP_AGE_SECS).to_string();
        let sig = compute_signature(SECRET, &edge_ts, b"body").unwrap();
        assert!(verify_slack_signature(SECRET, &edge_ts, b"body", &sig, now).is_ok());
    }

    #[test]
    fn non_numeric_timestamp_rejected() {
        let sig = compute_signature(SECRET, "yesterday", b"body").unwrap();
        assert!(verify_slack_signature(SECRET, "yesterday", b"body", &sig, 0).is_err());
    }

    #[test]
    fn missing_headers_rejected() {
        let timestamp = chrono::Utc::now().timestamp().to_string();
        let body = b"body";

        let mut no_sig = signed_headers(SECRET, &timestamp, body);
        no_sig.remove(SIGNATURE_HEADER);
        assert!(verify_request(SECRET, &no_sig, body).is_err());

        let mut no_ts = signed_headers(SECRET, &timestamp, body);
        no_ts.remove(TIMESTAMP_HEADER);
        assert!(verify_request(SECRET, &no_ts, body).is_err());

        assert!(verify_request(SECRET, &HeaderMap::new(), body).is_err());
    }

    #[test]
    fn constant_time_eq_semantics() {
        assert!(constant_time_eq(b"", b""));
        assert!(constant_time_eq(b"v0=abc", b"v0=abc"));
        assert!(!constant_time_eq(b"v0=abc", b"v0=abd"));
        assert!(!constant_time_eq(b"v0=abc", b"v0=ab"));
        assert!(!constant_time_eq(b"v0=abc", b"v0=abcd"));
        assert!(!constant_time_eq(b"xbc", b"abc"));
    }
}

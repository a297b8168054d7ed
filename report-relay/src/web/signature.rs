//! Webhook signature verification.
//!
//! Senders sign each request with HMAC-SHA256 over
//! `"{X-Timestamp}.{canonical JSON body}"` and put the lowercase hex digest in
//! `X-Signature` (or `Signature`). The canonical body is the compact JSON
//! serialization with object keys sorted, so field order on the wire does not
//! matter.
//!
//! Verification is pure: it never logs and never panics. Callers get a
//! definite verdict and decide what to record.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use axum::http::HeaderMap;
use hmac::{Hmac, Mac};
use serde_json::{Map, Value};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "X-Signature";
pub const FALLBACK_SIGNATURE_HEADER: &str = "Signature";
pub const TIMESTAMP_HEADER: &str = "X-Timestamp";

/// Why a request was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    MissingSignature,
    MissingTimestamp,
    MissingSecret,
    InvalidTimestamp,
    StaleTimestamp,
    Mismatch,
}

impl RejectReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectReason::MissingSignature => "missing_signature",
            RejectReason::MissingTimestamp => "missing_timestamp",
            RejectReason::MissingSecret => "missing_secret",
            RejectReason::InvalidTimestamp => "invalid_timestamp",
            RejectReason::StaleTimestamp => "stale_timestamp",
            RejectReason::Mismatch => "mismatch",
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub type VerificationResult = Result<(), RejectReason>;

/// Verify a webhook request without a freshness window.
///
/// Accepts only if a signature and a timestamp are present, a secret is
/// configured, and the signature matches exactly.
pub fn verify(
    body: &Map<String, Value>,
    headers: &HeaderMap,
    secret_key: Option<&str>,
) -> VerificationResult {
    verify_with_window(body, headers, secret_key, None)
}

/// Verify a webhook request, optionally bounding the timestamp age.
///
/// With `max_age_secs` set, the timestamp must be integer Unix seconds within
/// `max_age_secs` of now in either direction.
pub fn verify_with_window(
    body: &Map<String, Value>,
    headers: &HeaderMap,
    secret_key: Option<&str>,
    max_age_secs: Option<u64>,
) -> VerificationResult {
    let signature = header_value(headers, SIGNATURE_HEADER)
        .or_else(|| header_value(headers, FALLBACK_SIGNATURE_HEADER))
        .ok_or(RejectReason::MissingSignature)?;

    let timestamp =
        header_value(headers, TIMESTAMP_HEADER).ok_or(RejectReason::MissingTimestamp)?;

    let secret = secret_key
        .filter(|k| !k.is_empty())
        .ok_or(RejectReason::MissingSecret)?;

    if let Some(max_age) = max_age_secs {
        check_freshness(timestamp, max_age, unix_now())?;
    }

    let expected = sign(secret, timestamp, body).ok_or(RejectReason::Mismatch)?;

    if constant_time_compare(&expected, signature) {
        Ok(())
    } else {
        Err(RejectReason::Mismatch)
    }
}

/// Compute the lowercase hex signature a sender would attach.
///
/// Returns `None` only if the HMAC key is rejected.
pub fn sign(secret_key: &str, timestamp: &str, body: &Map<String, Value>) -> Option<String> {
    let mut mac = HmacSha256::new_from_slice(secret_key.as_bytes()).ok()?;
    mac.update(signing_input(timestamp, body).as_bytes());
    Some(hex::encode(mac.finalize().into_bytes()))
}

/// `"{timestamp}.{canonical_body}"`
pub fn signing_input(timestamp: &str, body: &Map<String, Value>) -> String {
    let mut input = String::with_capacity(timestamp.len() + 64);
    input.push_str(timestamp);
    input.push('.');
    write_canonical_object(body, &mut input);
    input
}

/// Compact JSON with object keys sorted at every depth.
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => write_canonical_object(map, out),
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
        // Display on scalars is already compact JSON with escaped strings.
        scalar => out.push_str(&scalar.to_string()),
    }
}

fn write_canonical_object(map: &Map<String, Value>, out: &mut String) {
    let mut entries: Vec<(&String, &Value)> = map.iter().collect();
    entries.sort_by(|a, b| a.0.cmp(b.0));

    out.push('{');
    for (i, (key, value)) in entries.into_iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push_str(&Value::String(key.clone()).to_string());
        out.push(':');
        write_canonical(value, out);
    }
    out.push('}');
}

fn check_freshness(timestamp: &str, max_age_secs: u64, now: u64) -> VerificationResult {
    let sent_at: u64 = timestamp
        .trim()
        .parse()
        .map_err(|_| RejectReason::InvalidTimestamp)?;

    if now.abs_diff(sent_at) > max_age_secs {
        return Err(RejectReason::StaleTimestamp);
    }

    Ok(())
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Header lookup is case-insensitive; empty and non-ASCII values count as absent.
fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
}

/// Constant-time string comparison to prevent timing attacks.
fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }
    result == 0
}

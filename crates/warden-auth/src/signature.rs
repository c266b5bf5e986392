//! # Signature Engine
//!
//! Canonical payload construction and HMAC-SHA256 signing/verification.
//!
//! ## Canonical Payload
//!
//! ```text
//! {METHOD}\n{PATH}\n{TIMESTAMP_MS}\n{BODY}
//! ```
//!
//! Field order and the `\n` delimiter are fixed. Nothing is normalized: a
//! trailing slash or a query string that differs between signer and verifier
//! produces a different payload and therefore a signature mismatch, never a
//! decodable error.
//!
//! ## Security Invariant
//!
//! [`verify`] compares MACs in constant time (`Mac::verify_slice`). Candidate
//! signatures that are not lowercase hex, or decode to the wrong length, are
//! compared against a zeroed buffer so the failure path does the same work.

use std::borrow::Cow;

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Output length of HMAC-SHA256 in bytes.
pub const SIGNATURE_LEN: usize = 32;

/// The body component of a canonical payload.
///
/// Non-empty text bodies are signed verbatim. JSON values are signed in their
/// compact `serde_json` serialization. An absent or empty body is signed as `{}`.
#[derive(Debug, Clone, Copy)]
pub enum CanonicalBody<'a> {
    /// No body was sent.
    Absent,
    /// The body as it travels on the wire.
    Text(&'a str),
    /// A structured body, serialized compactly before signing.
    Json(&'a serde_json::Value),
}

impl<'a> CanonicalBody<'a> {
    /// Render the body exactly as it appears in the canonical payload.
    ///
    /// Text is verbatim except the empty string, which renders as `{}` like
    /// an absent body since the two cannot be told apart on the wire.
    pub fn render(&self) -> Cow<'a, str> {
        match self {
            Self::Absent => Cow::Borrowed("{}"),
            Self::Text("") => Cow::Borrowed("{}"),
            Self::Text(text) => Cow::Borrowed(text),
            Self::Json(value) => Cow::Owned(value.to_string()),
        }
    }
}

impl<'a> From<&'a str> for CanonicalBody<'a> {
    fn from(text: &'a str) -> Self {
        Self::Text(text)
    }
}

impl<'a> From<&'a serde_json::Value> for CanonicalBody<'a> {
    fn from(value: &'a serde_json::Value) -> Self {
        Self::Json(value)
    }
}

impl<'a> From<Option<&'a str>> for CanonicalBody<'a> {
    fn from(text: Option<&'a str>) -> Self {
        text.map_or(Self::Absent, Self::Text)
    }
}

/// Build the canonical payload signed by the caller and re-derived by the verifier.
pub fn canonical_payload(
    method: &str,
    path: &str,
    timestamp_ms: &str,
    body: CanonicalBody<'_>,
) -> String {
    let body = body.render();
    let mut payload =
        String::with_capacity(method.len() + path.len() + timestamp_ms.len() + body.len() + 3);
    payload.push_str(method);
    payload.push('\n');
    payload.push_str(path);
    payload.push('\n');
    payload.push_str(timestamp_ms);
    payload.push('\n');
    payload.push_str(&body);
    payload
}

fn keyed_mac(secret: &[u8]) -> HmacSha256 {
    match HmacSha256::new_from_slice(secret) {
        Ok(mac) => mac,
        // HMAC pads or hashes the key; every length is accepted.
        Err(_) => unreachable!("HMAC-SHA256 accepts keys of any length"),
    }
}

/// HMAC-SHA256 over `payload` keyed by `secret`, as 64 lowercase hex characters.
pub fn sign(payload: &str, secret: &str) -> String {
    let mut mac = keyed_mac(secret.as_bytes());
    mac.update(payload.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Recompute the signature of `payload` and compare it to `candidate` in constant time.
///
/// Only the lowercase hex that [`sign`] emits is accepted. Never errors:
/// malformed candidates simply fail verification.
pub fn verify(payload: &str, secret: &str, candidate: &str) -> bool {
    let mut mac = keyed_mac(secret.as_bytes());
    mac.update(payload.as_bytes());

    let lowercase = !candidate.bytes().any(|b| b.is_ascii_uppercase());
    let decoded = hex::decode(candidate)
        .ok()
        .filter(|bytes| lowercase && bytes.len() == SIGNATURE_LEN);
    let well_formed = decoded.is_some();
    let bytes = decoded.unwrap_or_else(|| vec![0u8; SIGNATURE_LEN]);

    let matches = mac.verify_slice(&bytes).is_ok();
    matches && well_formed
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "topsecret32characterslong-abcdef";

    #[test]
    fn canonical_payload_joins_fields_with_newlines() {
        let body = serde_json::json!({"qty": 1});
        let payload = canonical_payload("POST", "/orders", "1700000000000", (&body).into());
        assert_eq!(payload, "POST\n/orders\n1700000000000\n{\"qty\":1}");
    }

    #[test]
    fn absent_body_renders_as_empty_object() {
        let payload = canonical_payload("GET", "/health", "1", CanonicalBody::Absent);
        assert_eq!(payload, "GET\n/health\n1\n{}");
    }

    #[test]
    fn text_body_is_signed_verbatim() {
        let raw = "{ \"qty\" : 1 }";
        let payload = canonical_payload("POST", "/orders", "1", raw.into());
        assert!(payload.ends_with(raw));
    }

    #[test]
    fn none_text_body_is_absent() {
        let body: CanonicalBody<'_> = None.into();
        assert_eq!(body.render(), "{}");
    }

    #[test]
    fn empty_text_body_matches_absent() {
        assert_eq!(CanonicalBody::Text("").render(), CanonicalBody::Absent.render());
    }

    #[test]
    fn query_string_is_part_of_the_path() {
        let a = canonical_payload("GET", "/orders?page=1", "1", CanonicalBody::Absent);
        let b = canonical_payload("GET", "/orders", "1", CanonicalBody::Absent);
        assert_ne!(a, b);
    }

    #[test]
    fn sign_is_64_lowercase_hex() {
        let sig = sign("payload", SECRET);
        assert_eq!(sig.len(), 64);
        assert!(sig.chars().all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));
    }

    #[test]
    fn sign_matches_rfc4231_vector() {
        // RFC 4231 test case 2.
        let sig = sign("what do ya want for nothing?", "Jefe");
        assert_eq!(
            sig,
            "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
        );
    }

    #[test]
    fn verify_accepts_own_signature() {
        let sig = sign("payload", SECRET);
        assert!(verify("payload", SECRET, &sig));
    }

    #[test]
    fn verify_rejects_uppercase_hex() {
        let sig = sign("payload", SECRET);
        assert!(!verify("payload", SECRET, &sig.to_uppercase()));

        // A single uppercase digit is enough.
        let pos = sig.find(|c: char| c.is_ascii_alphabetic()).unwrap();
        let mut mixed = sig.clone();
        mixed.replace_range(pos..=pos, &sig[pos..=pos].to_uppercase());
        assert!(!verify("payload", SECRET, &mixed));
    }

    #[test]
    fn verify_rejects_other_secret() {
        let sig = sign("payload", SECRET);
        assert!(!verify("payload", "a-different-secret", &sig));
    }

    #[test]
    fn verify_rejects_tampered_payload() {
        let sig = sign("payload", SECRET);
        assert!(!verify("payload!", SECRET, &sig));
    }

    #[test]
    fn verify_rejects_malformed_candidates() {
        assert!(!verify("payload", SECRET, ""));
        assert!(!verify("payload", SECRET, "not-hex-zz"));
        assert!(!verify("payload", SECRET, "abcd"));
        let sig = sign("payload", SECRET);
        assert!(!verify("payload", SECRET, &format!("{sig}00")));
    }
}

//! # Inbound Verifier
//!
//! Decides whether an inbound request may reach an internal-only endpoint.
//!
//! ## Check Order
//!
//! Checks short-circuit in this order and every failure is fatal:
//!
//! 1. Endpoint is [`EndpointAuth::Open`]: admit without looking at headers.
//! 2. All four signed headers present and non-empty.
//! 3. Principal is registered. No HMAC work is done for unknown names.
//! 4. Claimed secret equals the registered secret (constant time).
//! 5. Timestamp parses and lies within the tolerance window.
//! 6. Caller IP passes the allow-list.
//! 7. Signature over the re-derived canonical payload verifies.
//!
//! The verifier never trusts a caller-supplied path or body. It rebuilds the
//! canonical payload from what it actually received.

use std::sync::Arc;

use serde::Serialize;

use crate::registry::PrincipalRegistry;
use crate::replay::{self, DEFAULT_TOLERANCE_MS};
use crate::signature::{self, CanonicalBody};

/// Principal name header.
pub const HEADER_SERVICE_NAME: &str = "x-service-name";
/// Shared secret header.
pub const HEADER_SERVICE_SECRET: &str = "x-service-secret";
/// Caller clock, epoch milliseconds.
pub const HEADER_TIMESTAMP: &str = "x-timestamp";
/// Hex HMAC-SHA256 over the canonical payload.
pub const HEADER_SIGNATURE: &str = "x-signature";

/// Whether an endpoint runs the internal-auth gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointAuth {
    Open,
    Internal,
}

/// Authenticated internal caller attached to an admitted request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InternalCaller {
    pub name: String,
    pub timestamp_ms: i64,
}

/// Outcome of a successful verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    /// The endpoint is not marked internal; no identity was established.
    Open,
    Authenticated(InternalCaller),
}

impl Admission {
    pub fn caller(&self) -> Option<&InternalCaller> {
        match self {
            Self::Open => None,
            Self::Authenticated(caller) => Some(caller),
        }
    }
}

/// Why a request was refused.
///
/// Distinct internally for logs and metrics. Callers only ever see one
/// generic forbidden response.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Rejection {
    #[error("missing internal auth headers")]
    MissingHeaders,
    #[error("unknown principal '{0}'")]
    UnknownPrincipal(String),
    #[error("service secret mismatch for '{0}'")]
    SecretMismatch(String),
    #[error("malformed timestamp")]
    MalformedTimestamp,
    #[error("timestamp {timestamp_ms} outside tolerance window")]
    StaleTimestamp { timestamp_ms: i64 },
    #[error("caller ip '{0}' not in allow-list")]
    IpNotAllowed(String),
    #[error("signature mismatch for '{0}'")]
    SignatureMismatch(String),
}

impl Rejection {
    /// Stable label for logs and the rejection counter.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::MissingHeaders => "missing_headers",
            Self::UnknownPrincipal(_) => "unknown_principal",
            Self::SecretMismatch(_) => "secret_mismatch",
            Self::MalformedTimestamp => "malformed_timestamp",
            Self::StaleTimestamp { .. } => "stale_timestamp",
            Self::IpNotAllowed(_) => "ip_not_allowed",
            Self::SignatureMismatch(_) => "signature_mismatch",
        }
    }
}

/// The four signed header values as received.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SignedHeaders<'a> {
    pub service_name: Option<&'a str>,
    pub service_secret: Option<&'a str>,
    pub timestamp: Option<&'a str>,
    pub signature: Option<&'a str>,
}

impl<'a> SignedHeaders<'a> {
    /// Collect the headers through a case-insensitive lookup supplied by the transport.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<&'a str>,
    {
        Self {
            service_name: lookup(HEADER_SERVICE_NAME),
            service_secret: lookup(HEADER_SERVICE_SECRET),
            timestamp: lookup(HEADER_TIMESTAMP),
            signature: lookup(HEADER_SIGNATURE),
        }
    }

    fn complete(&self) -> Option<(&'a str, &'a str, &'a str, &'a str)> {
        let present = |value: Option<&'a str>| value.filter(|v| !v.is_empty());
        Some((
            present(self.service_name)?,
            present(self.service_secret)?,
            present(self.timestamp)?,
            present(self.signature)?,
        ))
    }
}

/// What the verifier observed about one request.
#[derive(Debug, Clone, Copy)]
pub struct InboundRequest<'a> {
    pub method: &'a str,
    /// Path as received, including `?query` when present.
    pub path: &'a str,
    /// Raw body bytes. Empty means absent.
    pub body: &'a [u8],
    pub headers: SignedHeaders<'a>,
    pub client_ip: &'a str,
}

/// Stateless gate over a shared [`PrincipalRegistry`].
#[derive(Debug, Clone)]
pub struct InboundVerifier {
    registry: Arc<PrincipalRegistry>,
    tolerance_ms: u64,
}

impl InboundVerifier {
    pub fn new(registry: Arc<PrincipalRegistry>) -> Self {
        Self {
            registry,
            tolerance_ms: DEFAULT_TOLERANCE_MS,
        }
    }

    pub fn with_tolerance_ms(mut self, tolerance_ms: u64) -> Self {
        self.tolerance_ms = tolerance_ms;
        self
    }

    pub fn tolerance_ms(&self) -> u64 {
        self.tolerance_ms
    }

    pub fn registry(&self) -> &PrincipalRegistry {
        &self.registry
    }

    /// Run the gate against the wall clock.
    pub fn verify_now(
        &self,
        auth: EndpointAuth,
        request: &InboundRequest<'_>,
    ) -> Result<Admission, Rejection> {
        self.verify(auth, request, replay::unix_millis())
    }

    /// Run the gate with an explicit `now_ms`.
    pub fn verify(
        &self,
        auth: EndpointAuth,
        request: &InboundRequest<'_>,
        now_ms: i64,
    ) -> Result<Admission, Rejection> {
        if auth == EndpointAuth::Open {
            return Ok(Admission::Open);
        }

        let (name, claimed_secret, raw_timestamp, candidate) =
            request.headers.complete().ok_or(Rejection::MissingHeaders)?;

        let secret = self
            .registry
            .resolve(name)
            .ok_or_else(|| Rejection::UnknownPrincipal(name.to_string()))?;

        if !secret.matches(claimed_secret) {
            return Err(Rejection::SecretMismatch(name.to_string()));
        }

        let timestamp_ms =
            replay::parse_timestamp(raw_timestamp).ok_or(Rejection::MalformedTimestamp)?;
        if !replay::is_fresh(timestamp_ms, now_ms, self.tolerance_ms) {
            return Err(Rejection::StaleTimestamp { timestamp_ms });
        }

        if !self.registry.is_ip_allowed(request.client_ip) {
            return Err(Rejection::IpNotAllowed(request.client_ip.to_string()));
        }

        let body = match request.body {
            [] => CanonicalBody::Absent,
            bytes => match std::str::from_utf8(bytes) {
                Ok(text) => CanonicalBody::Text(text),
                Err(_) => return Err(Rejection::SignatureMismatch(name.to_string())),
            },
        };
        let payload =
            signature::canonical_payload(request.method, request.path, raw_timestamp, body);
        if !signature::verify(&payload, secret.expose(), candidate) {
            return Err(Rejection::SignatureMismatch(name.to_string()));
        }

        Ok(Admission::Authenticated(InternalCaller {
            name: name.to_string(),
            timestamp_ms,
        }))
    }
}

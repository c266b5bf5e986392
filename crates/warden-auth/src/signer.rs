//! # Outbound Signer
//!
//! Produces the four signed headers for a request this service sends to a peer.

use crate::registry::ServiceSecret;
use crate::replay;
use crate::signature::{self, CanonicalBody};
use crate::verifier::{HEADER_SERVICE_NAME, HEADER_SERVICE_SECRET, HEADER_SIGNATURE, HEADER_TIMESTAMP};

/// Header values ready to attach to an outbound request.
#[derive(Clone)]
pub struct SignedHeaderSet {
    pub service_name: String,
    pub service_secret: ServiceSecret,
    pub timestamp: String,
    pub signature: String,
}

impl SignedHeaderSet {
    /// `(header name, value)` pairs in a fixed order.
    pub fn pairs(&self) -> [(&'static str, &str); 4] {
        [
            (HEADER_SERVICE_NAME, self.service_name.as_str()),
            (HEADER_SERVICE_SECRET, self.service_secret.expose()),
            (HEADER_TIMESTAMP, self.timestamp.as_str()),
            (HEADER_SIGNATURE, self.signature.as_str()),
        ]
    }
}

impl std::fmt::Debug for SignedHeaderSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignedHeaderSet")
            .field("service_name", &self.service_name)
            .field("service_secret", &"[REDACTED]")
            .field("timestamp", &self.timestamp)
            .field("signature", &self.signature)
            .finish()
    }
}

/// Signs outbound requests as one configured principal.
#[derive(Debug, Clone)]
pub struct OutboundSigner {
    service_name: String,
    secret: ServiceSecret,
}

impl OutboundSigner {
    pub fn new(service_name: impl Into<String>, secret: impl Into<ServiceSecret>) -> Self {
        Self {
            service_name: service_name.into(),
            secret: secret.into(),
        }
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    /// Sign `method` + `path` + `body` at `now_ms`.
    ///
    /// `path` must be exactly what the receiver will see, query string included.
    pub fn build_headers(
        &self,
        method: &str,
        path: &str,
        body: CanonicalBody<'_>,
        now_ms: i64,
    ) -> SignedHeaderSet {
        let timestamp = now_ms.to_string();
        let payload = signature::canonical_payload(method, path, &timestamp, body);
        SignedHeaderSet {
            service_name: self.service_name.clone(),
            service_secret: self.secret.clone(),
            signature: signature::sign(&payload, self.secret.expose()),
            timestamp,
        }
    }

    pub fn sign_now(&self, method: &str, path: &str, body: CanonicalBody<'_>) -> SignedHeaderSet {
        self.build_headers(method, path, body, replay::unix_millis())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn headers_carry_identity_and_timestamp() {
        let signer = OutboundSigner::new("admin-service", "s3cret");
        let headers = signer.build_headers("GET", "/x", CanonicalBody::Absent, 42);
        assert_eq!(headers.service_name, "admin-service");
        assert_eq!(headers.service_secret.expose(), "s3cret");
        assert_eq!(headers.timestamp, "42");
        assert_eq!(headers.signature.len(), 64);
    }

    #[test]
    fn signature_covers_canonical_payload() {
        let signer = OutboundSigner::new("admin-service", "s3cret");
        let headers = signer.build_headers("GET", "/x", CanonicalBody::Absent, 42);
        assert!(signature::verify("GET\n/x\n42\n{}", "s3cret", &headers.signature));
    }

    #[test]
    fn pairs_use_wire_header_names() {
        let headers = OutboundSigner::new("a", "b").build_headers("GET", "/", CanonicalBody::Absent, 1);
        let names: Vec<&str> = headers.pairs().iter().map(|(name, _)| *name).collect();
        assert_eq!(names, ["x-service-name", "x-service-secret", "x-timestamp", "x-signature"]);
    }

    #[test]
    fn debug_redacts_secret() {
        let headers = OutboundSigner::new("a", "very-secret").sign_now("GET", "/", CanonicalBody::Absent);
        let rendered = format!("{headers:?}");
        assert!(!rendered.contains("very-secret"));
        assert!(!format!("{:?}", OutboundSigner::new("a", "very-secret")).contains("very-secret"));
    }
}

//! # warden-peer-client — Signed calls to peer services
//!
//! A thin typed wrapper over `reqwest` that attaches the internal-auth
//! headers produced by [`warden_auth::OutboundSigner`] to every request.
//!
//! ## Signed Path
//!
//! The signature covers the path exactly as it goes on the wire: the base
//! URL's own path, then the endpoint, then `?query` when present. A peer
//! mounted under `http://core:8080/api` therefore verifies `/api/orders`,
//! not `/orders`. The bytes sent as the body are the bytes that were signed.
//!
//! ## Failure Model
//!
//! No retries. Each call is bounded by the configured timeout; elapsing it
//! yields [`PeerError::Timeout`]. Non-2xx responses are classified by status.
//! Credentials that cannot travel as header values are rejected when the
//! client is built, not reported as an unreachable peer.

pub mod config;
pub mod error;

pub use config::{ConfigError, PeerConfig};
pub use error::PeerError;

use std::time::Duration;

use reqwest::header::{HeaderValue, CONTENT_TYPE};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use url::Url;
use warden_auth::OutboundSigner;

/// Client for one peer service.
#[derive(Debug, Clone)]
pub struct PeerClient {
    http: reqwest::Client,
    base_url: Url,
    signer: OutboundSigner,
    timeout: Duration,
}

impl PeerClient {
    /// Fails with [`PeerError::InvalidHeader`] when the service name or
    /// secret cannot be sent as a header value.
    pub fn new(config: PeerConfig) -> Result<Self, PeerError> {
        for (field, value) in [
            ("service name", config.service_name.as_str()),
            ("service secret", config.service_secret.expose()),
        ] {
            HeaderValue::from_str(value).map_err(|_| PeerError::InvalidHeader(field))?;
        }
        let timeout = Duration::from_millis(config.timeout_ms);
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(PeerError::Client)?;
        Ok(Self {
            http,
            signer: OutboundSigner::new(config.service_name, config.service_secret),
            base_url: config.base_url,
            timeout,
        })
    }

    pub fn from_env() -> Result<Self, PeerError> {
        Self::new(PeerConfig::from_env()?)
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// `GET {base}{endpoint}?{query}`.
    pub async fn get<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        query: &[(&str, &str)],
    ) -> Result<T, PeerError> {
        self.execute(Method::GET, endpoint, query, None).await
    }

    pub async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        endpoint: &str,
        body: &B,
    ) -> Result<T, PeerError> {
        let body = encode(&Method::POST, endpoint, body)?;
        self.execute(Method::POST, endpoint, &[], Some(body)).await
    }

    pub async fn put<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        endpoint: &str,
        body: &B,
    ) -> Result<T, PeerError> {
        let body = encode(&Method::PUT, endpoint, body)?;
        self.execute(Method::PUT, endpoint, &[], Some(body)).await
    }

    pub async fn patch<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        endpoint: &str,
        body: &B,
    ) -> Result<T, PeerError> {
        let body = encode(&Method::PATCH, endpoint, body)?;
        self.execute(Method::PATCH, endpoint, &[], Some(body)).await
    }

    pub async fn delete<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T, PeerError> {
        self.execute(Method::DELETE, endpoint, &[], None).await
    }

    /// Join `endpoint` and `query` onto the base URL.
    ///
    /// Endpoints carry the path only; put query parameters in `query`.
    fn resolve(&self, endpoint: &str, query: &[(&str, &str)]) -> Result<Url, PeerError> {
        if endpoint.contains(['?', '#']) {
            return Err(PeerError::InvalidEndpoint(endpoint.to_string()));
        }
        let mut url = self.base_url.clone();
        let base_path = url.path().trim_end_matches('/').to_string();
        let endpoint = endpoint.trim_start_matches('/');
        url.set_path(&format!("{base_path}/{endpoint}"));
        url.set_query(None);
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url)
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        method: Method,
        endpoint: &str,
        query: &[(&str, &str)],
        body: Option<String>,
    ) -> Result<T, PeerError> {
        let url = self.resolve(endpoint, query)?;
        let label = format!("{method} {endpoint}");

        let signed_path = match url.query() {
            Some(q) => format!("{}?{q}", url.path()),
            None => url.path().to_string(),
        };
        let headers = self.signer.sign_now(
            method.as_str(),
            &signed_path,
            body.as_deref().into(),
        );

        tracing::debug!(method = %method, path = %signed_path, peer = %self.base_url, "calling peer");

        let mut request = self
            .http
            .request(method, url)
            .timeout(self.timeout)
            .header(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        for (name, value) in headers.pairs() {
            request = request.header(name, value);
        }
        if let Some(body) = body {
            request = request.body(body);
        }

        let resp = request.send().await.map_err(|e| self.transport_error(&label, e))?;

        let status = resp.status();
        let bytes = resp
            .bytes()
            .await
            .map_err(|e| self.transport_error(&label, e))?;

        if !status.is_success() {
            let text = String::from_utf8_lossy(&bytes);
            let message = error::upstream_message(&text, status.canonical_reason());
            tracing::warn!(endpoint = %label, status = status.as_u16(), %message, "peer returned error");
            return Err(PeerError::from_status(label, status.as_u16(), message));
        }

        let decoded = if bytes.is_empty() {
            serde_json::from_value(serde_json::Value::Null)
        } else {
            serde_json::from_slice(&bytes)
        };
        decoded.map_err(|source| PeerError::Decode {
            endpoint: label,
            source,
        })
    }

    fn transport_error(&self, label: &str, err: reqwest::Error) -> PeerError {
        if err.is_builder() {
            tracing::error!(endpoint = %label, error = %err, "could not build peer request");
            PeerError::Request {
                endpoint: label.to_string(),
                source: err,
            }
        } else if err.is_timeout() {
            tracing::warn!(endpoint = %label, timeout_ms = self.timeout.as_millis() as u64, "peer call timed out");
            PeerError::Timeout {
                endpoint: label.to_string(),
                timeout_ms: self.timeout.as_millis() as u64,
            }
        } else {
            tracing::warn!(endpoint = %label, error = %err, "peer unavailable");
            PeerError::Unavailable {
                endpoint: label.to_string(),
                source: err,
            }
        }
    }
}

fn encode<B: Serialize + ?Sized>(
    method: &Method,
    endpoint: &str,
    body: &B,
) -> Result<String, PeerError> {
    serde_json::to_string(body).map_err(|source| PeerError::Encode {
        endpoint: format!("{method} {endpoint}"),
        source,
    })
}

//! Peer client error types.

/// Errors from peer service calls.
///
/// Timeouts are kept apart from every other transport failure so callers
/// can decide whether a retry is safe.
#[derive(Debug, thiserror::Error)]
pub enum PeerError {
    /// The local per-request timeout elapsed.
    #[error("peer call {endpoint} timed out after {timeout_ms}ms")]
    Timeout { endpoint: String, timeout_ms: u64 },
    /// The peer could not be reached.
    #[error("peer unavailable calling {endpoint}: {source}")]
    Unavailable {
        endpoint: String,
        source: reqwest::Error,
    },
    #[error("peer rejected credentials for {endpoint}: {message}")]
    Unauthorized { endpoint: String, message: String },
    #[error("peer denied access to {endpoint}: {message}")]
    Forbidden { endpoint: String, message: String },
    #[error("peer resource not found at {endpoint}: {message}")]
    NotFound { endpoint: String, message: String },
    /// The peer answered 408.
    #[error("peer reported request timeout for {endpoint}: {message}")]
    RequestTimeout { endpoint: String, message: String },
    /// Any other non-2xx status.
    #[error("peer {endpoint} returned {status}: {message}")]
    Status {
        endpoint: String,
        status: u16,
        message: String,
    },
    #[error("failed to encode request body for {endpoint}: {source}")]
    Encode {
        endpoint: String,
        source: serde_json::Error,
    },
    #[error("failed to decode response from {endpoint}: {source}")]
    Decode {
        endpoint: String,
        source: serde_json::Error,
    },
    /// The request could not be built locally. Never retryable.
    #[error("failed to build request for {endpoint}: {source}")]
    Request {
        endpoint: String,
        source: reqwest::Error,
    },
    /// A configured credential cannot be sent as a header value.
    #[error("{0} is not a valid HTTP header value")]
    InvalidHeader(&'static str),
    /// The endpoint could not be joined onto the base URL.
    #[error("invalid endpoint '{0}'")]
    InvalidEndpoint(String),
    #[error("configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),
    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    Client(reqwest::Error),
}

impl PeerError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// HTTP status for errors that came from a peer response.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Unauthorized { .. } => Some(401),
            Self::Forbidden { .. } => Some(403),
            Self::NotFound { .. } => Some(404),
            Self::RequestTimeout { .. } => Some(408),
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Map a non-2xx response to its variant.
    pub(crate) fn from_status(endpoint: String, status: u16, message: String) -> Self {
        match status {
            401 => Self::Unauthorized { endpoint, message },
            403 => Self::Forbidden { endpoint, message },
            404 => Self::NotFound { endpoint, message },
            408 => Self::RequestTimeout { endpoint, message },
            _ => Self::Status {
                endpoint,
                status,
                message,
            },
        }
    }
}

/// Pull a human-readable message out of an error body.
///
/// Uses the JSON `message` field when present, else the raw text, else the
/// status reason phrase.
pub(crate) fn upstream_message(body: &str, reason: Option<&str>) -> String {
    let from_json = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| value.get("message").and_then(|m| m.as_str()).map(String::from));
    match from_json {
        Some(message) => message,
        None if !body.trim().is_empty() => body.to_string(),
        None => reason.unwrap_or("upstream error").to_string(),
    }
}

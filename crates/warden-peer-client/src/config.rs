//! Peer client configuration.
//!
//! One base URL per peer, plus the identity this service signs as.

use url::Url;
use warden_auth::ServiceSecret;

/// Default principal this service signs as.
pub const DEFAULT_SERVICE_NAME: &str = "admin-service";

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT_MS: u64 = 5_000;

/// Configuration for talking to one peer service.
///
/// `service_secret` is a [`ServiceSecret`], so `Debug` output is redacted.
#[derive(Debug, Clone)]
pub struct PeerConfig {
    /// Peer base URL. Any path component is prefixed to every endpoint.
    pub base_url: Url,
    /// Principal name sent in `x-service-name`.
    pub service_name: String,
    pub service_secret: ServiceSecret,
    pub timeout_ms: u64,
}

impl PeerConfig {
    pub fn new(base_url: Url, service_secret: impl Into<ServiceSecret>) -> Self {
        Self {
            base_url,
            service_name: DEFAULT_SERVICE_NAME.to_string(),
            service_secret: service_secret.into(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }

    pub fn with_service_name(mut self, service_name: impl Into<String>) -> Self {
        self.service_name = service_name.into();
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `PEER_BASE_URL` (required)
    /// - `PEER_SERVICE_SECRET` (required)
    /// - `PEER_SERVICE_NAME` (default: `admin-service`)
    /// - `PEER_TIMEOUT_MS` (default: 5000)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`PeerConfig::from_env`] with an injectable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &'static str| {
            lookup(key)
                .filter(|v| !v.is_empty())
                .ok_or(ConfigError::Missing(key))
        };

        let raw_url = required("PEER_BASE_URL")?;
        let base_url = Url::parse(&raw_url)
            .map_err(|e| ConfigError::InvalidUrl("PEER_BASE_URL".into(), e.to_string()))?;
        let service_secret = required("PEER_SERVICE_SECRET")?;

        let service_name = lookup("PEER_SERVICE_NAME")
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_SERVICE_NAME.to_string());

        let timeout_ms = match lookup("PEER_TIMEOUT_MS") {
            Some(raw) => raw
                .parse::<u64>()
                .ok()
                .filter(|ms| *ms > 0)
                .ok_or_else(|| ConfigError::InvalidNumber("PEER_TIMEOUT_MS".into(), raw))?,
            None => DEFAULT_TIMEOUT_MS,
        };

        Ok(Self {
            base_url,
            service_name,
            service_secret: service_secret.into(),
            timeout_ms,
        })
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} environment variable is required")]
    Missing(&'static str),
    #[error("invalid URL for {0}: {1}")]
    InvalidUrl(String, String),
    #[error("{0} must be a positive integer, got '{1}'")]
    InvalidNumber(String, String),
}

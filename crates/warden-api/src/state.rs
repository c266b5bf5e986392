//! # Application State
//!
//! Shared state for the Axum application: validated configuration, the
//! internal-auth verifier, the JWT verifier, and the optional database pool
//! and metrics handle.

use std::sync::Arc;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusHandle;
use sqlx::PgPool;
use warden_auth::InboundVerifier;

use crate::auth::JwtVerifier;
use crate::config::ServiceConfig;

/// Shared application state passed to all route handlers.
///
/// Cheap to clone; everything heavy sits behind an `Arc` or is a pool handle.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServiceConfig>,
    pub verifier: InboundVerifier,
    pub jwt: JwtVerifier,
    /// `None` when `DATABASE_URL` is unset.
    pub db_pool: Option<PgPool>,
    /// `None` when no Prometheus recorder is installed.
    pub metrics: Option<PrometheusHandle>,
    started_at: Instant,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .field("verifier", &self.verifier)
            .field("db_pool", &self.db_pool.is_some())
            .field("metrics", &self.metrics.is_some())
            .finish()
    }
}

impl AppState {
    pub fn new(config: ServiceConfig) -> Self {
        let verifier = InboundVerifier::new(Arc::clone(&config.internal_auth.registry))
            .with_tolerance_ms(config.internal_auth.tolerance_ms);
        let jwt = JwtVerifier::new(config.jwt_access_secret.expose());
        Self {
            config: Arc::new(config),
            verifier,
            jwt,
            db_pool: None,
            metrics: None,
            started_at: Instant::now(),
        }
    }

    pub fn with_db_pool(mut self, pool: PgPool) -> Self {
        self.db_pool = Some(pool);
        self
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }

    /// Whole seconds since the state was created.
    pub fn uptime_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}

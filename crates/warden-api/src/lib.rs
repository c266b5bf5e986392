//! # warden-api — Axum Service Bootstrap
//!
//! The HTTP service around [`warden_auth`]: environment-validated
//! configuration, a uniform response envelope, health endpoints, a bearer-token
//! guard for user routes, and the internal-auth gate for service-to-service
//! routes.
//!
//! ## API Surface
//!
//! | Path                        | Module                 | Auth            |
//! |-----------------------------|------------------------|-----------------|
//! | `/{prefix}/health`          | [`routes::health`]     | open            |
//! | `/{prefix}/health/ready`    | [`routes::health`]     | open            |
//! | `/{prefix}/health/live`     | [`routes::health`]     | open            |
//! | `/{prefix}/internal/whoami` | [`routes::internal`]   | internal signed |
//! | `/{prefix}/me`              | [`routes::me`]         | bearer JWT      |
//! | `/metrics`                  | [`routes::metrics`]    | open, unwrapped |
//!
//! ## Middleware Stack (execution order)
//!
//! ```text
//! TraceId → CORS → TraceLayer → Metrics → Envelope → route guards → Handler
//! ```
//!
//! ## Crate Policy
//!
//! - Signing and verification live in `warden-auth`; this crate only adapts
//!   them to HTTP.
//! - All errors map to enveloped responses via `AppError`.
//! - `anyhow` is confined to the binary.

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod state;

use axum::extract::{DefaultBodyLimit, OriginalUri};
use axum::http::Method;
use axum::middleware::from_fn;
use axum::Router;

use crate::middleware::cors::cors_layer;
use crate::middleware::envelope::envelope_middleware;
use crate::middleware::metrics::metrics_middleware;
use crate::middleware::trace_id::trace_id_middleware;
use crate::middleware::tracing_layer;

pub use config::ServiceConfig;
pub use error::AppError;
pub use state::AppState;

/// Request body limit for JSON extractors.
const BODY_LIMIT: usize = 2 * 1024 * 1024;

/// Assemble the full application router with all routes and middleware.
pub fn app(state: AppState) -> Router {
    let api: Router<AppState> = Router::new()
        .merge(routes::health::router())
        .merge(routes::internal::router(state.verifier.clone()))
        .merge(routes::me::router(state.jwt.clone()));

    let base = state.config.app.route_base();
    let mut router = if base.is_empty() {
        Router::new().merge(api)
    } else {
        Router::new().nest(&base, api)
    };

    if let Some(handle) = state.metrics.clone() {
        router = router.merge(routes::metrics::router(handle));
    }

    let router = router
        .fallback(not_found)
        .layer(DefaultBodyLimit::max(BODY_LIMIT))
        .layer(from_fn(envelope_middleware))
        .layer(from_fn(metrics_middleware))
        .layer(tracing_layer::layer());

    let router = match cors_layer(&state.config.cors) {
        Some(cors) => router.layer(cors),
        None => router,
    };

    router
        .layer(from_fn(trace_id_middleware))
        .with_state(state)
}

async fn not_found(method: Method, OriginalUri(uri): OriginalUri) -> AppError {
    AppError::NotFound(format!("Cannot {} {}", method, uri.path()))
}

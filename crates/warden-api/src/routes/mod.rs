//! # API Route Modules
//!
//! - `health`: liveness, readiness and service identity checks (open).
//! - `internal`: service-to-service endpoints behind the internal-auth gate.
//! - `me`: bearer-token guarded user endpoint.
//! - `metrics`: Prometheus scrape endpoint, mounted at the root, unwrapped.

pub mod health;
pub mod internal;
pub mod me;
pub mod metrics;

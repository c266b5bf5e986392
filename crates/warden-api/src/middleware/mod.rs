//! # Middleware Modules
//!
//! Tower middleware layers for the API service, outermost first:
//!
//! ```text
//! trace_id → cors → tracing_layer → metrics → envelope → [route layers] → handler
//! ```
//!
//! Route layers (`internal_auth`, the JWT guard in [`crate::auth`]) only run
//! for the routes they were attached to.

pub mod cors;
pub mod envelope;
pub mod internal_auth;
pub mod metrics;
pub mod trace_id;
pub mod tracing_layer;

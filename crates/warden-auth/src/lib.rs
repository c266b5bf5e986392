//! # warden-auth — Signed Internal Requests
//!
//! Service-to-service authentication for the Warden stack: a caller proves
//! its identity with a shared secret, an HMAC-SHA256 signature over the
//! request, and a timestamp bounded by a replay window.
//!
//! ## Modules
//!
//! - [`signature`]: canonical payload, `sign`, constant-time `verify`.
//! - [`replay`]: timestamp parsing and freshness window.
//! - [`registry`]: principal → secret table and IP allow-list.
//! - [`verifier`]: the inbound gate, transport-agnostic.
//! - [`signer`]: outbound header construction.
//!
//! ## Crate Policy
//!
//! - The protocol is implemented once, here. HTTP adapters (`warden-api`
//!   middleware, `warden-peer-client`) only translate transport types.
//! - Secrets are zeroized on drop and redacted from `Debug`.
//! - All comparisons involving secrets or MACs are constant-time.
//! - No I/O and no async: everything is a pure function of its inputs plus
//!   the wall clock where a `*_now` variant says so.

pub mod registry;
pub mod replay;
pub mod signature;
pub mod signer;
pub mod verifier;

pub use registry::{AllowList, PrincipalRegistry, RegistryError, ServiceSecret, DEFAULT_BINDINGS};
pub use replay::DEFAULT_TOLERANCE_MS;
pub use signature::CanonicalBody;
pub use signer::{OutboundSigner, SignedHeaderSet};
pub use verifier::{
    Admission, EndpointAuth, InboundRequest, InboundVerifier, InternalCaller, Rejection,
    SignedHeaders,
};

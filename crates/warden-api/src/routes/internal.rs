//! # Internal Service Routes
//!
//! Service-to-service endpoints. Every route here sits behind the
//! internal-auth gate.
//!
//! - `GET  /internal/whoami`: the authenticated caller
//! - `POST /internal/whoami`: the caller plus the JSON body it sent

use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use warden_auth::{InboundVerifier, InternalCaller};

use crate::middleware::internal_auth::{require_internal_auth, InternalService};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct WhoAmI {
    pub caller: InternalCaller,
    /// Body the caller sent, `null` for GET or an empty body.
    pub echo: serde_json::Value,
}

pub fn router(verifier: InboundVerifier) -> Router<AppState> {
    require_internal_auth(
        Router::new().route("/internal/whoami", get(whoami).post(whoami_echo)),
        verifier,
    )
}

async fn whoami(InternalService(caller): InternalService) -> Json<WhoAmI> {
    Json(WhoAmI {
        caller,
        echo: serde_json::Value::Null,
    })
}

/// The body is taken raw so an empty POST is accepted like it is signed.
async fn whoami_echo(InternalService(caller): InternalService, body: String) -> Json<WhoAmI> {
    let echo = if body.trim().is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_str(&body).unwrap_or(serde_json::Value::String(body))
    };
    Json(WhoAmI { caller, echo })
}

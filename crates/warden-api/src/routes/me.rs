//! `GET /me`: the verified access-token claims of the caller.

use axum::routing::get;
use axum::{Json, Router};

use crate::auth::{require_jwt, AccessClaims, JwtVerifier};
use crate::state::AppState;

pub fn router(verifier: JwtVerifier) -> Router<AppState> {
    require_jwt(Router::new().route("/me", get(me)), verifier)
}

async fn me(claims: AccessClaims) -> Json<AccessClaims> {
    Json(claims)
}

//! # Bearer Token Authentication
//!
//! HS256 JWT guard for user-facing endpoints.
//!
//! ## Token Rules
//!
//! - `Authorization: Bearer <token>` is required.
//! - The token must verify against `JWT_ACCESS_SECRET` and be unexpired.
//! - The `type` claim must be `access`; refresh tokens are refused.
//!
//! Every failure is a 401 with the same message so clients cannot discover
//! which rule they broke.
//!
//! ## AccessClaims
//!
//! Guarded routes get the verified [`AccessClaims`] in the request
//! extensions. Handlers extract it via the `FromRequestParts` impl.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::request::Parts;
use axum::middleware::{from_fn_with_state, Next};
use axum::response::Response;
use axum::Router;
use axum_extra::headers::authorization::Bearer;
use axum_extra::headers::Authorization;
use axum_extra::typed_header::TypedHeaderRejection;
use axum_extra::TypedHeader;
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// `type` claim value accepted by the guard.
pub const ACCESS_TOKEN_TYPE: &str = "access";

const UNAUTHORIZED: &str = "Unauthorized";

/// Claims carried by an access token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Subject (user id).
    pub sub: String,
    #[serde(rename = "type")]
    pub token_type: String,
    pub exp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Any other claims, passed through untouched.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Axum `FromRequestParts` implementation for `AccessClaims`.
///
/// Returns 401 if the JWT guard did not run for this route.
impl<S: Send + Sync> axum::extract::FromRequestParts<S> for AccessClaims {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AccessClaims>()
            .cloned()
            .ok_or_else(|| AppError::Unauthorized(UNAUTHORIZED.into()))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    #[error("token rejected: {0}")]
    Invalid(#[from] jsonwebtoken::errors::Error),
    #[error("token type '{0}' is not an access token")]
    WrongType(String),
}

/// Verifies access tokens with a shared HS256 secret.
///
/// Custom `Debug` never prints key material.
#[derive(Clone)]
pub struct JwtVerifier {
    inner: Arc<VerifierInner>,
}

struct VerifierInner {
    key: DecodingKey,
    validation: Validation,
}

impl std::fmt::Debug for JwtVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtVerifier")
            .field("algorithm", &"HS256")
            .field("key", &"[REDACTED]")
            .finish()
    }
}

impl JwtVerifier {
    pub fn new(secret: &str) -> Self {
        Self {
            inner: Arc::new(VerifierInner {
                key: DecodingKey::from_secret(secret.as_bytes()),
                validation: Validation::new(Algorithm::HS256),
            }),
        }
    }

    pub fn verify(&self, token: &str) -> Result<AccessClaims, JwtError> {
        let data = jsonwebtoken::decode::<AccessClaims>(token, &self.inner.key, &self.inner.validation)?;
        if data.claims.token_type != ACCESS_TOKEN_TYPE {
            return Err(JwtError::WrongType(data.claims.token_type));
        }
        Ok(data.claims)
    }
}

/// Guard every route in `router` with the JWT middleware.
pub fn require_jwt<S>(router: Router<S>, verifier: JwtVerifier) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router.route_layer(from_fn_with_state(verifier, jwt_middleware))
}

/// Middleware that validates the bearer token and injects [`AccessClaims`].
pub async fn jwt_middleware(
    State(verifier): State<JwtVerifier>,
    bearer: Result<TypedHeader<Authorization<Bearer>>, TypedHeaderRejection>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let TypedHeader(Authorization(bearer)) =
        bearer.map_err(|_| AppError::Unauthorized(UNAUTHORIZED.into()))?;

    let claims = verifier.verify(bearer.token()).map_err(|e| {
        tracing::debug!(error = %e, "bearer token rejected");
        AppError::Unauthorized(UNAUTHORIZED.into())
    })?;

    request.extensions_mut().insert(claims);
    Ok(next.run(request).await)
}

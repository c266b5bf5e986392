//! # Internal Service Auth Gate
//!
//! HTTP adapter for [`warden_auth::InboundVerifier`]. Routes registered in a
//! router passed to [`require_internal_auth`] are internal-only; every other
//! route is untouched.
//!
//! The gate buffers the raw request body, hands method, original path
//! (with query), body bytes, the four signed headers and the peer address
//! to the verifier, then restores the body for the handler.
//!
//! Every rejection is the same generic 403. The concrete reason is logged
//! and counted in `warden_internal_auth_rejections_total{reason}`.

use std::net::SocketAddr;

use axum::body::{to_bytes, Body};
use axum::extract::{ConnectInfo, FromRequestParts, OriginalUri, Request, State};
use axum::http::request::Parts;
use axum::middleware::{from_fn_with_state, Next};
use axum::response::{IntoResponse, Response};
use axum::Router;
use warden_auth::{
    Admission, EndpointAuth, InboundRequest, InboundVerifier, InternalCaller, Rejection,
    SignedHeaders,
};

use crate::error::AppError;

/// Largest request body the gate will buffer for signing.
pub const MAX_SIGNED_BODY: usize = 2 * 1024 * 1024;

/// Address used when the transport exposes no peer address.
pub const FALLBACK_CLIENT_IP: &str = "127.0.0.1";

const REJECTION_MESSAGE: &str = "Internal service authentication failed";

/// Counter of refused internal calls, labelled by `reason`.
pub const REJECTIONS_METRIC: &str = "warden_internal_auth_rejections_total";

/// Mark every route in `router` as internal-only.
pub fn require_internal_auth<S>(router: Router<S>, verifier: InboundVerifier) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router.route_layer(from_fn_with_state(verifier, internal_auth_middleware))
}

/// The authenticated internal caller, available to handlers behind the gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InternalService(pub InternalCaller);

impl<S: Send + Sync> FromRequestParts<S> for InternalService {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<InternalService>()
            .cloned()
            .ok_or_else(|| AppError::Forbidden(REJECTION_MESSAGE.into()))
    }
}

/// Peer IP as seen by the transport, or [`FALLBACK_CLIENT_IP`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIp(pub String);

impl<S: Send + Sync> FromRequestParts<S> for ClientIp {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let ip = ConnectInfo::<SocketAddr>::from_request_parts(parts, state)
            .await
            .map(|ConnectInfo(addr)| addr.ip().to_string())
            .unwrap_or_else(|_| FALLBACK_CLIENT_IP.to_string());
        Ok(Self(ip))
    }
}

fn reject(rejection: &Rejection, path: &str) -> Response {
    tracing::warn!(reason = rejection.reason(), %path, detail = %rejection, "internal auth rejected");
    metrics::counter!(REJECTIONS_METRIC, "reason" => rejection.reason()).increment(1);
    AppError::Forbidden(REJECTION_MESSAGE.into()).into_response()
}

pub async fn internal_auth_middleware(
    State(verifier): State<InboundVerifier>,
    ClientIp(client_ip): ClientIp,
    request: Request,
    next: Next,
) -> Response {
    let (mut parts, body) = request.into_parts();

    let bytes = match to_bytes(body, MAX_SIGNED_BODY).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(error = %e, "internal auth could not read request body");
            return AppError::Forbidden(REJECTION_MESSAGE.into()).into_response();
        }
    };

    let path = parts
        .extensions
        .get::<OriginalUri>()
        .map(|OriginalUri(uri)| uri)
        .unwrap_or(&parts.uri)
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| "/".to_string());

    let outcome = {
        let headers = SignedHeaders::from_lookup(|name| {
            parts.headers.get(name).and_then(|v| v.to_str().ok())
        });
        let inbound = InboundRequest {
            method: parts.method.as_str(),
            path: &path,
            body: &bytes,
            headers,
            client_ip: &client_ip,
        };
        verifier.verify_now(EndpointAuth::Internal, &inbound)
    };

    match outcome {
        Ok(Admission::Authenticated(caller)) => {
            tracing::debug!(service = %caller.name, %path, "internal caller admitted");
            parts.extensions.insert(InternalService(caller));
        }
        Ok(Admission::Open) => {}
        Err(rejection) => return reject(&rejection, &path),
    }

    next.run(Request::from_parts(parts, Body::from(bytes))).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::extract::connect_info::MockConnectInfo;
    use axum::http::{self, StatusCode};
    use axum::routing::{get, post};
    use http_body_util::BodyExt;
    use tower::ServiceExt;
    use warden_auth::{AllowList, CanonicalBody, OutboundSigner, PrincipalRegistry};

    const SECRET: &str = "internal-secret-0123456789abcdef";

    fn verifier(allow: &str) -> InboundVerifier {
        let registry = PrincipalRegistry::builder()
            .principal("admin-service", SECRET)
            .allow_list(AllowList::parse(allow))
            .build()
            .unwrap();
        InboundVerifier::new(Arc::new(registry))
    }

    async fn echo(InternalService(caller): InternalService, body: String) -> String {
        format!("{}|{}", caller.name, body)
    }

    fn app(allow: &str) -> Router {
        let internal = require_internal_auth(
            Router::new().route("/internal/echo", post(echo)),
            verifier(allow),
        );
        Router::new()
            .route("/open", get(|| async { "open" }))
            .merge(internal)
    }

    fn signed_request(path: &str, body: &str, secret: &str) -> http::Request<Body> {
        let headers = OutboundSigner::new("admin-service", secret).sign_now(
            "POST",
            path,
            if body.is_empty() { CanonicalBody::Absent } else { CanonicalBody::Text(body) },
        );
        let mut builder = http::Request::builder().method("POST").uri(path);
        for (name, value) in headers.pairs() {
            builder = builder.header(name, value);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    async fn body_string(response: Response) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn signed_request_reaches_handler_with_body_intact() {
        let response = app("")
            .oneshot(signed_request("/internal/echo", r#"{"qty":1}"#, SECRET))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, r#"admin-service|{"qty":1}"#);
    }

    #[tokio::test]
    async fn query_string_is_covered() {
        let response = app("")
            .oneshot(signed_request("/internal/echo?x=1", "", SECRET))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn wrong_secret_is_forbidden() {
        let response = app("")
            .oneshot(signed_request("/internal/echo", "{}", "not-the-secret"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert!(body_string(response).await.contains(REJECTION_MESSAGE));
    }

    #[tokio::test]
    async fn missing_headers_are_forbidden() {
        let request = http::Request::builder()
            .method("POST")
            .uri("/internal/echo")
            .body(Body::empty())
            .unwrap();
        let response = app("").oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn open_routes_ignore_the_gate() {
        let request = http::Request::builder().uri("/open").body(Body::empty()).unwrap();
        let response = app("10.9.9.9").oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn allow_list_uses_connect_info() {
        let listed = app("10.0.0.7").layer(MockConnectInfo(SocketAddr::from(([10, 0, 0, 7], 4000))));
        let response = listed
            .oneshot(signed_request("/internal/echo", "{}", SECRET))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let unlisted = app("10.0.0.7").layer(MockConnectInfo(SocketAddr::from(([10, 0, 0, 8], 4000))));
        let response = unlisted
            .oneshot(signed_request("/internal/echo", "{}", SECRET))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn missing_connect_info_falls_back_to_loopback() {
        let response = app(FALLBACK_CLIENT_IP)
            .oneshot(signed_request("/internal/echo", "{}", SECRET))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn extractor_without_gate_is_forbidden() {
        let app = Router::new().route("/x", get(|_: InternalService| async { "unreachable" }));
        let request = http::Request::builder().uri("/x").body(Body::empty()).unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }
}

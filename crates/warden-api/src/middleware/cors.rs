//! CORS layer built from [`CorsSettings`].
//!
//! `tower-http` refuses wildcard origins or headers together with
//! credentials, so `*` is served by mirroring the request when credentials
//! are on.

use std::time::Duration;

use axum::http::{HeaderName, HeaderValue, Method};
use tower_http::cors::{AllowHeaders, AllowOrigin, Any, CorsLayer};

use crate::config::{CorsOrigin, CorsSettings};

/// `None` when CORS is disabled.
pub fn cors_layer(settings: &CorsSettings) -> Option<CorsLayer> {
    if !settings.enabled {
        return None;
    }

    let mut cors = CorsLayer::new();

    cors = match &settings.origin {
        CorsOrigin::Any if settings.credentials => cors.allow_origin(AllowOrigin::mirror_request()),
        CorsOrigin::Any => cors.allow_origin(Any),
        CorsOrigin::Mirror => cors.allow_origin(AllowOrigin::mirror_request()),
        CorsOrigin::Deny => cors.allow_origin(AllowOrigin::list(Vec::<HeaderValue>::new())),
        CorsOrigin::List(origins) => {
            let origins: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();
            cors.allow_origin(origins)
        }
    };

    let methods: Vec<Method> = settings.methods.iter().filter_map(|m| m.parse().ok()).collect();
    cors = cors.allow_methods(methods);

    if settings.allowed_headers.iter().any(|h| h == "*") {
        cors = if settings.credentials {
            cors.allow_headers(AllowHeaders::mirror_request())
        } else {
            cors.allow_headers(Any)
        };
    } else {
        let headers: Vec<HeaderName> = settings
            .allowed_headers
            .iter()
            .filter_map(|h| h.parse().ok())
            .collect();
        cors = cors.allow_headers(headers);
    }

    let exposed: Vec<HeaderName> = settings
        .exposed_headers
        .iter()
        .filter(|h| h.as_str() != "*")
        .filter_map(|h| h.parse().ok())
        .collect();
    if !exposed.is_empty() {
        cors = cors.expose_headers(exposed);
    }

    cors = cors.max_age(Duration::from_secs(settings.max_age_secs));

    if settings.credentials {
        cors = cors.allow_credentials(true);
    }

    Some(cors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{self, StatusCode};
    use axum::routing::get;
    use axum::Router;
    use tower::ServiceExt;

    fn settings(origin: CorsOrigin, credentials: bool) -> CorsSettings {
        CorsSettings {
            enabled: true,
            origin,
            methods: vec!["GET".into(), "POST".into()],
            allowed_headers: vec!["content-type".into(), "authorization".into()],
            exposed_headers: vec!["x-request-id".into()],
            credentials,
            max_age_secs: 600,
        }
    }

    async fn preflight(settings: &CorsSettings, origin: &str) -> http::Response<Body> {
        let app = Router::new()
            .route("/x", get(|| async { "x" }))
            .layer(cors_layer(settings).unwrap());
        app.oneshot(
            http::Request::builder()
                .method("OPTIONS")
                .uri("/x")
                .header("origin", origin)
                .header("access-control-request-method", "POST")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap()
    }

    #[test]
    fn disabled_yields_no_layer() {
        let mut s = settings(CorsOrigin::Any, false);
        s.enabled = false;
        assert!(cors_layer(&s).is_none());
    }

    #[tokio::test]
    async fn wildcard_with_credentials_mirrors_origin() {
        let response = preflight(&settings(CorsOrigin::Any, true), "https://app.example").await;
        assert_eq!(response.status(), StatusCode::OK);
        let headers = response.headers();
        assert_eq!(headers["access-control-allow-origin"], "https://app.example");
        assert_eq!(headers["access-control-allow-credentials"], "true");
        assert_eq!(headers["access-control-max-age"], "600");
    }

    #[tokio::test]
    async fn wildcard_without_credentials_is_star() {
        let response = preflight(&settings(CorsOrigin::Any, false), "https://app.example").await;
        assert_eq!(response.headers()["access-control-allow-origin"], "*");
    }

    #[tokio::test]
    async fn list_only_allows_listed_origins() {
        let s = settings(CorsOrigin::List(vec!["https://ok.example".into()]), true);
        let ok = preflight(&s, "https://ok.example").await;
        assert_eq!(ok.headers()["access-control-allow-origin"], "https://ok.example");
        let other = preflight(&s, "https://evil.example").await;
        assert!(other.headers().get("access-control-allow-origin").is_none());
    }

    #[tokio::test]
    async fn deny_allows_nothing() {
        let response = preflight(&settings(CorsOrigin::Deny, false), "https://app.example").await;
        assert!(response.headers().get("access-control-allow-origin").is_none());
    }

    #[test]
    fn wildcard_headers_with_credentials_do_not_panic() {
        let mut s = settings(CorsOrigin::Any, true);
        s.allowed_headers = vec!["*".into()];
        s.exposed_headers = vec!["*".into()];
        assert!(cors_layer(&s).is_some());
    }
}

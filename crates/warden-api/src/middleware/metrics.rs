//! # HTTP Metrics
//!
//! Records request counts and latency through the `metrics` facade. The
//! binary installs a Prometheus recorder; without one (tests, embedding)
//! every call is a no-op.
//!
//! Paths are normalized before use as a label so that ids do not explode
//! label cardinality.

use std::time::Instant;

use axum::extract::{MatchedPath, Request};
use axum::middleware::Next;
use axum::response::Response;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

pub const HTTP_REQUESTS_TOTAL: &str = "warden_http_requests_total";
pub const HTTP_REQUEST_DURATION_SECONDS: &str = "warden_http_request_duration_seconds";
pub const HTTP_ERRORS_TOTAL: &str = "warden_http_errors_total";

const DURATION_BUCKETS: &[f64] = &[0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0];

/// Install the process-wide Prometheus recorder and return its render handle.
pub fn install_recorder() -> Result<PrometheusHandle, metrics_exporter_prometheus::BuildError> {
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            metrics_exporter_prometheus::Matcher::Full(HTTP_REQUEST_DURATION_SECONDS.to_string()),
            DURATION_BUCKETS,
        )?
        .install_recorder()
}

/// Replace id-like path segments with `{id}`.
fn normalize_path(path: &str) -> String {
    path.split('/')
        .map(|segment| {
            let hyphenated_uuid = segment.len() == 36
                && segment.chars().enumerate().all(|(i, c)| {
                    if matches!(i, 8 | 13 | 18 | 23) {
                        c == '-'
                    } else {
                        c.is_ascii_hexdigit()
                    }
                });
            let bare_uuid = segment.len() == 32 && segment.chars().all(|c| c.is_ascii_hexdigit());
            let numeric = !segment.is_empty() && segment.chars().all(|c| c.is_ascii_digit());
            if hyphenated_uuid || bare_uuid || numeric {
                "{id}"
            } else {
                segment
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Route template when the router matched one, otherwise the normalized path.
fn path_label(request: &Request) -> String {
    match request.extensions().get::<MatchedPath>() {
        Some(matched) => matched.as_str().to_string(),
        None => normalize_path(request.uri().path()),
    }
}

pub async fn metrics_middleware(request: Request, next: Next) -> Response {
    let method = request.method().to_string();
    let path = path_label(&request);
    let start = Instant::now();

    let response = next.run(request).await;

    let status = response.status().as_u16().to_string();
    metrics::counter!(
        HTTP_REQUESTS_TOTAL,
        "method" => method.clone(),
        "path" => path.clone(),
        "status" => status.clone()
    )
    .increment(1);
    metrics::histogram!(HTTP_REQUEST_DURATION_SECONDS, "method" => method.clone(), "path" => path.clone())
        .record(start.elapsed().as_secs_f64());
    if response.status().is_client_error() || response.status().is_server_error() {
        metrics::counter!(HTTP_ERRORS_TOTAL, "method" => method, "path" => path, "status" => status)
            .increment(1);
    }

    response
}

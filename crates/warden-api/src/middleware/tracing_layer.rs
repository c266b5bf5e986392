//! # Request/Response Tracing
//!
//! Configures `tower_http::trace::TraceLayer` for structured request
//! logging. Each span carries the request id so log lines correlate with
//! the `traceId` clients see in the envelope.

use axum::body::Body;
use axum::http::Request;
use tower_http::classify::{ServerErrorsAsFailures, SharedClassifier};
use tower_http::trace::TraceLayer;
use tracing::Span;

use crate::middleware::trace_id::REQUEST_ID_HEADER;

type MakeSpan = fn(&Request<Body>) -> Span;

/// Build the `TraceLayer` used by the service.
///
/// Must sit inside the trace-id layer so the request id header is set.
pub fn layer() -> TraceLayer<SharedClassifier<ServerErrorsAsFailures>, MakeSpan> {
    TraceLayer::new_for_http().make_span_with(request_span as MakeSpan)
}

fn request_span(request: &Request<Body>) -> Span {
    let trace_id = request
        .headers()
        .get(&REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    tracing::info_span!(
        "request",
        method = %request.method(),
        uri = %request.uri(),
        trace_id = %trace_id,
    )
}

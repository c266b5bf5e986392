//! `GET /metrics`: Prometheus text exposition, returned without the envelope.

use axum::extract::State;
use axum::http::header::CONTENT_TYPE;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;

use crate::middleware::envelope::skip_wrap;
use crate::state::AppState;

const PROMETHEUS_CONTENT_TYPE: &str = "text/plain; version=0.0.4";

pub fn router(handle: PrometheusHandle) -> Router<AppState> {
    skip_wrap(Router::new().route("/metrics", get(scrape).with_state(handle)))
}

async fn scrape(State(handle): State<PrometheusHandle>) -> Response {
    ([(CONTENT_TYPE, PROMETHEUS_CONTENT_TYPE)], handle.render()).into_response()
}

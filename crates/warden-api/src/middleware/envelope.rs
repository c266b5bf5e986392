//! # Response Envelope
//!
//! Wraps every response in one JSON shape:
//!
//! ```json
//! {"success": true,  "data": <body|null>, "error": null, "traceId": "..."}
//! {"success": false, "data": null, "error": {"code", "message", "details"}, "traceId": "..."}
//! ```
//!
//! Success bodies are embedded as JSON when they parse as JSON, as a string
//! otherwise, and as `null` when empty. Error responses use the
//! [`ErrorDetail`] that [`AppError`](crate::error::AppError) attaches; any
//! other non-2xx response (framework rejections, 405s) is mapped from its
//! status with the body text as the message.
//!
//! Routers passed through [`skip_wrap`] return their success bodies raw.
//! Errors are always enveloped.

use axum::body::to_bytes;
use axum::extract::Request;
use axum::http::header::{CONTENT_LENGTH, CONTENT_TYPE};
use axum::http::{HeaderMap, StatusCode};
use axum::middleware::{map_response, Next};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::error::{code_for_status, AppError, ErrorDetail};
use crate::middleware::trace_id::TraceId;

/// Largest response body the envelope will buffer.
const MAX_WRAPPED_BODY: usize = 16 * 1024 * 1024;

/// The wire envelope.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    pub success: bool,
    pub data: serde_json::Value,
    pub error: Option<ErrorDetail>,
    pub trace_id: String,
}

/// Response marker set by [`skip_wrap`].
#[derive(Debug, Clone, Copy)]
struct SkipWrap;

/// Return success responses from `router` without the envelope.
pub fn skip_wrap<S>(router: Router<S>) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router.route_layer(map_response(|mut response: Response| async move {
        response.extensions_mut().insert(SkipWrap);
        response
    }))
}

pub async fn envelope_middleware(request: Request, next: Next) -> Response {
    let trace_id = request
        .extensions()
        .get::<TraceId>()
        .map(|id| id.0.clone())
        .unwrap_or_default();

    let response = next.run(request).await;
    let status = response.status();

    if status.is_success() {
        if status == StatusCode::NO_CONTENT || response.extensions().get::<SkipWrap>().is_some() {
            return response;
        }
        wrap_success(response, trace_id).await
    } else if status.is_client_error() || status.is_server_error() {
        wrap_error(response, trace_id).await
    } else {
        response
    }
}

fn is_json(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("application/json") || ct.contains("+json"))
}

/// Rebuild a response with `envelope` as the body, keeping the original
/// status and every header except the body-describing ones.
fn rebuild(status: StatusCode, mut headers: HeaderMap, envelope: Envelope) -> Response {
    headers.remove(CONTENT_TYPE);
    headers.remove(CONTENT_LENGTH);
    let mut response = (status, Json(envelope)).into_response();
    for (name, value) in headers.iter() {
        response.headers_mut().append(name.clone(), value.clone());
    }
    response
}

async fn wrap_success(response: Response, trace_id: String) -> Response {
    let (parts, body) = response.into_parts();
    let bytes = match to_bytes(body, MAX_WRAPPED_BODY).await {
        Ok(bytes) => bytes,
        Err(e) => {
            let err = AppError::Internal(format!("failed to buffer response body: {e}"));
            tracing::error!(error = %err, "envelope could not wrap response");
            return error_response(err.status(), err.detail(), trace_id);
        }
    };

    let data = if bytes.is_empty() {
        serde_json::Value::Null
    } else if is_json(&parts.headers) {
        serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| serde_json::Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    } else {
        serde_json::Value::String(String::from_utf8_lossy(&bytes).into_owned())
    };

    rebuild(
        parts.status,
        parts.headers,
        Envelope {
            success: true,
            data,
            error: None,
            trace_id,
        },
    )
}

async fn wrap_error(response: Response, trace_id: String) -> Response {
    let (parts, body) = response.into_parts();
    let detail = match parts.extensions.get::<ErrorDetail>() {
        Some(detail) => detail.clone(),
        None => {
            let text = to_bytes(body, MAX_WRAPPED_BODY)
                .await
                .map(|b| String::from_utf8_lossy(&b).trim().to_string())
                .unwrap_or_default();
            let message = if text.is_empty() {
                parts
                    .status
                    .canonical_reason()
                    .unwrap_or("Error")
                    .to_string()
            } else {
                text
            };
            ErrorDetail {
                code: code_for_status(parts.status).to_string(),
                message,
                details: None,
            }
        }
    };
    rebuild(
        parts.status,
        parts.headers,
        Envelope {
            success: false,
            data: serde_json::Value::Null,
            error: Some(detail),
            trace_id,
        },
    )
}

fn error_response(status: StatusCode, detail: ErrorDetail, trace_id: String) -> Response {
    rebuild(
        status,
        HeaderMap::new(),
        Envelope {
            success: false,
            data: serde_json::Value::Null,
            error: Some(detail),
            trace_id,
        },
    )
}

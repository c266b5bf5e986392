//! # API Error Types
//!
//! Structured error type implementing `axum::response::IntoResponse`.
//! Every error response carries an [`ErrorDetail`] in its extensions so the
//! envelope middleware can wrap it with the request's trace id without
//! re-parsing the body. Internal error messages never reach clients.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error payload placed under `error` in the response envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "NOT_FOUND", "FORBIDDEN").
    pub code: String,
    pub message: String,
    /// Extra context. Serialized as `null` when absent.
    pub details: Option<serde_json::Value>,
}

/// Bare error body, used when a response escapes the envelope layer.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

/// Application-level error type that implements [`IntoResponse`] for Axum.
#[derive(Error, Debug)]
pub enum AppError {
    /// No route matched (404). The message is returned as-is.
    #[error("{0}")]
    NotFound(String),

    /// Missing or invalid bearer token (401).
    #[error("{0}")]
    Unauthorized(String),

    /// Caller is authenticated but not allowed (403).
    #[error("{0}")]
    Forbidden(String),

    /// Failure with a caller-chosen code and status.
    #[error("{message}")]
    Business {
        code: String,
        message: String,
        status: StatusCode,
        details: Option<serde_json::Value>,
    },

    /// Internal server error (500). Message is logged but not returned to client.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Return the HTTP status code and machine-readable error code for this error.
    fn status_and_code(&self) -> (StatusCode, &str) {
        match self {
            Self::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Self::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            Self::Forbidden(_) => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            Self::Business { status, code, .. } => (*status, code.as_str()),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }

    pub(crate) fn status(&self) -> StatusCode {
        self.status_and_code().0
    }

    pub(crate) fn detail(&self) -> ErrorDetail {
        let (_, code) = self.status_and_code();
        let message = match self {
            Self::Internal(_) => "An internal error occurred".to_string(),
            other => other.to_string(),
        };
        let details = match self {
            Self::Business { details, .. } => details.clone(),
            _ => None,
        };
        ErrorDetail {
            code: code.to_string(),
            message,
            details,
        }
    }
}

/// Default error code for a bare status, used for framework rejections.
pub fn code_for_status(status: StatusCode) -> &'static str {
    match status {
        StatusCode::BAD_REQUEST => "BAD_REQUEST",
        StatusCode::UNAUTHORIZED => "UNAUTHORIZED",
        StatusCode::FORBIDDEN => "FORBIDDEN",
        StatusCode::NOT_FOUND => "NOT_FOUND",
        StatusCode::METHOD_NOT_ALLOWED => "METHOD_NOT_ALLOWED",
        StatusCode::CONFLICT => "CONFLICT",
        StatusCode::PAYLOAD_TOO_LARGE => "PAYLOAD_TOO_LARGE",
        StatusCode::UNSUPPORTED_MEDIA_TYPE => "UNSUPPORTED_MEDIA_TYPE",
        StatusCode::UNPROCESSABLE_ENTITY => "VALIDATION_ERROR",
        StatusCode::TOO_MANY_REQUESTS => "RATE_LIMITED",
        StatusCode::SERVICE_UNAVAILABLE => "SERVICE_UNAVAILABLE",
        s if s.is_server_error() => "INTERNAL_ERROR",
        _ => "ERROR",
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, _) = self.status_and_code();

        // Log internal errors for operator visibility.
        if matches!(&self, Self::Internal(_)) {
            tracing::error!(error = %self, "internal server error");
        }

        let detail = self.detail();
        let mut response = (
            status,
            Json(ErrorBody {
                error: detail.clone(),
            }),
        )
            .into_response();
        response.extensions_mut().insert(detail);
        response
    }
}

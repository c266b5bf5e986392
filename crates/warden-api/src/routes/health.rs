//! # Health Endpoints
//!
//! - `GET /health`: service identity and uptime
//! - `GET /health/ready`: health plus dependency checks; 503 when degraded
//! - `GET /health/live`: process is up
//!
//! All three are open (no auth) and enveloped like every other route.

use std::collections::BTreeMap;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::db;
use crate::error::AppError;
use crate::state::AppState;

pub const STATUS_OK: &str = "ok";
pub const STATUS_DEGRADED: &str = "degraded";

/// Outcome of a single dependency check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Ok,
    Error,
    /// Dependency not configured.
    Disabled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: String,
    pub timestamp: String,
    pub service: String,
    pub version: String,
    pub environment: String,
    /// Seconds since the service started.
    pub uptime: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessReport {
    #[serde(flatten)]
    pub health: HealthReport,
    pub checks: BTreeMap<String, CheckStatus>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LivenessReport {
    pub status: String,
    pub timestamp: String,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .route("/health/live", get(liveness))
}

fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

fn report(state: &AppState, status: &str) -> HealthReport {
    HealthReport {
        status: status.to_string(),
        timestamp: now_rfc3339(),
        service: state.config.app.name.clone(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        environment: state.config.app.environment.to_string(),
        uptime: state.uptime_secs(),
    }
}

async fn health(State(state): State<AppState>) -> Json<HealthReport> {
    Json(report(&state, STATUS_OK))
}

async fn liveness() -> Json<LivenessReport> {
    Json(LivenessReport {
        status: STATUS_OK.to_string(),
        timestamp: now_rfc3339(),
    })
}

async fn readiness(State(state): State<AppState>) -> Result<Json<ReadinessReport>, AppError> {
    let mut checks = BTreeMap::new();

    let database = match &state.db_pool {
        None => CheckStatus::Disabled,
        Some(pool) => match db::ping(pool).await {
            Ok(()) => CheckStatus::Ok,
            Err(e) => {
                tracing::warn!(error = %e, "database readiness check failed");
                CheckStatus::Error
            }
        },
    };
    checks.insert("database".to_string(), database);

    let degraded = checks.values().any(|c| *c == CheckStatus::Error);
    let status = if degraded { STATUS_DEGRADED } else { STATUS_OK };
    let readiness = ReadinessReport {
        health: report(&state, status),
        checks,
    };

    if degraded {
        return Err(AppError::Business {
            code: "SERVICE_UNAVAILABLE".into(),
            message: "Service is not ready".into(),
            status: StatusCode::SERVICE_UNAVAILABLE,
            details: serde_json::to_value(&readiness).ok(),
        });
    }
    Ok(Json(readiness))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_status_serializes_lowercase() {
        assert_eq!(serde_json::to_value(CheckStatus::Disabled).unwrap(), "disabled");
        assert_eq!(serde_json::to_value(CheckStatus::Error).unwrap(), "error");
    }

    #[test]
    fn readiness_flattens_health_fields() {
        let report = ReadinessReport {
            health: HealthReport {
                status: STATUS_OK.into(),
                timestamp: now_rfc3339(),
                service: "Warden".into(),
                version: "0.1.0".into(),
                environment: "test".into(),
                uptime: 3,
            },
            checks: BTreeMap::from([("database".to_string(), CheckStatus::Ok)]),
        };
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["service"], "Warden");
        assert_eq!(value["uptime"], 3);
        assert_eq!(value["checks"]["database"], "ok");
    }
}

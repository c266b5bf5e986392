//! # warden-api — Binary Entry Point
//!
//! Validates the environment, wires optional Postgres and the Prometheus
//! recorder, and serves the Axum app until Ctrl-C or SIGTERM.

use std::net::SocketAddr;

use anyhow::Context;
use tracing_subscriber::EnvFilter;
use warden_api::config::ServiceConfig;
use warden_api::middleware::metrics::install_recorder;
use warden_api::{app, db, AppState};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v == "json");
    if json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutdown signal received, draining connections");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = ServiceConfig::from_env().map_err(|e| {
        tracing::error!("{e}");
        e
    })?;

    let principals = config.internal_auth.registry.principal_names();
    if principals.is_empty() {
        tracing::warn!("no internal service secrets configured; internal routes will reject every call");
    }

    let mut state = AppState::new(config.clone());

    match install_recorder() {
        Ok(handle) => state = state.with_metrics(handle),
        Err(e) => tracing::warn!("Prometheus recorder not installed: {e}. /metrics is disabled."),
    }

    match &config.database {
        Some(settings) => {
            let pool = db::init_pool(settings)
                .await
                .context("database initialization failed")?;
            state = state.with_db_pool(pool);
        }
        None => tracing::warn!("DATABASE_URL not set; running without a database"),
    }

    let addr = SocketAddr::from(([0, 0, 0, 0], config.app.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    tracing::info!(
        service = %config.app.name,
        version = env!("CARGO_PKG_VERSION"),
        environment = %config.app.environment,
        prefix = %config.app.route_base(),
        internal_principals = ?principals,
        "{} listening on {}",
        config.app.name,
        addr,
    );

    axum::serve(
        listener,
        app(state).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("server error")?;

    tracing::info!("server stopped");
    Ok(())
}

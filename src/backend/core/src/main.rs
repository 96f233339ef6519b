//! Warden Server - Main entry point
//!
//! Tenant-scoped request authorization in front of a multi-tenant HTTP API.

use anyhow::Context;

use warden_core::{
    api::{self, AppState},
    config::Config,
    telemetry,
};

/// Path of an optional config file, layered under `WARDEN__*` variables.
const CONFIG_PATH_VAR: &str = "WARDEN_CONFIG";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let config = match std::env::var(CONFIG_PATH_VAR) {
        Ok(path) => Config::from_file(&path)
            .with_context(|| format!("failed to load configuration from {}", path))?,
        Err(_) => Config::load().context("failed to load configuration")?,
    };

    let telemetry = telemetry::init_telemetry(&config.observability)?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        backend = ?config.policy.backend,
        privileged_role = %config.authz.privileged_role,
        trust_identity_headers = config.authz.trust_identity_headers,
        "Starting Warden Server"
    );

    let state = AppState::from_config(&config, telemetry.metrics.clone()).await?;
    let app = api::build_router(state);

    let addr = config.server.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    tracing::info!(address = %addr, "Starting HTTP server");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Wait for SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
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
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
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

    tracing::info!("Shutdown signal received");
}

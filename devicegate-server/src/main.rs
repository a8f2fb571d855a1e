//! Devicegate Server - device attestation allow-list service
//!
//! Exposes a single endpoint:
//! - POST /devices - Authorize a device by its attested permanent identifier

use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tokio::signal;

use devicegate_server::{
    create_router_with_config, serve, telemetry, AppState, Config, CredentialProvider,
    SqliteDeviceStore,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load()?;
    telemetry::init(config.log_format);

    let credentials = config
        .tls_files()
        .map(CredentialProvider::from_files)
        .transpose()
        .context("error loading certificate")?
        .map(Arc::new);

    let store = SqliteDeviceStore::open(&config.database, config.max_connections)
        .await
        .with_context(|| format!("error opening database {}", config.database.display()))?;

    let app = create_router_with_config(AppState::new(Arc::new(store.clone())), &config);

    let listener = TcpListener::bind(config.address)
        .await
        .with_context(|| format!("error binding {}", config.address))?;

    if credentials.is_some() {
        tracing::info!(address = %config.address, "Starting https server");
    } else {
        tracing::info!(address = %config.address, "Starting http server");
    }

    serve(listener, app, credentials, shutdown_signal()).await?;

    store.close().await;
    Ok(())
}

/// Resolve on SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for SIGINT");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
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

//! Server startup and graceful shutdown

use std::net::SocketAddr;

use anyhow::Result;
use imgu_core::Config;
use imgu_infra::shutdown_telemetry;

use super::App;

/// Serve until Ctrl+C or SIGTERM, then stop the background tasks. A sweep
/// that is mid-cycle finishes its current record batch first.
pub async fn start_server(config: &Config, app: App) -> Result<()> {
    let addr = format!("0.0.0.0:{}", config.server_port());
    tracing::info!(addr = %addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(
        max_upload_body_bytes = config.max_upload_body_bytes(),
        trusted_proxy_count = config.trusted_proxy_count(),
        "Server ready and accepting connections"
    );

    let App {
        router, scheduler, ..
    } = app;

    let served = axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await;

    scheduler.shutdown().await;
    tracing::info!("Background tasks stopped");
    shutdown_telemetry().await;

    served?;
    Ok(())
}

/// Resolves on Ctrl+C (SIGINT) or SIGTERM. If a handler cannot be
/// installed that signal source is ignored and the other one still works.
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
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            tracing::info!("Received terminate signal");
        },
    }

    tracing::info!("Shutting down gracefully...");
}

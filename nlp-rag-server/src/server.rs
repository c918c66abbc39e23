//! Listener setup and graceful shutdown.

use tokio::net::TcpListener;
use tracing::info;

use crate::config::ServerConfig;
use crate::routes::app_router;

/// Build the application from `config` and serve it until Ctrl+C or SIGTERM.
pub async fn run_server(config: ServerConfig) -> anyhow::Result<()> {
    let addr = config.socket_addr()?;
    let state = config.build_state().await?;
    let app = app_router(state, config.request_timeout());

    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "nlp-rag-server listening");
    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;
    info!("server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "failed to listen for Ctrl+C");
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
                tracing::warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received Ctrl+C, shutting down"),
        _ = terminate => info!("received SIGTERM, shutting down"),
    }
}

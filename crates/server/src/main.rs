// crates/server/src/main.rs
//! Stepwatch server binary.
//!
//! Serves the job API until Ctrl+C or SIGTERM, then stops the in-flight
//! worker before exiting.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use stepwatch_jobs::JobController;
use stepwatch_server::cli::ServerArgs;
use stepwatch_server::{create_app, AppState};

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
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

#[tokio::main]
async fn main() -> Result<()> {
    let args = ServerArgs::parse();

    // Keep the guard alive so buffered file logs are flushed on exit.
    let _log_guard = stepwatch_observability::init(&args.log_config())?;

    let config = args.job_config();
    tracing::info!(
        total_steps = config.total_steps.get(),
        step_delay_ms = config.step_delay.as_millis() as u64,
        on_busy = %config.supersede,
        "Job configuration"
    );

    let jobs = Arc::new(JobController::new(config));
    let state = AppState::with_controller(Arc::clone(&jobs));
    let shutdown = state.shutdown.clone();
    let app = create_app(state);

    let addr = args.addr();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!("Server listening on http://{addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            // Status streams never end on their own; close them so draining finishes.
            shutdown.cancel();
        })
        .await
        .context("server error")?;

    jobs.shutdown().await;
    tracing::info!("Server stopped");

    Ok(())
}

// src/server/mod.rs

//! The HTTP host: binds requests to actions and runs the metrics exporter.

use crate::config::Config;
use crate::core::handler::ActionRouter;
use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio::task::JoinSet;
use tracing::{error, info};

mod context;
mod http;
mod metrics_server;

pub use context::AppState;
pub use http::build_http_router;

/// The main server startup function. Runs until Ctrl-C is received.
pub async fn run(config: Config, router: ActionRouter) -> Result<()> {
    let (shutdown_tx, _) = broadcast::channel(1);
    let mut background_tasks = JoinSet::new();

    // --- Metrics Server ---
    if config.metrics.enabled {
        let shutdown_rx = shutdown_tx.subscribe();
        let port = config.metrics.port;
        background_tasks.spawn(async move {
            metrics_server::run_metrics_server(port, shutdown_rx).await;
        });
    } else {
        info!("Prometheus metrics server is disabled in the configuration.");
    }

    let state = Arc::new(AppState::new(router));
    info!("Serving actions: {:?}", state.router.action_names());

    let listener = TcpListener::bind(config.bind_addr())
        .await
        .with_context(|| format!("Failed to bind action server on {}", config.bind_addr()))?;
    info!("ActionGate listening on http://{}", config.bind_addr());

    let mut shutdown_rx = shutdown_tx.subscribe();
    let serve = axum::serve(listener, build_http_router(state)).with_graceful_shutdown(async move {
        shutdown_rx.recv().await.ok();
        info!("Action server shutting down.");
    });

    let signal_tx = shutdown_tx.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for shutdown signal: {}", e);
            return;
        }
        info!("Shutdown signal received, initiating graceful shutdown.");
        let _ = signal_tx.send(());
    });

    let result = serve.await.context("Action server failed");
    let _ = shutdown_tx.send(());
    while background_tasks.join_next().await.is_some() {}
    result
}

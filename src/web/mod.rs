pub mod handlers;
pub mod routes;
pub mod state;
pub mod static_files;
pub mod templates;

use std::io;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

use crate::config::WebConfig;
use state::AppState;

pub async fn run_server(config: &WebConfig, state: Arc<AppState>) -> io::Result<()> {
    let app = routes::app(state);

    let listener = TcpListener::bind((config.host.as_str(), config.port)).await?;
    info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

use std::sync::Arc;

use anyhow::Context;
use axum::Router;
use rewriter_backend::core::config::{AppPaths, ConfigService};
use rewriter_backend::core::logging;
use rewriter_backend::server;
use rewriter_backend::state::AppState;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let paths = Arc::new(AppPaths::new());
    let config = ConfigService::new(paths.clone());
    let settings = config
        .load_settings()
        .context("Failed to load configuration")?;
    logging::init(&paths, &settings.logging);

    let state = AppState::initialize_with(paths, config, settings).await?;

    let bind_addr = format!("{}:{}", state.settings.server.host, state.settings.server.port);
    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", bind_addr))?;
    let addr = listener.local_addr()?;

    println!("REWRITER_PORT={}", addr.port());
    tracing::info!("Listening on {}", addr);

    let app: Router = server::router::router(state);

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}

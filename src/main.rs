use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;

use urbia_backend::core::config::{AppPaths, Settings};
use urbia_backend::core::logging;
use urbia_backend::server::router;
use urbia_backend::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let paths = Arc::new(AppPaths::new());
    logging::init(&paths);

    let settings = Arc::new(Settings::from_env());
    tracing::info!(
        "starting urbia backend (corpus: {})",
        settings.knowledge_base_path.display()
    );

    let state = AppState::initialize(settings.clone(), paths).await?;

    let bind_addr = format!("{}:{}", settings.api_host, settings.api_port);
    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind to {}", bind_addr))?;
    tracing::info!("listening on {}", listener.local_addr()?);

    let app = router::router(state);
    axum::serve(listener, app).await.context("server error")?;

    Ok(())
}

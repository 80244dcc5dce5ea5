use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use dekho_api::{router, AppState};
use dekho_common::Config;
use dekho_store::PgStore;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("dekho=info".parse()?))
        .init();

    let config = Config::from_env();
    let store = PgStore::connect(&config.database_url).await?;
    store.migrate().await?;
    info!("Database migrations applied");

    let addr = format!("{}:{}", config.web_host, config.web_port);
    let state = Arc::new(AppState::new(config, Arc::new(store)));
    let app = router(state);

    info!("DekhoCampus API starting on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("DekhoCampus API stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
}

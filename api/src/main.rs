//! MySQL Backup API Server

mod config;
mod error;
mod handlers;
mod routes;
mod state;

#[cfg(test)]
mod tests;

use std::net::SocketAddr;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "info,mysql_backup_api=debug,mysql_backup_core=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = config::AppConfig::from_env()?;

    info!("Starting MySQL Backup API Server");
    info!("Backups are written to {}", config.backup_root);
    info!("Listening on {}:{}", config.host, config.port);

    let state = state::AppState::new(&config);
    let app = routes::create_router(state);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app).await?;

    Ok(())
}

//! MySQL Backup Runner
//!
//! One-shot backup of a single database, configured through the environment.

mod config;

use anyhow::Context;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mysql_backup_core::BackupEngine;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "warn,mysql_backup_runner=info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = config::RunnerConfig::from_env()?;

    info!("Backing up database {} into {}", config.database, config.backup_dir);

    let mut engine = BackupEngine::new(config.engine_config());
    let result = engine.run(&config.request()).await;
    print!("{}", engine.log().drain());

    match result {
        Ok(artifact) => {
            println!("{}", artifact);
            Ok(())
        }
        Err(e) => {
            error!("Backup failed: {}", e);
            Err(e).context("Backup failed")
        }
    }
}

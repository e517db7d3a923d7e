//! SOX Hub Server - Main entry point

use anyhow::Result;
use soxhub_common::logging::{init_logging, LogConfig};
use tracing::info;

use soxhub_server::{api, config::Config};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging with configuration from environment
    let log_config = LogConfig::builder()
        .log_file_prefix("soxhub-server")
        .filter_directives("soxhub_server=debug,tower_http=debug,axum=trace,sqlx=info")
        .build();

    // Merge with environment variables (they take precedence)
    let log_config = LogConfig::from_env().unwrap_or(log_config);

    init_logging(&log_config)?;

    info!("Starting SOX Hub Server");

    // Load configuration
    let config = Config::load()?;
    info!(
        "Configuration loaded - server will bind to {}:{}",
        config.server.host, config.server.port
    );

    api::serve(config).await
}

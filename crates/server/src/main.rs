mod bootstrap;
mod service;

use anyhow::Result;
use tracing_subscriber::EnvFilter;

use dreampoll_core::config::{AppConfig, LoadOptions};

fn init_logging(config: &AppConfig) {
    use dreampoll_core::config::LogFormat::*;

    // Quiet the HTTP client's per-request chatter unless explicitly asked
    // for; RUST_LOG still overrides everything.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("{},reqwest=warn,hyper=warn", config.logging.level))
    });

    match config.logging.format {
        Compact => {
            tracing_subscriber::fmt()
                .with_target(false)
                .with_env_filter(filter)
                .compact()
                .init();
        }
        Pretty => {
            tracing_subscriber::fmt().with_target(false).with_env_filter(filter).pretty().init();
        }
        Json => {
            tracing_subscriber::fmt().with_target(false).with_env_filter(filter).json().init();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    run().await
}

pub async fn run() -> Result<()> {
    // Load config and initialize logging before any other operations;
    // missing secrets abort here.
    let config = AppConfig::load(LoadOptions::default())?;
    init_logging(&config);

    let app = bootstrap::bootstrap_with_config(config);

    tracing::info!(
        event_name = "system.server.started",
        "dreampoll server started; polling for updates"
    );

    tokio::select! {
        result = app.runner.start() => result?,
        result = tokio::signal::ctrl_c() => result?,
    }

    tracing::info!(event_name = "system.server.stopping", "dreampoll server stopping");

    Ok(())
}

//! Poolkeeper Server - Headless Daemon
//!
//! A pure Rust process that:
//! - Keeps the account pool and its scheduled refresh state
//! - Runs the scheduled refresh coordinator in the background
//! - Provides a REST admin API on /admin/* for the CLI and operators
//!
//! Access via: http://localhost:8046

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::info;

mod api;
mod cli;
mod commands;
mod router;
mod server_utils;
mod state;

#[cfg(test)]
mod test_helpers;

use cli::{Cli, Commands};
use poolkeeper_core::modules::{config as core_config, logger};
use state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    logger::init_logger(&cli.log_level, cli.log_dir.as_deref())
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    let data_dir = resolve_data_dir(cli.data_dir)?;

    match cli.command {
        None => run_server(data_dir, None, None).await,
        Some(Commands::Serve { host, port }) => run_server(data_dir, host, port).await,
        Some(Commands::States { json, url }) => commands::show_states(&url, json).await,
        Some(Commands::Refresh { account_ids, url }) => {
            commands::trigger_refresh(&url, account_ids).await
        },
        Some(Commands::CheckConfig) => commands::check_config(&data_dir),
    }
}

fn resolve_data_dir(flag: Option<PathBuf>) -> Result<PathBuf> {
    match flag {
        Some(dir) => {
            std::fs::create_dir_all(&dir)?;
            Ok(dir)
        },
        None => core_config::get_data_dir()
            .map_err(|e| anyhow::anyhow!("Failed to get data directory: {}", e)),
    }
}

async fn run_server(data_dir: PathBuf, host: Option<String>, port: Option<u16>) -> Result<()> {
    info!("🚀 Poolkeeper Server starting...");

    // Invalid config is fatal at startup; later reloads keep the last good config.
    let mut config = core_config::load_config(&data_dir)
        .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    let state = AppState::from_config(&config, data_dir.clone())?;
    info!("✅ Application state initialized");
    info!("📊 {} accounts loaded", state.get_account_count());

    let scheduler = state.scheduler().clone();
    let reload_dir = data_dir.clone();
    let driver =
        scheduler.start(move || core_config::load_config(&reload_dir).map(|c| c.scheduled_refresh));

    let app = router::build_router(state);
    let listener = server_utils::create_listener(&config.server).await?;
    info!("🔌 Admin API available at http://{}:{}/admin/", config.server.host, config.server.port);

    axum::serve(listener, app).with_graceful_shutdown(server_utils::shutdown_signal()).await?;

    scheduler.shutdown().await;
    if let Err(e) = driver.await {
        tracing::warn!("Scheduler driver ended abnormally: {}", e);
    }

    info!("Server shutdown complete");
    Ok(())
}

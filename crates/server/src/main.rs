//! havn server entry point.
//!
//! This is the main binary that boots the MCP server on stdio transport.
//! Logging goes to stderr to avoid interfering with the JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::Result;
use havn_client::{CacheManager, FetchClient, FetchConfig, ManagerConfig, WorkerHooks};
use havn_core::{AppConfig, CacheDb, CacheStore};
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use tracing_subscriber::EnvFilter;

mod handler;
mod tools;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;
    tracing::info!(version = %config.version_tag, origin = %config.origin, "Starting havn server on stdio transport");

    let db = CacheDb::open(&config.db_path).await?;
    let network = FetchClient::new(FetchConfig::from(&config))?;
    let manager = Arc::new(CacheManager::new(
        ManagerConfig::from_app_config(&config)?,
        Arc::new(db.clone()),
        Arc::new(network),
    )?);

    startup(&manager, &db, &config).await;

    let handler = handler::HavnServer::new(Arc::clone(&manager), db, config.skip_waiting);
    let transport = stdio();
    let server = serve_server(handler, transport).await?;

    server.waiting().await?;
    manager.settle().await;

    Ok(())
}

/// Install on start when configured, otherwise re-activate an installed version.
/// Failures are logged; the server still starts and serves what the store has.
async fn startup(manager: &CacheManager, db: &CacheDb, config: &AppConfig) {
    if config.install_on_start {
        match manager.on_install().await {
            Ok(report) => tracing::info!(version = %report.version, assets = report.assets.len(), "startup install done"),
            Err(e) => {
                tracing::error!("startup install failed: {e}");
                return;
            }
        }
        if !config.skip_waiting {
            return;
        }
    } else {
        match db.has_version(manager.version()).await {
            Ok(true) => {}
            Ok(false) => {
                tracing::warn!(version = %manager.version(), "version not installed; call sw_install");
                return;
            }
            Err(e) => {
                tracing::error!("cache store unavailable at startup: {e}");
                return;
            }
        }
    }

    if let Err(e) = manager.on_activate().await {
        tracing::error!("startup activate failed: {e}");
    }
}

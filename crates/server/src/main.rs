//! mks-sw server entry point.
//!
//! Boots the offline cache worker and serves it as MCP tools on stdio.
//! Logging goes to stderr to avoid interfering with the JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::Result;
use mks_sw_client::{ClientHub, FetchClient, FetchConfig, NotificationCenter, OfflineWorker};
use mks_sw_core::{AppConfig, CacheDb};
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use tracing_subscriber::EnvFilter;

mod error;
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
    tracing::info!(version = %config.cache_version, db = %config.db_path.display(), "Starting mks-sw on stdio transport");

    let db = CacheDb::open(&config.db_path).await?;
    let network = Arc::new(FetchClient::new(FetchConfig::from(&config))?);
    let hub = Arc::new(ClientHub::new());
    let center = Arc::new(NotificationCenter::new());
    let worker = OfflineWorker::new(db, network, hub.clone(), center.clone(), &config)?;

    let handler = handler::MksSwServer::new(Arc::new(worker), hub, center);
    let transport = stdio();
    let server = serve_server(handler, transport).await?;

    server.waiting().await?;

    Ok(())
}

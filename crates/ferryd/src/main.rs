//! ferryd — Ferry file transfer daemon.
//!
//! Accepts one client at a time: chunks are concurrent within a transfer,
//! clients are not.

use anyhow::{Context, Result};
use tokio::net::TcpListener;

use ferry_core::config::FerryConfig;
use ferryd::transfer;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    if let Err(e) = FerryConfig::write_default_if_missing() {
        tracing::warn!(error = %e, "failed to write default config");
    }
    let config = FerryConfig::load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "failed to load config, using defaults");
        FerryConfig::default()
    });

    if let Err(e) = std::fs::create_dir_all(&config.storage.serve_root) {
        tracing::warn!(error = %e, "failed to create serve root");
    }

    let listener = TcpListener::bind(("0.0.0.0", config.network.port))
        .await
        .with_context(|| format!("failed to bind port {}", config.network.port))?;
    tracing::info!(
        port = config.network.port,
        serve_root = %config.storage.serve_root.display(),
        "ferryd listening"
    );

    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(conn) => conn,
            Err(e) => {
                tracing::warn!(error = %e, "accept failed");
                continue;
            }
        };
        tracing::info!(%peer, "client connected");

        if let Err(e) = transfer::serve_connection(stream, &config).await {
            tracing::warn!(%peer, error = %e, "transfer failed");
        }
    }
}

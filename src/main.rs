//! Ferrokv - an in-memory key-value server speaking the Redis protocol
//!
//! This is the main entry point for the Ferrokv server.

use std::process;

use tracing::info;
use tracing_subscriber::EnvFilter;

use ferrokv::config::{parse_cli_args, Config};
use ferrokv::error::Result;
use ferrokv::{Server, StorageEngine};

#[tokio::main]
async fn main() {
    let args = parse_cli_args();
    let config = match Config::load(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    // RUST_LOG wins over the configured level
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.server.log_level.filter_directive())),
        )
        .init();

    if let Err(e) = run(config).await {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

async fn run(config: Config) -> Result<()> {
    info!(version = env!("CARGO_PKG_VERSION"), "starting ferrokv");

    let storage = StorageEngine::with_partitions(config.storage.shards);
    let server = Server::bind(config.network, storage).await?;
    server.run_until(shutdown_signal()).await
}

/// Completes on SIGINT, or SIGTERM on unix
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => info!("received SIGINT, shutting down"),
                    _ = sigterm.recv() => info!("received SIGTERM, shutting down"),
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "cannot install SIGTERM handler");
                let _ = tokio::signal::ctrl_c().await;
                info!("received SIGINT, shutting down");
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
        info!("received SIGINT, shutting down");
    }
}

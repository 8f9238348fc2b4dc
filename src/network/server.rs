//! Main server implementation
//!
//! Accepts TCP connections and spawns one task per client. On shutdown the
//! server stops accepting, tells every connection to finish up, and waits
//! for all of them before returning.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{watch, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use super::{Connection, NetworkConfig};
use crate::error::{FerrokvError, Result};
use crate::storage::commands::CommandExecutor;
use crate::storage::StorageEngine;

/// Connection ID generator
static CONN_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Reply sent to clients over the connection limit
const MAX_CLIENTS_REPLY: &[u8] = b"-ERR max number of clients reached\r\n";

/// Main server struct
pub struct Server {
    listener: TcpListener,
    config: NetworkConfig,
    executor: CommandExecutor,
}

impl Server {
    /// Bind the listening socket
    pub async fn bind(config: NetworkConfig, storage: Arc<StorageEngine>) -> Result<Self> {
        let listener = TcpListener::bind(config.addr()).await.map_err(|err| {
            FerrokvError::Config(format!("cannot bind {}: {}", config.addr(), err))
        })?;

        Ok(Server {
            listener,
            config,
            executor: CommandExecutor::new(storage),
        })
    }

    /// Address actually bound, useful with port 0
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Serve clients until `shutdown` completes, then drain
    pub async fn run_until<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let max_clients = self.config.max_clients.max(1);
        let slots = Arc::new(Semaphore::new(max_clients));
        let (stop_tx, stop_rx) = watch::channel(false);
        let mut tasks = JoinSet::new();

        info!(
            addr = %self.local_addr()?,
            max_clients,
            partitions = self.executor.storage().partition_count(),
            "ready to accept connections"
        );

        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                biased;

                _ = &mut shutdown => {
                    info!("shutdown requested, draining connections");
                    break;
                }

                Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                    if let Err(err) = joined {
                        error!(error = %err, "connection task failed");
                    }
                }

                accepted = self.listener.accept() => {
                    let (stream, addr) = match accepted {
                        Ok(pair) => pair,
                        Err(err) => {
                            warn!(error = %err, "accept error");
                            continue;
                        }
                    };

                    let permit = match slots.clone().try_acquire_owned() {
                        Ok(permit) => permit,
                        Err(_) => {
                            warn!(%addr, "max clients reached, rejecting connection");
                            tasks.spawn(reject(stream));
                            continue;
                        }
                    };

                    let id = CONN_ID_COUNTER.fetch_add(1, Ordering::Relaxed);
                    debug!(id, %addr, "client connected");

                    let conn = Connection::new(id, stream, addr, self.executor.clone());
                    let stop = stop_rx.clone();
                    tasks.spawn(async move {
                        if let Err(err) = conn.run(stop).await {
                            debug!(id, error = %err, "connection closed with error");
                        }
                        drop(permit);
                    });
                }
            }
        }

        drop(self.listener);
        let _ = stop_tx.send(true);
        while let Some(joined) = tasks.join_next().await {
            if let Err(err) = joined {
                error!(error = %err, "connection task failed");
            }
        }

        info!("all connections closed");
        Ok(())
    }
}

async fn reject(mut stream: TcpStream) {
    let _ = stream.write_all(MAX_CLIENTS_REPLY).await;
    let _ = stream.shutdown().await;
}

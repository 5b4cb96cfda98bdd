//! TCP listener.
//!
//! [`Server::bind`] opens the listening socket; [`Server::run`] accepts
//! connections until the shutdown future resolves, spawning one task per
//! connection. Tasks already running are not waited for.

use crate::commands::CommandHandler;
use crate::config::Config;
use crate::connection::{handle_connection, ConnectionStats};
use crate::storage::StorageEngine;
use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};

/// A bound, not yet running server.
pub struct Server {
    listener: TcpListener,
    handler: CommandHandler,
    stats: Arc<ConnectionStats>,
    max_buffer_size: usize,
}

impl Server {
    /// Binds the listening socket described by `config`.
    pub async fn bind(config: &Config) -> io::Result<Self> {
        let listener = TcpListener::bind(config.bind_address()).await?;
        let storage = Arc::new(StorageEngine::new());
        info!(addr = %listener.local_addr()?, "Listening");

        Ok(Self {
            listener,
            handler: CommandHandler::new(storage),
            stats: Arc::new(ConnectionStats::new()),
            max_buffer_size: config.max_buffer_size,
        })
    }

    /// The address actually bound, useful when the port was 0.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn storage(&self) -> &Arc<StorageEngine> {
        self.handler.storage()
    }

    pub fn stats(&self) -> &Arc<ConnectionStats> {
        &self.stats
    }

    /// Accepts connections until `shutdown` completes.
    pub async fn run<F>(self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::select! {
            _ = self.accept_loop() => {}
            _ = shutdown => {
                info!("Shutdown signal received, stopping server...");
            }
        }

        let stats = self.storage().stats();
        info!(keys = stats.keys, "Server stopped");
    }

    /// Main loop that accepts incoming connections
    async fn accept_loop(&self) {
        loop {
            match self.listener.accept().await {
                Ok((stream, addr)) => {
                    if let Err(e) = stream.set_nodelay(true) {
                        error!(client = %addr, error = %e, "Failed to set TCP_NODELAY");
                    }
                    tokio::spawn(handle_connection(
                        stream,
                        addr,
                        self.handler.clone(),
                        Arc::clone(&self.stats),
                        self.max_buffer_size,
                    ));
                }
                Err(e) => {
                    error!(error = %e, "Failed to accept connection");
                }
            }
        }
    }
}

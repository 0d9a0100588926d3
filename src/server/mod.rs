//! Server module
//!
//! Handles TCP connections and manages the event loop.
//! This module is responsible for accepting connections and delegating
//! command processing to the dispatcher.

mod connection;

use crate::dispatch::Dispatcher;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};

pub use connection::Connection;

/// Run the server
///
/// Starts the TCP server on the given address and processes incoming connections.
/// Every connection shares the same dispatcher.
pub async fn run(addr: &str, dispatcher: Arc<Dispatcher>) -> anyhow::Result<()> {
    // Bind the TCP listener
    let listener = TcpListener::bind(addr).await?;
    info!("hashkv RESP server listening on {}", addr);

    loop {
        // Accept incoming connections
        let (socket, addr) = listener.accept().await?;
        info!("New RESP connection from {}", addr);

        // Clone the dispatcher Arc for this connection
        let dispatcher = dispatcher.clone();

        // Spawn a new task to handle this connection
        tokio::spawn(async move {
            let mut connection = Connection::new(socket);

            if let Err(e) = connection.handle(&dispatcher).await {
                error!("Connection error from {}: {}", addr, e);
            }

            info!("Connection closed: {}", addr);
        });
    }
}

//! Loopback TCP server for the session.
//!
//! The server:
//! - Listens on `127.0.0.1:<port>` for controller connections
//! - Spawns a ConnectionHandler for each connection
//! - Stops accepting once the CancellationToken is triggered
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │  SessionServer  │
//! │                 │
//! │   TcpListener   │
//! └───────┬─────────┘
//!         │ accept()
//!         ▼
//! ┌─────────────────┐     ┌─────────────────┐
//! │ConnectionHandler│────▶│EndpointRegistry │
//! │ (per connection)│     │ (spawn_blocking)│
//! └─────────────────┘     └─────────────────┘
//! ```

mod connection;

pub use connection::{ConnectionError, ConnectionHandler};

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::config::ServerConfig;
use crate::endpoints::EndpointRegistry;

/// Session server bound to its loopback port.
pub struct SessionServer {
    listener: TcpListener,

    /// Endpoints shared by all connections
    endpoints: Arc<EndpointRegistry>,

    config: ServerConfig,

    /// Cancellation token for shutdown
    cancel_token: CancellationToken,

    /// Connection counter, for log correlation
    connection_counter: AtomicU64,
}

impl SessionServer {
    /// Binds the listening socket.
    ///
    /// Binding is separate from [`run`](Self::run) so the actual port is
    /// known (and can be announced) before serving starts.
    pub async fn bind(
        config: ServerConfig,
        endpoints: EndpointRegistry,
        cancel_token: CancellationToken,
    ) -> Result<Self, ServerError> {
        let addr = config.bind_addr();
        let listener = TcpListener::bind(addr).await.map_err(|e| ServerError::Bind {
            addr,
            error: e.to_string(),
        })?;

        Ok(Self {
            listener,
            endpoints: Arc::new(endpoints),
            config,
            cancel_token,
            connection_counter: AtomicU64::new(0),
        })
    }

    /// Returns the address the server is listening on.
    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        self.listener
            .local_addr()
            .map_err(|e| ServerError::LocalAddr(e.to_string()))
    }

    /// Runs the server.
    ///
    /// Accepts connections until the cancellation token is triggered.
    pub async fn run(&self) -> Result<(), ServerError> {
        info!(addr = %self.local_addr()?, "Session server listening");

        loop {
            tokio::select! {
                _ = self.cancel_token.cancelled() => {
                    info!("Server shutdown requested");
                    break;
                }

                result = self.listener.accept() => {
                    match result {
                        Ok((stream, _addr)) => {
                            let conn_num = self.connection_counter.fetch_add(1, Ordering::Relaxed);
                            self.handle_connection(stream, conn_num);
                        }
                        Err(e) => {
                            error!(error = %e, "Failed to accept connection");
                        }
                    }
                }
            }
        }

        info!("Session server stopped");
        Ok(())
    }

    fn handle_connection(&self, stream: TcpStream, connection_number: u64) {
        if let Err(e) = stream.set_nodelay(true) {
            error!(error = %e, "Failed to disable Nagle's algorithm");
        }
        let (reader, writer) = stream.into_split();
        let handler = ConnectionHandler::new(
            reader,
            writer,
            Arc::clone(&self.endpoints),
            &self.config,
            self.cancel_token.child_token(),
            connection_number,
        );
        tokio::spawn(handler.run());
    }
}

/// Errors that can occur in server operations.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Failed to bind {addr}: {error}")]
    Bind { addr: SocketAddr, error: String },

    #[error("Failed to read listening address: {0}")]
    LocalAddr(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LOOPBACK;

    #[test]
    fn test_server_error_display() {
        let err = ServerError::Bind {
            addr: SocketAddr::new(LOOPBACK, 8270),
            error: "address in use".to_string(),
        };
        assert!(err.to_string().contains("127.0.0.1:8270"));
        assert!(err.to_string().contains("address in use"));
    }
}

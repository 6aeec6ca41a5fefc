//! Server configuration.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

/// The server only ever listens on the loopback interface.
pub const LOOPBACK: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);

/// Interpreter used when none is configured.
pub const DEFAULT_INTERPRETER: &str = "python";

/// Maximum frame size (1 MB)
pub const MAX_FRAME_SIZE: usize = 1_048_576;

/// Read timeout for idle connections (5 minutes)
pub const READ_TIMEOUT: Duration = Duration::from_secs(300);

/// Write timeout (10 seconds)
pub const WRITE_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Port to bind; 0 lets the OS pick one
    pub port: u16,
    pub read_timeout: Duration,
    pub write_timeout: Duration,
    pub max_frame_size: usize,
}

impl ServerConfig {
    pub fn new(port: u16) -> Self {
        Self {
            port,
            read_timeout: READ_TIMEOUT,
            write_timeout: WRITE_TIMEOUT,
            max_frame_size: MAX_FRAME_SIZE,
        }
    }

    /// Returns the address the server binds to.
    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(LOOPBACK, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::new(8270);
        assert_eq!(config.write_timeout, Duration::from_secs(10));
        assert_eq!(config.read_timeout, Duration::from_secs(300));
        assert_eq!(config.max_frame_size, 1_048_576);
    }

    #[test]
    fn test_bind_addr_is_loopback() {
        let addr = ServerConfig::new(8270).bind_addr();
        assert!(addr.ip().is_loopback());
        assert_eq!(addr.port(), 8270);
    }
}

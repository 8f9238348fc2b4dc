//! Network layer for Ferrokv
//!
//! Handles TCP connections, client limits and network I/O.

pub mod connection;
pub mod server;

pub use connection::Connection;
pub use server::Server;

/// Network configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkConfig {
    /// TCP bind address
    pub bind_addr: String,

    /// TCP port; 0 lets the OS pick one
    pub port: u16,

    /// Maximum number of client connections
    pub max_clients: usize,
}

impl NetworkConfig {
    /// `host:port` to bind
    pub fn addr(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        NetworkConfig {
            bind_addr: "127.0.0.1".to_string(),
            port: 6379,
            max_clients: 10000,
        }
    }
}

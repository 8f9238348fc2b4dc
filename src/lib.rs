//! Ferrokv library
//!
//! This file exposes the public API of Ferrokv for use as a library: the
//! storage engine with its sorted sets, the option registries, the RESP
//! codec and the TCP server.

pub mod config;
pub mod error;
pub mod network;
pub mod options;
pub mod protocol;
pub mod storage;

// Re-export commonly used types
pub use config::Config;
pub use error::{CommandError, FerrokvError, StorageError};
pub use network::server::Server;
pub use protocol::resp::RespFrame;
pub use storage::commands::CommandExecutor;
pub use storage::engine::StorageEngine;

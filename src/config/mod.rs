//! Configuration module for Ferrokv
//!
//! Provides a centralized configuration system that supports both
//! configuration files and command-line arguments. Command-line values
//! (and their environment variable forms) override the file.

mod cli;
mod parser;

pub use cli::{parse_cli_args, CliArgs};
pub use parser::{parse_config_file, parse_config_str, ConfigParseError};

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::network::NetworkConfig;
use crate::storage::engine::DEFAULT_PARTITIONS;

/// Main configuration structure for Ferrokv
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    /// Server configuration
    pub server: ServerConfig,

    /// Network configuration
    pub network: NetworkConfig,

    /// Keyspace configuration
    pub storage: StorageConfig,
}

/// Server-specific configuration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerConfig {
    /// Log level
    pub log_level: LogLevel,
}

/// Keyspace configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageConfig {
    /// Number of independently locked keyspace partitions
    pub shards: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig {
            shards: DEFAULT_PARTITIONS,
        }
    }
}

/// Log level configuration, named the way redis.conf names them
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    /// Debug level - most verbose
    Debug,

    /// Verbose level
    Verbose,

    /// Notice level - default
    #[default]
    Notice,

    /// Warning level
    Warning,
}

impl LogLevel {
    /// `tracing` filter directive for this level
    pub fn filter_directive(self) -> &'static str {
        match self {
            LogLevel::Debug => "trace",
            LogLevel::Verbose => "debug",
            LogLevel::Notice => "info",
            LogLevel::Warning => "warn",
        }
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "debug" => Ok(LogLevel::Debug),
            "verbose" => Ok(LogLevel::Verbose),
            "notice" => Ok(LogLevel::Notice),
            "warning" => Ok(LogLevel::Warning),
            _ => Err(format!("unknown log level '{}'", s)),
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LogLevel::Debug => "debug",
            LogLevel::Verbose => "verbose",
            LogLevel::Notice => "notice",
            LogLevel::Warning => "warning",
        };
        f.write_str(name)
    }
}

impl Config {
    /// Load configuration from a file
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self, ConfigParseError> {
        let path = path.into();
        parse_config_file(&path)
    }

    /// Build the effective configuration: the file named by `--config`
    /// (if any) with the remaining arguments applied on top
    pub fn load(args: &CliArgs) -> Result<Self, ConfigParseError> {
        let mut config = match &args.config {
            Some(path) => Self::from_file(path)?,
            None => Config::default(),
        };
        config.apply_cli_args(args)?;
        Ok(config)
    }

    /// Apply command-line arguments to override config
    pub fn apply_cli_args(&mut self, args: &CliArgs) -> Result<(), ConfigParseError> {
        if let Some(port) = args.port {
            self.network.port = port;
        }
        if let Some(bind_addr) = &args.bind {
            self.network.bind_addr = bind_addr.clone();
        }
        if let Some(max_clients) = args.maxclients {
            self.network.max_clients = checked_positive("maxclients", max_clients)?;
        }
        if let Some(level) = &args.loglevel {
            self.server.log_level = level
                .parse()
                .map_err(|_| ConfigParseError::Argument("loglevel".into(), level.clone()))?;
        }
        if let Some(shards) = args.shards {
            self.storage.shards = checked_positive("shards", shards)?;
        }
        Ok(())
    }
}

fn checked_positive(option: &str, value: usize) -> Result<usize, ConfigParseError> {
    if value == 0 {
        Err(ConfigParseError::Argument(option.into(), value.to_string()))
    } else {
        Ok(value)
    }
}

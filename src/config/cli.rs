//! Command-line argument parser
//!
//! Every option can also be given through a `FERROKV_*` environment
//! variable; an explicit flag wins over the variable.

use std::path::PathBuf;

use clap::Parser;

/// Command-line arguments for Ferrokv
#[derive(Parser, Debug, Clone, Default, PartialEq, Eq)]
#[command(
    name = "ferrokv",
    version,
    about = "In-memory key-value server speaking the Redis protocol"
)]
pub struct CliArgs {
    /// Configuration file to use (redis.conf syntax)
    #[arg(short = 'c', long, env = "FERROKV_CONFIG")]
    pub config: Option<PathBuf>,

    /// TCP port to listen on (default: 6379)
    #[arg(short, long, env = "FERROKV_PORT")]
    pub port: Option<u16>,

    /// Interface to bind to (default: 127.0.0.1)
    #[arg(long, env = "FERROKV_BIND")]
    pub bind: Option<String>,

    /// Maximum number of simultaneous clients
    #[arg(long, env = "FERROKV_MAXCLIENTS")]
    pub maxclients: Option<usize>,

    /// Log level (debug, verbose, notice, warning)
    #[arg(long, env = "FERROKV_LOGLEVEL")]
    pub loglevel: Option<String>,

    /// Number of independently locked keyspace partitions
    #[arg(long, env = "FERROKV_SHARDS")]
    pub shards: Option<usize>,
}

/// Parse command-line arguments, exiting with usage on error
pub fn parse_cli_args() -> CliArgs {
    CliArgs::parse()
}

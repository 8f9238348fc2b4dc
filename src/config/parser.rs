//! Configuration file parser
//!
//! Parses Redis-compatible configuration files for Ferrokv: one
//! `parameter value` pair per line, `#` starts a comment.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;
use std::str::FromStr;

use tracing::warn;

use super::{Config, LogLevel};

/// Error type for configuration parsing
#[derive(Debug, thiserror::Error)]
pub enum ConfigParseError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Invalid line format
    #[error("Invalid line format at line {0}: {1}")]
    Format(usize, String),

    /// Invalid parameter value
    #[error("Invalid value for parameter '{0}' at line {1}: {2}")]
    Value(String, usize, String),

    /// Invalid command-line value
    #[error("Invalid value for option '--{0}': {1}")]
    Argument(String, String),
}

/// Parse a Redis-compatible configuration file
pub fn parse_config_file(path: &Path) -> Result<Config, ConfigParseError> {
    let file = File::open(path)?;
    parse_lines(BufReader::new(file))
}

/// Parse configuration text
pub fn parse_config_str(text: &str) -> Result<Config, ConfigParseError> {
    parse_lines(text.as_bytes())
}

fn parse_lines<R: BufRead>(reader: R) -> Result<Config, ConfigParseError> {
    let mut config = Config::default();

    for (line_num, line_result) in reader.lines().enumerate() {
        let line = line_result?;
        let line = line.trim();

        // Skip empty lines and comments
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let (param, value) = match line.split_once(char::is_whitespace) {
            Some((param, value)) => (param.to_lowercase(), unquote(value.trim())),
            None => return Err(ConfigParseError::Format(line_num + 1, line.to_string())),
        };

        apply_config_param(&mut config, &param, value, line_num + 1)?;
    }

    Ok(config)
}

/// Apply a configuration parameter to the config
fn apply_config_param(config: &mut Config, param: &str, value: &str, line_num: usize) -> Result<(), ConfigParseError> {
    match param {
        "bind" => {
            // Redis accepts several addresses; only the first is used
            let first = value.split_whitespace().next().unwrap_or(value);
            config.network.bind_addr = first.to_string();
        }
        "port" => {
            config.network.port = parse_value(param, value, line_num)?;
        }
        "maxclients" => {
            config.network.max_clients = parse_positive(param, value, line_num)?;
        }
        "loglevel" => {
            config.server.log_level = parse_value::<LogLevel>(param, value, line_num)?;
        }
        "shards" => {
            config.storage.shards = parse_positive(param, value, line_num)?;
        }
        _ => {
            // Just skip unknown parameters instead of erroring
            warn!(param, line = line_num, "unknown configuration parameter, skipping");
        }
    }

    Ok(())
}

/// Strip one pair of surrounding double quotes
fn unquote(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
}

/// Parse a value that implements FromStr
fn parse_value<T: FromStr>(param: &str, value: &str, line_num: usize) -> Result<T, ConfigParseError> {
    value
        .parse::<T>()
        .map_err(|_| ConfigParseError::Value(param.to_string(), line_num, value.to_string()))
}

fn parse_positive(param: &str, value: &str, line_num: usize) -> Result<usize, ConfigParseError> {
    match parse_value::<usize>(param, value, line_num)? {
        0 => Err(ConfigParseError::Value(param.to_string(), line_num, value.to_string())),
        n => Ok(n),
    }
}

//! Error types for Ferrokv
//!
//! This module defines all error types used throughout the server.
//! Every error renders as the line a Redis client expects after the `-`
//! of an error reply, so the wire layer can forward `to_string()` as-is.

use std::io;
use thiserror::Error;

/// Main error type for Ferrokv operations
#[derive(Debug, Error)]
pub enum FerrokvError {
    /// Protocol-related errors (RESP framing)
    #[error("ERR Protocol error: {0}")]
    Protocol(String),

    /// Command decoding errors
    #[error(transparent)]
    Command(#[from] CommandError),

    /// Storage engine errors
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Network/IO errors
    #[error("ERR I/O error: {0}")]
    Io(#[from] io::Error),

    /// Configuration errors
    #[error("ERR configuration error: {0}")]
    Config(String),
}

/// Errors raised while turning a request into a typed command
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    /// Unknown command
    #[error("ERR unknown command '{0}'")]
    UnknownCommand(String),

    /// Wrong number of arguments for command
    #[error("ERR wrong number of arguments for '{0}' command")]
    WrongNumberOfArgs(String),

    /// Syntax error in command
    #[error("ERR syntax error")]
    SyntaxError,

    /// Value is not an integer or out of range
    #[error("ERR value is not an integer or out of range")]
    NotInteger,

    /// Value is not a valid float
    #[error("ERR value is not a valid float")]
    NotFloat,

    /// Non-positive or overflowing expiry argument
    #[error("ERR invalid expire time in '{0}' command")]
    InvalidExpireTime(String),

    /// Malformed BYSCORE bound
    #[error("ERR min or max is not a float")]
    InvalidScoreRange,

    /// Malformed BYLEX bound
    #[error("ERR min or max not valid string range item")]
    InvalidLexRange,

    /// Option name not registered for the command
    #[error("ERR unknown option '{0}'")]
    UnknownOption(String),

    /// Two mutually exclusive options requested together
    #[error("ERR {option} and {conflicts_with} options at the same time are not compatible")]
    OptionConflict {
        option: String,
        conflicts_with: String,
    },
}

/// Errors returned by the storage engine
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    /// Key or member absent
    #[error("ERR no such key")]
    NotFound,

    /// Operation against a value of the wrong kind
    #[error("WRONGTYPE Operation against a key holding the wrong kind of value")]
    WrongType,

    /// An NX/XX/GT/LT guard was not satisfied
    #[error("ERR precondition failed")]
    PreconditionFailed,

    /// Malformed argument detected by the engine
    #[error("ERR {0}")]
    InvalidArgument(String),
}

/// Type alias for Results throughout Ferrokv
pub type Result<T> = std::result::Result<T, FerrokvError>;

impl FerrokvError {
    /// True if the error means the connection can no longer be used
    pub fn is_fatal_to_connection(&self) -> bool {
        matches!(self, FerrokvError::Protocol(_) | FerrokvError::Io(_))
    }
}

//! Command execution layer for Ferrokv
//!
//! Turns a request frame into a typed [`Command`], runs it against the
//! storage engine and produces the reply frame. Decoding validates arity,
//! numbers and option combinations before the engine sees anything.

use std::sync::Arc;

use tracing::trace;

use super::{keys, sorted_sets, strings};
use crate::error::{CommandError, FerrokvError, Result};
use crate::protocol::{extract_bytes, RespFrame};
use crate::storage::StorageEngine;

pub use keys::KeyCommand;
pub use sorted_sets::SortedSetCommand;
pub use strings::StringCommand;

/// Top-level command categories
#[derive(Debug, Clone)]
pub enum Command {
    String(StringCommand),
    Key(KeyCommand),
    SortedSet(SortedSetCommand),
    Server(ServerCommand),
}

/// Connection and introspection commands
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerCommand {
    Ping { message: Option<Vec<u8>> },
    Echo { message: Vec<u8> },
    Command { subcommand: Option<String> },
    Quit,
}

/// Reply to a single request
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub frame: RespFrame,
    /// The client asked to close the connection after this reply
    pub close: bool,
}

/// Name, arity (negative means "at least") and flags of each command
const COMMAND_TABLE: &[(&str, i64, &[&str])] = &[
    ("get", 2, &["readonly", "fast"]),
    ("set", -3, &["write", "denyoom"]),
    ("del", -2, &["write"]),
    ("exists", -2, &["readonly", "fast"]),
    ("type", 2, &["readonly", "fast"]),
    ("expire", -3, &["write", "fast"]),
    ("pexpire", -3, &["write", "fast"]),
    ("persist", 2, &["write", "fast"]),
    ("ttl", 2, &["readonly", "fast"]),
    ("pttl", 2, &["readonly", "fast"]),
    ("keys", 2, &["readonly"]),
    ("dbsize", 1, &["readonly", "fast"]),
    ("zadd", -4, &["write", "denyoom", "fast"]),
    ("zrange", -4, &["readonly"]),
    ("zscore", 3, &["readonly", "fast"]),
    ("zrank", 3, &["readonly", "fast"]),
    ("zcard", 2, &["readonly", "fast"]),
    ("zrem", -3, &["write", "fast"]),
    ("ping", -1, &["fast"]),
    ("echo", 2, &["fast"]),
    ("command", -1, &["loading", "stale"]),
    ("quit", 1, &["fast"]),
];

/// Executes commands against one shared storage engine
#[derive(Clone)]
pub struct CommandExecutor {
    storage: Arc<StorageEngine>,
}

impl CommandExecutor {
    /// Create new executor with storage reference
    pub fn new(storage: Arc<StorageEngine>) -> Self {
        CommandExecutor { storage }
    }

    /// Storage engine this executor runs against
    pub fn storage(&self) -> &Arc<StorageEngine> {
        &self.storage
    }

    /// Decode, execute and encode one request
    ///
    /// Command and storage errors become error replies; only protocol
    /// errors are returned, since those mean the stream is unusable.
    pub fn handle(&self, frame: RespFrame) -> Result<Reply> {
        let parts = match frame {
            RespFrame::Array(Some(parts)) => parts,
            _ => return Err(FerrokvError::Protocol("expected an array of bulk strings".into())),
        };

        let command = match Self::parse(&parts) {
            Ok(command) => command,
            Err(err) if err.is_fatal_to_connection() => return Err(err),
            Err(err) => {
                return Ok(Reply {
                    frame: RespFrame::error(err.to_string()),
                    close: false,
                })
            }
        };

        let close = matches!(command, Command::Server(ServerCommand::Quit));
        trace!(command = ?command, "executing");

        let frame = match self.execute(command) {
            Ok(frame) => frame,
            Err(err) if err.is_fatal_to_connection() => return Err(err),
            Err(err) => RespFrame::error(err.to_string()),
        };

        Ok(Reply { frame, close })
    }

    /// Parse the parts of a request into a command
    pub fn parse(parts: &[RespFrame]) -> Result<Command> {
        let name = match parts.first() {
            Some(frame) => String::from_utf8_lossy(&extract_bytes(frame)?).to_ascii_uppercase(),
            None => return Err(CommandError::UnknownCommand(String::new()).into()),
        };
        let args = &parts[1..];

        match name.as_str() {
            "GET" | "SET" => Ok(Command::String(strings::parse(&name, args)?)),
            "DEL" | "EXISTS" | "TYPE" | "EXPIRE" | "PEXPIRE" | "PERSIST" | "TTL" | "PTTL"
            | "KEYS" | "DBSIZE" => Ok(Command::Key(keys::parse(&name, args)?)),
            "ZADD" | "ZRANGE" | "ZSCORE" | "ZRANK" | "ZCARD" | "ZREM" => {
                Ok(Command::SortedSet(sorted_sets::parse(&name, args)?))
            }
            "PING" | "ECHO" | "COMMAND" | "QUIT" => Ok(Command::Server(Self::parse_server(&name, args)?)),
            _ => Err(CommandError::UnknownCommand(name.to_lowercase()).into()),
        }
    }

    /// Execute a parsed command
    pub fn execute(&self, command: Command) -> Result<RespFrame> {
        match command {
            Command::String(cmd) => strings::execute(&self.storage, cmd),
            Command::Key(cmd) => keys::execute(&self.storage, cmd),
            Command::SortedSet(cmd) => sorted_sets::execute(&self.storage, cmd),
            Command::Server(cmd) => Ok(Self::execute_server(cmd)),
        }
    }

    fn parse_server(name: &str, args: &[RespFrame]) -> Result<ServerCommand> {
        match name {
            "PING" => match args {
                [] => Ok(ServerCommand::Ping { message: None }),
                [message] => Ok(ServerCommand::Ping {
                    message: Some(extract_bytes(message)?),
                }),
                _ => Err(wrong_args("ping")),
            },
            "ECHO" => match args {
                [message] => Ok(ServerCommand::Echo {
                    message: extract_bytes(message)?,
                }),
                _ => Err(wrong_args("echo")),
            },
            "COMMAND" => Ok(ServerCommand::Command {
                subcommand: match args.first() {
                    Some(frame) => Some(String::from_utf8_lossy(&extract_bytes(frame)?).to_ascii_uppercase()),
                    None => None,
                },
            }),
            _ => match args {
                [] => Ok(ServerCommand::Quit),
                _ => Err(wrong_args("quit")),
            },
        }
    }

    fn execute_server(cmd: ServerCommand) -> RespFrame {
        match cmd {
            ServerCommand::Ping { message: None } => RespFrame::simple_string("PONG"),
            ServerCommand::Ping { message: Some(msg) } => RespFrame::bulk_string(msg),
            ServerCommand::Echo { message } => RespFrame::bulk_string(message),
            ServerCommand::Quit => RespFrame::ok(),
            ServerCommand::Command { subcommand } => match subcommand.as_deref() {
                None => RespFrame::array(COMMAND_TABLE.iter().map(command_entry).collect()),
                Some("COUNT") => RespFrame::count(COMMAND_TABLE.len()),
                // DOCS, INFO and friends: nothing to describe beyond the table
                Some(_) => RespFrame::array(Vec::new()),
            },
        }
    }
}

fn command_entry(&(name, arity, flags): &(&str, i64, &[&str])) -> RespFrame {
    let has_key = !matches!(name, "ping" | "echo" | "command" | "quit" | "dbsize" | "keys");
    let last_key = if matches!(name, "del" | "exists") { -1 } else { 1 };

    RespFrame::array(vec![
        RespFrame::bulk_string(name),
        RespFrame::Integer(arity),
        RespFrame::array(flags.iter().map(|flag| RespFrame::simple_string(*flag)).collect()),
        RespFrame::Integer(if has_key { 1 } else { 0 }),
        RespFrame::Integer(if has_key { last_key } else { 0 }),
        RespFrame::Integer(if has_key { 1 } else { 0 }),
    ])
}

/// Arity error for a command
pub(crate) fn wrong_args(command: &str) -> FerrokvError {
    CommandError::WrongNumberOfArgs(command.to_string()).into()
}

/// Parse an integer argument
pub(crate) fn parse_int(frame: &RespFrame) -> Result<i64> {
    let bytes = extract_bytes(frame)?;
    std::str::from_utf8(&bytes)
        .ok()
        .and_then(|s| s.parse::<i64>().ok())
        .ok_or_else(|| CommandError::NotInteger.into())
}

/// Render a score the way Redis clients expect: integral values without a
/// fractional part, infinities as `inf` / `-inf`
pub fn format_score(score: f64) -> String {
    if score.is_infinite() {
        if score > 0.0 { "inf".into() } else { "-inf".into() }
    } else if score.fract() == 0.0 && score.abs() < 1e17 {
        format!("{}", score as i64)
    } else {
        format!("{}", score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(words: &[&str]) -> RespFrame {
        RespFrame::array(words.iter().map(|w| RespFrame::bulk_string(*w)).collect())
    }

    fn run(executor: &CommandExecutor, words: &[&str]) -> RespFrame {
        executor.handle(request(words)).unwrap().frame
    }

    #[test]
    fn test_ping_echo_quit() {
        let executor = CommandExecutor::new(StorageEngine::new());
        assert_eq!(run(&executor, &["PING"]), RespFrame::simple_string("PONG"));
        assert_eq!(run(&executor, &["ping", "hi"]), RespFrame::bulk_string("hi"));
        assert_eq!(run(&executor, &["ECHO", "x"]), RespFrame::bulk_string("x"));

        let reply = executor.handle(request(&["QUIT"])).unwrap();
        assert!(reply.close);
        assert_eq!(reply.frame, RespFrame::ok());
    }

    #[test]
    fn test_unknown_command() {
        let executor = CommandExecutor::new(StorageEngine::new());
        assert_eq!(
            run(&executor, &["FLY"]),
            RespFrame::error("ERR unknown command 'fly'")
        );
    }

    #[test]
    fn test_command_introspection() {
        let executor = CommandExecutor::new(StorageEngine::new());
        assert_eq!(
            run(&executor, &["COMMAND", "count"]),
            RespFrame::count(COMMAND_TABLE.len())
        );
        match run(&executor, &["COMMAND"]) {
            RespFrame::Array(Some(entries)) => assert_eq!(entries.len(), COMMAND_TABLE.len()),
            other => panic!("unexpected reply {:?}", other),
        }
        assert_eq!(run(&executor, &["COMMAND", "DOCS"]), RespFrame::array(vec![]));
    }

    #[test]
    fn test_non_array_request_is_fatal() {
        let executor = CommandExecutor::new(StorageEngine::new());
        assert!(executor.handle(RespFrame::Integer(1)).is_err());
    }

    #[test]
    fn test_format_score() {
        assert_eq!(format_score(1.0), "1");
        assert_eq!(format_score(-3.0), "-3");
        assert_eq!(format_score(1.5), "1.5");
        assert_eq!(format_score(f64::INFINITY), "inf");
        assert_eq!(format_score(f64::NEG_INFINITY), "-inf");
    }
}

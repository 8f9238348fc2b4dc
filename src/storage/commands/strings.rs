//! String command implementations
//!
//! GET and SET, including the full SET option dialect.

use std::sync::Arc;

use super::executor::{parse_int, wrong_args};
use crate::error::{CommandError, FerrokvError, Result, StorageError};
use crate::options::SetOptions;
use crate::protocol::{extract_bytes, RespFrame};
use crate::storage::StorageEngine;

/// String commands
#[derive(Debug, Clone)]
pub enum StringCommand {
    Get {
        key: Vec<u8>,
    },
    Set {
        key: Vec<u8>,
        value: Vec<u8>,
        options: SetOptions,
    },
}

pub(super) fn parse(name: &str, args: &[RespFrame]) -> Result<StringCommand> {
    match name {
        "GET" => parse_get(args),
        _ => parse_set(args),
    }
}

fn parse_get(args: &[RespFrame]) -> Result<StringCommand> {
    match args {
        [key] => Ok(StringCommand::Get {
            key: extract_bytes(key)?,
        }),
        _ => Err(wrong_args("get")),
    }
}

/// SET key value [NX | XX] [GET] [EX s | PX ms | EXAT ts | PXAT ts-ms | KEEPTTL]
fn parse_set(args: &[RespFrame]) -> Result<StringCommand> {
    if args.len() < 2 {
        return Err(wrong_args("set"));
    }

    let key = extract_bytes(&args[0])?;
    let value = extract_bytes(&args[1])?;
    let mut options = SetOptions::new();

    let mut i = 2;
    while i < args.len() {
        let opt = String::from_utf8_lossy(&extract_bytes(&args[i])?).to_ascii_uppercase();
        match opt.as_str() {
            "EX" | "PX" | "EXAT" | "PXAT" => {
                let amount = args.get(i + 1).ok_or(CommandError::SyntaxError)?;
                options.activate_expiry(&opt, parse_int(amount)?)?;
                i += 2;
            }
            _ => {
                options.activate(&opt).map_err(|err| match err {
                    CommandError::UnknownOption(_) => CommandError::SyntaxError,
                    other => other,
                })?;
                i += 1;
            }
        }
    }

    Ok(StringCommand::Set { key, value, options })
}

pub(super) fn execute(storage: &Arc<StorageEngine>, cmd: StringCommand) -> Result<RespFrame> {
    match cmd {
        StringCommand::Get { key } => Ok(RespFrame::optional_bulk(storage.get_string(&key)?)),
        StringCommand::Set { key, value, options } => {
            match storage.set(key, value, &options) {
                Ok(previous) if options.is_get() => Ok(RespFrame::optional_bulk(previous)),
                Ok(_) => Ok(RespFrame::ok()),
                Err(FerrokvError::Storage(StorageError::PreconditionFailed)) => Ok(RespFrame::null_bulk()),
                Err(err) => Err(err),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::commands::executor::CommandExecutor;

    fn run(executor: &CommandExecutor, words: &[&str]) -> RespFrame {
        let frame = RespFrame::array(words.iter().map(|w| RespFrame::bulk_string(*w)).collect());
        executor.handle(frame).unwrap().frame
    }

    #[test]
    fn test_set_and_get() {
        let executor = CommandExecutor::new(StorageEngine::new());
        assert_eq!(run(&executor, &["SET", "k", "v"]), RespFrame::ok());
        assert_eq!(run(&executor, &["GET", "k"]), RespFrame::bulk_string("v"));
        assert_eq!(run(&executor, &["GET", "missing"]), RespFrame::null_bulk());
    }

    #[test]
    fn test_set_guards_reply_null() {
        let executor = CommandExecutor::new(StorageEngine::new());
        assert_eq!(run(&executor, &["SET", "k", "v", "XX"]), RespFrame::null_bulk());
        assert_eq!(run(&executor, &["SET", "k", "v", "nx"]), RespFrame::ok());
        assert_eq!(run(&executor, &["SET", "k", "w", "NX"]), RespFrame::null_bulk());
        assert_eq!(run(&executor, &["SET", "k", "w", "NX", "GET"]), RespFrame::bulk_string("v"));
        assert_eq!(run(&executor, &["SET", "new", "x", "GET"]), RespFrame::null_bulk());
    }

    #[test]
    fn test_set_option_errors() {
        let executor = CommandExecutor::new(StorageEngine::new());
        assert_eq!(
            run(&executor, &["SET", "k", "v", "NX", "XX"]),
            RespFrame::error("ERR XX and NX options at the same time are not compatible")
        );
        assert_eq!(
            run(&executor, &["SET", "k", "v", "EX", "10", "PX", "5"]),
            RespFrame::error("ERR PX and EX options at the same time are not compatible")
        );
        assert_eq!(run(&executor, &["SET", "k", "v", "EX"]), RespFrame::error("ERR syntax error"));
        assert_eq!(run(&executor, &["SET", "k", "v", "BOGUS"]), RespFrame::error("ERR syntax error"));
        assert_eq!(
            run(&executor, &["SET", "k", "v", "EX", "ten"]),
            RespFrame::error("ERR value is not an integer or out of range")
        );
        assert_eq!(
            run(&executor, &["SET", "k", "v", "EX", "0"]),
            RespFrame::error("ERR invalid expire time in 'set' command")
        );
        assert_eq!(
            run(&executor, &["SET", "k"]),
            RespFrame::error("ERR wrong number of arguments for 'set' command")
        );
    }

    #[test]
    fn test_get_wrong_type() {
        let executor = CommandExecutor::new(StorageEngine::new());
        run(&executor, &["ZADD", "z", "1", "m"]);
        assert_eq!(
            run(&executor, &["GET", "z"]),
            RespFrame::error("WRONGTYPE Operation against a key holding the wrong kind of value")
        );
    }
}

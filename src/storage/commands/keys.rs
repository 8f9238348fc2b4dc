//! Keyspace command implementations
//!
//! Commands that work on keys regardless of the value they hold:
//! deletion, existence, type, expiry and enumeration.

use std::sync::Arc;

use super::executor::{parse_int, wrong_args};
use crate::error::{FerrokvError, Result, StorageError};
use crate::options::ExpireOptions;
use crate::protocol::{extract_bytes, RespFrame};
use crate::storage::StorageEngine;

/// Keyspace commands
#[derive(Debug, Clone)]
pub enum KeyCommand {
    Del {
        keys: Vec<Vec<u8>>,
    },
    Exists {
        keys: Vec<Vec<u8>>,
    },
    Type {
        key: Vec<u8>,
    },
    Expire {
        key: Vec<u8>,
        seconds: i64,
        options: ExpireOptions,
    },
    PExpire {
        key: Vec<u8>,
        millis: i64,
        options: ExpireOptions,
    },
    Persist {
        key: Vec<u8>,
    },
    Ttl {
        key: Vec<u8>,
    },
    Pttl {
        key: Vec<u8>,
    },
    Keys {
        pattern: Vec<u8>,
    },
    DbSize,
}

pub(super) fn parse(name: &str, args: &[RespFrame]) -> Result<KeyCommand> {
    match name {
        "DEL" => Ok(KeyCommand::Del {
            keys: parse_key_list(args, "del")?,
        }),
        "EXISTS" => Ok(KeyCommand::Exists {
            keys: parse_key_list(args, "exists")?,
        }),
        "TYPE" => Ok(KeyCommand::Type {
            key: single_key(args, "type")?,
        }),
        "EXPIRE" => {
            let (key, seconds, options) = parse_expire(args, "expire")?;
            Ok(KeyCommand::Expire { key, seconds, options })
        }
        "PEXPIRE" => {
            let (key, millis, options) = parse_expire(args, "pexpire")?;
            Ok(KeyCommand::PExpire { key, millis, options })
        }
        "PERSIST" => Ok(KeyCommand::Persist {
            key: single_key(args, "persist")?,
        }),
        "TTL" => Ok(KeyCommand::Ttl {
            key: single_key(args, "ttl")?,
        }),
        "PTTL" => Ok(KeyCommand::Pttl {
            key: single_key(args, "pttl")?,
        }),
        "KEYS" => Ok(KeyCommand::Keys {
            pattern: single_key(args, "keys")?,
        }),
        _ => match args {
            [] => Ok(KeyCommand::DbSize),
            _ => Err(wrong_args("dbsize")),
        },
    }
}

fn single_key(args: &[RespFrame], command: &str) -> Result<Vec<u8>> {
    match args {
        [key] => extract_bytes(key),
        _ => Err(wrong_args(command)),
    }
}

fn parse_key_list(args: &[RespFrame], command: &str) -> Result<Vec<Vec<u8>>> {
    if args.is_empty() {
        return Err(wrong_args(command));
    }
    args.iter().map(extract_bytes).collect()
}

/// EXPIRE key seconds [NX | XX | GT | LT]
fn parse_expire(args: &[RespFrame], command: &str) -> Result<(Vec<u8>, i64, ExpireOptions)> {
    if args.len() < 2 {
        return Err(wrong_args(command));
    }

    let key = extract_bytes(&args[0])?;
    let amount = parse_int(&args[1])?;
    let mut options = ExpireOptions::new();
    for arg in &args[2..] {
        let flag = String::from_utf8_lossy(&extract_bytes(arg)?).to_ascii_uppercase();
        options.activate(&flag)?;
    }

    Ok((key, amount, options))
}

pub(super) fn execute(storage: &Arc<StorageEngine>, cmd: KeyCommand) -> Result<RespFrame> {
    match cmd {
        KeyCommand::Del { keys } => Ok(RespFrame::count(storage.del(&keys))),
        KeyCommand::Exists { keys } => Ok(RespFrame::count(storage.exists(&keys))),
        KeyCommand::Type { key } => Ok(RespFrame::simple_string(
            storage.key_type(&key).map_or("none", |t| t.name()),
        )),
        KeyCommand::Expire { key, seconds, options } => {
            expire_reply(storage.expire(&key, seconds, &options))
        }
        KeyCommand::PExpire { key, millis, options } => {
            expire_reply(storage.pexpire(&key, millis, &options))
        }
        KeyCommand::Persist { key } => Ok(RespFrame::Integer(storage.persist(&key) as i64)),
        KeyCommand::Ttl { key } => Ok(RespFrame::Integer(storage.ttl(&key))),
        KeyCommand::Pttl { key } => Ok(RespFrame::Integer(storage.pttl(&key))),
        KeyCommand::Keys { pattern } => Ok(RespFrame::array(
            storage
                .keys(&pattern)
                .into_iter()
                .map(RespFrame::bulk_string)
                .collect(),
        )),
        KeyCommand::DbSize => Ok(RespFrame::count(storage.dbsize())),
    }
}

/// `:1` when the expiry was applied, `:0` for a missing key or a guard
/// that did not hold
fn expire_reply(outcome: Result<()>) -> Result<RespFrame> {
    match outcome {
        Ok(()) => Ok(RespFrame::Integer(1)),
        Err(FerrokvError::Storage(StorageError::NotFound))
        | Err(FerrokvError::Storage(StorageError::PreconditionFailed)) => Ok(RespFrame::Integer(0)),
        Err(err) => Err(err),
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
    fn test_del_exists_type() {
        let executor = CommandExecutor::new(StorageEngine::new());
        run(&executor, &["SET", "a", "1"]);
        run(&executor, &["ZADD", "z", "1", "m"]);

        assert_eq!(run(&executor, &["EXISTS", "a", "a", "nope"]), RespFrame::Integer(2));
        assert_eq!(run(&executor, &["TYPE", "a"]), RespFrame::simple_string("string"));
        assert_eq!(run(&executor, &["TYPE", "z"]), RespFrame::simple_string("zset"));
        assert_eq!(run(&executor, &["TYPE", "nope"]), RespFrame::simple_string("none"));
        assert_eq!(run(&executor, &["DEL", "a", "z", "nope"]), RespFrame::Integer(2));
        assert_eq!(run(&executor, &["DBSIZE"]), RespFrame::Integer(0));
        assert_eq!(
            run(&executor, &["DEL"]),
            RespFrame::error("ERR wrong number of arguments for 'del' command")
        );
    }

    #[test]
    fn test_expire_replies() {
        let executor = CommandExecutor::new(StorageEngine::new());
        assert_eq!(run(&executor, &["EXPIRE", "k", "10"]), RespFrame::Integer(0));

        run(&executor, &["SET", "k", "v"]);
        assert_eq!(run(&executor, &["TTL", "k"]), RespFrame::Integer(-1));
        assert_eq!(run(&executor, &["EXPIRE", "k", "100", "XX"]), RespFrame::Integer(0));
        assert_eq!(run(&executor, &["EXPIRE", "k", "100", "NX"]), RespFrame::Integer(1));
        assert_eq!(run(&executor, &["TTL", "k"]), RespFrame::Integer(100));
        assert_eq!(run(&executor, &["EXPIRE", "k", "50", "GT"]), RespFrame::Integer(0));
        assert_eq!(run(&executor, &["EXPIRE", "k", "50", "lt"]), RespFrame::Integer(1));
        assert_eq!(run(&executor, &["PERSIST", "k"]), RespFrame::Integer(1));
        assert_eq!(run(&executor, &["PERSIST", "k"]), RespFrame::Integer(0));
        assert_eq!(run(&executor, &["PTTL", "k"]), RespFrame::Integer(-1));
        assert_eq!(run(&executor, &["PTTL", "nope"]), RespFrame::Integer(-2));

        assert_eq!(run(&executor, &["PEXPIRE", "k", "0"]), RespFrame::Integer(1));
        assert_eq!(run(&executor, &["EXISTS", "k"]), RespFrame::Integer(0));
    }

    #[test]
    fn test_expire_option_errors() {
        let executor = CommandExecutor::new(StorageEngine::new());
        run(&executor, &["SET", "k", "v"]);
        assert_eq!(
            run(&executor, &["EXPIRE", "k", "10", "GT", "LT"]),
            RespFrame::error("ERR LT and GT options at the same time are not compatible")
        );
        assert_eq!(
            run(&executor, &["EXPIRE", "k", "ten"]),
            RespFrame::error("ERR value is not an integer or out of range")
        );
        assert_eq!(
            run(&executor, &["EXPIRE", "k", "10", "SOON"]),
            RespFrame::error("ERR unknown option 'SOON'")
        );
    }

    #[test]
    fn test_keys_pattern() {
        let executor = CommandExecutor::new(StorageEngine::new());
        for key in ["hello", "hallo", "hxllo", "world"] {
            run(&executor, &["SET", key, "1"]);
        }

        let mut matched = match run(&executor, &["KEYS", "h[ae]llo"]) {
            RespFrame::Array(Some(items)) => items,
            other => panic!("unexpected reply {:?}", other),
        };
        matched.sort_by(|a, b| format!("{:?}", a).cmp(&format!("{:?}", b)));
        assert_eq!(
            matched,
            vec![RespFrame::bulk_string("hallo"), RespFrame::bulk_string("hello")]
        );
        assert_eq!(run(&executor, &["DBSIZE"]), RespFrame::Integer(4));
    }
}

//! Sorted set command implementations

use std::sync::Arc;

use super::executor::{format_score, parse_int, wrong_args};
use crate::error::{CommandError, FerrokvError, Result, StorageError};
use crate::options::{ZAddOptions, ZRangeOptions};
use crate::protocol::{extract_bytes, RespFrame};
use crate::storage::sorted_set::parse_score;
use crate::storage::{RangeSpec, StorageEngine, ZAddReply, ZMember};

/// Sorted set commands
#[derive(Debug, Clone)]
pub enum SortedSetCommand {
    ZAdd {
        key: Vec<u8>,
        members: Vec<(f64, Vec<u8>)>,
        options: ZAddOptions,
    },
    ZRange {
        key: Vec<u8>,
        spec: RangeSpec,
        options: ZRangeOptions,
    },
    ZScore {
        key: Vec<u8>,
        member: Vec<u8>,
    },
    ZRank {
        key: Vec<u8>,
        member: Vec<u8>,
    },
    ZCard {
        key: Vec<u8>,
    },
    ZRem {
        key: Vec<u8>,
        members: Vec<Vec<u8>>,
    },
}

pub(super) fn parse(name: &str, args: &[RespFrame]) -> Result<SortedSetCommand> {
    match name {
        "ZADD" => parse_zadd(args),
        "ZRANGE" => parse_zrange(args),
        "ZSCORE" => match args {
            [key, member] => Ok(SortedSetCommand::ZScore {
                key: extract_bytes(key)?,
                member: extract_bytes(member)?,
            }),
            _ => Err(wrong_args("zscore")),
        },
        "ZRANK" => match args {
            [key, member] => Ok(SortedSetCommand::ZRank {
                key: extract_bytes(key)?,
                member: extract_bytes(member)?,
            }),
            _ => Err(wrong_args("zrank")),
        },
        "ZCARD" => match args {
            [key] => Ok(SortedSetCommand::ZCard {
                key: extract_bytes(key)?,
            }),
            _ => Err(wrong_args("zcard")),
        },
        _ => match args {
            [key, members @ ..] if !members.is_empty() => Ok(SortedSetCommand::ZRem {
                key: extract_bytes(key)?,
                members: members.iter().map(extract_bytes).collect::<Result<_>>()?,
            }),
            _ => Err(wrong_args("zrem")),
        },
    }
}

/// ZADD key [NX | XX] [GT | LT] [CH] [INCR] score member [score member ...]
fn parse_zadd(args: &[RespFrame]) -> Result<SortedSetCommand> {
    if args.len() < 3 {
        return Err(wrong_args("zadd"));
    }

    let key = extract_bytes(&args[0])?;
    let mut options = ZAddOptions::new();

    let mut idx = 1;
    while idx < args.len() {
        let word = extract_bytes(&args[idx])?;
        let flag = String::from_utf8_lossy(&word).to_ascii_uppercase();
        if !ZAddOptions::recognizes(&flag) {
            break;
        }
        options.activate(&flag)?;
        idx += 1;
    }

    let pairs = &args[idx..];
    if pairs.is_empty() || pairs.len() % 2 != 0 {
        return Err(CommandError::SyntaxError.into());
    }

    let members = pairs
        .chunks(2)
        .map(|pair| -> Result<(f64, Vec<u8>)> {
            let score = parse_score(&extract_bytes(&pair[0])?).ok_or(CommandError::NotFloat)?;
            Ok((score, extract_bytes(&pair[1])?))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(SortedSetCommand::ZAdd {
        key,
        members,
        options,
    })
}

/// ZRANGE key start stop [BYSCORE | BYLEX] [REV] [LIMIT offset count] [WITHSCORES]
fn parse_zrange(args: &[RespFrame]) -> Result<SortedSetCommand> {
    if args.len() < 3 {
        return Err(wrong_args("zrange"));
    }

    let key = extract_bytes(&args[0])?;
    let start = extract_bytes(&args[1])?;
    let stop = extract_bytes(&args[2])?;
    let mut options = ZRangeOptions::new();

    let mut idx = 3;
    while idx < args.len() {
        let flag = String::from_utf8_lossy(&extract_bytes(&args[idx])?).to_ascii_uppercase();
        if flag == "LIMIT" {
            let (offset, count) = match (args.get(idx + 1), args.get(idx + 2)) {
                (Some(offset), Some(count)) => (parse_int(offset)?, parse_int(count)?),
                _ => return Err(CommandError::SyntaxError.into()),
            };
            options.activate_limit(offset, count)?;
            idx += 3;
        } else {
            options.activate(&flag).map_err(|err| match err {
                CommandError::UnknownOption(_) => CommandError::SyntaxError,
                other => other,
            })?;
            idx += 1;
        }
    }

    // Bounds are read once the range kind is known
    let spec = RangeSpec::parse(options.kind(), &start, &stop)?;

    Ok(SortedSetCommand::ZRange { key, spec, options })
}

pub(super) fn execute(storage: &Arc<StorageEngine>, cmd: SortedSetCommand) -> Result<RespFrame> {
    match cmd {
        SortedSetCommand::ZAdd {
            key,
            members,
            options,
        } => match storage.zadd(key, members, &options) {
            Ok(ZAddReply::Count(n)) => Ok(RespFrame::count(n)),
            Ok(ZAddReply::Score(score)) => Ok(RespFrame::bulk_string(format_score(score))),
            Err(FerrokvError::Storage(StorageError::NotFound)) if options.is_incr() => {
                Ok(RespFrame::null_bulk())
            }
            Err(err) => Err(err),
        },
        SortedSetCommand::ZRange { key, spec, options } => {
            let members = storage.zrange(&key, &spec, &options)?;
            Ok(range_reply(members, options.with_scores()))
        }
        SortedSetCommand::ZScore { key, member } => Ok(RespFrame::optional_bulk(
            storage
                .zscore(&key, &member)?
                .map(|score| format_score(score).into_bytes()),
        )),
        SortedSetCommand::ZRank { key, member } => Ok(match storage.zrank(&key, &member)? {
            Some(rank) => RespFrame::count(rank),
            None => RespFrame::null_bulk(),
        }),
        SortedSetCommand::ZCard { key } => Ok(RespFrame::count(storage.zcard(&key)?)),
        SortedSetCommand::ZRem { key, members } => Ok(RespFrame::count(storage.zrem(&key, &members)?)),
    }
}

fn range_reply(members: Vec<ZMember>, with_scores: bool) -> RespFrame {
    let mut items = Vec::with_capacity(if with_scores { members.len() * 2 } else { members.len() });
    for ZMember { member, score } in members {
        items.push(RespFrame::bulk_string(member));
        if with_scores {
            items.push(RespFrame::bulk_string(format_score(score)));
        }
    }
    RespFrame::array(items)
}

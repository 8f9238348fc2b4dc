use lazy_static::lazy_static;

use super::OptionRegistry;
use crate::error::CommandError;

lazy_static! {
    static ref ZRANGE_OPTIONS: OptionRegistry = {
        let mut reg = OptionRegistry::new();
        reg.register("BYSCORE", &["BYLEX"]);
        reg.register("BYLEX", &["BYSCORE"]);
        reg.register("REV", &[]);
        reg.register("WITHSCORES", &[]);
        reg.register("LIMIT", &[]);
        reg
    };
}

/// Which ordering the range arguments are interpreted against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeKind {
    Rank,
    Score,
    Lex,
}

/// LIMIT offset/count; a negative count means "no limit"
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limit {
    pub offset: i64,
    pub count: i64,
}

/// Option set for ZRANGE
#[derive(Debug, Clone)]
pub struct ZRangeOptions {
    flags: OptionRegistry,
    limit: Option<Limit>,
}

impl Default for ZRangeOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl ZRangeOptions {
    pub fn new() -> Self {
        ZRangeOptions {
            flags: ZRANGE_OPTIONS.clone(),
            limit: None,
        }
    }

    pub fn from_flags(flags: &[&str]) -> Result<Self, CommandError> {
        let mut opts = Self::new();
        for flag in flags {
            opts.activate(flag)?;
        }
        Ok(opts)
    }

    /// Activate an argument-less flag
    pub fn activate(&mut self, name: &str) -> Result<(), CommandError> {
        if name.eq_ignore_ascii_case("LIMIT") {
            return Err(CommandError::SyntaxError);
        }
        self.flags.activate(name)
    }

    /// Activate LIMIT with its offset and count
    pub fn activate_limit(&mut self, offset: i64, count: i64) -> Result<(), CommandError> {
        self.flags.activate("LIMIT")?;
        self.limit = Some(Limit { offset, count });
        Ok(())
    }

    pub fn kind(&self) -> RangeKind {
        if self.flags.is_set("BYSCORE") {
            RangeKind::Score
        } else if self.flags.is_set("BYLEX") {
            RangeKind::Lex
        } else {
            RangeKind::Rank
        }
    }

    pub fn is_rev(&self) -> bool {
        self.flags.is_set("REV")
    }

    pub fn with_scores(&self) -> bool {
        self.flags.is_set("WITHSCORES")
    }

    pub fn limit(&self) -> Option<Limit> {
        self.limit
    }
}

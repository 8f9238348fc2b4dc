use std::time::{Duration, SystemTime, UNIX_EPOCH};

use lazy_static::lazy_static;

use super::OptionRegistry;
use crate::error::CommandError;

lazy_static! {
    static ref SET_OPTIONS: OptionRegistry = {
        let mut reg = OptionRegistry::new();
        reg.register("NX", &["XX"]);
        reg.register("XX", &["NX"]);
        reg.register("GET", &[]);
        reg.register("EX", &["PX", "EXAT", "PXAT", "KEEPTTL"]);
        reg.register("PX", &["EX", "EXAT", "PXAT", "KEEPTTL"]);
        reg.register("EXAT", &["EX", "PX", "PXAT", "KEEPTTL"]);
        reg.register("PXAT", &["EX", "PX", "EXAT", "KEEPTTL"]);
        reg.register("KEEPTTL", &["EX", "PX", "EXAT", "PXAT"]);
        reg
    };
}

/// Options that carry a numeric argument
const TIMED: [&str; 4] = ["EX", "PX", "EXAT", "PXAT"];

/// Expiry requested by a SET
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expiry {
    /// Relative to the moment the write happens (EX, PX)
    After(Duration),
    /// Absolute wall-clock deadline (EXAT, PXAT)
    At(SystemTime),
    /// Leave whatever expiry the key already has (KEEPTTL)
    Keep,
}

/// Option set for SET: `NX | XX`, `GET`, and one of
/// `EX | PX | EXAT | PXAT | KEEPTTL`
#[derive(Debug, Clone)]
pub struct SetOptions {
    flags: OptionRegistry,
    expiry: Option<Expiry>,
}

impl Default for SetOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl SetOptions {
    /// Fresh option set with nothing active
    pub fn new() -> Self {
        SetOptions {
            flags: SET_OPTIONS.clone(),
            expiry: None,
        }
    }

    /// Build from a list of argument-less flags
    pub fn from_flags(flags: &[&str]) -> Result<Self, CommandError> {
        let mut opts = Self::new();
        for flag in flags {
            opts.activate(flag)?;
        }
        Ok(opts)
    }

    /// Activate an argument-less flag (`NX`, `XX`, `GET`, `KEEPTTL`)
    pub fn activate(&mut self, name: &str) -> Result<(), CommandError> {
        let upper = name.to_ascii_uppercase();
        if TIMED.contains(&upper.as_str()) {
            return Err(CommandError::SyntaxError);
        }
        self.flags.activate(&upper)?;
        if upper == "KEEPTTL" {
            self.expiry = Some(Expiry::Keep);
        }
        Ok(())
    }

    /// Activate a timed expiry option with its argument
    ///
    /// `EX` and `EXAT` take seconds, `PX` and `PXAT` milliseconds. The
    /// amount must be positive.
    pub fn activate_expiry(&mut self, name: &str, amount: i64) -> Result<(), CommandError> {
        let upper = name.to_ascii_uppercase();
        if amount <= 0 {
            return Err(CommandError::InvalidExpireTime("set".into()));
        }
        let amount = amount as u64;

        let expiry = match upper.as_str() {
            "EX" => Expiry::After(Duration::from_secs(amount)),
            "PX" => Expiry::After(Duration::from_millis(amount)),
            "EXAT" => Expiry::At(checked_epoch(Duration::from_secs(amount))?),
            "PXAT" => Expiry::At(checked_epoch(Duration::from_millis(amount))?),
            _ => return Err(CommandError::SyntaxError),
        };

        self.flags.activate(&upper)?;
        self.expiry = Some(expiry);
        Ok(())
    }

    pub fn is_nx(&self) -> bool {
        self.flags.is_set("NX")
    }

    pub fn is_xx(&self) -> bool {
        self.flags.is_set("XX")
    }

    pub fn is_get(&self) -> bool {
        self.flags.is_set("GET")
    }

    /// The requested expiry, if any
    pub fn expiry(&self) -> Option<Expiry> {
        self.expiry
    }
}

fn checked_epoch(offset: Duration) -> Result<SystemTime, CommandError> {
    UNIX_EPOCH
        .checked_add(offset)
        .ok_or_else(|| CommandError::InvalidExpireTime("set".into()))
}

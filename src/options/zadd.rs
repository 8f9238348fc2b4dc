use lazy_static::lazy_static;

use super::OptionRegistry;
use crate::error::CommandError;

lazy_static! {
    static ref ZADD_OPTIONS: OptionRegistry = {
        let mut reg = OptionRegistry::new();
        reg.register("NX", &["XX", "GT", "LT"]);
        reg.register("XX", &["NX"]);
        reg.register("GT", &["LT", "NX"]);
        reg.register("LT", &["GT", "NX"]);
        reg.register("CH", &[]);
        reg.register("INCR", &["NX", "XX", "GT", "LT"]);
        reg
    };
}

/// Option set for ZADD
///
/// `NX` excludes `XX`, `GT` and `LT`; `GT` excludes `LT`; `INCR` stands
/// alone apart from `CH`.
#[derive(Debug, Clone)]
pub struct ZAddOptions {
    flags: OptionRegistry,
}

impl Default for ZAddOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl ZAddOptions {
    pub fn new() -> Self {
        ZAddOptions {
            flags: ZADD_OPTIONS.clone(),
        }
    }

    pub fn from_flags(flags: &[&str]) -> Result<Self, CommandError> {
        let mut opts = Self::new();
        for flag in flags {
            opts.activate(flag)?;
        }
        Ok(opts)
    }

    pub fn activate(&mut self, name: &str) -> Result<(), CommandError> {
        self.flags.activate(name)
    }

    /// Whether `name` is a ZADD flag; used by the decoder to tell flags
    /// from the first score
    pub fn recognizes(name: &str) -> bool {
        ZADD_OPTIONS.is_registered(name)
    }

    pub fn is_nx(&self) -> bool {
        self.flags.is_set("NX")
    }

    pub fn is_xx(&self) -> bool {
        self.flags.is_set("XX")
    }

    pub fn is_gt(&self) -> bool {
        self.flags.is_set("GT")
    }

    pub fn is_lt(&self) -> bool {
        self.flags.is_set("LT")
    }

    pub fn is_ch(&self) -> bool {
        self.flags.is_set("CH")
    }

    pub fn is_incr(&self) -> bool {
        self.flags.is_set("INCR")
    }
}

use lazy_static::lazy_static;

use super::OptionRegistry;
use crate::error::CommandError;

lazy_static! {
    static ref EXPIRE_OPTIONS: OptionRegistry = {
        let mut reg = OptionRegistry::new();
        reg.register("NX", &["XX", "GT", "LT"]);
        reg.register("XX", &["NX", "GT", "LT"]);
        reg.register("GT", &["NX", "XX", "LT"]);
        reg.register("LT", &["NX", "XX", "GT"]);
        reg
    };
}

/// Option set for EXPIRE and PEXPIRE; the four guards exclude each other
#[derive(Debug, Clone)]
pub struct ExpireOptions {
    flags: OptionRegistry,
}

impl Default for ExpireOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl ExpireOptions {
    pub fn new() -> Self {
        ExpireOptions {
            flags: EXPIRE_OPTIONS.clone(),
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

    /// Only set an expiry on keys that have none
    pub fn is_nx(&self) -> bool {
        self.flags.is_set("NX")
    }

    /// Only replace an existing expiry
    pub fn is_xx(&self) -> bool {
        self.flags.is_set("XX")
    }

    /// Only extend the current expiry
    pub fn is_gt(&self) -> bool {
        self.flags.is_set("GT")
    }

    /// Only shorten the current expiry
    pub fn is_lt(&self) -> bool {
        self.flags.is_set("LT")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guards_are_pairwise_exclusive() {
        let names = ["NX", "XX", "GT", "LT"];
        for a in names {
            for b in names {
                let result = ExpireOptions::from_flags(&[a, b]);
                if a == b {
                    assert!(result.is_ok());
                } else {
                    assert!(result.is_err(), "{} with {} should conflict", a, b);
                }
            }
        }
    }

    #[test]
    fn test_unknown_flag() {
        assert_eq!(
            ExpireOptions::from_flags(&["KEEPTTL"]).unwrap_err(),
            CommandError::UnknownOption("KEEPTTL".into())
        );
    }
}

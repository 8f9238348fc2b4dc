//! Per-command option dialects
//!
//! Every command that takes modifier flags owns an [`OptionRegistry`]
//! seeded with the flags it understands and the flags each one excludes.
//! Seeded registries live in process-wide templates; each decoded command
//! works on its own clone, so nothing leaks between commands.

mod expire;
mod set;
mod zadd;
mod zrange;

pub use expire::ExpireOptions;
pub use set::{Expiry, SetOptions};
pub use zadd::ZAddOptions;
pub use zrange::{Limit, RangeKind, ZRangeOptions};

use crate::error::CommandError;

/// A registered option and the names it cannot be combined with
#[derive(Debug, Clone)]
struct OptionSpec {
    name: String,
    incompatible: Vec<String>,
}

/// Named boolean flags with mutual-exclusion rules
///
/// Names are case-insensitive. Two options conflict when either one lists
/// the other as incompatible, regardless of which was registered first or
/// which is activated first.
#[derive(Debug, Clone, Default)]
pub struct OptionRegistry {
    specs: Vec<OptionSpec>,
    /// Indices into `specs`, in activation order
    active: Vec<usize>,
}

impl OptionRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare an option. Registering the same name again replaces its
    /// incompatibility list.
    pub fn register(&mut self, name: &str, incompatible: &[&str]) {
        let spec = OptionSpec {
            name: name.to_ascii_uppercase(),
            incompatible: incompatible.iter().map(|n| n.to_ascii_uppercase()).collect(),
        };

        match self.position(&spec.name) {
            Some(idx) => self.specs[idx] = spec,
            None => self.specs.push(spec),
        }
    }

    /// Turn an option on
    ///
    /// Fails with `UnknownOption` for unregistered names and with
    /// `OptionConflict` when an already active option excludes it or is
    /// excluded by it. Activating an active option again is a no-op.
    pub fn activate(&mut self, name: &str) -> Result<(), CommandError> {
        let upper = name.to_ascii_uppercase();
        let idx = self
            .position(&upper)
            .ok_or_else(|| CommandError::UnknownOption(upper.clone()))?;

        if self.active.contains(&idx) {
            return Ok(());
        }

        let candidate = &self.specs[idx];
        for &other_idx in &self.active {
            let other = &self.specs[other_idx];
            if candidate.incompatible.contains(&other.name)
                || other.incompatible.contains(&candidate.name)
            {
                return Err(CommandError::OptionConflict {
                    option: candidate.name.clone(),
                    conflicts_with: other.name.clone(),
                });
            }
        }

        self.active.push(idx);
        Ok(())
    }

    /// Whether the option is currently active
    pub fn is_set(&self, name: &str) -> bool {
        let upper = name.to_ascii_uppercase();
        self.active.iter().any(|&idx| self.specs[idx].name == upper)
    }

    /// Whether the option is registered at all
    pub fn is_registered(&self, name: &str) -> bool {
        self.position(&name.to_ascii_uppercase()).is_some()
    }

    /// Deactivate every option, keeping registrations
    pub fn reset(&mut self) {
        self.active.clear();
    }

    /// Names of the active options, in activation order
    pub fn active(&self) -> Vec<&str> {
        self.active
            .iter()
            .map(|&idx| self.specs[idx].name.as_str())
            .collect()
    }

    fn position(&self, upper: &str) -> Option<usize> {
        self.specs.iter().position(|spec| spec.name == upper)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> OptionRegistry {
        let mut reg = OptionRegistry::new();
        reg.register("NX", &["XX"]);
        reg.register("XX", &[]);
        reg.register("CH", &[]);
        reg
    }

    #[test]
    fn test_activate_and_query() {
        let mut reg = registry();
        assert!(!reg.is_set("NX"));
        reg.activate("nx").unwrap();
        assert!(reg.is_set("NX"));
        assert!(reg.is_set("nx"));
        reg.activate("CH").unwrap();
        assert_eq!(reg.active(), vec!["NX", "CH"]);
    }

    #[test]
    fn test_unknown_option() {
        let mut reg = registry();
        assert_eq!(
            reg.activate("BOGUS"),
            Err(CommandError::UnknownOption("BOGUS".into()))
        );
    }

    #[test]
    fn test_conflict_is_symmetric() {
        // Only NX lists XX, yet the order of activation must not matter.
        let mut reg = registry();
        reg.activate("NX").unwrap();
        assert!(matches!(
            reg.activate("XX"),
            Err(CommandError::OptionConflict { .. })
        ));

        let mut reg = registry();
        reg.activate("XX").unwrap();
        let err = reg.activate("NX").unwrap_err();
        assert_eq!(
            err,
            CommandError::OptionConflict {
                option: "NX".into(),
                conflicts_with: "XX".into(),
            }
        );
        assert!(!reg.is_set("NX"));
    }

    #[test]
    fn test_reactivation_is_idempotent() {
        let mut reg = registry();
        reg.activate("NX").unwrap();
        reg.activate("NX").unwrap();
        assert_eq!(reg.active(), vec!["NX"]);
    }

    #[test]
    fn test_reset() {
        let mut reg = registry();
        reg.activate("XX").unwrap();
        reg.reset();
        assert!(reg.active().is_empty());
        assert!(reg.is_registered("XX"));
        reg.activate("NX").unwrap();
    }

    #[test]
    fn test_clones_are_independent() {
        let template = registry();
        let mut a = template.clone();
        let b = template.clone();
        a.activate("NX").unwrap();
        assert!(!b.is_set("NX"));
        assert!(!template.is_set("NX"));
    }
}

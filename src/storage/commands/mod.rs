//! Command handler modules
//!
//! This module organizes all command implementations by data type.

pub mod executor;
pub mod keys;
pub mod sorted_sets;
pub mod strings;

pub use executor::{format_score, Command, CommandExecutor, Reply, ServerCommand};
pub use keys::KeyCommand;
pub use sorted_sets::SortedSetCommand;
pub use strings::StringCommand;

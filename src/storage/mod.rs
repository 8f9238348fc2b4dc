//! Storage engine for Ferrokv
//!
//! This module provides the keyspace, its value types and the command
//! layer that drives them.

pub mod commands;
pub mod engine;
pub mod pattern;
pub mod skiplist;
pub mod sorted_set;
pub mod value;

pub use engine::{StorageEngine, ZAddReply};
pub use sorted_set::{RangeSpec, SortedSet, ZMember};
pub use value::{Value, ValueType};

/// Key type for storage
pub type Key = Vec<u8>;

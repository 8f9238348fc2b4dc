//! Value types for storage engine
//!
//! A key holds either a byte string or a sorted set. Nothing converts
//! between the two; asking one kind for the other's operation is a
//! `WrongType` error at the engine level.

use crate::storage::sorted_set::SortedSet;

/// All value kinds a key can hold
#[derive(Debug, Clone)]
pub enum Value {
    /// String value (bytes)
    String(Vec<u8>),

    /// Sorted set value backed by a skip list
    SortedSet(SortedSet),
}

/// Value type enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    String,
    SortedSet,
}

impl ValueType {
    /// Name reported by the TYPE command
    pub fn name(self) -> &'static str {
        match self {
            ValueType::String => "string",
            ValueType::SortedSet => "zset",
        }
    }
}

impl Value {
    /// Get the type of this value
    pub fn value_type(&self) -> ValueType {
        match self {
            Value::String(_) => ValueType::String,
            Value::SortedSet(_) => ValueType::SortedSet,
        }
    }

    /// Create a string value from bytes
    pub fn string<T: Into<Vec<u8>>>(data: T) -> Self {
        Value::String(data.into())
    }

    /// Get string bytes if this is a string value
    pub fn as_string(&self) -> Option<&[u8]> {
        match self {
            Value::String(bytes) => Some(bytes),
            _ => None,
        }
    }

    /// Get the sorted set if this is one
    pub fn as_sorted_set(&self) -> Option<&SortedSet> {
        match self {
            Value::SortedSet(set) => Some(set),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_types() {
        let s = Value::string("hello");
        assert_eq!(s.value_type(), ValueType::String);
        assert_eq!(s.as_string(), Some(&b"hello"[..]));
        assert!(s.as_sorted_set().is_none());

        let z = Value::SortedSet(SortedSet::new());
        assert_eq!(z.value_type().name(), "zset");
        assert!(z.as_string().is_none());
    }
}

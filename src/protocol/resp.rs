//! RESP data types and frame definitions
//!
//! Only the RESP2 frame kinds are spoken.

/// RESP protocol frame types
#[derive(Debug, Clone, PartialEq)]
pub enum RespFrame {
    /// Simple string: +OK\r\n
    SimpleString(Vec<u8>),

    /// Error: -Error message\r\n
    Error(Vec<u8>),

    /// Integer: :1000\r\n
    Integer(i64),

    /// Bulk string: $6\r\nfoobar\r\n or $-1\r\n (null)
    BulkString(Option<Vec<u8>>),

    /// Array: *2\r\n$3\r\nfoo\r\n$3\r\nbar\r\n or *-1\r\n (null)
    Array(Option<Vec<RespFrame>>),
}

impl RespFrame {
    /// Create an OK response
    pub fn ok() -> Self {
        RespFrame::SimpleString(b"OK".to_vec())
    }

    /// Create a simple string response
    pub fn simple_string(s: impl Into<Vec<u8>>) -> Self {
        RespFrame::SimpleString(s.into())
    }

    /// Check if this frame is an error
    pub fn is_error(&self) -> bool {
        matches!(self, RespFrame::Error(_))
    }

    /// Create an error response
    pub fn error(msg: impl Into<Vec<u8>>) -> Self {
        RespFrame::Error(msg.into())
    }

    /// Create a null bulk string
    pub fn null_bulk() -> Self {
        RespFrame::BulkString(None)
    }

    /// Create a bulk string from bytes
    pub fn bulk_string(bytes: impl Into<Vec<u8>>) -> Self {
        RespFrame::BulkString(Some(bytes.into()))
    }

    /// Bulk string when present, null bulk otherwise
    pub fn optional_bulk(bytes: Option<Vec<u8>>) -> Self {
        RespFrame::BulkString(bytes)
    }

    /// Create an array of frames
    pub fn array(frames: Vec<RespFrame>) -> Self {
        RespFrame::Array(Some(frames))
    }

    /// Create an integer response from any count
    pub fn count(n: usize) -> Self {
        RespFrame::Integer(i64::try_from(n).unwrap_or(i64::MAX))
    }

    /// Check if this frame represents a null/nil value
    pub fn is_null(&self) -> bool {
        matches!(self, RespFrame::BulkString(None) | RespFrame::Array(None))
    }
}

impl From<i64> for RespFrame {
    fn from(n: i64) -> Self {
        RespFrame::Integer(n)
    }
}

impl From<Vec<RespFrame>> for RespFrame {
    fn from(frames: Vec<RespFrame>) -> Self {
        RespFrame::array(frames)
    }
}

//! RESP (REdis Serialization Protocol) implementation
//!
//! This module provides parsing and serialization for RESP2 frames.

pub mod parser;
pub mod resp;
pub mod serializer;

pub use parser::RespParser;
pub use resp::RespFrame;
pub use serializer::{serialize_resp_frame, serialize_to_vec};

use crate::error::{FerrokvError, Result};

/// Extract raw bytes from a RESP frame
pub fn extract_bytes(frame: &RespFrame) -> Result<Vec<u8>> {
    match frame {
        RespFrame::SimpleString(data) => Ok(data.clone()),
        RespFrame::BulkString(Some(data)) => Ok(data.clone()),
        _ => Err(FerrokvError::Protocol("expected bulk string".into())),
    }
}

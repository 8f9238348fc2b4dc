//! RESP protocol serializer implementation
//!
//! Serializes RESP frames to byte buffers for network transmission.

use std::io::Write;

use super::resp::RespFrame;
use crate::error::Result;

/// Serialize a RESP frame to a writer
pub fn serialize_resp_frame<W: Write>(frame: &RespFrame, writer: &mut W) -> Result<()> {
    match frame {
        RespFrame::SimpleString(bytes) => {
            writer.write_all(b"+")?;
            writer.write_all(bytes)?;
            writer.write_all(b"\r\n")?;
        }

        RespFrame::Error(bytes) => {
            writer.write_all(b"-")?;
            writer.write_all(bytes)?;
            writer.write_all(b"\r\n")?;
        }

        RespFrame::Integer(n) => {
            write!(writer, ":{}\r\n", n)?;
        }

        RespFrame::BulkString(Some(bytes)) => {
            write!(writer, "${}\r\n", bytes.len())?;
            writer.write_all(bytes)?;
            writer.write_all(b"\r\n")?;
        }

        RespFrame::BulkString(None) => {
            writer.write_all(b"$-1\r\n")?;
        }

        RespFrame::Array(Some(frames)) => {
            write!(writer, "*{}\r\n", frames.len())?;
            for frame in frames {
                serialize_resp_frame(frame, writer)?;
            }
        }

        RespFrame::Array(None) => {
            writer.write_all(b"*-1\r\n")?;
        }
    }

    Ok(())
}

/// Serialize a RESP frame to a byte vector
pub fn serialize_to_vec(frame: &RespFrame) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    serialize_resp_frame(frame, &mut buf)?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialize_scalars() {
        assert_eq!(serialize_to_vec(&RespFrame::ok()).unwrap(), b"+OK\r\n");
        assert_eq!(serialize_to_vec(&RespFrame::error("ERR x")).unwrap(), b"-ERR x\r\n");
        assert_eq!(serialize_to_vec(&RespFrame::Integer(-2)).unwrap(), b":-2\r\n");
        assert_eq!(serialize_to_vec(&RespFrame::null_bulk()).unwrap(), b"$-1\r\n");
        assert_eq!(serialize_to_vec(&RespFrame::bulk_string("hi")).unwrap(), b"$2\r\nhi\r\n");
    }

    #[test]
    fn test_serialize_nested_array() {
        let frame = RespFrame::array(vec![
            RespFrame::bulk_string("a"),
            RespFrame::Integer(1),
            RespFrame::array(vec![]),
        ]);
        assert_eq!(
            serialize_to_vec(&frame).unwrap(),
            b"*3\r\n$1\r\na\r\n:1\r\n*0\r\n"
        );
        assert_eq!(serialize_to_vec(&RespFrame::Array(None)).unwrap(), b"*-1\r\n");
    }
}

//! RESP protocol parser implementation
//!
//! Incremental parsing of RESP2 frames. Bytes are fed as they arrive from
//! the socket and complete frames are handed out one at a time. Lines that
//! do not start with a RESP type byte are read as inline commands
//! (space-separated words), which is what `telnet` users send.

use super::resp::RespFrame;
use crate::error::{FerrokvError, Result};

/// Largest accepted bulk string payload
pub const MAX_BULK_LEN: usize = 512 * 1024 * 1024;

/// Largest accepted number of array elements
pub const MAX_ARRAY_LEN: usize = 1024 * 1024;

/// Longest accepted inline command line
pub const MAX_INLINE_LEN: usize = 64 * 1024;

/// Parser state for incremental RESP parsing
#[derive(Debug, Default)]
pub struct RespParser {
    buffer: Vec<u8>,
    position: usize,
}

impl RespParser {
    /// Create a new parser
    pub fn new() -> Self {
        RespParser {
            buffer: Vec::with_capacity(4096),
            position: 0,
        }
    }

    /// Feed data into the parser
    pub fn feed(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Try to parse a complete frame from the buffer
    ///
    /// `Ok(None)` means more input is needed. A protocol error leaves the
    /// parser in an unusable state; the connection should be closed.
    pub fn parse(&mut self) -> Result<Option<RespFrame>> {
        loop {
            let pending = &self.buffer[self.position..];
            if pending.is_empty() {
                return Ok(None);
            }

            let parsed = match pending[0] {
                b'+' | b'-' | b':' | b'$' | b'*' => parse_frame(pending)?,
                _ => parse_inline(pending)?,
            };

            match parsed {
                Some((frame, consumed)) => {
                    self.position += consumed;
                    // If we've consumed more than half the buffer, compact it
                    if self.position > self.buffer.len() / 2 {
                        self.buffer.drain(..self.position);
                        self.position = 0;
                    }
                    // Blank inline lines carry no command
                    if frame == RespFrame::Array(Some(Vec::new())) {
                        continue;
                    }
                    return Ok(Some(frame));
                }
                None => return Ok(None),
            }
        }
    }
}

/// Parse a RESP frame from a byte slice
///
/// Returns `Some((frame, bytes_consumed))` if a complete frame is found.
pub fn parse_frame(data: &[u8]) -> Result<Option<(RespFrame, usize)>> {
    if data.is_empty() {
        return Ok(None);
    }

    match data[0] {
        b'+' => Ok(parse_line(data, 1)?
            .map(|(line, consumed)| (RespFrame::SimpleString(line.to_vec()), consumed))),
        b'-' => Ok(parse_line(data, 1)?
            .map(|(line, consumed)| (RespFrame::Error(line.to_vec()), consumed))),
        b':' => parse_integer(data),
        b'$' => parse_bulk_string(data),
        b'*' => parse_array(data),
        other => Err(FerrokvError::Protocol(format!(
            "invalid RESP type byte: {}",
            other as char
        ))),
    }
}

/// Parse an integer: :1000\r\n
fn parse_integer(data: &[u8]) -> Result<Option<(RespFrame, usize)>> {
    match parse_line(data, 1)? {
        Some((line, consumed)) => Ok(Some((RespFrame::Integer(parse_number(line)?), consumed))),
        None => Ok(None),
    }
}

/// Parse a bulk string: $6\r\nfoobar\r\n or $-1\r\n (null)
fn parse_bulk_string(data: &[u8]) -> Result<Option<(RespFrame, usize)>> {
    let (len_line, header_consumed) = match parse_line(data, 1)? {
        Some(v) => v,
        None => return Ok(None),
    };

    let len = parse_number(len_line)?;
    if len == -1 {
        return Ok(Some((RespFrame::BulkString(None), header_consumed)));
    }
    if len < 0 || len as u64 > MAX_BULK_LEN as u64 {
        return Err(FerrokvError::Protocol("invalid bulk length".into()));
    }

    let len = len as usize;
    let total_needed = header_consumed + len + 2; // +2 for \r\n
    if data.len() < total_needed {
        return Ok(None); // Need more data
    }

    if &data[header_consumed + len..total_needed] != b"\r\n" {
        return Err(FerrokvError::Protocol("missing CRLF after bulk string".into()));
    }

    let content = data[header_consumed..header_consumed + len].to_vec();
    Ok(Some((RespFrame::BulkString(Some(content)), total_needed)))
}

/// Parse an array: *2\r\n$3\r\nfoo\r\n$3\r\nbar\r\n
fn parse_array(data: &[u8]) -> Result<Option<(RespFrame, usize)>> {
    let (len_line, header_consumed) = match parse_line(data, 1)? {
        Some(v) => v,
        None => return Ok(None),
    };

    let len = parse_number(len_line)?;
    if len == -1 {
        return Ok(Some((RespFrame::Array(None), header_consumed)));
    }
    if len < 0 || len as u64 > MAX_ARRAY_LEN as u64 {
        return Err(FerrokvError::Protocol("invalid multibulk length".into()));
    }

    let len = len as usize;
    let mut elements = Vec::with_capacity(len.min(1024));
    let mut total_consumed = header_consumed;

    for _ in 0..len {
        match parse_frame(&data[total_consumed..])? {
            Some((frame, consumed)) => {
                elements.push(frame);
                total_consumed += consumed;
            }
            None => return Ok(None), // Need more data
        }
    }

    Ok(Some((RespFrame::Array(Some(elements)), total_consumed)))
}

/// Parse an inline command line into an array of bulk strings
fn parse_inline(data: &[u8]) -> Result<Option<(RespFrame, usize)>> {
    let newline = match data.iter().position(|&b| b == b'\n') {
        Some(pos) => pos,
        None if data.len() > MAX_INLINE_LEN => {
            return Err(FerrokvError::Protocol("too big inline request".into()))
        }
        None => return Ok(None),
    };

    let line = &data[..newline];
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    let words = line
        .split(|b| b.is_ascii_whitespace())
        .filter(|word| !word.is_empty())
        .map(|word| RespFrame::BulkString(Some(word.to_vec())))
        .collect();

    Ok(Some((RespFrame::Array(Some(words)), newline + 1)))
}

/// Parse a CRLF-terminated line starting at `start`
fn parse_line(data: &[u8], start: usize) -> Result<Option<(&[u8], usize)>> {
    let rest = &data[start..];
    match rest.windows(2).position(|w| w == b"\r\n") {
        Some(pos) => Ok(Some((&rest[..pos], start + pos + 2))),
        None if rest.len() > MAX_INLINE_LEN => {
            Err(FerrokvError::Protocol("line too long".into()))
        }
        None => Ok(None),
    }
}

fn parse_number(line: &[u8]) -> Result<i64> {
    std::str::from_utf8(line)
        .ok()
        .and_then(|s| s.parse::<i64>().ok())
        .ok_or_else(|| FerrokvError::Protocol("invalid number".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bulk(s: &str) -> RespFrame {
        RespFrame::BulkString(Some(s.as_bytes().to_vec()))
    }

    #[test]
    fn test_parse_simple_frames() {
        let (frame, used) = parse_frame(b"+OK\r\n").unwrap().unwrap();
        assert_eq!(frame, RespFrame::SimpleString(b"OK".to_vec()));
        assert_eq!(used, 5);

        let (frame, _) = parse_frame(b"-ERR bad\r\n").unwrap().unwrap();
        assert_eq!(frame, RespFrame::Error(b"ERR bad".to_vec()));

        let (frame, _) = parse_frame(b":-42\r\n").unwrap().unwrap();
        assert_eq!(frame, RespFrame::Integer(-42));

        let (frame, _) = parse_frame(b"$-1\r\n").unwrap().unwrap();
        assert_eq!(frame, RespFrame::BulkString(None));
    }

    #[test]
    fn test_parse_command_array() {
        let input = b"*3\r\n$3\r\nSET\r\n$3\r\nkey\r\n$5\r\nvalue\r\n";
        let (frame, used) = parse_frame(input).unwrap().unwrap();
        assert_eq!(used, input.len());
        assert_eq!(frame, RespFrame::array(vec![bulk("SET"), bulk("key"), bulk("value")]));
    }

    #[test]
    fn test_binary_safe_bulk() {
        let (frame, _) = parse_frame(b"$4\r\na\r\nb\r\n").unwrap().unwrap();
        assert_eq!(frame, RespFrame::BulkString(Some(b"a\r\nb".to_vec())));
    }

    #[test]
    fn test_incremental_feed() {
        let mut parser = RespParser::new();
        parser.feed(b"*2\r\n$4\r\nECHO\r\n$5\r\nhel");
        assert_eq!(parser.parse().unwrap(), None);
        parser.feed(b"lo\r\n*1\r\n$4\r\nPING\r\n");
        assert_eq!(
            parser.parse().unwrap(),
            Some(RespFrame::array(vec![bulk("ECHO"), bulk("hello")]))
        );
        assert_eq!(parser.parse().unwrap(), Some(RespFrame::array(vec![bulk("PING")])));
        assert_eq!(parser.parse().unwrap(), None);
        assert_eq!(parser.buffer.len(), parser.position);
    }

    #[test]
    fn test_inline_commands() {
        let mut parser = RespParser::new();
        parser.feed(b"\r\nSET  foo bar\r\nPING\n");
        assert_eq!(
            parser.parse().unwrap(),
            Some(RespFrame::array(vec![bulk("SET"), bulk("foo"), bulk("bar")]))
        );
        assert_eq!(parser.parse().unwrap(), Some(RespFrame::array(vec![bulk("PING")])));
    }

    #[test]
    fn test_protocol_errors() {
        assert!(parse_frame(b"$abc\r\n").is_err());
        assert!(parse_frame(b"$3\r\nabcXY").is_err());
        assert!(parse_frame(b"*-5\r\n").is_err());
        assert!(parse_frame(b"$-2\r\n").is_err());
        assert!(parse_frame(b"?x\r\n").is_err());
    }

    #[test]
    fn test_oversized_lengths_rejected() {
        let huge = format!("${}\r\n", MAX_BULK_LEN + 1);
        assert!(parse_frame(huge.as_bytes()).is_err());
        let huge = format!("*{}\r\n", MAX_ARRAY_LEN + 1);
        assert!(parse_frame(huge.as_bytes()).is_err());
    }
}

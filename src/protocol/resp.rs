//! RESP2 parser and encoder

use super::types::{RespError, RespValue};
use bytes::{BufMut, Bytes, BytesMut};

const CRLF: &[u8] = b"\r\n";

/// Deepest array nesting accepted in one frame
const MAX_DEPTH: usize = 32;

/// RESP2 Parser
pub struct RespParser;

impl RespParser {
    /// Parse one value from the front of `buf`
    ///
    /// Returns `Ok(None)` and leaves `buf` untouched when the frame is not
    /// complete yet. On success the frame is consumed from `buf`.
    pub fn parse(buf: &mut BytesMut) -> Result<Option<RespValue>, RespError> {
        match Self::decode(buf, 0, 0)? {
            Some((value, consumed)) => {
                let _ = buf.split_to(consumed);
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    /// Decode the value starting at `pos` without consuming anything.
    /// Returns the value and the offset one past its last byte.
    /// `depth` counts the arrays enclosing `pos`.
    fn decode(
        buf: &[u8],
        pos: usize,
        depth: usize,
    ) -> Result<Option<(RespValue, usize)>, RespError> {
        let Some((line, next)) = Self::line_at(buf, pos) else {
            return Ok(None);
        };
        if line.is_empty() {
            return Err(RespError::InvalidProtocol("empty line".to_string()));
        }

        let body = &line[1..];
        match line[0] {
            b'+' => Ok(Some((RespValue::SimpleString(Self::text(body)?), next))),
            b'-' => Ok(Some((RespValue::Error(Self::text(body)?), next))),
            b':' => Ok(Some((RespValue::Integer(Self::number(body)?), next))),
            b'$' => {
                let len = Self::number(body)?;
                if len == -1 {
                    return Ok(Some((RespValue::Null, next)));
                }
                let len = usize::try_from(len).map_err(|_| {
                    RespError::InvalidProtocol(format!("invalid bulk length: {}", len))
                })?;
                let end = next + len;
                if buf.len() < end + CRLF.len() {
                    return Ok(None);
                }
                if &buf[end..end + CRLF.len()] != CRLF {
                    return Err(RespError::InvalidProtocol(
                        "missing CRLF after bulk data".to_string(),
                    ));
                }
                let data = Bytes::copy_from_slice(&buf[next..end]);
                Ok(Some((RespValue::BulkString(data), end + CRLF.len())))
            }
            b'*' => {
                if depth >= MAX_DEPTH {
                    return Err(RespError::InvalidProtocol("nesting too deep".to_string()));
                }
                let count = Self::number(body)?;
                if count == -1 {
                    return Ok(Some((RespValue::Null, next)));
                }
                let count = usize::try_from(count).map_err(|_| {
                    RespError::InvalidProtocol(format!("invalid array count: {}", count))
                })?;
                let mut elements = Vec::with_capacity(count.min(1024));
                let mut cursor = next;
                for _ in 0..count {
                    match Self::decode(buf, cursor, depth + 1)? {
                        Some((value, after)) => {
                            elements.push(value);
                            cursor = after;
                        }
                        None => return Ok(None),
                    }
                }
                Ok(Some((RespValue::Array(elements), cursor)))
            }
            other => Err(RespError::InvalidProtocol(format!(
                "unknown type prefix: {}",
                other as char
            ))),
        }
    }

    /// The line starting at `pos` (without CRLF) and the offset after its CRLF
    fn line_at(buf: &[u8], pos: usize) -> Option<(&[u8], usize)> {
        let rest = buf.get(pos..)?;
        let end = rest.windows(CRLF.len()).position(|w| w == CRLF)?;
        Some((&rest[..end], pos + end + CRLF.len()))
    }

    fn text(body: &[u8]) -> Result<String, RespError> {
        String::from_utf8(body.to_vec()).map_err(|_| RespError::InvalidUtf8)
    }

    fn number(body: &[u8]) -> Result<i64, RespError> {
        std::str::from_utf8(body)
            .map_err(|_| RespError::InvalidUtf8)?
            .parse::<i64>()
            .map_err(|_| RespError::InvalidInteger)
    }
}

/// RESP2 Encoder
pub struct RespEncoder;

impl RespEncoder {
    pub fn encode(value: &RespValue) -> Bytes {
        let mut buf = BytesMut::new();
        Self::encode_to(&mut buf, value);
        buf.freeze()
    }

    /// Encode into an existing buffer. Arrays write their element count
    /// before any element.
    pub fn encode_to(buf: &mut BytesMut, value: &RespValue) {
        match value {
            RespValue::SimpleString(s) => Self::line(buf, b'+', s.as_bytes()),
            RespValue::Error(e) => Self::line(buf, b'-', e.as_bytes()),
            RespValue::Integer(i) => Self::line(buf, b':', i.to_string().as_bytes()),
            RespValue::BulkString(bytes) => {
                Self::line(buf, b'$', bytes.len().to_string().as_bytes());
                buf.put_slice(bytes);
                buf.put_slice(CRLF);
            }
            RespValue::Null => buf.put_slice(b"$-1\r\n"),
            RespValue::Array(arr) => {
                Self::line(buf, b'*', arr.len().to_string().as_bytes());
                for elem in arr {
                    Self::encode_to(buf, elem);
                }
            }
        }
    }

    fn line(buf: &mut BytesMut, prefix: u8, body: &[u8]) {
        buf.put_u8(prefix);
        buf.put_slice(body);
        buf.put_slice(CRLF);
    }
}

//! RESP2 value types
//!
//! Requests arrive as arrays of bulk strings; replies are any of the variants.
//! Array replies carry their element count up front, which is what lets the
//! encoder declare the size before streaming the elements.

use bytes::Bytes;
use std::fmt;

/// RESP2 value
#[derive(Debug, Clone, PartialEq)]
pub enum RespValue {
    /// `+OK\r\n`
    SimpleString(String),

    /// `-ERR message\r\n`
    Error(String),

    /// `:1000\r\n`
    Integer(i64),

    /// `$6\r\nfoobar\r\n`
    BulkString(Bytes),

    /// `$-1\r\n`
    Null,

    /// `*2\r\n...`
    Array(Vec<RespValue>),
}

impl RespValue {
    pub fn simple_string(s: impl Into<String>) -> Self {
        RespValue::SimpleString(s.into())
    }

    /// The `+OK` status reply
    pub fn ok() -> Self {
        RespValue::SimpleString("OK".to_string())
    }

    pub fn error(s: impl Into<String>) -> Self {
        RespValue::Error(s.into())
    }

    pub fn integer(i: i64) -> Self {
        RespValue::Integer(i)
    }

    pub fn bulk_string(b: impl Into<Bytes>) -> Self {
        RespValue::BulkString(b.into())
    }

    /// Bulk string when present, null otherwise
    pub fn optional_bulk(b: Option<Bytes>) -> Self {
        b.map_or(RespValue::Null, RespValue::BulkString)
    }

    pub fn null() -> Self {
        RespValue::Null
    }

    pub fn array(v: Vec<RespValue>) -> Self {
        RespValue::Array(v)
    }

    pub fn as_array(&self) -> Option<&Vec<RespValue>> {
        match self {
            RespValue::Array(arr) => Some(arr),
            _ => None,
        }
    }

    pub fn as_bulk_string(&self) -> Option<&Bytes> {
        match self {
            RespValue::BulkString(bytes) => Some(bytes),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            RespValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, RespValue::Error(_))
    }
}

impl fmt::Display for RespValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RespValue::SimpleString(s) => write!(f, "SimpleString({})", s),
            RespValue::Error(e) => write!(f, "Error({})", e),
            RespValue::Integer(i) => write!(f, "Integer({})", i),
            RespValue::BulkString(b) => write!(f, "BulkString({} bytes)", b.len()),
            RespValue::Null => write!(f, "Null"),
            RespValue::Array(arr) => write!(f, "Array({} elements)", arr.len()),
        }
    }
}

/// RESP parsing errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RespError {
    /// Malformed frame
    #[error("invalid protocol: {0}")]
    InvalidProtocol(String),

    /// Non UTF-8 text where text is required
    #[error("invalid UTF-8")]
    InvalidUtf8,

    /// A length or integer line did not parse
    #[error("invalid integer")]
    InvalidInteger,
}

//! Error taxonomy for hash commands
//!
//! Every variant is terminal for the command that raised it. The `Display`
//! text is exactly the error line sent back to the client.

use crate::protocol::RespValue;

/// Errors raised by the hash command handlers and the key table
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HashError {
    /// Malformed argument shape (odd pair count, bad cursor, bad float state)
    #[error("ERR {0}")]
    Param(String),

    /// The key holds a value that is not a hash
    #[error("WRONGTYPE Operation against a key holding the wrong kind of value")]
    WrongType,

    /// The key is absent and the command requires it
    #[error("ERR no such key")]
    NotExist,

    /// Stored or supplied value is not a valid integer, or the result overflowed
    #[error("ERR value is not an integer or out of range")]
    NotANumber,
}

impl HashError {
    /// Build a parameter error with the given detail
    pub fn param(detail: impl Into<String>) -> Self {
        HashError::Param(detail.into())
    }

    /// Parameter error for a wrong argument count
    pub fn arity(command: &str) -> Self {
        HashError::Param(format!("wrong number of arguments for '{}' command", command))
    }
}

impl From<HashError> for RespValue {
    fn from(err: HashError) -> Self {
        RespValue::error(err.to_string())
    }
}

/// Result alias used by command handlers
pub type HashResult<T> = Result<T, HashError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_lines() {
        assert_eq!(
            RespValue::from(HashError::WrongType),
            RespValue::error("WRONGTYPE Operation against a key holding the wrong kind of value")
        );
        assert_eq!(RespValue::from(HashError::NotExist), RespValue::error("ERR no such key"));
        assert_eq!(
            RespValue::from(HashError::arity("HMSET")),
            RespValue::error("ERR wrong number of arguments for 'HMSET' command")
        );
    }
}

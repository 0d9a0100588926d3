//! Typed containers a key can hold

use super::backend::HashObject;
use bytes::Bytes;

/// Value held by a key. One type per key.
#[derive(Debug, Clone)]
pub enum Value {
    /// String value (binary-safe)
    String(Bytes),

    /// Hash (field -> value), backed by a storage engine
    Hash(HashObject),
}

impl Value {
    pub fn string(bytes: impl Into<Bytes>) -> Self {
        Value::String(bytes.into())
    }

    /// Name reported by TYPE
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::String(_) => "string",
            Value::Hash(_) => "hash",
        }
    }

    pub fn as_string(&self) -> Option<&Bytes> {
        match self {
            Value::String(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_hash(&self) -> Option<&HashObject> {
        match self {
            Value::Hash(hash) => Some(hash),
            _ => None,
        }
    }
}

//! In-memory storage
//!
//! The key table, the typed values it holds, and the storage engines behind
//! the hash type. Independent of protocol and command handling.

pub mod backend;
mod keyspace;
mod router;
pub mod scan;
mod value;

pub use backend::{BackendKind, FieldRef, FieldTable, HashObject, Scope, StorageBackend};
pub use keyspace::{Keyspace, KeyspaceStats};
pub use router::ShardRouter;
pub use scan::Page;
pub use value::Value;

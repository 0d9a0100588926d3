//! hashkv - an in-memory key-value server built around the hash type
//!
//! A hash is a per-key map of field -> value, stored by one of two engines
//! chosen at startup, and enumerable in bounded pages with HSCAN.
//! - `store`: key table, storage engines, cursor scan
//! - `commands`: one handler per command
//! - `dispatch` / `server`: request routing and the RESP listener

pub mod commands;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod protocol;
pub mod server;
pub mod store;

/// Re-export commonly used types
pub use commands::{Command, CommandContext};
pub use config::Config;
pub use dispatch::Dispatcher;
pub use error::{HashError, HashResult};
pub use protocol::{RespError, RespValue};
pub use store::{BackendKind, Keyspace};

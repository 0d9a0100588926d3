//! RESP2 protocol implementation
//!
//! Parsing of request frames and encoding of replies. Independent from the
//! store and command modules.

mod resp;
mod types;

pub use resp::{RespEncoder, RespParser};
pub use types::{RespError, RespValue};

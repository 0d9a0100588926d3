//! Command execution module
//!
//! Every command implements [`Command`]. Handlers run synchronously to
//! completion against the shared [`CommandContext`]; none of them yields.

mod context;
mod registry;

mod admin;
mod hash;
mod hash_counter;
mod hash_scan;
mod key;
mod string;

pub use context::{CommandContext, CommandSettings};
pub use registry::CommandRegistry;

use crate::error::{HashError, HashResult};
use crate::protocol::RespValue;
use bytes::Bytes;

/// Command execution trait
pub trait Command: Send + Sync {
    /// Execute with the arguments following the command name
    fn execute(&self, ctx: &CommandContext, args: &[RespValue]) -> RespValue;

    /// Command name, upper case
    fn name(&self) -> &'static str;

    fn min_args(&self) -> usize {
        0
    }

    /// `None` means unlimited
    fn max_args(&self) -> Option<usize> {
        None
    }
}

/// Argument `index` as a bulk string
pub(crate) fn bulk_arg(args: &[RespValue], index: usize) -> HashResult<&Bytes> {
    args.get(index)
        .and_then(RespValue::as_bulk_string)
        .ok_or_else(|| HashError::param("expected bulk string"))
}

/// Turn a handler result into the reply
pub(crate) fn reply(result: HashResult<RespValue>) -> RespValue {
    result.unwrap_or_else(RespValue::from)
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::store::BackendKind;

    /// One fresh context per engine
    pub fn contexts() -> Vec<CommandContext> {
        vec![
            CommandContext::with_backend(BackendKind::Exclusive),
            CommandContext::with_backend(BackendKind::Concurrent { segments: 8 }),
        ]
    }

    pub fn run(cmd: &dyn Command, ctx: &CommandContext, args: &[&str]) -> RespValue {
        let args: Vec<RespValue> = args.iter().map(|a| RespValue::bulk_string(a.to_string())).collect();
        cmd.execute(ctx, &args)
    }

    pub fn bulk(s: &str) -> RespValue {
        RespValue::bulk_string(s.to_string())
    }
}

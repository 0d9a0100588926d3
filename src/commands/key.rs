//! Key commands (DEL, EXISTS, TYPE)

use super::{bulk_arg, reply, Command, CommandContext};
use crate::error::HashResult;
use crate::protocol::RespValue;

/// DEL command - Delete one or more keys
///
/// Syntax: DEL key [key ...]
///
/// Deleting a hash key destroys the hash and every field in it.
pub struct DelCommand;

impl Command for DelCommand {
    fn execute(&self, ctx: &CommandContext, args: &[RespValue]) -> RespValue {
        reply(count_keys(args, |key| ctx.keyspace.delete(key)))
    }

    fn name(&self) -> &'static str {
        "DEL"
    }

    fn min_args(&self) -> usize {
        1
    }
}

/// EXISTS command - Check if one or more keys exist
///
/// Syntax: EXISTS key [key ...]
pub struct ExistsCommand;

impl Command for ExistsCommand {
    fn execute(&self, ctx: &CommandContext, args: &[RespValue]) -> RespValue {
        reply(count_keys(args, |key| ctx.keyspace.exists(key)))
    }

    fn name(&self) -> &'static str {
        "EXISTS"
    }

    fn min_args(&self) -> usize {
        1
    }
}

fn count_keys(args: &[RespValue], mut hit: impl FnMut(&[u8]) -> bool) -> HashResult<RespValue> {
    let mut count = 0;
    for index in 0..args.len() {
        if hit(bulk_arg(args, index)?) {
            count += 1;
        }
    }
    Ok(RespValue::integer(count))
}

/// TYPE command - Type of the value stored at a key
///
/// Syntax: TYPE key
pub struct TypeCommand;

impl Command for TypeCommand {
    fn execute(&self, ctx: &CommandContext, args: &[RespValue]) -> RespValue {
        reply(bulk_arg(args, 0).map(|key| RespValue::simple_string(ctx.keyspace.type_of(key))))
    }

    fn name(&self) -> &'static str {
        "TYPE"
    }

    fn min_args(&self) -> usize {
        1
    }

    fn max_args(&self) -> Option<usize> {
        Some(1)
    }
}

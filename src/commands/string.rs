//! String commands (SET, GET)

use super::{bulk_arg, reply, Command, CommandContext};
use crate::error::{HashError, HashResult};
use crate::protocol::RespValue;
use crate::store::Value;

/// SET command - Set a key to a value
///
/// Syntax: SET key value
///
/// Replaces whatever the key held, hashes included.
pub struct SetCommand;

impl Command for SetCommand {
    fn execute(&self, ctx: &CommandContext, args: &[RespValue]) -> RespValue {
        reply(set(ctx, args))
    }

    fn name(&self) -> &'static str {
        "SET"
    }

    fn min_args(&self) -> usize {
        2
    }

    fn max_args(&self) -> Option<usize> {
        Some(2)
    }
}

fn set(ctx: &CommandContext, args: &[RespValue]) -> HashResult<RespValue> {
    let key = bulk_arg(args, 0)?.clone();
    let value = bulk_arg(args, 1)?.clone();
    ctx.keyspace.set(key, Value::String(value));
    Ok(RespValue::ok())
}

/// GET command - Get the value of a key
///
/// Syntax: GET key
pub struct GetCommand;

impl Command for GetCommand {
    fn execute(&self, ctx: &CommandContext, args: &[RespValue]) -> RespValue {
        reply(get(ctx, args))
    }

    fn name(&self) -> &'static str {
        "GET"
    }

    fn min_args(&self) -> usize {
        1
    }

    fn max_args(&self) -> Option<usize> {
        Some(1)
    }
}

fn get(ctx: &CommandContext, args: &[RespValue]) -> HashResult<RespValue> {
    match ctx.keyspace.get(bulk_arg(args, 0)?) {
        Some(Value::String(value)) => Ok(RespValue::BulkString(value)),
        Some(_) => Err(HashError::WrongType),
        None => Ok(RespValue::Null),
    }
}

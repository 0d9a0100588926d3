//! Hash commands (HSET, HMSET, HGET, HMGET, HGETALL, HKEYS, HVALS, HDEL,
//! HEXISTS, HLEN, HSETNX, HSTRLEN)
//!
//! Write commands create the hash on first use. Read commands fail with
//! `ERR no such key` on a missing key, except HSTRLEN which answers 0.

use super::{bulk_arg, reply, Command, CommandContext};
use crate::error::{HashError, HashResult};
use crate::protocol::RespValue;
use crate::store::Scope;
use bytes::Bytes;

/// HSET command - Set one field of a hash
///
/// Syntax: HSET key field value
///
/// Always replies 1, whether the field was created or overwritten.
pub struct HSetCommand;

impl Command for HSetCommand {
    fn execute(&self, ctx: &CommandContext, args: &[RespValue]) -> RespValue {
        reply(hset(ctx, args))
    }

    fn name(&self) -> &'static str {
        "HSET"
    }

    fn min_args(&self) -> usize {
        3
    }

    fn max_args(&self) -> Option<usize> {
        Some(3)
    }
}

fn hset(ctx: &CommandContext, args: &[RespValue]) -> HashResult<RespValue> {
    let key = bulk_arg(args, 0)?;
    let field = bulk_arg(args, 1)?.clone();
    let value = bulk_arg(args, 2)?.clone();

    let hash = ctx.keyspace.get_or_create_hash(key)?;
    hash.open(Scope::Field).upsert(field, value);
    Ok(RespValue::integer(1))
}

/// HMSET command - Set several fields at once
///
/// Syntax: HMSET key field value [field value ...]
///
/// The whole batch becomes visible at once to concurrent readers.
pub struct HMSetCommand;

impl Command for HMSetCommand {
    fn execute(&self, ctx: &CommandContext, args: &[RespValue]) -> RespValue {
        reply(hmset(ctx, args))
    }

    fn name(&self) -> &'static str {
        "HMSET"
    }

    fn min_args(&self) -> usize {
        3
    }
}

fn hmset(ctx: &CommandContext, args: &[RespValue]) -> HashResult<RespValue> {
    if args.len() < 3 || (args.len() - 1) % 2 != 0 {
        return Err(HashError::arity("HMSET"));
    }
    let key = bulk_arg(args, 0)?;
    let pairs = args[1..]
        .chunks_exact(2)
        .map(|pair| -> HashResult<(Bytes, Bytes)> {
            Ok((bulk_arg(pair, 0)?.clone(), bulk_arg(pair, 1)?.clone()))
        })
        .collect::<HashResult<Vec<_>>>()?;

    let hash = ctx.keyspace.get_or_create_hash(key)?;
    let mut table = hash.open(Scope::Batch);
    for (field, value) in pairs {
        table.upsert(field, value);
    }
    Ok(RespValue::ok())
}

/// HGET command - Get the value of a hash field
///
/// Syntax: HGET key field
pub struct HGetCommand;

impl Command for HGetCommand {
    fn execute(&self, ctx: &CommandContext, args: &[RespValue]) -> RespValue {
        reply(hget(ctx, args))
    }

    fn name(&self) -> &'static str {
        "HGET"
    }

    fn min_args(&self) -> usize {
        2
    }

    fn max_args(&self) -> Option<usize> {
        Some(2)
    }
}

fn hget(ctx: &CommandContext, args: &[RespValue]) -> HashResult<RespValue> {
    let key = bulk_arg(args, 0)?;
    let field = bulk_arg(args, 1)?;

    let hash = ctx.keyspace.get_hash(key)?;
    let table = hash.open(Scope::Field);
    let value = table.lookup(field).map(|v| Bytes::clone(&v));
    Ok(RespValue::optional_bulk(value))
}

/// HMGET command - Get several fields, in request order
///
/// Syntax: HMGET key field [field ...]
pub struct HMGetCommand;

impl Command for HMGetCommand {
    fn execute(&self, ctx: &CommandContext, args: &[RespValue]) -> RespValue {
        reply(hmget(ctx, args))
    }

    fn name(&self) -> &'static str {
        "HMGET"
    }

    fn min_args(&self) -> usize {
        2
    }
}

fn hmget(ctx: &CommandContext, args: &[RespValue]) -> HashResult<RespValue> {
    let key = bulk_arg(args, 0)?;
    let hash = ctx.keyspace.get_hash(key)?;
    let table = hash.open(Scope::Field);

    let mut values = Vec::with_capacity(args.len() - 1);
    for index in 1..args.len() {
        let field = bulk_arg(args, index)?;
        values.push(RespValue::optional_bulk(table.lookup(field).map(|v| Bytes::clone(&v))));
    }
    Ok(RespValue::array(values))
}

/// HGETALL command - Get all fields and values
///
/// Syntax: HGETALL key
pub struct HGetAllCommand;

impl Command for HGetAllCommand {
    fn execute(&self, ctx: &CommandContext, args: &[RespValue]) -> RespValue {
        reply(hgetall(ctx, args))
    }

    fn name(&self) -> &'static str {
        "HGETALL"
    }

    fn min_args(&self) -> usize {
        1
    }

    fn max_args(&self) -> Option<usize> {
        Some(1)
    }
}

fn hgetall(ctx: &CommandContext, args: &[RespValue]) -> HashResult<RespValue> {
    let hash = ctx.keyspace.get_hash(bulk_arg(args, 0)?)?;
    let entries = hash.open(Scope::Read).entries();

    let mut result = Vec::with_capacity(2 * entries.len());
    for (field, value) in entries {
        result.push(RespValue::BulkString(field));
        result.push(RespValue::BulkString(value));
    }
    Ok(RespValue::array(result))
}

/// HKEYS command - Get all field names
///
/// Syntax: HKEYS key
pub struct HKeysCommand;

impl Command for HKeysCommand {
    fn execute(&self, ctx: &CommandContext, args: &[RespValue]) -> RespValue {
        reply(project(ctx, args, |(field, _)| field))
    }

    fn name(&self) -> &'static str {
        "HKEYS"
    }

    fn min_args(&self) -> usize {
        1
    }

    fn max_args(&self) -> Option<usize> {
        Some(1)
    }
}

/// HVALS command - Get all values
///
/// Syntax: HVALS key
pub struct HValsCommand;

impl Command for HValsCommand {
    fn execute(&self, ctx: &CommandContext, args: &[RespValue]) -> RespValue {
        reply(project(ctx, args, |(_, value)| value))
    }

    fn name(&self) -> &'static str {
        "HVALS"
    }

    fn min_args(&self) -> usize {
        1
    }

    fn max_args(&self) -> Option<usize> {
        Some(1)
    }
}

fn project(
    ctx: &CommandContext,
    args: &[RespValue],
    pick: fn((Bytes, Bytes)) -> Bytes,
) -> HashResult<RespValue> {
    let hash = ctx.keyspace.get_hash(bulk_arg(args, 0)?)?;
    let entries = hash.open(Scope::Read).entries();
    Ok(RespValue::array(
        entries.into_iter().map(|entry| RespValue::BulkString(pick(entry))).collect(),
    ))
}

/// HDEL command - Delete one or more fields
///
/// Syntax: HDEL key field [field ...]
///
/// Replies with the number of fields actually removed. The hash is kept
/// even when it ends up empty.
pub struct HDelCommand;

impl Command for HDelCommand {
    fn execute(&self, ctx: &CommandContext, args: &[RespValue]) -> RespValue {
        reply(hdel(ctx, args))
    }

    fn name(&self) -> &'static str {
        "HDEL"
    }

    fn min_args(&self) -> usize {
        2
    }
}

fn hdel(ctx: &CommandContext, args: &[RespValue]) -> HashResult<RespValue> {
    let key = bulk_arg(args, 0)?;
    let fields = (1..args.len())
        .map(|index| bulk_arg(args, index))
        .collect::<HashResult<Vec<_>>>()?;

    let hash = ctx.keyspace.get_hash(key)?;
    let mut table = hash.open(Scope::Field);
    let deleted = fields.into_iter().filter(|field| table.remove(field)).count();
    Ok(RespValue::integer(deleted as i64))
}

/// HEXISTS command - Check whether a field exists
///
/// Syntax: HEXISTS key field
pub struct HExistsCommand;

impl Command for HExistsCommand {
    fn execute(&self, ctx: &CommandContext, args: &[RespValue]) -> RespValue {
        reply(hexists(ctx, args))
    }

    fn name(&self) -> &'static str {
        "HEXISTS"
    }

    fn min_args(&self) -> usize {
        2
    }

    fn max_args(&self) -> Option<usize> {
        Some(2)
    }
}

fn hexists(ctx: &CommandContext, args: &[RespValue]) -> HashResult<RespValue> {
    let hash = ctx.keyspace.get_hash(bulk_arg(args, 0)?)?;
    let field = bulk_arg(args, 1)?;
    let found = hash.open(Scope::Field).lookup(field).is_some();
    Ok(RespValue::integer(found as i64))
}

/// HLEN command - Number of fields in a hash
///
/// Syntax: HLEN key
pub struct HLenCommand;

impl Command for HLenCommand {
    fn execute(&self, ctx: &CommandContext, args: &[RespValue]) -> RespValue {
        reply(hlen(ctx, args))
    }

    fn name(&self) -> &'static str {
        "HLEN"
    }

    fn min_args(&self) -> usize {
        1
    }

    fn max_args(&self) -> Option<usize> {
        Some(1)
    }
}

fn hlen(ctx: &CommandContext, args: &[RespValue]) -> HashResult<RespValue> {
    let hash = ctx.keyspace.get_hash(bulk_arg(args, 0)?)?;
    let len = hash.open(Scope::Field).len();
    Ok(RespValue::integer(len as i64))
}

/// HSETNX command - Set a field only if it does not exist
///
/// Syntax: HSETNX key field value
pub struct HSetNxCommand;

impl Command for HSetNxCommand {
    fn execute(&self, ctx: &CommandContext, args: &[RespValue]) -> RespValue {
        reply(hsetnx(ctx, args))
    }

    fn name(&self) -> &'static str {
        "HSETNX"
    }

    fn min_args(&self) -> usize {
        3
    }

    fn max_args(&self) -> Option<usize> {
        Some(3)
    }
}

fn hsetnx(ctx: &CommandContext, args: &[RespValue]) -> HashResult<RespValue> {
    let key = bulk_arg(args, 0)?;
    let field = bulk_arg(args, 1)?.clone();
    let value = bulk_arg(args, 2)?.clone();

    let hash = ctx.keyspace.get_or_create_hash(key)?;
    let inserted = hash.open(Scope::Field).upsert_if_absent(field, value);
    Ok(RespValue::integer(inserted as i64))
}

/// HSTRLEN command - Length of a field's value
///
/// Syntax: HSTRLEN key field
///
/// A missing key or field answers 0 rather than an error.
pub struct HStrLenCommand;

impl Command for HStrLenCommand {
    fn execute(&self, ctx: &CommandContext, args: &[RespValue]) -> RespValue {
        reply(hstrlen(ctx, args))
    }

    fn name(&self) -> &'static str {
        "HSTRLEN"
    }

    fn min_args(&self) -> usize {
        2
    }

    fn max_args(&self) -> Option<usize> {
        Some(2)
    }
}

fn hstrlen(ctx: &CommandContext, args: &[RespValue]) -> HashResult<RespValue> {
    let key = bulk_arg(args, 0)?;
    let field = bulk_arg(args, 1)?;

    let hash = match ctx.keyspace.get_hash(key) {
        Ok(hash) => hash,
        Err(HashError::NotExist) => return Ok(RespValue::integer(0)),
        Err(e) => return Err(e),
    };
    let len = hash.open(Scope::Field).lookup(field).map_or(0, |v| v.len());
    Ok(RespValue::integer(len as i64))
}

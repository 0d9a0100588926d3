//! HSCAN command

use super::{bulk_arg, reply, Command, CommandContext};
use crate::error::{HashError, HashResult};
use crate::protocol::RespValue;
use crate::store::Scope;

const DEFAULT_COUNT: usize = 10;

/// HSCAN command - Incrementally iterate the fields of a hash
///
/// Syntax: HSCAN key cursor [MATCH pattern] [COUNT count]
///
/// Start with cursor 0 and pass back the returned cursor until it is 0
/// again. MATCH filters each page after it is read, so a page can be empty
/// while the cycle is still running.
///
/// Supported patterns:
/// - * : matches all fields
/// - prefix* : matches fields starting with prefix
/// - *suffix : matches fields ending with suffix
/// - *pattern* : matches fields containing pattern
pub struct HScanCommand;

impl Command for HScanCommand {
    fn execute(&self, ctx: &CommandContext, args: &[RespValue]) -> RespValue {
        reply(hscan(ctx, args))
    }

    fn name(&self) -> &'static str {
        "HSCAN"
    }

    fn min_args(&self) -> usize {
        2
    }

    fn max_args(&self) -> Option<usize> {
        Some(6)
    }
}

#[derive(Debug, PartialEq)]
struct ScanOptions<'a> {
    cursor: u64,
    pattern: Option<&'a str>,
    count: usize,
}

fn parse_options(args: &[RespValue]) -> HashResult<ScanOptions<'_>> {
    let cursor = std::str::from_utf8(bulk_arg(args, 1)?)
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| HashError::param("invalid cursor"))?;

    let mut options = ScanOptions {
        cursor,
        pattern: None,
        count: DEFAULT_COUNT,
    };
    let mut index = 2;
    while index < args.len() {
        let option = bulk_arg(args, index)?;
        let value = std::str::from_utf8(bulk_arg(args, index + 1).map_err(|_| syntax_error())?)
            .map_err(|_| syntax_error())?;
        if option.eq_ignore_ascii_case(b"MATCH") {
            options.pattern = Some(value);
        } else if option.eq_ignore_ascii_case(b"COUNT") {
            options.count = value
                .parse()
                .ok()
                .filter(|count| *count >= 1)
                .ok_or_else(syntax_error)?;
        } else {
            return Err(syntax_error());
        }
        index += 2;
    }
    Ok(options)
}

fn syntax_error() -> HashError {
    HashError::param("syntax error")
}

fn hscan(ctx: &CommandContext, args: &[RespValue]) -> HashResult<RespValue> {
    let options = parse_options(args)?;
    let hash = ctx.keyspace.get_hash(bulk_arg(args, 0)?)?;
    let page = hash.open(Scope::Read).iterate_from(options.cursor, options.count);

    let mut items = Vec::with_capacity(2 * page.entries.len());
    for (field, value) in page.entries {
        if options.pattern.map_or(true, |p| matches_pattern(&field, p)) {
            items.push(RespValue::BulkString(field));
            items.push(RespValue::BulkString(value));
        }
    }
    Ok(RespValue::array(vec![
        RespValue::bulk_string(page.next.to_string()),
        RespValue::array(items),
    ]))
}

/// Check if a field matches a glob pattern
fn matches_pattern(field: &[u8], pattern: &str) -> bool {
    let field = match std::str::from_utf8(field) {
        Ok(s) => s,
        Err(_) => return false,
    };

    if pattern == "*" {
        return true;
    }

    match (pattern.strip_prefix('*'), pattern.strip_suffix('*')) {
        (Some(rest), Some(_)) => field.contains(rest.strip_suffix('*').unwrap_or(rest)),
        (Some(suffix), None) => field.ends_with(suffix),
        (None, Some(prefix)) => field.starts_with(prefix),
        (None, None) => field == pattern,
    }
}

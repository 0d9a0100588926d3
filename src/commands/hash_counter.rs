//! Hash counter commands (HINCRBY, HINCRBYFLOAT)
//!
//! The stored value is parsed strictly. The delta is either parsed strictly
//! or, by default, read like C `atoi`/`atof`: the longest numeric prefix,
//! 0 when there is none. See [`CommandSettings::strict_increment_delta`].
//!
//! [`CommandSettings::strict_increment_delta`]: super::CommandSettings::strict_increment_delta

use super::{bulk_arg, reply, Command, CommandContext};
use crate::error::{HashError, HashResult};
use crate::protocol::RespValue;
use crate::store::Scope;
use bytes::Bytes;

/// HINCRBY command - Increment the integer value of a hash field
///
/// Syntax: HINCRBY key field increment
///
/// A missing field counts as 0. A stored value that is not a base-10
/// integer, or a result that overflows, fails with NotANumber and leaves
/// the field untouched.
pub struct HIncrByCommand;

impl Command for HIncrByCommand {
    fn execute(&self, ctx: &CommandContext, args: &[RespValue]) -> RespValue {
        reply(hincrby(ctx, args))
    }

    fn name(&self) -> &'static str {
        "HINCRBY"
    }

    fn min_args(&self) -> usize {
        3
    }

    fn max_args(&self) -> Option<usize> {
        Some(3)
    }
}

fn hincrby(ctx: &CommandContext, args: &[RespValue]) -> HashResult<RespValue> {
    let key = bulk_arg(args, 0)?;
    let field = bulk_arg(args, 1)?.clone();
    let delta = bulk_arg(args, 2)?;
    let delta = if ctx.settings.strict_increment_delta {
        parse_integer(delta).ok_or(HashError::NotANumber)?
    } else {
        integer_prefix(delta)
    };

    let hash = ctx.keyspace.get_or_create_hash(key)?;
    let mut result = 0;
    hash.open(Scope::Field).update(field, &mut |current| {
        let base = match current {
            Some(value) => parse_integer(value).ok_or(HashError::NotANumber)?,
            None => 0,
        };
        result = base.checked_add(delta).ok_or(HashError::NotANumber)?;
        Ok(Bytes::from(result.to_string()))
    })?;
    Ok(RespValue::integer(result))
}

/// HINCRBYFLOAT command - Increment the float value of a hash field
///
/// Syntax: HINCRBYFLOAT key field increment
///
/// The new value is stored and returned in fixed notation with six
/// decimals.
pub struct HIncrByFloatCommand;

impl Command for HIncrByFloatCommand {
    fn execute(&self, ctx: &CommandContext, args: &[RespValue]) -> RespValue {
        reply(hincrbyfloat(ctx, args))
    }

    fn name(&self) -> &'static str {
        "HINCRBYFLOAT"
    }

    fn min_args(&self) -> usize {
        3
    }

    fn max_args(&self) -> Option<usize> {
        Some(3)
    }
}

fn hincrbyfloat(ctx: &CommandContext, args: &[RespValue]) -> HashResult<RespValue> {
    let key = bulk_arg(args, 0)?;
    let field = bulk_arg(args, 1)?.clone();
    let delta = bulk_arg(args, 2)?;
    let delta = if ctx.settings.strict_increment_delta {
        parse_float(delta).ok_or(HashError::NotANumber)?
    } else {
        float_prefix(delta)
    };

    let hash = ctx.keyspace.get_or_create_hash(key)?;
    let stored = hash.open(Scope::Field).update(field, &mut |current| {
        let base = match current {
            Some(value) => parse_float(value).ok_or_else(|| HashError::param("hash value is not a float"))?,
            None => 0.0,
        };
        let sum = base + delta;
        if !sum.is_finite() {
            return Err(HashError::param("increment would produce NaN or Infinity"));
        }
        Ok(Bytes::from(format!("{:.6}", sum)))
    })?;
    Ok(RespValue::BulkString(stored))
}

fn parse_integer(bytes: &[u8]) -> Option<i64> {
    std::str::from_utf8(bytes).ok()?.parse().ok()
}

fn parse_float(bytes: &[u8]) -> Option<f64> {
    std::str::from_utf8(bytes).ok()?.parse().ok()
}

/// Leading `[whitespace][sign]digits`, 0 when absent. Saturates on overflow.
fn integer_prefix(bytes: &[u8]) -> i64 {
    let start = bytes
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(bytes.len());
    let mut rest = &bytes[start..];
    let negative = match rest.first() {
        Some(b'-') => {
            rest = &rest[1..];
            true
        }
        Some(b'+') => {
            rest = &rest[1..];
            false
        }
        _ => false,
    };

    let mut value: i64 = 0;
    for digit in rest.iter().take_while(|b| b.is_ascii_digit()) {
        let digit = i64::from(digit - b'0');
        let next = value
            .checked_mul(10)
            .and_then(|v| if negative { v.checked_sub(digit) } else { v.checked_add(digit) });
        match next {
            Some(v) => value = v,
            None => return if negative { i64::MIN } else { i64::MAX },
        }
    }
    value
}

/// Longest leading text that reads as a float, 0 when there is none
///
/// One forward pass over `[ws][sign](digits[.digits] | .digits)[e[sign]digits]`
/// or `[ws][sign]inf|infinity|nan`, then a single parse of that slice.
fn float_prefix(bytes: &[u8]) -> f64 {
    let start = bytes
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(bytes.len());
    let digits = |from: usize| bytes[from..].iter().take_while(|b| b.is_ascii_digit()).count();

    let mut end = start;
    if matches!(bytes.get(end), Some(b'+' | b'-')) {
        end += 1;
    }

    let rest = &bytes[end..];
    let special = [&b"infinity"[..], &b"inf"[..], &b"nan"[..]]
        .into_iter()
        .find(|word| rest.len() >= word.len() && rest[..word.len()].eq_ignore_ascii_case(word));
    if let Some(word) = special {
        end += word.len();
    } else {
        let whole = digits(end);
        end += whole;
        let mut fraction = 0;
        if bytes.get(end) == Some(&b'.') {
            fraction = digits(end + 1);
            if fraction > 0 {
                end += 1 + fraction;
            }
        }
        if whole + fraction == 0 {
            return 0.0;
        }
        if matches!(bytes.get(end), Some(b'e' | b'E')) {
            let sign = usize::from(matches!(bytes.get(end + 1), Some(b'+' | b'-')));
            let exponent = digits(end + 1 + sign);
            if exponent > 0 {
                end += 1 + sign + exponent;
            }
        }
    }

    std::str::from_utf8(&bytes[start..end])
        .ok()
        .and_then(|text| text.parse().ok())
        .unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::hash::{HGetCommand, HSetCommand};
    use crate::commands::testing::{bulk, contexts, run};
    use crate::commands::CommandSettings;
    use crate::store::{BackendKind, Value};
    use std::sync::Arc;

    fn strict_contexts() -> Vec<CommandContext> {
        contexts()
            .into_iter()
            .map(|ctx| {
                CommandContext::new(
                    ctx.keyspace,
                    CommandSettings {
                        strict_increment_delta: true,
                    },
                )
            })
            .collect()
    }

    #[test]
    fn test_integer_prefix() {
        assert_eq!(integer_prefix(b"42"), 42);
        assert_eq!(integer_prefix(b"  -7xyz"), -7);
        assert_eq!(integer_prefix(b"+3"), 3);
        assert_eq!(integer_prefix(b"abc"), 0);
        assert_eq!(integer_prefix(b""), 0);
        assert_eq!(integer_prefix(b"99999999999999999999"), i64::MAX);
        assert_eq!(integer_prefix(b"-99999999999999999999"), i64::MIN);
    }

    #[test]
    fn test_float_prefix() {
        assert_eq!(float_prefix(b"1.5"), 1.5);
        assert_eq!(float_prefix(b" 2.5kg"), 2.5);
        assert_eq!(float_prefix(b"1e3"), 1000.0);
        assert_eq!(float_prefix(b"1e"), 1.0);
        assert_eq!(float_prefix(b"x"), 0.0);
        assert_eq!(float_prefix(b"3.5e+x"), 3.5);
        assert_eq!(float_prefix(b"-.25e2z"), -25.0);
        assert_eq!(float_prefix(b"7.kg"), 7.0);
        assert_eq!(float_prefix(b"."), 0.0);
        assert_eq!(float_prefix(b"-"), 0.0);
        assert_eq!(float_prefix(b"\t-Inf"), f64::NEG_INFINITY);
        assert!(float_prefix(b"nanny").is_nan());
    }

    #[test]
    fn test_float_prefix_long_tail() {
        let mut delta = "1".repeat(300).into_bytes();
        delta.extend(std::iter::repeat(b'x').take(200_000));
        let value = float_prefix(&delta);
        assert!(value.is_finite());
        assert!(value > 1e299);

        let mut delta = b"2.5".to_vec();
        delta.extend(std::iter::repeat(b'9').take(200_000));
        delta.extend(std::iter::repeat(b'e').take(200_000));
        assert!((float_prefix(&delta) - 2.6).abs() < 1e-9);
    }

    #[test]
    fn test_hincrby_missing_field_starts_at_zero() {
        for ctx in contexts() {
            assert_eq!(run(&HIncrByCommand, &ctx, &["h", "n", "5"]), RespValue::integer(5));
            assert_eq!(run(&HIncrByCommand, &ctx, &["h", "n", "-8"]), RespValue::integer(-3));
            assert_eq!(run(&HGetCommand, &ctx, &["h", "n"]), bulk("-3"));
        }
    }

    #[test]
    fn test_hincrby_non_integer_leaves_field() {
        for ctx in contexts() {
            run(&HSetCommand, &ctx, &["h", "f", "abc"]);
            assert_eq!(
                run(&HIncrByCommand, &ctx, &["h", "f", "1"]),
                RespValue::error("ERR value is not an integer or out of range")
            );
            assert_eq!(run(&HGetCommand, &ctx, &["h", "f"]), bulk("abc"));

            run(&HSetCommand, &ctx, &["h", "g", "1.5"]);
            assert!(run(&HIncrByCommand, &ctx, &["h", "g", "1"]).is_error());
            assert_eq!(run(&HGetCommand, &ctx, &["h", "g"]), bulk("1.5"));
        }
    }

    #[test]
    fn test_hincrby_overflow() {
        for ctx in contexts() {
            run(&HSetCommand, &ctx, &["h", "f", i64::MAX.to_string().as_str()]);
            assert_eq!(
                run(&HIncrByCommand, &ctx, &["h", "f", "1"]),
                RespValue::from(HashError::NotANumber)
            );
            assert_eq!(run(&HGetCommand, &ctx, &["h", "f"]), bulk(&i64::MAX.to_string()));
        }
    }

    #[test]
    fn test_lenient_delta() {
        for ctx in contexts() {
            run(&HSetCommand, &ctx, &["h", "f", "10"]);
            assert_eq!(run(&HIncrByCommand, &ctx, &["h", "f", "abc"]), RespValue::integer(10));
            assert_eq!(run(&HIncrByCommand, &ctx, &["h", "f", "3apples"]), RespValue::integer(13));
            assert_eq!(run(&HIncrByFloatCommand, &ctx, &["h", "x", "junk"]), bulk("0.000000"));
        }
    }

    #[test]
    fn test_strict_delta() {
        for ctx in strict_contexts() {
            run(&HSetCommand, &ctx, &["h", "f", "10"]);
            let nan = RespValue::from(HashError::NotANumber);
            assert_eq!(run(&HIncrByCommand, &ctx, &["h", "f", "abc"]), nan);
            assert_eq!(run(&HIncrByCommand, &ctx, &["h", "f", "3apples"]), nan);
            assert_eq!(run(&HIncrByFloatCommand, &ctx, &["h", "f", "junk"]), nan);
            assert_eq!(run(&HGetCommand, &ctx, &["h", "f"]), bulk("10"));
            assert_eq!(run(&HIncrByCommand, &ctx, &["h", "f", "-4"]), RespValue::integer(6));

            // A rejected delta never creates the key.
            assert_eq!(run(&HIncrByCommand, &ctx, &["other", "f", "x"]), nan);
            assert!(!ctx.keyspace.exists(b"other"));
        }
    }

    #[test]
    fn test_hincrbyfloat() {
        for ctx in contexts() {
            assert_eq!(run(&HIncrByFloatCommand, &ctx, &["h", "f", "1.5"]), bulk("1.500000"));
            assert_eq!(run(&HIncrByFloatCommand, &ctx, &["h", "f", "2.25"]), bulk("3.750000"));
            assert_eq!(run(&HGetCommand, &ctx, &["h", "f"]), bulk("3.750000"));

            run(&HSetCommand, &ctx, &["h", "i", "7"]);
            assert_eq!(run(&HIncrByFloatCommand, &ctx, &["h", "i", "-0.5"]), bulk("6.500000"));
        }
    }

    #[test]
    fn test_hincrbyfloat_non_numeric_is_param_error() {
        for ctx in contexts() {
            run(&HSetCommand, &ctx, &["h", "f", "hello"]);
            assert_eq!(
                run(&HIncrByFloatCommand, &ctx, &["h", "f", "1"]),
                RespValue::error("ERR hash value is not a float")
            );
            assert_eq!(run(&HGetCommand, &ctx, &["h", "f"]), bulk("hello"));
        }
    }

    #[test]
    fn test_wrong_type() {
        for ctx in contexts() {
            ctx.keyspace.set(Bytes::from("s"), Value::string("1"));
            let wrong_type = RespValue::from(HashError::WrongType);
            assert_eq!(run(&HIncrByCommand, &ctx, &["s", "f", "1"]), wrong_type);
            assert_eq!(run(&HIncrByFloatCommand, &ctx, &["s", "f", "1"]), wrong_type);
        }
    }

    #[test]
    fn test_parallel_increments_are_not_lost() {
        let ctx = Arc::new(CommandContext::with_backend(BackendKind::Concurrent { segments: 4 }));
        std::thread::scope(|s| {
            for _ in 0..8 {
                let ctx = ctx.clone();
                s.spawn(move || {
                    for _ in 0..250 {
                        run(&HIncrByCommand, &ctx, &["h", "n", "1"]);
                    }
                });
            }
        });
        assert_eq!(run(&HGetCommand, &ctx, &["h", "n"]), bulk("2000"));
    }
}

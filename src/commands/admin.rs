//! Admin commands (PING, INFO, FLUSHDB)

use super::{Command, CommandContext};
use crate::protocol::RespValue;

/// PING command - Test the connection
///
/// Syntax: PING [message]
pub struct PingCommand;

impl Command for PingCommand {
    fn execute(&self, _ctx: &CommandContext, args: &[RespValue]) -> RespValue {
        match args.first() {
            Some(RespValue::BulkString(message)) => RespValue::BulkString(message.clone()),
            Some(_) => RespValue::error("ERR expected bulk string"),
            None => RespValue::simple_string("PONG"),
        }
    }

    fn name(&self) -> &'static str {
        "PING"
    }

    fn max_args(&self) -> Option<usize> {
        Some(1)
    }
}

/// INFO command - Get information and statistics about the server
///
/// Syntax: INFO [section]
pub struct InfoCommand;

impl Command for InfoCommand {
    fn execute(&self, ctx: &CommandContext, _args: &[RespValue]) -> RespValue {
        let stats = ctx.keyspace.stats();

        let info = format!(
            "# Server\r\n\
            hashkv_version:{}\r\n\
            os:{}\r\n\
            arch:{}\r\n\
            \r\n\
            # Storage\r\n\
            hash_backend:{}\r\n\
            keyspace_shards:{}\r\n\
            strict_increment_delta:{}\r\n\
            \r\n\
            # Keyspace\r\n\
            db0:keys={},hashes={},hash_fields={}\r\n",
            env!("CARGO_PKG_VERSION"),
            std::env::consts::OS,
            std::env::consts::ARCH,
            ctx.keyspace.backend().name(),
            stats.shards,
            ctx.settings.strict_increment_delta as u8,
            stats.keys,
            stats.hashes,
            stats.hash_fields
        );

        RespValue::bulk_string(info)
    }

    fn name(&self) -> &'static str {
        "INFO"
    }

    fn max_args(&self) -> Option<usize> {
        Some(1)
    }
}

/// FLUSHDB command - Remove all keys
///
/// Syntax: FLUSHDB
pub struct FlushDbCommand;

impl Command for FlushDbCommand {
    fn execute(&self, ctx: &CommandContext, _args: &[RespValue]) -> RespValue {
        ctx.keyspace.clear();
        RespValue::ok()
    }

    fn name(&self) -> &'static str {
        "FLUSHDB"
    }

    fn max_args(&self) -> Option<usize> {
        Some(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::hash::HMSetCommand;
    use crate::commands::testing::{bulk, contexts, run};
    use crate::store::BackendKind;

    #[test]
    fn test_ping() {
        let ctx = CommandContext::default();
        assert_eq!(run(&PingCommand, &ctx, &[]), RespValue::simple_string("PONG"));
        assert_eq!(run(&PingCommand, &ctx, &["hello"]), bulk("hello"));
    }

    #[test]
    fn test_info() {
        let ctx = CommandContext::with_backend(BackendKind::Exclusive);
        run(&HMSetCommand, &ctx, &["h", "a", "1", "b", "2"]);

        let result = run(&InfoCommand, &ctx, &[]);
        let info = String::from_utf8(result.as_bulk_string().unwrap().to_vec()).unwrap();
        assert!(info.contains("hash_backend:exclusive"));
        assert!(info.contains("db0:keys=1,hashes=1,hash_fields=2"));
    }

    #[test]
    fn test_flushdb() {
        for ctx in contexts() {
            run(&HMSetCommand, &ctx, &["h", "a", "1"]);
            assert_eq!(run(&FlushDbCommand, &ctx, &[]), RespValue::ok());
            assert!(ctx.keyspace.is_empty());
        }
    }
}

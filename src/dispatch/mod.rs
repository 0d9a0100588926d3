//! Command dispatcher
//!
//! Routes incoming commands to the appropriate handler.
//! This module provides loose coupling between the server and command implementations.

use crate::commands::{CommandContext, CommandRegistry};
use crate::error::HashError;
use crate::protocol::RespValue;
use base64::{engine::general_purpose, Engine as _};
use tracing::{debug, warn};

/// Command dispatcher
///
/// Receives RESP commands, validates them, and routes to appropriate handlers.
/// Shared by every connection; dispatch only needs `&self`.
pub struct Dispatcher {
    /// Command registry
    registry: CommandRegistry,

    /// Command execution context
    context: CommandContext,
}

impl Dispatcher {
    /// Create a dispatcher over an existing context
    pub fn new(context: CommandContext) -> Self {
        Dispatcher {
            registry: CommandRegistry::new(),
            context,
        }
    }

    /// Dispatch a command
    ///
    /// Takes a RESP value (expected to be an array), extracts the command name
    /// and arguments, then routes to the appropriate handler.
    pub fn dispatch(&self, value: RespValue) -> RespValue {
        // Commands should be arrays
        let args = match value.as_array() {
            Some(arr) if !arr.is_empty() => arr,
            Some(_) => {
                return RespValue::error("ERR empty command array");
            }
            None => {
                return RespValue::error("ERR expected array");
            }
        };

        // First element is the command name
        let cmd_name = match args[0].as_bulk_string() {
            Some(name) => match std::str::from_utf8(name) {
                Ok(s) => s,
                Err(_) => {
                    warn!(name = %general_purpose::STANDARD.encode(name), "undecodable command name");
                    return RespValue::error("ERR invalid command name encoding");
                }
            },
            None => {
                return RespValue::error("ERR command name must be a bulk string");
            }
        };

        // Extract arguments (everything after the command name)
        let cmd_args = &args[1..];
        debug!(command = cmd_name, args = cmd_args.len(), "dispatching");

        // Look up the command
        let command = match self.registry.get(cmd_name) {
            Some(cmd) => cmd,
            None => {
                warn!("Unknown command: {}", cmd_name);
                return RespValue::error(format!("ERR unknown command '{}'", cmd_name));
            }
        };

        // Validate argument count
        let too_many = command.max_args().map_or(false, |max| cmd_args.len() > max);
        if cmd_args.len() < command.min_args() || too_many {
            return HashError::arity(command.name()).into();
        }

        command.execute(&self.context, cmd_args)
    }

    /// Get reference to the context (for testing/inspection)
    pub fn context(&self) -> &CommandContext {
        &self.context
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new(CommandContext::default())
    }
}

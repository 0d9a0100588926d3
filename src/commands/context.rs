//! Command execution context

use crate::config::Config;
use crate::store::{BackendKind, Keyspace};
use std::sync::Arc;

/// Behaviour switches for command handlers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CommandSettings {
    /// Reject non-numeric increment deltas with NotANumber
    pub strict_increment_delta: bool,
}

/// Context provided to commands during execution
///
/// Shared by every connection; the key table synchronizes itself.
#[derive(Debug, Clone)]
pub struct CommandContext {
    pub keyspace: Arc<Keyspace>,
    pub settings: CommandSettings,
}

impl CommandContext {
    pub fn new(keyspace: Arc<Keyspace>, settings: CommandSettings) -> Self {
        CommandContext { keyspace, settings }
    }

    /// Context with a single-shard key table and default settings
    pub fn with_backend(backend: BackendKind) -> Self {
        Self::new(Arc::new(Keyspace::new(1, backend)), CommandSettings::default())
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            Arc::new(Keyspace::new(config.shards, config.backend)),
            CommandSettings {
                strict_increment_delta: config.strict_increment_delta,
            },
        )
    }
}

impl Default for CommandContext {
    fn default() -> Self {
        Self::with_backend(BackendKind::default())
    }
}

//! Command registry
//!
//! Centralized registry for all available commands.
//! This allows loose coupling between command implementations and the dispatcher.

use super::{admin, hash, hash_counter, hash_scan, key, string, Command};
use std::collections::HashMap;
use std::sync::Arc;

/// Registry of all available commands
pub struct CommandRegistry {
    commands: HashMap<String, Arc<dyn Command>>,
}

impl CommandRegistry {
    /// Create a new command registry and register all commands
    pub fn new() -> Self {
        let mut registry = CommandRegistry {
            commands: HashMap::new(),
        };

        // Register string commands
        registry.register(Arc::new(string::SetCommand));
        registry.register(Arc::new(string::GetCommand));

        // Register key commands
        registry.register(Arc::new(key::DelCommand));
        registry.register(Arc::new(key::ExistsCommand));
        registry.register(Arc::new(key::TypeCommand));

        // Register hash commands
        registry.register(Arc::new(hash::HSetCommand));
        registry.register(Arc::new(hash::HMSetCommand));
        registry.register(Arc::new(hash::HGetCommand));
        registry.register(Arc::new(hash::HMGetCommand));
        registry.register(Arc::new(hash::HGetAllCommand));
        registry.register(Arc::new(hash::HKeysCommand));
        registry.register(Arc::new(hash::HValsCommand));
        registry.register(Arc::new(hash::HDelCommand));
        registry.register(Arc::new(hash::HExistsCommand));
        registry.register(Arc::new(hash::HLenCommand));
        registry.register(Arc::new(hash::HSetNxCommand));
        registry.register(Arc::new(hash::HStrLenCommand));
        registry.register(Arc::new(hash_counter::HIncrByCommand));
        registry.register(Arc::new(hash_counter::HIncrByFloatCommand));
        registry.register(Arc::new(hash_scan::HScanCommand));

        // Register admin commands
        registry.register(Arc::new(admin::PingCommand));
        registry.register(Arc::new(admin::InfoCommand));
        registry.register(Arc::new(admin::FlushDbCommand));

        registry
    }

    /// Register a command
    fn register(&mut self, command: Arc<dyn Command>) {
        let name = command.name().to_uppercase();
        self.commands.insert(name, command);
    }

    /// Get a command by name (case-insensitive)
    pub fn get(&self, name: &str) -> Option<Arc<dyn Command>> {
        self.commands.get(&name.to_uppercase()).cloned()
    }

    /// Check if a command exists
    pub fn has_command(&self, name: &str) -> bool {
        self.commands.contains_key(&name.to_uppercase())
    }

    /// Get all command names
    pub fn command_names(&self) -> Vec<String> {
        self.commands.keys().cloned().collect()
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new()
    }
}

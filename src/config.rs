//! Runtime configuration
//!
//! Read from the JSON file named by `HASHKV_CONFIG` when set, then
//! overridden field by field from the environment.

use crate::store::BackendKind;
use anyhow::Context;
use serde::Deserialize;
use std::path::Path;

/// Server and engine settings
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// RESP listen address
    pub bind: String,

    /// Number of key table shards
    pub shards: usize,

    /// Engine used for newly created hashes
    pub backend: BackendKind,

    /// Reject increment deltas that are not valid numbers instead of
    /// reading their leading numeric prefix (0 when there is none)
    pub strict_increment_delta: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            bind: "127.0.0.1:6379".to_string(),
            shards: num_cpus::get().clamp(1, 16),
            backend: BackendKind::default(),
            strict_increment_delta: false,
        }
    }
}

impl Config {
    /// Load from `HASHKV_CONFIG` and the environment
    pub fn load() -> anyhow::Result<Self> {
        let mut config = match std::env::var_os("HASHKV_CONFIG") {
            Some(path) => Self::from_file(Path::new(&path))?,
            None => Config::default(),
        };
        config.apply_overrides(|name| std::env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::from_json(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn from_json(text: &str) -> anyhow::Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Apply `HASHKV_*` overrides looked up through `var`
    pub fn apply_overrides(
        &mut self,
        var: impl Fn(&str) -> Option<String>,
    ) -> anyhow::Result<()> {
        if let Some(bind) = var("HASHKV_BIND") {
            self.bind = bind;
        }
        if let Some(backend) = var("HASHKV_BACKEND") {
            self.backend = backend.parse()?;
        }
        if let Some(shards) = var("HASHKV_SHARDS") {
            self.shards = shards
                .parse()
                .with_context(|| format!("HASHKV_SHARDS is not a number: {}", shards))?;
        }
        if let Some(strict) = var("HASHKV_STRICT_INCREMENT_DELTA") {
            self.strict_increment_delta = matches!(strict.as_str(), "1" | "true" | "yes");
        }
        Ok(())
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.shards == 0 {
            anyhow::bail!("shards must be at least 1");
        }
        self.backend.validate()
    }
}

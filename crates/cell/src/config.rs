//! TOML configuration for a cell
//!
//! ```toml
//! file = "settings.json"
//! directory = "documents"
//!
//! [update]
//! mode = "debounced"
//! delay_ms = 2000
//! ```

use crate::builder::CellBuilder;
use crate::policy::{UpdatePolicy, DEFAULT_DELAY};
use anyhow::{Context, Result};
use cellar_core::{Directory, PathError, PathResolver};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Longest accepted debounce delay (1 hour)
pub const MAX_DELAY_MS: u64 = 3_600_000;

/// Where a cell lives and how it writes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellConfig {
    /// File name, relative to `directory`
    pub file: String,

    /// Storage directory (default: documents)
    #[serde(default)]
    pub directory: Directory,

    /// Update policy (default: 2s debounce)
    #[serde(default)]
    pub update: UpdateConfig,
}

/// Serialized form of `UpdatePolicy`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum UpdateConfig {
    Immediate,
    Debounced {
        #[serde(default = "default_delay_ms")]
        delay_ms: u64,
    },
    Manual,
}

impl Default for UpdateConfig {
    fn default() -> Self {
        UpdateConfig::Debounced {
            delay_ms: default_delay_ms(),
        }
    }
}

fn default_delay_ms() -> u64 {
    DEFAULT_DELAY.as_millis() as u64
}

impl From<UpdateConfig> for UpdatePolicy {
    fn from(config: UpdateConfig) -> Self {
        match config {
            UpdateConfig::Immediate => UpdatePolicy::Immediate,
            UpdateConfig::Debounced { delay_ms } => {
                UpdatePolicy::Debounced(Duration::from_millis(delay_ms))
            }
            UpdateConfig::Manual => UpdatePolicy::Manual,
        }
    }
}

impl CellConfig {
    /// Parse and validate
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: CellConfig =
            toml::from_str(contents).context("Failed to parse cell config")?;
        config.validate().context("Invalid cell config")?;
        Ok(config)
    }

    /// Read, parse and validate a config file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read cell config {}", path.display()))?;
        Self::from_toml_str(&contents)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize cell config")
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<()> {
        if self.file.trim().is_empty() {
            anyhow::bail!("file must not be empty");
        }

        if let UpdateConfig::Debounced { delay_ms } = self.update {
            if delay_ms == 0 || delay_ms > MAX_DELAY_MS {
                anyhow::bail!(
                    "update.delay_ms must be between 1 and {} (got {})",
                    MAX_DELAY_MS,
                    delay_ms
                );
            }
        }

        Ok(())
    }

    pub fn policy(&self) -> UpdatePolicy {
        self.update.into()
    }

    /// Builder for the configured file and policy
    pub fn builder(&self, resolver: &impl PathResolver) -> Result<CellBuilder, PathError> {
        Ok(CellBuilder::resolve(&self.file, self.directory, resolver)?.policy(self.policy()))
    }
}

/// Example configuration with every field spelled out
pub fn example_config() -> &'static str {
    r#"# Name of the backing file, relative to `directory`
file = "settings.json"

# documents | caches | desktop | config | data | home | temp
directory = "documents"

[update]
# immediate | debounced | manual
mode = "debounced"
# Quiet period before a write, in milliseconds (1-3600000)
delay_ms = 2000
"#
}

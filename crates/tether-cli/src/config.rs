//! tether.toml loading

use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tether_core::BindingConfig;
use tether_heap::HeapConfig;

/// Default configuration file looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "tether.toml";

/// Whole-program configuration: one table per layer
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TetherConfig {
    /// `[binding]`: proxy runtime behaviour
    pub binding: BindingConfig,

    /// `[heap]`: native heap layout and write policy
    pub heap: HeapConfig,
}

impl TetherConfig {
    /// Parse from TOML text
    pub fn from_toml_str(s: &str) -> anyhow::Result<Self> {
        toml::from_str(s).context("invalid tether configuration")
    }

    /// Load an explicit file, or `./tether.toml` if it exists, or defaults
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let path = match path {
            Some(path) => path,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => Path::new(DEFAULT_CONFIG_FILE),
            None => {
                log::debug!("no {DEFAULT_CONFIG_FILE}, using defaults");
                return Ok(Self::default());
            }
        };
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        log::debug!("loaded configuration from {}", path.display());
        Self::from_toml_str(&text).with_context(|| format!("in {}", path.display()))
    }
}

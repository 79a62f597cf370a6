//! Binding configuration (`[binding]` table of tether.toml)

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File could not be read
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// File is not valid TOML or has wrong field types
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Behaviour knobs of the proxy runtime
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct BindingConfig {
    /// Check the runtime kind of externally supplied handles in `Runtime::wrap`
    pub verify_wrapped_kinds: bool,

    /// Upper bound on owner links followed by one propagation
    pub max_propagation_depth: usize,
}

impl Default for BindingConfig {
    fn default() -> Self {
        Self {
            verify_wrapped_kinds: false,
            max_propagation_depth: 64,
        }
    }
}

impl BindingConfig {
    /// Parse from TOML text holding the fields at top level
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Load from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = BindingConfig::from_toml_str("").unwrap();
        assert_eq!(config, BindingConfig::default());
        assert!(!config.verify_wrapped_kinds);
        assert_eq!(config.max_propagation_depth, 64);
    }

    #[test]
    fn test_partial() {
        let config = BindingConfig::from_toml_str("verify_wrapped_kinds = true").unwrap();
        assert!(config.verify_wrapped_kinds);
        assert_eq!(config.max_propagation_depth, 64);
    }

    #[test]
    fn test_parse_error() {
        let err = BindingConfig::from_toml_str("max_propagation_depth = \"deep\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "max_propagation_depth = 3").unwrap();
        let config = BindingConfig::from_file(file.path()).unwrap();
        assert_eq!(config.max_propagation_depth, 3);

        let missing = file.path().with_extension("missing");
        assert!(matches!(BindingConfig::from_file(&missing), Err(ConfigError::Io(_))));
    }
}

//! Driver configuration
//!
//! TOML-deserialized options for the command-line driver. Matching
//! thresholds are deliberately absent: they are load-bearing constants of
//! the engine, not tunables.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::core::errors::{Error, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiffConfig {
    /// Run the fuzzy matching passes (4 and 5)
    #[serde(default = "default_fuzzy_matching")]
    pub fuzzy_matching: bool,

    /// Only report function pairs with at least one difference
    #[serde(default)]
    pub skip_identical: bool,

    /// Restrict the diff to functions whose name contains this substring
    #[serde(default)]
    pub function_filter: Option<String>,
}

fn default_fuzzy_matching() -> bool {
    true
}

impl Default for DiffConfig {
    fn default() -> Self {
        Self {
            fuzzy_matching: default_fuzzy_matching(),
            skip_identical: false,
            function_filter: None,
        }
    }
}

impl DiffConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| Error::Configuration(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_enable_fuzzy_matching() {
        let config = DiffConfig::default();
        assert!(config.fuzzy_matching);
        assert!(!config.skip_identical);
    }

    #[test]
    fn parses_partial_config() {
        let config: DiffConfig = toml::from_str("skip_identical = true").unwrap();
        assert!(config.skip_identical);
        assert!(config.fuzzy_matching);
    }
}

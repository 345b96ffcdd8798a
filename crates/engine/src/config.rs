//! Engine configuration
//!
//! Loaded from TOML; every field has a default so an empty document is a
//! valid config:
//!
//! ```toml
//! [retention]
//! keep_count = 50
//! protect_tagged = true
//!
//! [diff]
//! context_lines = 3
//! ```

use crate::error::{EngineError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Retention defaults and protection policy
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct RetentionSettings {
    /// Number of newest versions retained when no explicit count is given
    pub keep_count: usize,
    /// Whether tagged versions are protected from cleanup
    pub protect_tagged: bool,
}

impl Default for RetentionSettings {
    fn default() -> Self {
        Self {
            keep_count: 50,
            protect_tagged: true,
        }
    }
}

/// Diff rendering knobs
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct DiffSettings {
    /// Context lines around each hunk in unified output
    pub context_lines: usize,
}

impl Default for DiffSettings {
    fn default() -> Self {
        Self { context_lines: 3 }
    }
}

/// Top-level engine configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    pub retention: RetentionSettings,
    pub diff: DiffSettings,
}

impl EngineConfig {
    /// Parse a TOML document
    pub fn from_toml_str(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| EngineError::validation(format!("invalid config: {e}")))
    }

    /// Load from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            EngineError::validation(format!("cannot read config {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_is_default() {
        let config = EngineConfig::from_toml_str("").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.retention.keep_count, 50);
        assert!(config.retention.protect_tagged);
        assert_eq!(config.diff.context_lines, 3);
    }

    #[test]
    fn test_partial_override() {
        let config = EngineConfig::from_toml_str(
            r#"
            [retention]
            keep_count = 10
            protect_tagged = false
            "#,
        )
        .unwrap();

        assert_eq!(config.retention.keep_count, 10);
        assert!(!config.retention.protect_tagged);
        assert_eq!(config.diff.context_lines, 3);
    }

    #[test]
    fn test_unknown_keys_rejected() {
        let result = EngineConfig::from_toml_str(
            r#"
            [retention]
            keep_forever = true
            "#,
        );
        assert!(matches!(result, Err(EngineError::Validation(_))));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[diff]\ncontext_lines = 5\n").unwrap();

        let config = EngineConfig::load(&path).unwrap();
        assert_eq!(config.diff.context_lines, 5);
    }
}

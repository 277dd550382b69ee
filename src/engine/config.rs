//! Engine configuration
//!
//! Every field has a default, so an empty JSON object is a valid config.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration loading failures
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File could not be read
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// File is not valid config JSON
    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    /// A field holds an unusable value
    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

/// Query engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Key prefix for insert records that have no store key yet (default: "pushId_")
    #[serde(default = "default_placeholder_prefix")]
    pub placeholder_prefix: String,

    /// Remove line comments before parsing (default: true)
    #[serde(default = "default_true")]
    pub strip_comments: bool,

    /// Emit lifecycle logs (default: true)
    #[serde(default = "default_true")]
    pub log_events: bool,

    /// Wait bound for a subquery's first delivery (default: 30000)
    #[serde(default = "default_subquery_timeout_ms")]
    pub subquery_timeout_ms: u64,
}

fn default_placeholder_prefix() -> String {
    "pushId_".to_string()
}

fn default_true() -> bool {
    true
}

fn default_subquery_timeout_ms() -> u64 {
    30_000
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            placeholder_prefix: default_placeholder_prefix(),
            strip_comments: default_true(),
            log_events: default_true(),
            subquery_timeout_ms: default_subquery_timeout_ms(),
        }
    }
}

impl EngineConfig {
    /// Loads and validates a JSON config file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    /// Parses and validates config JSON
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.placeholder_prefix.is_empty() || self.placeholder_prefix.contains('/') {
            return Err(ConfigError::InvalidValue {
                field: "placeholder_prefix",
                reason: "must be non-empty and contain no '/'".to_string(),
            });
        }
        if self.subquery_timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "subquery_timeout_ms",
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }

    pub fn subquery_timeout(&self) -> Duration {
        Duration::from_millis(self.subquery_timeout_ms)
    }

    /// Config with logging silenced
    pub fn quiet() -> Self {
        Self {
            log_events: false,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.placeholder_prefix, "pushId_");
        assert!(config.strip_comments);
        assert!(config.log_events);
        assert_eq!(config.subquery_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = EngineConfig::from_json_str(r#"{"strip_comments": false}"#).unwrap();
        assert!(!config.strip_comments);
        assert_eq!(config.placeholder_prefix, "pushId_");
        assert_eq!(EngineConfig::from_json_str("{}").unwrap(), EngineConfig::default());
    }

    #[test]
    fn test_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("engine.json");
        fs::write(&path, r#"{"placeholder_prefix": "new_", "subquery_timeout_ms": 250}"#).unwrap();

        let config = EngineConfig::from_file(&path).unwrap();
        assert_eq!(config.placeholder_prefix, "new_");
        assert_eq!(config.subquery_timeout(), Duration::from_millis(250));
    }

    #[test]
    fn test_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let err = EngineConfig::from_file(temp_dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            EngineConfig::from_json_str(r#"{"subquery_timeout_ms": 0}"#),
            Err(ConfigError::InvalidValue { field: "subquery_timeout_ms", .. })
        ));
        assert!(matches!(
            EngineConfig::from_json_str(r#"{"placeholder_prefix": "a/b"}"#),
            Err(ConfigError::InvalidValue { field: "placeholder_prefix", .. })
        ));
        assert!(matches!(
            EngineConfig::from_json_str("not json"),
            Err(ConfigError::Parse(_))
        ));
    }
}

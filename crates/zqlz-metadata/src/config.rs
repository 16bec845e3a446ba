//! Metadata loading configuration
//!
//! Loaded from `metadata.toml` in the ZQLZ config directory:
//!
//! ```toml
//! use_sys_schema_prefix = true
//!
//! [retry]
//! max_attempts = 3
//! initial_backoff_ms = 100
//! max_backoff_ms = 5000
//! jitter = true
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{MetadataError, MetadataResult};
use crate::retry::{BackoffStrategy, RetryPolicy};

/// Settings shared by every metadata loader of a data source
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MetadataConfig {
    /// Qualify data dictionary views with `SYS.` so synonyms in the
    /// connected schema cannot shadow them
    pub use_sys_schema_prefix: bool,

    /// Retry settings for callers that retry metadata loads
    pub retry: RetrySettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub jitter: bool,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff_ms: 100,
            max_backoff_ms: 5_000,
            jitter: true,
        }
    }
}

impl RetrySettings {
    pub fn policy(&self) -> RetryPolicy {
        let backoff = BackoffStrategy::new(self.initial_backoff_ms, self.max_backoff_ms)
            .with_jitter(self.jitter);
        RetryPolicy::new(self.max_attempts, backoff)
    }
}

impl MetadataConfig {
    /// Parse a configuration from TOML text
    pub fn from_toml_str(text: &str) -> MetadataResult<Self> {
        toml::from_str(text).map_err(|e| MetadataError::Config(e.to_string()))
    }

    /// Load a configuration file
    pub fn load(path: &Path) -> MetadataResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            MetadataError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let config = Self::from_toml_str(&text)?;
        tracing::debug!(path = %path.display(), "loaded metadata config");
        Ok(config)
    }

    /// Default location: `<config dir>/zqlz/metadata.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("zqlz").join("metadata.toml"))
    }

    /// Load the default file, falling back to defaults when it is absent or
    /// invalid
    pub fn load_or_default() -> Self {
        let Some(path) = Self::default_path().filter(|p| p.exists()) else {
            return Self::default();
        };
        Self::load(&path).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "invalid metadata config, using defaults");
            Self::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_parse_full_config() {
        let config = MetadataConfig::from_toml_str(
            r#"
            use_sys_schema_prefix = true

            [retry]
            max_attempts = 5
            initial_backoff_ms = 50
            max_backoff_ms = 800
            jitter = false
            "#,
        )
        .unwrap();

        assert!(config.use_sys_schema_prefix);
        assert_eq!(config.retry.max_attempts, 5);

        let policy = config.retry.policy();
        assert_eq!(policy.max_attempts(), 5);
        assert_eq!(policy.backoff().calculate_delay(0), Duration::from_millis(50));
        assert_eq!(policy.backoff().calculate_delay(10), Duration::from_millis(800));
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let config = MetadataConfig::from_toml_str("[retry]\nmax_attempts = 1\n").unwrap();
        assert!(!config.use_sys_schema_prefix);
        assert_eq!(config.retry.max_attempts, 1);
        assert_eq!(config.retry.initial_backoff_ms, 100);
        assert!(config.retry.jitter);
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let err = MetadataConfig::from_toml_str("use_sys_schema_prefix = \"maybe\"").unwrap_err();
        assert!(matches!(err, MetadataError::Config(_)));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("metadata.toml");
        std::fs::write(&path, "use_sys_schema_prefix = true\n").unwrap();

        let config = MetadataConfig::load(&path).unwrap();
        assert!(config.use_sys_schema_prefix);
        assert_eq!(config.retry, RetrySettings::default());

        let missing = MetadataConfig::load(&dir.path().join("absent.toml"));
        assert!(matches!(missing, Err(MetadataError::Config(_))));
    }
}

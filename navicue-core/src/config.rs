//! Catalog configuration loading and config file resolution
//!
//! Every field has a compiled default, so a missing file or section never
//! stops the catalog from starting.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::classification::{BatchMarker, BatchPolicy};
use crate::{Error, Result};

/// Environment variable naming the config file
pub const CONFIG_ENV_VAR: &str = "NAVICUE_CONFIG";

/// Normalizer settings (`[normalizer]`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizerConfig {
    /// Batch assigned when no marker tag is present
    pub default_batch: u32,
    /// Marker tags in priority order
    pub batch_markers: Vec<BatchMarker>,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        let policy = BatchPolicy::default();
        Self {
            default_batch: policy.default_batch,
            batch_markers: policy.markers,
        }
    }
}

impl NormalizerConfig {
    pub fn batch_policy(&self) -> BatchPolicy {
        BatchPolicy {
            markers: self.batch_markers.clone(),
            default_batch: self.default_batch,
        }
    }
}

/// Logging settings (`[logging]`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default tracing level (trace, debug, info, warn, error)
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Complete catalog configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    pub normalizer: NormalizerConfig,
    pub logging: LoggingConfig,
}

impl CatalogConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: CatalogConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&content)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        info!(path = %path.display(), "Loaded catalog config");
        Ok(config)
    }

    /// Reject settings the normalizer cannot honor
    pub fn validate(&self) -> Result<()> {
        if self.normalizer.default_batch == 0 {
            return Err(Error::Config(
                "normalizer.default_batch must be positive".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for marker in &self.normalizer.batch_markers {
            if marker.batch == 0 {
                return Err(Error::Config(format!(
                    "batch marker '{}' must map to a positive batch",
                    marker.tag
                )));
            }
            if !seen.insert(marker.tag.as_str()) {
                return Err(Error::Config(format!(
                    "batch marker '{}' is listed more than once",
                    marker.tag
                )));
            }
        }

        const LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];
        if !LEVELS.contains(&self.logging.level.to_ascii_lowercase().as_str()) {
            return Err(Error::Config(format!(
                "unknown logging.level '{}'",
                self.logging.level
            )));
        }

        Ok(())
    }

    pub fn batch_policy(&self) -> BatchPolicy {
        self.normalizer.batch_policy()
    }
}

/// Where the config came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Named on the command line
    CliArg(PathBuf),
    /// Named by `NAVICUE_CONFIG`
    EnvVar(PathBuf),
    /// Found at the platform config location
    UserFile(PathBuf),
    /// Nothing found; compiled defaults
    Defaults,
}

impl ConfigSource {
    pub fn path(&self) -> Option<&Path> {
        match self {
            ConfigSource::CliArg(p) | ConfigSource::EnvVar(p) | ConfigSource::UserFile(p) => {
                Some(p)
            }
            ConfigSource::Defaults => None,
        }
    }
}

/// Default config file location (`<config dir>/navicue/catalog.toml`)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("navicue").join("catalog.toml"))
}

/// Config file resolution priority:
///
/// Nothing is logged here; resolution usually runs before the subscriber is
/// installed, so callers report the returned source once logging is up.
///
/// 1. Command-line argument (highest priority)
/// 2. `NAVICUE_CONFIG` environment variable
/// 3. User config file, if it exists
/// 4. Compiled defaults (fallback)
pub fn resolve_config_source(cli_arg: Option<&Path>) -> ConfigSource {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return ConfigSource::CliArg(path.to_path_buf());
    }

    // Priority 2: Environment variable
    if let Some(path) = std::env::var_os(CONFIG_ENV_VAR).filter(|v| !v.is_empty()) {
        return ConfigSource::EnvVar(PathBuf::from(path));
    }

    // Priority 3: User config file
    if let Some(path) = default_config_path().filter(|p| p.exists()) {
        return ConfigSource::UserFile(path);
    }

    // Priority 4: Compiled defaults
    ConfigSource::Defaults
}

/// Resolve and load the catalog config
///
/// A file named explicitly (argument or environment) must exist; the default
/// location is optional.
pub fn load_resolved(cli_arg: Option<&Path>) -> Result<(CatalogConfig, ConfigSource)> {
    let source = resolve_config_source(cli_arg);
    let config = match source.path() {
        Some(path) if !path.exists() => {
            return Err(Error::NotFound(format!(
                "config file {}",
                path.display()
            )));
        }
        Some(path) => CatalogConfig::load(path)?,
        None => CatalogConfig::default(),
    };
    Ok((config, source))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_builtin_batch_policy() {
        let config = CatalogConfig::default();
        assert_eq!(config.batch_policy(), BatchPolicy::default());
        assert_eq!(config.logging.level, "info");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_document_fills_defaults() {
        let config = CatalogConfig::from_toml_str("[logging]\nlevel = \"debug\"\n").unwrap();
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.normalizer, NormalizerConfig::default());

        let empty = CatalogConfig::from_toml_str("").unwrap();
        assert_eq!(empty, CatalogConfig::default());
    }

    #[test]
    fn test_custom_markers() {
        let toml = r#"
            [normalizer]
            default_batch = 5
            batch_markers = [{ tag = "wave_b", batch = 6 }]
        "#;
        let policy = CatalogConfig::from_toml_str(toml).unwrap().batch_policy();
        assert_eq!(policy.batch_for(&["wave_b"]), 6);
        assert_eq!(policy.batch_for(&["batch_2"]), 5);
    }

    #[test]
    fn test_validation_rejects_bad_settings() {
        for toml in [
            "[normalizer]\ndefault_batch = 0\n",
            "[normalizer]\nbatch_markers = [{ tag = \"b\", batch = 0 }]\n",
            "[normalizer]\nbatch_markers = [{ tag = \"b\", batch = 2 }, { tag = \"b\", batch = 3 }]\n",
            "[logging]\nlevel = \"chatty\"\n",
        ] {
            let err = CatalogConfig::from_toml_str(toml).unwrap_err();
            assert!(matches!(err, Error::Config(_)), "{:?} should fail validation", toml);
        }
    }

    #[test]
    fn test_malformed_toml_is_toml_error() {
        let err = CatalogConfig::from_toml_str("[normalizer\n").unwrap_err();
        assert!(matches!(err, Error::Toml(_)));
    }
}

//! Configuration system using TOML files.
//!
//! Config is stored in the OS-standard config directory:
//! - Windows: %APPDATA%\cratedigger\config.toml
//! - macOS: ~/Library/Application Support/cratedigger/config.toml
//! - Linux: ~/.config/cratedigger/config.toml
//!
//! The config file is human-readable and editable. CLI flags override
//! config values per invocation; the file only supplies defaults.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::ingest::{IngestMode, MergePolicy};

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Ingestion defaults
    pub ingest: IngestSettings,

    /// Apply/safety settings
    pub apply: ApplySettings,
}

/// Defaults for the ingestion pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestSettings {
    /// Default ingest mode when --mode is not given
    pub mode: IngestMode,

    /// Default merge policy for re-scans
    pub overwrite: MergePolicy,

    /// Whether to compute acoustic fingerprints during full scans
    pub fingerprint: bool,
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self {
            mode: IngestMode::Full,
            overwrite: MergePolicy::Overwrite,
            fingerprint: false,
        }
    }
}

/// Safety settings for the apply executor
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplySettings {
    /// Where soft-deleted files are relocated
    pub quarantine_root: PathBuf,

    /// Abort an apply run outright if delete candidates exceed this count
    pub max_delete: Option<u32>,
}

impl Default for ApplySettings {
    fn default() -> Self {
        Self {
            quarantine_root: dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("CrateQuarantine"),
            max_delete: None,
        }
    }
}

// ============================================================================
// Config File Operations
// ============================================================================

/// Get the config directory path
pub fn config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("cratedigger"))
}

/// Get the full path to the config file
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|d| d.join("config.toml"))
}

/// Directory holding named lock markers (see `apply::lock`)
pub fn locks_dir() -> Option<PathBuf> {
    config_dir().map(|d| d.join("locks"))
}

/// Load configuration from disk
///
/// Returns default config if file doesn't exist or can't be parsed.
/// Logs warnings but doesn't fail - we always return a usable config.
pub fn load() -> Config {
    let Some(path) = config_path() else {
        tracing::warn!("Could not determine config directory, using defaults");
        return Config::default();
    };

    if !path.exists() {
        tracing::debug!("No config file found at {:?}, using defaults", path);
        // Seed an editable file so users can discover the settings
        let defaults = Config::default();
        if let Err(e) = save(&defaults) {
            tracing::warn!("Could not write default config: {}", e);
        }
        return defaults;
    }

    match std::fs::read_to_string(&path) {
        Ok(contents) => match toml::from_str(&contents) {
            Ok(config) => {
                tracing::debug!("Loaded config from {:?}", path);
                config
            }
            Err(e) => {
                tracing::error!("Failed to parse config file {:?}: {}", path, e);
                tracing::warn!("Using default configuration");
                Config::default()
            }
        },
        Err(e) => {
            tracing::error!("Failed to read config file {:?}: {}", path, e);
            Config::default()
        }
    }
}

/// Save configuration to disk
///
/// Creates the config directory if it doesn't exist.
pub fn save(config: &Config) -> Result<(), ConfigError> {
    let dir = config_dir().ok_or(ConfigError::NoConfigDir)?;
    let path = dir.join("config.toml");

    std::fs::create_dir_all(&dir).map_err(|e| ConfigError::CreateDir(dir.clone(), e))?;

    let contents = toml::to_string_pretty(config).map_err(ConfigError::Serialize)?;

    // Write atomically (write to temp, then rename)
    let temp_path = path.with_extension("toml.tmp");
    std::fs::write(&temp_path, &contents).map_err(|e| ConfigError::Write(temp_path.clone(), e))?;
    std::fs::rename(&temp_path, &path)
        .map_err(|e| ConfigError::Rename(temp_path, path.clone(), e))?;

    tracing::info!("Saved config to {:?}", path);
    Ok(())
}

/// Guarantee the quarantine directory exists before the apply executor
/// needs it.
pub fn ensure_quarantine_exists(settings: &ApplySettings) -> std::io::Result<PathBuf> {
    std::fs::create_dir_all(&settings.quarantine_root)?;
    Ok(settings.quarantine_root.clone())
}

// ============================================================================
// Error Types
// ============================================================================

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Failed to create config directory {0}: {1}")]
    CreateDir(PathBuf, std::io::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(toml::ser::Error),

    #[error("Failed to write config to {0}: {1}")]
    Write(PathBuf, std::io::Error),

    #[error("Failed to rename temp file {0} to {1}: {2}")]
    Rename(PathBuf, PathBuf, std::io::Error),
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_serializes() {
        let config = Config::default();
        let toml = toml::to_string_pretty(&config).unwrap();
        assert!(toml.contains("[ingest]"));
        assert!(toml.contains("[apply]"));
    }

    #[test]
    fn test_config_roundtrip() {
        let mut config = Config::default();
        config.ingest.fingerprint = true;
        config.ingest.overwrite = MergePolicy::FillMissingOnly;
        config.apply.max_delete = Some(50);
        config.apply.quarantine_root = PathBuf::from("/tmp/quarantine");

        let toml = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&toml).unwrap();

        assert!(parsed.ingest.fingerprint);
        assert_eq!(parsed.ingest.overwrite, MergePolicy::FillMissingOnly);
        assert_eq!(parsed.apply.max_delete, Some(50));
        assert_eq!(parsed.apply.quarantine_root, PathBuf::from("/tmp/quarantine"));
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let toml = r#"
[apply]
max_delete = 10
"#;
        let config: Config = toml::from_str(toml).unwrap();

        assert_eq!(config.apply.max_delete, Some(10));
        // Other fields use defaults
        assert_eq!(config.ingest.mode, IngestMode::Full);
        assert_eq!(config.ingest.overwrite, MergePolicy::Overwrite);
        assert!(!config.ingest.fingerprint);
    }

    #[test]
    fn test_ensure_quarantine_exists() {
        let dir = tempfile::tempdir().unwrap();
        let settings = ApplySettings {
            quarantine_root: dir.path().join("deep").join("quarantine"),
            max_delete: None,
        };
        let created = ensure_quarantine_exists(&settings).unwrap();
        assert!(created.is_dir());
    }
}

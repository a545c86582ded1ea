//! TOML-based configuration for the locker client.
//!
//! Reads and writes [`LockerConfig`] from an explicit path or the
//! platform-appropriate config file:
//! - Windows:  `%APPDATA%\Lockerctl\config.toml`
//! - Linux:    `$XDG_CONFIG_HOME/lockerctl/config.toml` or `~/.config/lockerctl/config.toml`
//! - macOS:    `~/Library/Application Support/Lockerctl/config.toml`
//!
//! ```toml
//! [sdk]
//! project_id = 1
//! log_level = "info"
//!
//! [coordinator]
//! command_capacity = 64
//! event_capacity = 128
//! ```
//!
//! Every field has a serde default, so a missing file, a missing section, or
//! a missing key all fall back to the values above.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::application::coordinator::ChannelCapacity;

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The platform config directory could not be determined.
    #[error("could not determine platform config directory")]
    NoPlatformConfigDir,

    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level client configuration stored on disk.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct LockerConfig {
    #[serde(default)]
    pub sdk: SdkConfig,
    #[serde(default)]
    pub coordinator: CoordinatorConfig,
}

/// Settings handed to the radio SDK at startup.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SdkConfig {
    /// Project whose controllers this client talks to.  Advertisements from
    /// other projects are ignored by the transport.
    #[serde(default = "default_project_id")]
    pub project_id: u32,
    /// `tracing` filter used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Channel sizing for the connection coordinator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CoordinatorConfig {
    #[serde(default = "default_command_capacity")]
    pub command_capacity: usize,
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_project_id() -> u32 {
    1
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_command_capacity() -> usize {
    64
}
fn default_event_capacity() -> usize {
    128
}

impl Default for SdkConfig {
    fn default() -> Self {
        Self {
            project_id: default_project_id(),
            log_level: default_log_level(),
        }
    }
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            command_capacity: default_command_capacity(),
            event_capacity: default_event_capacity(),
        }
    }
}

impl From<&CoordinatorConfig> for ChannelCapacity {
    fn from(config: &CoordinatorConfig) -> Self {
        Self {
            commands: config.command_capacity,
            events: config.event_capacity,
        }
    }
}

// ── Config repository ─────────────────────────────────────────────────────────

/// Resolves the platform config file path.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] if the base directory cannot be
/// determined from the environment.
pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    platform_config_dir()
        .map(|dir| dir.join("config.toml"))
        .ok_or(ConfigError::NoPlatformConfigDir)
}

/// Loads the config from the platform path.  See [`load_config_from`].
///
/// # Errors
///
/// As [`config_file_path`] and [`load_config_from`].
pub fn load_config() -> Result<LockerConfig, ConfigError> {
    load_config_from(&config_file_path()?)
}

/// Loads the config at `path`, returning defaults if the file does not exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not found",
/// and [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_config_from(path: &Path) -> Result<LockerConfig, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(content) => {
            debug!(path = %path.display(), "loaded config");
            Ok(toml::from_str(&content)?)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "no config file; using defaults");
            Ok(LockerConfig::default())
        }
        Err(source) => Err(ConfigError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Persists `config` to the platform path.
///
/// # Errors
///
/// As [`config_file_path`] and [`save_config_to`].
pub fn save_config(config: &LockerConfig) -> Result<(), ConfigError> {
    save_config_to(&config_file_path()?, config)
}

/// Writes `config` to `path`, creating parent directories as needed.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system failures or
/// [`ConfigError::Serialize`] if serialization fails.
pub fn save_config_to(path: &Path, config: &LockerConfig) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|source| ConfigError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    }

    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn platform_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA").map(|p| PathBuf::from(p).join("Lockerctl"))
    }

    #[cfg(target_os = "linux")]
    {
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
        Some(base.join("lockerctl"))
    }

    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME").map(|h| {
            PathBuf::from(h)
                .join("Library")
                .join("Application Support")
                .join("Lockerctl")
        })
    }

    #[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
    {
        None
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn temp_path() -> PathBuf {
        std::env::temp_dir()
            .join(format!("lockerctl_test_{}", Uuid::new_v4()))
            .join("config.toml")
    }

    #[test]
    fn test_default_config_targets_project_one_at_info() {
        let cfg = LockerConfig::default();
        assert_eq!(cfg.sdk.project_id, 1);
        assert_eq!(cfg.sdk.log_level, "info");
        assert_eq!(cfg.coordinator.command_capacity, 64);
        assert_eq!(cfg.coordinator.event_capacity, 128);
    }

    #[test]
    fn test_empty_toml_uses_defaults() {
        let cfg: LockerConfig = toml::from_str("").expect("empty document is valid");
        assert_eq!(cfg, LockerConfig::default());
    }

    #[test]
    fn test_partial_section_overrides_only_given_keys() {
        // Arrange
        let toml_str = r#"
[sdk]
project_id = 7
"#;

        // Act
        let cfg: LockerConfig = toml::from_str(toml_str).expect("deserialize partial");

        // Assert
        assert_eq!(cfg.sdk.project_id, 7);
        assert_eq!(cfg.sdk.log_level, "info");
        assert_eq!(cfg.coordinator, CoordinatorConfig::default());
    }

    #[test]
    fn test_invalid_toml_is_a_parse_error() {
        // Arrange
        let path = temp_path();
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "[[[ not valid toml").unwrap();

        // Act
        let result = load_config_from(&path);

        // Assert
        assert!(matches!(result, Err(ConfigError::Parse(_))));
        std::fs::remove_dir_all(path.parent().unwrap()).ok();
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let result = load_config_from(&temp_path());
        assert_eq!(result.unwrap(), LockerConfig::default());
    }

    #[test]
    fn test_save_then_load_round_trip() {
        // Arrange – parent directory does not exist yet
        let path = temp_path();
        let mut cfg = LockerConfig::default();
        cfg.sdk.project_id = 42;
        cfg.sdk.log_level = "debug".to_string();

        // Act
        save_config_to(&path, &cfg).expect("save");
        let loaded = load_config_from(&path).expect("load");

        // Assert
        assert_eq!(loaded, cfg);
        std::fs::remove_dir_all(path.parent().unwrap()).ok();
    }

    #[test]
    fn test_coordinator_config_maps_to_channel_capacity() {
        let capacity = ChannelCapacity::from(&CoordinatorConfig {
            command_capacity: 8,
            event_capacity: 16,
        });
        assert_eq!(capacity, ChannelCapacity { commands: 8, events: 16 });
    }

    #[test]
    fn test_config_file_path_ends_with_config_toml() {
        // NoPlatformConfigDir is acceptable in a stripped environment.
        if let Ok(path) = config_file_path() {
            assert!(path.ends_with("config.toml"), "got {path:?}");
        }
    }
}

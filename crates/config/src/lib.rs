#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Configuration management for archfix
//!
//! This crate handles loading and merging configuration from:
//! - Default values (hard-coded)
//! - Configuration file (~/.config/archfix/config.toml)
//! - Environment variables
//! - CLI flags

pub mod constants;
pub mod core;

pub use core::{BundleConfig, GeneralConfig, LogConfig, PathConfig};

use archfix_errors::{ConfigError, Error};
use archfix_types::{ColorChoice, OutputFormat};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::constants::{CONFIG_DIR_NAME, JOURNAL_FILE_NAME, VARIANT_STORE_DIR};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub paths: PathConfig,

    #[serde(default)]
    pub bundle: BundleConfig,

    #[serde(default)]
    pub log: LogConfig,
}

impl Config {
    /// Get the default config file path
    ///
    /// # Errors
    ///
    /// Returns an error if the system config directory cannot be determined.
    pub fn default_path() -> Result<PathBuf, Error> {
        let config_dir = dirs::config_dir().ok_or_else(|| ConfigError::NotFound {
            path: "config directory".to_string(),
        })?;
        Ok(config_dir.join(CONFIG_DIR_NAME).join("config.toml"))
    }

    /// Load configuration from file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, contains invalid TOML,
    /// or describes an unusable bundle layout.
    pub async fn load_from_file(path: &Path) -> Result<Self, Error> {
        let contents = fs::read_to_string(path)
            .await
            .map_err(|_| ConfigError::NotFound {
                path: path.display().to_string(),
            })?;

        let config: Self = toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
            message: e.to_string(),
        })?;
        config.validate()?;
        tracing::debug!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    /// Load configuration with fallback to defaults
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file exists but cannot be read
    /// or contains invalid TOML syntax.
    pub async fn load() -> Result<Self, Error> {
        let config_path = Self::default_path()?;

        if config_path.exists() {
            Self::load_from_file(&config_path).await
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from an optional path or use default
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be read or parsed
    pub async fn load_or_default(path: Option<&Path>) -> Result<Self, Error> {
        match path {
            Some(config_path) => Self::load_from_file(config_path).await,
            None => Self::load().await,
        }
    }

    /// Reject layouts the repository cannot work with.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` when the binary set or the layout
    /// candidates are empty, or the backup directory name is not a plain name.
    pub fn validate(&self) -> Result<(), Error> {
        if self.bundle.binaries.is_empty() {
            return Err(ConfigError::Invalid {
                message: "bundle.binaries must name at least the primary transcoder".to_string(),
            }
            .into());
        }
        if self.bundle.executable_dirs.is_empty() {
            return Err(ConfigError::Invalid {
                message: "bundle.executable_dirs must not be empty".to_string(),
            }
            .into());
        }
        let name = self.bundle.backup_dir_name.as_str();
        if name.is_empty() || name.contains('/') || name == "." || name == ".." {
            return Err(ConfigError::InvalidValue {
                field: "bundle.backup_dir_name".to_string(),
                value: name.to_string(),
            }
            .into());
        }
        Ok(())
    }

    /// Merge with environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if environment variables contain invalid values
    /// that cannot be parsed into the expected types.
    pub fn merge_env(&mut self) -> Result<(), Error> {
        // ARCHFIX_OUTPUT
        if let Ok(output) = std::env::var("ARCHFIX_OUTPUT") {
            self.general.default_output = match output.as_str() {
                "tty" => OutputFormat::Tty,
                "json" => OutputFormat::Json,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        field: "ARCHFIX_OUTPUT".to_string(),
                        value: output,
                    }
                    .into())
                }
            };
        }

        // ARCHFIX_COLOR
        if let Ok(color) = std::env::var("ARCHFIX_COLOR") {
            self.general.color = match color.as_str() {
                "always" => ColorChoice::Always,
                "auto" => ColorChoice::Auto,
                "never" => ColorChoice::Never,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        field: "ARCHFIX_COLOR".to_string(),
                        value: color,
                    }
                    .into())
                }
            };
        }

        if let Ok(dir) = std::env::var("ARCHFIX_RESOURCES_DIR") {
            if dir.is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: "ARCHFIX_RESOURCES_DIR".to_string(),
                    value: dir,
                }
                .into());
            }
            self.paths.resources_dir = Some(PathBuf::from(dir));
        }

        if let Ok(dir) = std::env::var("ARCHFIX_LOG_DIR") {
            if dir.is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: "ARCHFIX_LOG_DIR".to_string(),
                    value: dir,
                }
                .into());
            }
            self.paths.log_dir = Some(PathBuf::from(dir));
        }

        // ARCHFIX_LOG_MAX_ENTRIES
        if let Ok(max) = std::env::var("ARCHFIX_LOG_MAX_ENTRIES") {
            self.log.max_entries = match max.parse::<usize>() {
                Ok(value) if value > 0 => value,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        field: "ARCHFIX_LOG_MAX_ENTRIES".to_string(),
                        value: max,
                    }
                    .into())
                }
            };
        }

        Ok(())
    }

    /// Get the variant store directory (with default)
    ///
    /// Defaults to `ffmpeg_binaries` next to the running executable when that
    /// directory exists, otherwise under the working directory.
    #[must_use]
    pub fn resources_dir(&self) -> PathBuf {
        if let Some(dir) = &self.paths.resources_dir {
            return dir.clone();
        }
        let beside_exe = std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(|dir| dir.join(VARIANT_STORE_DIR)))
            .filter(|dir| dir.is_dir());
        beside_exe.unwrap_or_else(|| {
            std::env::current_dir()
                .unwrap_or_else(|_| PathBuf::from("."))
                .join(VARIANT_STORE_DIR)
        })
    }

    /// Get the log directory (with default)
    #[must_use]
    pub fn log_dir(&self) -> PathBuf {
        self.paths.log_dir.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .map(|dir| dir.join(CONFIG_DIR_NAME).join("logs"))
                .unwrap_or_else(|| PathBuf::from("logs"))
        })
    }

    /// Journal file for the operation log, if journaling is enabled
    #[must_use]
    pub fn journal_path(&self) -> Option<PathBuf> {
        self.log
            .journal
            .then(|| self.log_dir().join(JOURNAL_FILE_NAME))
    }

    /// First configured search path that exists on disk
    #[must_use]
    pub fn default_bundle_path(&self) -> Option<PathBuf> {
        self.bundle
            .search_paths
            .iter()
            .find(|path| path.exists())
            .cloned()
    }
}

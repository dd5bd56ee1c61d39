//! Configuration sections

use archfix_types::{ColorChoice, OutputFormat};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::constants::{
    BACKUP_DIR_NAME, DEFAULT_BINARIES, DEFAULT_EXECUTABLE_DIRS, DEFAULT_SEARCH_PATHS,
};

/// General application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    #[serde(default = "default_output_format")]
    pub default_output: OutputFormat,
    #[serde(default = "default_color_choice")]
    pub color: ColorChoice,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            default_output: OutputFormat::Tty,
            color: ColorChoice::Auto,
        }
    }
}

/// Path configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PathConfig {
    /// Prebuilt variant store, laid out as `<resources_dir>/<arch>/<name>`
    pub resources_dir: Option<PathBuf>,
    pub log_dir: Option<PathBuf>,
}

/// Bundle layout configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BundleConfig {
    /// Ordered binary set; the first entry is the primary transcoder
    #[serde(default = "default_binaries")]
    pub binaries: Vec<String>,
    #[serde(default = "default_backup_dir_name")]
    pub backup_dir_name: String,
    /// Candidate executable directories relative to the bundle root
    #[serde(default = "default_executable_dirs")]
    pub executable_dirs: Vec<PathBuf>,
    /// Locations tried when no bundle path is given
    #[serde(default = "default_search_paths")]
    pub search_paths: Vec<PathBuf>,
}

impl Default for BundleConfig {
    fn default() -> Self {
        Self {
            binaries: default_binaries(),
            backup_dir_name: default_backup_dir_name(),
            executable_dirs: default_executable_dirs(),
            search_paths: default_search_paths(),
        }
    }
}

/// Operation log configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Top-level entries retained in memory
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,
    /// Persist the log as JSON lines in the log directory
    #[serde(default = "default_journal")]
    pub journal: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            max_entries: default_max_entries(),
            journal: default_journal(),
        }
    }
}

// Default value functions for serde
fn default_output_format() -> OutputFormat {
    OutputFormat::Tty
}

fn default_color_choice() -> ColorChoice {
    ColorChoice::Auto
}

fn default_binaries() -> Vec<String> {
    DEFAULT_BINARIES.iter().map(ToString::to_string).collect()
}

fn default_backup_dir_name() -> String {
    BACKUP_DIR_NAME.to_string()
}

fn default_executable_dirs() -> Vec<PathBuf> {
    DEFAULT_EXECUTABLE_DIRS.iter().map(PathBuf::from).collect()
}

fn default_search_paths() -> Vec<PathBuf> {
    DEFAULT_SEARCH_PATHS.iter().map(PathBuf::from).collect()
}

fn default_max_entries() -> usize {
    200
}

fn default_journal() -> bool {
    true
}

//! Bundle path validation and layout discovery

use archfix_config::BundleConfig;
use archfix_errors::{BundleError, Error};
use archfix_platform::{Platform, PlatformContext};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// How the application is installed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BundleKind {
    /// macOS `.app` bundle with a `Contents` directory
    AppBundle,
    /// Plain install directory (Linux packages, manual installs)
    InstallDir,
}

/// A validated application path plus the directories derived from it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BundleLocation {
    pub root: PathBuf,
    pub kind: BundleKind,
    /// Directory holding the primary transcoder and its siblings
    pub executable_dir: PathBuf,
    pub resource_dir: PathBuf,
}

impl BundleLocation {
    /// Validate `path` against the configured layout candidates.
    ///
    /// # Errors
    ///
    /// Returns `BundleError::InvalidPath` if nothing exists at `path` and
    /// `BundleError::InvalidBundle` if it is not a directory or none of the
    /// candidate directories contains the primary transcoder.
    pub async fn resolve(
        platform: &Platform,
        ctx: &PlatformContext,
        path: &Path,
        layout: &BundleConfig,
    ) -> Result<Self, Error> {
        let fs = platform.filesystem();
        let display = path.display().to_string();

        if path.as_os_str().is_empty() || !fs.exists(ctx, path).await {
            return Err(BundleError::InvalidPath { path: display }.into());
        }
        if !fs.is_dir(ctx, path).await {
            return Err(BundleError::InvalidBundle {
                path: display,
                reason: "not a directory".to_string(),
            }
            .into());
        }

        let is_app = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("app"));
        let kind = if is_app {
            if !fs.is_dir(ctx, &path.join("Contents")).await {
                return Err(BundleError::InvalidBundle {
                    path: display,
                    reason: "missing Contents directory".to_string(),
                }
                .into());
            }
            BundleKind::AppBundle
        } else {
            BundleKind::InstallDir
        };

        let Some(primary) = layout.binaries.first() else {
            return Err(BundleError::InvalidBundle {
                path: display,
                reason: "no binaries configured".to_string(),
            }
            .into());
        };

        let mut executable_dir = None;
        for candidate in &layout.executable_dirs {
            let dir = if candidate.as_os_str() == "." {
                path.to_path_buf()
            } else {
                path.join(candidate)
            };
            if fs.is_file(ctx, &dir.join(primary)).await {
                executable_dir = Some(dir);
                break;
            }
        }
        let Some(executable_dir) = executable_dir else {
            return Err(BundleError::InvalidBundle {
                path: display,
                reason: format!("no {primary} executable in any known location"),
            }
            .into());
        };

        let resources = path.join("Contents").join("Resources");
        let resource_dir = if kind == BundleKind::AppBundle && fs.is_dir(ctx, &resources).await {
            resources
        } else {
            path.to_path_buf()
        };

        tracing::debug!(
            bundle = %path.display(),
            executable_dir = %executable_dir.display(),
            "bundle resolved"
        );

        Ok(Self {
            root: path.to_path_buf(),
            kind,
            executable_dir,
            resource_dir,
        })
    }

    /// Backup directory for this bundle
    #[must_use]
    pub fn backup_dir(&self, backup_dir_name: &str) -> PathBuf {
        self.executable_dir.join(backup_dir_name)
    }
}

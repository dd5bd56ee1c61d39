#![warn(mismatched_lifetime_syntaxes)]
#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Binary repository: locates the architecture-sensitive binaries inside an
//! application bundle and manages their backup, replacement and restore.
//!
//! All filesystem failures are converted to `BundleError` here, with the
//! offending path attached. Copies are whole-file and the cancellation token
//! is checked between files, never during one.

mod binary_set;
mod location;

pub use binary_set::BinarySet;
pub use location::{BundleKind, BundleLocation};

use archfix_config::BundleConfig;
use archfix_errors::{BundleError, Error, PlatformError};
use archfix_events::{AppEvent, BundleEvent, EventEmitter, EventSender, FailureContext};
use archfix_platform::{filesystem::EXECUTABLE_MODE, Platform, PlatformContext};
use archfix_types::{Architecture, ArchitectureSet};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;

/// Suffix of the staging directory a backup is assembled in
const STAGING_SUFFIX: &str = ".partial";

/// Outcome of a backup request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackupRecord {
    pub dir: PathBuf,
    /// Files present in the backup
    pub files: Vec<String>,
    /// False when an existing backup was kept as is
    pub created: bool,
}

/// Files written by a replace or restore
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SwapSummary {
    pub files: Vec<String>,
    /// Architectures the primary transcoder reports afterwards
    pub architectures: ArchitectureSet,
}

/// Locates binary sets and manages backups for bundles
#[derive(Clone)]
pub struct BinaryRepository {
    platform: Platform,
    layout: BundleConfig,
    resources_dir: PathBuf,
    ctx: PlatformContext,
}

impl BinaryRepository {
    /// Create a repository reading prebuilt variants from
    /// `<resources_dir>/<arch>/<name>`
    #[must_use]
    pub fn new(platform: Platform, layout: BundleConfig, resources_dir: PathBuf) -> Self {
        let ctx = platform.create_context(None);
        Self {
            platform,
            layout,
            resources_dir,
            ctx,
        }
    }

    #[must_use]
    pub fn with_event_sender(mut self, sender: EventSender) -> Self {
        self.ctx = self.platform.create_context(Some(sender));
        self
    }

    #[must_use]
    pub fn platform(&self) -> &Platform {
        &self.platform
    }

    #[must_use]
    pub fn context(&self) -> &PlatformContext {
        &self.ctx
    }

    #[must_use]
    pub fn resources_dir(&self) -> &Path {
        &self.resources_dir
    }

    /// Validate a user-supplied path into a `BundleLocation`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidPath` or `InvalidBundle`.
    pub async fn locate(&self, path: &Path) -> Result<BundleLocation, Error> {
        BundleLocation::resolve(&self.platform, &self.ctx, path, &self.layout).await
    }

    /// Members of the configured binary set present in the executable dir.
    ///
    /// Optional siblings that a given install does not ship are left out;
    /// the primary transcoder is always included.
    ///
    /// # Errors
    ///
    /// Returns `InvalidBundle` if the primary transcoder is missing.
    pub async fn locate_binary_set(&self, bundle: &BundleLocation) -> Result<BinarySet, Error> {
        let fs = self.platform.filesystem();
        let mut present = Vec::new();
        for name in &self.layout.binaries {
            if fs.is_file(&self.ctx, &bundle.executable_dir.join(name)).await {
                present.push(name.clone());
            }
        }

        let primary_present = self
            .layout
            .binaries
            .first()
            .is_some_and(|primary| present.first() == Some(primary));
        match BinarySet::new(present) {
            Some(set) if primary_present => Ok(set),
            _ => Err(BundleError::InvalidBundle {
                path: bundle.executable_dir.display().to_string(),
                reason: "primary transcoder missing".to_string(),
            }
            .into()),
        }
    }

    /// Architectures of the bundle's primary transcoder
    ///
    /// # Errors
    ///
    /// Returns `FileNotFound` if the primary transcoder vanished, or
    /// `InvalidBundle` if the bundle no longer resolves.
    pub async fn current_architecture(
        &self,
        bundle: &BundleLocation,
    ) -> Result<ArchitectureSet, Error> {
        let set = self.locate_binary_set(bundle).await?;
        let primary = bundle.executable_dir.join(set.primary());
        Ok(self
            .platform
            .probe()
            .binary_architecture(&self.ctx, &primary)
            .await?)
    }

    #[must_use]
    pub fn backup_dir(&self, bundle: &BundleLocation) -> PathBuf {
        bundle.backup_dir(&self.layout.backup_dir_name)
    }

    /// Names from the configured set that exist in the backup directory
    async fn backed_up_files(&self, bundle: &BundleLocation) -> Vec<String> {
        let fs = self.platform.filesystem();
        let dir = self.backup_dir(bundle);
        let mut files = Vec::new();
        if !fs.is_dir(&self.ctx, &dir).await {
            return files;
        }
        for name in &self.layout.binaries {
            if fs.is_file(&self.ctx, &dir.join(name)).await {
                files.push(name.clone());
            }
        }
        files
    }

    /// True iff the backup directory holds at least one binary-set file
    pub async fn has_backup(&self, bundle: &BundleLocation) -> bool {
        !self.backed_up_files(bundle).await.is_empty()
    }

    /// Copy the current binary set into the backup directory.
    ///
    /// An existing backup is never overwritten. The copy is assembled in a
    /// staging directory and renamed into place only when complete; on
    /// failure or cancellation the staging directory is removed.
    ///
    /// # Errors
    ///
    /// Returns `BackupFailed` on I/O failure and `Cancelled` if `cancel`
    /// fired between files.
    pub async fn backup(
        &self,
        bundle: &BundleLocation,
        cancel: &CancellationToken,
    ) -> Result<BackupRecord, Error> {
        let backup_dir = self.backup_dir(bundle);
        let bundle_name = bundle.root.display().to_string();

        let existing = self.backed_up_files(bundle).await;
        if !existing.is_empty() {
            tracing::info!(backup = %backup_dir.display(), "keeping existing backup");
            self.ctx.emit(AppEvent::Bundle(BundleEvent::BackupExists {
                bundle: bundle_name,
                backup_dir: backup_dir.display().to_string(),
            }));
            return Ok(BackupRecord {
                dir: backup_dir,
                files: existing,
                created: false,
            });
        }

        let set = self.locate_binary_set(bundle).await?;
        self.ctx.emit(AppEvent::Bundle(BundleEvent::BackupStarted {
            bundle: bundle_name.clone(),
            files: set.len(),
        }));

        let mut staging = backup_dir.clone().into_os_string();
        staging.push(STAGING_SUFFIX);
        let staging = PathBuf::from(staging);

        let result = self
            .write_backup(bundle, &set, &staging, &backup_dir, cancel)
            .await;

        match result {
            Ok(()) => {
                let files: Vec<String> = set.names().to_vec();
                tracing::info!(backup = %backup_dir.display(), files = files.len(), "backup created");
                self.ctx.emit(AppEvent::Bundle(BundleEvent::BackupCompleted {
                    bundle: bundle_name,
                    backup_dir: backup_dir.display().to_string(),
                    files: files.len(),
                }));
                Ok(BackupRecord {
                    dir: backup_dir,
                    files,
                    created: true,
                })
            }
            Err(err) => {
                if let Err(cleanup) = self
                    .platform
                    .filesystem()
                    .remove_dir_all(&self.ctx, &staging)
                    .await
                {
                    tracing::warn!(staging = %staging.display(), error = %cleanup, "failed to remove partial backup");
                    self.ctx.emit_warning_with_context(
                        "failed to remove partial backup",
                        staging.display().to_string(),
                    );
                }
                if !err.is_cancelled() {
                    self.ctx.emit(AppEvent::Bundle(BundleEvent::BackupFailed {
                        bundle: bundle_name,
                        failure: FailureContext::from_error(&err),
                    }));
                }
                Err(err)
            }
        }
    }

    async fn write_backup(
        &self,
        bundle: &BundleLocation,
        set: &BinarySet,
        staging: &Path,
        backup_dir: &Path,
        cancel: &CancellationToken,
    ) -> Result<(), Error> {
        let fs = self.platform.filesystem();
        let backup_failed = |path: &Path, err: &PlatformError| -> Error {
            BundleError::BackupFailed {
                path: path.display().to_string(),
                message: err.to_string(),
            }
            .into()
        };

        // Leftover from an interrupted run
        fs.remove_dir_all(&self.ctx, staging)
            .await
            .map_err(|e| backup_failed(staging, &e))?;
        fs.create_dir_all(&self.ctx, staging)
            .await
            .map_err(|e| backup_failed(staging, &e))?;

        for (name, source) in set.paths_in(&bundle.executable_dir) {
            if cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }
            let destination = staging.join(name);
            fs.copy_file(&self.ctx, &source, &destination)
                .await
                .map_err(|e| backup_failed(&source, &e))?;
            self.emit_copied(&source, &destination);
        }

        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        fs.rename(&self.ctx, staging, backup_dir)
            .await
            .map_err(|e| backup_failed(backup_dir, &e))
    }

    /// Directory holding the prebuilt variant for `arch`
    #[must_use]
    pub fn variant_dir(&self, arch: Architecture) -> PathBuf {
        self.resources_dir.join(arch.as_str())
    }

    /// Overwrite the binary set with the prebuilt `target` variant and
    /// verify every written file afterwards.
    ///
    /// Every source is checked before the first write. Each destination is
    /// replaced atomically, so a failure or stop leaves every file either
    /// original or fully replaced.
    ///
    /// # Errors
    ///
    /// Returns `ReplaceFailed` if a variant is missing, a copy fails, or the
    /// result does not report `target`; `Cancelled` if `cancel` fired
    /// between files.
    pub async fn replace(
        &self,
        bundle: &BundleLocation,
        target: Architecture,
        cancel: &CancellationToken,
    ) -> Result<SwapSummary, Error> {
        let bundle_name = bundle.root.display().to_string();
        let result = self.replace_inner(bundle, target, cancel).await;
        match &result {
            Ok(summary) => {
                tracing::info!(bundle = %bundle_name, arch = %target, files = summary.files.len(), "binaries replaced");
                self.ctx.emit(AppEvent::Bundle(BundleEvent::ReplaceCompleted {
                    bundle: bundle_name,
                    target,
                    files: summary.files.len(),
                }));
            }
            Err(err) if !err.is_cancelled() => {
                self.ctx.emit(AppEvent::Bundle(BundleEvent::ReplaceFailed {
                    bundle: bundle_name,
                    target,
                    failure: FailureContext::from_error(err),
                }));
            }
            Err(_) => {}
        }
        result
    }

    async fn replace_inner(
        &self,
        bundle: &BundleLocation,
        target: Architecture,
        cancel: &CancellationToken,
    ) -> Result<SwapSummary, Error> {
        let fs = self.platform.filesystem();
        let set = self.locate_binary_set(bundle).await?;
        let variant_dir = self.variant_dir(target);

        if !target.is_known() {
            return Err(BundleError::ReplaceFailed {
                path: bundle.executable_dir.display().to_string(),
                message: "target architecture is unknown".to_string(),
            }
            .into());
        }

        let mut plan = Vec::with_capacity(set.len());
        for (name, destination) in set.paths_in(&bundle.executable_dir) {
            let source = variant_dir.join(name);
            if fs.is_file(&self.ctx, &source).await {
                plan.push((name.to_string(), source, destination));
            } else if name == set.primary() {
                return Err(BundleError::ReplaceFailed {
                    path: source.display().to_string(),
                    message: format!("no {target} variant of {name} available"),
                }
                .into());
            } else {
                tracing::warn!(file = name, arch = %target, "no variant available, keeping current file");
                self.ctx.emit_warning_with_context(
                    format!("no {target} variant of {name}, keeping current file"),
                    source.display().to_string(),
                );
            }
        }

        self.ctx.emit(AppEvent::Bundle(BundleEvent::ReplaceStarted {
            bundle: bundle.root.display().to_string(),
            target,
            files: plan.len(),
        }));

        let mut files = Vec::with_capacity(plan.len());
        for (name, source, destination) in plan {
            if cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }
            fs.atomic_replace(&self.ctx, &source, &destination, EXECUTABLE_MODE)
                .await
                .map_err(|e| BundleError::ReplaceFailed {
                    path: destination.display().to_string(),
                    message: e.to_string(),
                })?;
            self.emit_copied(&source, &destination);
            files.push(name);
        }

        let mut architectures = ArchitectureSet::unknown();
        for name in &files {
            let destination = bundle.executable_dir.join(name);
            let found = self
                .platform
                .probe()
                .binary_architecture(&self.ctx, &destination)
                .await
                .map_err(|e| BundleError::ReplaceFailed {
                    path: destination.display().to_string(),
                    message: e.to_string(),
                })?;
            if !found.contains(target) {
                return Err(BundleError::ReplaceFailed {
                    path: destination.display().to_string(),
                    message: format!("verification failed: binary reports {found}, expected {target}"),
                }
                .into());
            }
            if name == set.primary() {
                architectures = found;
            }
        }

        Ok(SwapSummary {
            files,
            architectures,
        })
    }

    /// Copy every backed-up file back over the binary set. The backup is
    /// left intact.
    ///
    /// # Errors
    ///
    /// Returns `NoBackupAvailable` without touching the bundle if there is
    /// no backup; `RestoreFailed` (with the count already restored) on I/O
    /// failure; `Cancelled` if `cancel` fired between files.
    pub async fn restore(
        &self,
        bundle: &BundleLocation,
        cancel: &CancellationToken,
    ) -> Result<SwapSummary, Error> {
        let fs = self.platform.filesystem();
        let backup_dir = self.backup_dir(bundle);
        let bundle_name = bundle.root.display().to_string();

        let files = self.backed_up_files(bundle).await;
        if files.is_empty() {
            return Err(BundleError::NoBackupAvailable {
                path: backup_dir.display().to_string(),
            }
            .into());
        }

        self.ctx.emit(AppEvent::Bundle(BundleEvent::RestoreStarted {
            bundle: bundle_name.clone(),
            files: files.len(),
        }));

        let mut restored = Vec::with_capacity(files.len());
        for name in files {
            if cancel.is_cancelled() {
                tracing::warn!(restored = restored.len(), "restore stopped part way");
                return Err(Error::Cancelled);
            }
            let source = backup_dir.join(&name);
            let destination = bundle.executable_dir.join(&name);
            if let Err(e) = fs
                .atomic_replace(&self.ctx, &source, &destination, EXECUTABLE_MODE)
                .await
            {
                let err: Error = BundleError::RestoreFailed {
                    path: destination.display().to_string(),
                    restored: restored.len(),
                    message: e.to_string(),
                }
                .into();
                tracing::error!(restored = restored.len(), error = %err, "partial restore");
                self.ctx.emit(AppEvent::Bundle(BundleEvent::RestoreFailed {
                    bundle: bundle_name,
                    restored: restored.len(),
                    failure: FailureContext::from_error(&err),
                }));
                return Err(err);
            }
            self.emit_copied(&source, &destination);
            restored.push(name);
        }

        let architectures = self.current_architecture(bundle).await?;
        tracing::info!(bundle = %bundle_name, files = restored.len(), arch = %architectures, "binaries restored");
        self.ctx.emit(AppEvent::Bundle(BundleEvent::RestoreCompleted {
            bundle: bundle_name,
            files: restored.len(),
        }));
        Ok(SwapSummary {
            files: restored,
            architectures,
        })
    }

    /// Test-only path: install the `arch` variant regardless of the host.
    ///
    /// Takes a backup first when none exists, so forcing never destroys the
    /// originals.
    ///
    /// # Errors
    ///
    /// Same as `backup` followed by `replace`.
    pub async fn force_architecture(
        &self,
        bundle: &BundleLocation,
        arch: Architecture,
        cancel: &CancellationToken,
    ) -> Result<SwapSummary, Error> {
        tracing::warn!(bundle = %bundle.root.display(), arch = %arch, "forcing transcoder architecture (test path)");
        self.backup(bundle, cancel).await?;
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        self.replace(bundle, arch, cancel).await
    }

    fn emit_copied(&self, source: &Path, destination: &Path) {
        self.ctx.emit(AppEvent::Bundle(BundleEvent::FileCopied {
            source: source.display().to_string(),
            destination: destination.display().to_string(),
        }));
    }
}

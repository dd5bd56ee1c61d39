//! Filesystem operations on top of `tokio::fs`, with event emission

use archfix_errors::PlatformError;
use archfix_events::{AppEvent, EventEmitter, FailureContext, PlatformEvent};
use async_trait::async_trait;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio::fs;

use crate::core::PlatformContext;
use crate::filesystem::FilesystemOperations;

/// Native implementation of filesystem operations
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeFilesystem;

impl NativeFilesystem {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

/// Hidden sibling used as the write target before the final rename
fn temp_sibling(dst: &Path) -> Result<PathBuf, PlatformError> {
    let name = dst
        .file_name()
        .ok_or_else(|| PlatformError::FilesystemOperationFailed {
            operation: "atomic_replace".to_string(),
            path: dst.display().to_string(),
            message: "destination has no file name".to_string(),
        })?;
    Ok(dst.with_file_name(format!(
        ".{}.archfix-{}",
        name.to_string_lossy(),
        std::process::id()
    )))
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

fn emit_fs_result(
    ctx: &PlatformContext,
    operation: &str,
    source: Option<&Path>,
    target: &Path,
    result: &Result<(), PlatformError>,
    started: Instant,
) {
    match result {
        Ok(()) => ctx.emit(AppEvent::Platform(
            PlatformEvent::FilesystemOperationCompleted {
                operation: operation.to_string(),
                source_path: source.map(|p| p.display().to_string()),
                target_path: target.display().to_string(),
                duration_ms: duration_ms(started.elapsed()),
            },
        )),
        Err(err) => {
            tracing::warn!(operation, target = %target.display(), error = %err, "filesystem operation failed");
            ctx.emit(AppEvent::Platform(PlatformEvent::FilesystemOperationFailed {
                operation: operation.to_string(),
                target_path: target.display().to_string(),
                failure: FailureContext::from_error(err),
            }));
        }
    }
}

#[async_trait]
impl FilesystemOperations for NativeFilesystem {
    async fn copy_file(
        &self,
        ctx: &PlatformContext,
        src: &Path,
        dst: &Path,
    ) -> Result<(), PlatformError> {
        let start = Instant::now();
        // fs::copy carries the permission bits over
        let result = fs::copy(src, dst)
            .await
            .map(|_| ())
            .map_err(|e| PlatformError::from_io("copy_file", src, &e));
        emit_fs_result(ctx, "copy_file", Some(src), dst, &result, start);
        result
    }

    async fn atomic_replace(
        &self,
        ctx: &PlatformContext,
        src: &Path,
        dst: &Path,
        mode: u32,
    ) -> Result<(), PlatformError> {
        let start = Instant::now();
        let tmp = temp_sibling(dst)?;

        let result = async {
            fs::copy(src, &tmp)
                .await
                .map_err(|e| PlatformError::from_io("atomic_replace", src, &e))?;
            fs::set_permissions(&tmp, std::fs::Permissions::from_mode(mode))
                .await
                .map_err(|e| PlatformError::from_io("set_permissions", &tmp, &e))?;
            fs::rename(&tmp, dst)
                .await
                .map_err(|e| PlatformError::from_io("atomic_replace", dst, &e))
        }
        .await;

        if result.is_err() {
            let _ = fs::remove_file(&tmp).await;
        }
        emit_fs_result(ctx, "atomic_replace", Some(src), dst, &result, start);
        result
    }

    async fn rename(
        &self,
        ctx: &PlatformContext,
        src: &Path,
        dst: &Path,
    ) -> Result<(), PlatformError> {
        let start = Instant::now();
        let result = fs::rename(src, dst)
            .await
            .map_err(|e| PlatformError::from_io("rename", src, &e));
        emit_fs_result(ctx, "rename", Some(src), dst, &result, start);
        result
    }

    async fn create_dir_all(
        &self,
        ctx: &PlatformContext,
        path: &Path,
    ) -> Result<(), PlatformError> {
        let start = Instant::now();
        let result = fs::create_dir_all(path)
            .await
            .map_err(|e| PlatformError::from_io("create_dir_all", path, &e));
        emit_fs_result(ctx, "create_dir_all", None, path, &result, start);
        result
    }

    async fn remove_dir_all(
        &self,
        ctx: &PlatformContext,
        path: &Path,
    ) -> Result<(), PlatformError> {
        let start = Instant::now();
        let result = match fs::remove_dir_all(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(PlatformError::from_io("remove_dir_all", path, &e)),
        };
        emit_fs_result(ctx, "remove_dir_all", None, path, &result, start);
        result
    }

    async fn exists(&self, _ctx: &PlatformContext, path: &Path) -> bool {
        fs::try_exists(path).await.unwrap_or(false)
    }

    async fn is_dir(&self, _ctx: &PlatformContext, path: &Path) -> bool {
        fs::metadata(path).await.is_ok_and(|m| m.is_dir())
    }

    async fn is_file(&self, _ctx: &PlatformContext, path: &Path) -> bool {
        fs::metadata(path).await.is_ok_and(|m| m.is_file())
    }
}

//! Filesystem operations used by the binary repository

use archfix_errors::PlatformError;
use async_trait::async_trait;
use std::path::Path;

use crate::core::PlatformContext;

/// Executable permission bits applied to every swapped binary
pub const EXECUTABLE_MODE: u32 = 0o755;

/// Trait for the filesystem operations behind backup, replace and restore
///
/// Every copy is whole-file: implementations must never leave a partially
/// written destination behind.
#[async_trait]
pub trait FilesystemOperations: Send + Sync {
    /// Copy `src` to `dst` preserving permission bits
    async fn copy_file(
        &self,
        ctx: &PlatformContext,
        src: &Path,
        dst: &Path,
    ) -> Result<(), PlatformError>;

    /// Copy `src` over `dst` through a temporary sibling, apply `mode`, then
    /// rename into place
    async fn atomic_replace(
        &self,
        ctx: &PlatformContext,
        src: &Path,
        dst: &Path,
        mode: u32,
    ) -> Result<(), PlatformError>;

    /// Rename a file or directory
    async fn rename(&self, ctx: &PlatformContext, src: &Path, dst: &Path)
        -> Result<(), PlatformError>;

    /// Create directory and all parent directories
    async fn create_dir_all(&self, ctx: &PlatformContext, path: &Path)
        -> Result<(), PlatformError>;

    /// Remove directory and all contents; a missing directory is not an error
    async fn remove_dir_all(&self, ctx: &PlatformContext, path: &Path)
        -> Result<(), PlatformError>;

    /// Check if a path exists
    async fn exists(&self, ctx: &PlatformContext, path: &Path) -> bool;

    /// Check if a path points to a directory.
    async fn is_dir(&self, ctx: &PlatformContext, path: &Path) -> bool;

    /// Check if a path points to a regular file.
    async fn is_file(&self, ctx: &PlatformContext, path: &Path) -> bool;
}

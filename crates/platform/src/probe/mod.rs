//! Architecture probing

use archfix_errors::PlatformError;
use archfix_types::{Architecture, ArchitectureSet};
use async_trait::async_trait;
use std::path::Path;

use crate::core::PlatformContext;

/// What the host reported about itself
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostInfo {
    /// Raw machine identifier, empty when it could not be read
    pub machine: String,
    pub architecture: Architecture,
    /// The process runs under binary translation
    pub translated: bool,
}

/// Determines the machine architecture of the host and of executables
#[async_trait]
pub trait ArchitectureProbe: Send + Sync {
    /// Describe the running host. Never fails; unrecognized hosts report
    /// `Architecture::Unknown`.
    async fn host_info(&self, ctx: &PlatformContext) -> HostInfo;

    /// Every architecture embedded in the executable at `path`.
    ///
    /// An unreadable or unrecognized header yields the unknown set rather
    /// than an error.
    ///
    /// # Errors
    ///
    /// Returns `PlatformError::FileNotFound` if nothing exists at `path`.
    async fn binary_architecture(
        &self,
        ctx: &PlatformContext,
        path: &Path,
    ) -> Result<ArchitectureSet, PlatformError>;

    /// Host architecture only
    async fn host_architecture(&self, ctx: &PlatformContext) -> Architecture {
        self.host_info(ctx).await.architecture
    }
}

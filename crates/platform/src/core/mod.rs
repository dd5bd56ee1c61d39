//! Core platform abstractions and context management

use std::sync::Arc;

use archfix_events::{EventEmitter, EventSender};

use crate::filesystem::FilesystemOperations;
use crate::implementations::native::{NativeFilesystem, NativeProbe};
use crate::probe::ArchitectureProbe;

/// Context for platform operations, carrying the optional event channel
#[derive(Clone, Default)]
pub struct PlatformContext {
    event_sender: Option<EventSender>,
}

impl PlatformContext {
    /// Create a new platform context with event emission capabilities
    #[must_use]
    pub fn new(event_sender: Option<EventSender>) -> Self {
        Self { event_sender }
    }
}

impl EventEmitter for PlatformContext {
    fn event_sender(&self) -> Option<&EventSender> {
        self.event_sender.as_ref()
    }
}

/// Main platform abstraction providing access to all platform operations
#[derive(Clone)]
pub struct Platform {
    probe: Arc<dyn ArchitectureProbe>,
    filesystem: Arc<dyn FilesystemOperations>,
}

impl Platform {
    /// Create a new platform instance with the specified implementations
    pub fn new(
        probe: Arc<dyn ArchitectureProbe>,
        filesystem: Arc<dyn FilesystemOperations>,
    ) -> Self {
        Self { probe, filesystem }
    }

    /// The platform of the running process
    #[must_use]
    pub fn native() -> Self {
        Self::new(Arc::new(NativeProbe::new()), Arc::new(NativeFilesystem::new()))
    }

    /// Native filesystem with a caller-supplied probe
    #[must_use]
    pub fn with_probe(probe: Arc<dyn ArchitectureProbe>) -> Self {
        Self::new(probe, Arc::new(NativeFilesystem::new()))
    }

    /// Access probe operations
    pub fn probe(&self) -> &dyn ArchitectureProbe {
        &*self.probe
    }

    /// Access filesystem operations
    pub fn filesystem(&self) -> &dyn FilesystemOperations {
        &*self.filesystem
    }

    /// Create a platform context with event emission
    #[must_use]
    pub fn create_context(&self, event_sender: Option<EventSender>) -> PlatformContext {
        PlatformContext::new(event_sender)
    }
}

impl Default for Platform {
    fn default() -> Self {
        Self::native()
    }
}

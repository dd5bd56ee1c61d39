//! Common test utilities for end-to-end scenarios
//!
//! Builds synthetic bundles from minimal Mach-O headers, a variant store for
//! both architectures, and engines pinned to a chosen host.

use archfix_config::Config;
use archfix_events::{EventMessage, EventReceiver};
use archfix_ops::{CompatibilityEngine, EngineBuilder};
use archfix_platform::{ArchitectureProbe, NativeProbe, Platform, PlatformContext};
use archfix_types::{Architecture, ArchitectureSet};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

const CPU_TYPE_X86_64: u32 = 0x0100_0007;
const CPU_TYPE_ARM64: u32 = 0x0100_000c;

fn cputype(arch: Architecture) -> u32 {
    match arch {
        Architecture::Arm64 => CPU_TYPE_ARM64,
        _ => CPU_TYPE_X86_64,
    }
}

/// Thin 64-bit Mach-O header for `arch`
pub fn thin_macho(arch: Architecture) -> Vec<u8> {
    let mut data = Vec::new();
    for word in [0xfeed_facf_u32, cputype(arch), 0, 2, 0, 0, 0, 0] {
        data.extend_from_slice(&word.to_le_bytes());
    }
    data
}

/// Universal binary with one thin slice per architecture
pub fn fat_macho(arches: &[Architecture]) -> Vec<u8> {
    let mut data = Vec::new();
    data.extend_from_slice(&0xcafe_babe_u32.to_be_bytes());
    data.extend_from_slice(&u32::try_from(arches.len()).unwrap().to_be_bytes());
    let slices: Vec<Vec<u8>> = arches.iter().map(|&arch| thin_macho(arch)).collect();
    for (index, (&arch, slice)) in arches.iter().zip(&slices).enumerate() {
        let offset = 4096 * (u32::try_from(index).unwrap() + 1);
        for word in [cputype(arch), 0, offset, u32::try_from(slice.len()).unwrap(), 12] {
            data.extend_from_slice(&word.to_be_bytes());
        }
    }
    for (index, slice) in slices.iter().enumerate() {
        data.resize(4096 * (index + 1), 0);
        data.extend_from_slice(slice);
    }
    data
}

pub fn write_exe(path: &Path, data: &[u8]) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, data).unwrap();
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)).unwrap();
}

/// Test environment: one bundle, one variant store, one log directory
pub struct TestEnvironment {
    pub temp_dir: TempDir,
    pub bundle: PathBuf,
    pub executable_dir: PathBuf,
    pub config: Config,
}

impl TestEnvironment {
    /// `.app` bundle whose ffmpeg and ffprobe are the given header bytes
    pub fn with_binary(binary: &[u8]) -> Self {
        let temp_dir = TempDir::new().unwrap();
        let bundle = temp_dir.path().join("EmbyServer.app");
        let executable_dir = bundle.join("Contents/MacOS");
        std::fs::create_dir_all(bundle.join("Contents/Resources")).unwrap();
        for name in ["ffmpeg", "ffprobe"] {
            write_exe(&executable_dir.join(name), binary);
        }

        let store = temp_dir.path().join("ffmpeg_binaries");
        for arch in Architecture::KNOWN {
            for name in ["ffmpeg", "ffprobe"] {
                write_exe(&store.join(arch.as_str()).join(name), &thin_macho(arch));
            }
        }

        let mut config = Config::default();
        config.paths.resources_dir = Some(store);
        config.paths.log_dir = Some(temp_dir.path().join("logs"));

        Self {
            temp_dir,
            bundle,
            executable_dir,
            config,
        }
    }

    /// Bundle with thin binaries for `arch`
    pub fn thin(arch: Architecture) -> Self {
        Self::with_binary(&thin_macho(arch))
    }

    /// Engine that believes the host is `host`
    pub fn engine(&self, host: Architecture) -> CompatibilityEngine {
        EngineBuilder::new()
            .with_config(self.config.clone())
            .with_platform(Platform::with_probe(Arc::new(NativeProbe::with_host(host))))
            .build()
            .unwrap()
    }

    /// Engine with an event channel attached
    pub fn engine_with_events(&self, host: Architecture) -> (CompatibilityEngine, EventReceiver) {
        let (tx, rx) = archfix_events::channel();
        let engine = EngineBuilder::new()
            .with_config(self.config.clone())
            .with_platform(Platform::with_probe(Arc::new(NativeProbe::with_host(host))))
            .with_event_sender(tx)
            .build()
            .unwrap();
        (engine, rx)
    }

    /// Architectures currently reported by a file in the executable dir
    pub async fn architecture_of(&self, name: &str) -> ArchitectureSet {
        NativeProbe::new()
            .binary_architecture(&PlatformContext::default(), &self.executable_dir.join(name))
            .await
            .unwrap()
    }

    pub fn backup_dir(&self) -> PathBuf {
        self.executable_dir.join("ffmpeg_backup_original")
    }
}

/// Everything currently queued on the receiver
pub fn drain(rx: &mut EventReceiver) -> Vec<EventMessage> {
    let mut events = Vec::new();
    while let Ok(message) = rx.try_recv() {
        events.push(message);
    }
    events
}

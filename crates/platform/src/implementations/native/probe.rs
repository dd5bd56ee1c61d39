//! Header-based architecture probe

use archfix_errors::PlatformError;
use archfix_events::{AppEvent, EventEmitter, PlatformEvent};
use archfix_types::{Architecture, ArchitectureSet};
use async_trait::async_trait;
use object::{
    elf::{FileHeader32, FileHeader64, EM_AARCH64, EM_X86_64},
    macho::{MachHeader32, MachHeader64, CPU_TYPE_ARM64, CPU_TYPE_X86_64},
    read::{
        elf::FileHeader,
        macho::{FatArch, MachHeader, MachOFatFile32, MachOFatFile64},
    },
    Endianness, FileKind,
};
use std::path::Path;
use tokio::io::AsyncReadExt;

use super::host;
use crate::core::PlatformContext;
use crate::probe::{ArchitectureProbe, HostInfo};

/// Bytes read from the start of a file; enough for any header and fat table.
const HEADER_PROBE_LEN: u64 = 64 * 1024;

/// Probe backed by `uname(2)` and on-disk executable headers
#[derive(Debug, Clone, Default)]
pub struct NativeProbe {
    host_override: Option<Architecture>,
}

impl NativeProbe {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Report `host` instead of asking the kernel. Binary inspection is
    /// unaffected.
    #[must_use]
    pub fn with_host(host: Architecture) -> Self {
        Self {
            host_override: Some(host),
        }
    }
}

#[async_trait]
impl ArchitectureProbe for NativeProbe {
    async fn host_info(&self, ctx: &PlatformContext) -> HostInfo {
        let info = if let Some(architecture) = self.host_override {
            HostInfo {
                machine: architecture.as_str().to_string(),
                architecture,
                translated: false,
            }
        } else {
            let machine = host::machine_identifier().unwrap_or_default();
            let translated = host::is_translated();
            // Under Rosetta uname reports the emulated x86_64 machine
            let architecture = if translated {
                Architecture::Arm64
            } else {
                Architecture::from_machine(&machine)
            };
            HostInfo {
                machine,
                architecture,
                translated,
            }
        };

        tracing::debug!(
            machine = %info.machine,
            arch = %info.architecture,
            translated = info.translated,
            "host architecture detected"
        );
        ctx.emit(AppEvent::Platform(PlatformEvent::HostDetected {
            machine: info.machine.clone(),
            architecture: info.architecture,
            translated: info.translated,
        }));
        info
    }

    async fn binary_architecture(
        &self,
        ctx: &PlatformContext,
        path: &Path,
    ) -> Result<ArchitectureSet, PlatformError> {
        let file = match tokio::fs::File::open(path).await {
            Ok(file) => file,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(PlatformError::FileNotFound {
                    path: path.display().to_string(),
                });
            }
            Err(err) => {
                tracing::debug!(path = %path.display(), error = %err, "binary unreadable");
                return Ok(ArchitectureSet::unknown());
            }
        };

        let mut header = Vec::new();
        let architectures = match file.take(HEADER_PROBE_LEN).read_to_end(&mut header).await {
            Ok(_) => decode_architectures(&header),
            Err(err) => {
                tracing::debug!(path = %path.display(), error = %err, "binary unreadable");
                ArchitectureSet::unknown()
            }
        };

        tracing::debug!(path = %path.display(), arch = %architectures, "binary probed");
        ctx.emit(AppEvent::Platform(PlatformEvent::BinaryProbed {
            path: path.display().to_string(),
            architectures: architectures.clone(),
        }));
        Ok(architectures)
    }
}

/// Decode the architectures named by an executable header.
///
/// Handles thin and fat Mach-O plus ELF. Anything else, or a header that does
/// not parse, yields the unknown set.
#[must_use]
pub fn decode_architectures(data: &[u8]) -> ArchitectureSet {
    let Ok(kind) = FileKind::parse(data) else {
        return ArchitectureSet::unknown();
    };

    match kind {
        FileKind::MachO64 => MachHeader64::<Endianness>::parse(data, 0)
            .ok()
            .and_then(|header| Some(header.cputype(header.endian().ok()?)))
            .map_or_else(ArchitectureSet::unknown, |cputype| {
                from_cputype(cputype).into()
            }),
        FileKind::MachO32 => MachHeader32::<Endianness>::parse(data, 0)
            .ok()
            .and_then(|header| Some(header.cputype(header.endian().ok()?)))
            .map_or_else(ArchitectureSet::unknown, |cputype| {
                from_cputype(cputype).into()
            }),
        FileKind::MachOFat32 => MachOFatFile32::parse(data).map_or_else(
            |_| ArchitectureSet::unknown(),
            |fat| fat.arches().iter().map(|arch| from_cputype(arch.cputype())).collect(),
        ),
        FileKind::MachOFat64 => MachOFatFile64::parse(data).map_or_else(
            |_| ArchitectureSet::unknown(),
            |fat| fat.arches().iter().map(|arch| from_cputype(arch.cputype())).collect(),
        ),
        FileKind::Elf64 => FileHeader64::<Endianness>::parse(data)
            .ok()
            .and_then(|header| Some(header.e_machine(header.endian().ok()?)))
            .map_or_else(ArchitectureSet::unknown, |machine| {
                from_elf_machine(machine).into()
            }),
        FileKind::Elf32 => FileHeader32::<Endianness>::parse(data)
            .ok()
            .and_then(|header| Some(header.e_machine(header.endian().ok()?)))
            .map_or_else(ArchitectureSet::unknown, |machine| {
                from_elf_machine(machine).into()
            }),
        _ => ArchitectureSet::unknown(),
    }
}

fn from_cputype(cputype: u32) -> Architecture {
    match cputype {
        CPU_TYPE_X86_64 => Architecture::X86_64,
        CPU_TYPE_ARM64 => Architecture::Arm64,
        _ => Architecture::Unknown,
    }
}

fn from_elf_machine(machine: u16) -> Architecture {
    match machine {
        EM_X86_64 => Architecture::X86_64,
        EM_AARCH64 => Architecture::Arm64,
        _ => Architecture::Unknown,
    }
}

#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

//! Platform abstraction layer for architecture inspection and binary swaps.
//!
//! This crate provides a unified interface for the host-facing operations the
//! repository and engine need:
//! - Architecture probing (host identifier, Mach-O thin/fat and ELF headers)
//! - Filesystem operations (whole-file copies, atomic replace, permissions)
//!
//! Both are traits so that callers can substitute a fixed host or an
//! instrumented filesystem.

pub mod core;
pub mod filesystem;
pub mod implementations;
pub mod probe;

pub use core::{Platform, PlatformContext};
pub use implementations::native::{NativeFilesystem, NativeProbe};

/// Re-export commonly used types
pub use filesystem::FilesystemOperations;
pub use probe::{ArchitectureProbe, HostInfo};

//! Implementation backed by the running operating system

mod filesystem;
mod host;
mod probe;

pub use filesystem::NativeFilesystem;
pub use probe::{decode_architectures, NativeProbe};

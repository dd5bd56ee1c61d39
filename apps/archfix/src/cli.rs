//! Command line interface definition

use archfix_types::{Architecture, ColorChoice};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// archfix - Detect and repair transcoder architecture mismatches
#[derive(Parser)]
#[command(name = "archfix")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Detect and repair transcoder architecture mismatches in media server bundles")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalArgs,
}

/// Global arguments available for all commands
#[derive(Parser)]
pub struct GlobalArgs {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable debug logging to the log directory
    #[arg(long, global = true)]
    pub debug: bool,

    /// Color output control
    #[arg(long, global = true, value_enum)]
    pub color: Option<ColorChoice>,

    /// Use alternate config file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Treat the host as this architecture instead of asking the kernel
    #[arg(long, global = true, value_name = "ARCH")]
    pub assume_host: Option<Architecture>,
}

/// Bundle path argument shared by bundle commands
#[derive(Args, Clone, Debug)]
pub struct BundleArg {
    /// Application bundle or install directory (default: first known install found)
    pub path: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand)]
pub enum Commands {
    /// Compare the host architecture with the bundle's transcoder
    Check(BundleArg),

    /// Back up the transcoder binaries and install the host-matching variant
    Fix(BundleArg),

    /// Put the backed-up original binaries back
    Restore(BundleArg),

    /// Install a specific architecture regardless of the host (testing)
    Force {
        #[command(flatten)]
        bundle: BundleArg,

        /// Architecture to install (default: the one opposite to the host)
        #[arg(long, value_name = "ARCH")]
        arch: Option<Architecture>,
    },

    /// Report whether the bundle has a backup
    Backup(BundleArg),

    /// Validate a bundle path and show its layout
    Select(BundleArg),

    /// Show the engine's operation state
    State,

    /// Show the operation log, newest first
    Log {
        /// Render as indented text instead of a table
        #[arg(long)]
        text: bool,
    },
}

impl Commands {
    /// Get command name for logging
    pub fn name(&self) -> &'static str {
        match self {
            Commands::Check(_) => "check",
            Commands::Fix(_) => "fix",
            Commands::Restore(_) => "restore",
            Commands::Force { .. } => "force",
            Commands::Backup(_) => "backup",
            Commands::Select(_) => "select",
            Commands::State => "state",
            Commands::Log { .. } => "log",
        }
    }

    /// Bundle path argument, for commands that take one
    pub fn bundle_path(&self) -> Option<Option<&PathBuf>> {
        match self {
            Commands::Check(arg)
            | Commands::Fix(arg)
            | Commands::Restore(arg)
            | Commands::Backup(arg)
            | Commands::Select(arg)
            | Commands::Force { bundle: arg, .. } => Some(arg.path.as_ref()),
            Commands::State | Commands::Log { .. } => None,
        }
    }

    /// Whether the command changes files and can be stopped with Ctrl-C
    pub fn is_mutating(&self) -> bool {
        matches!(
            self,
            Commands::Fix(_) | Commands::Restore(_) | Commands::Force { .. }
        )
    }
}

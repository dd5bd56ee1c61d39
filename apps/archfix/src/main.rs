//! archfix - Detect and repair transcoder architecture mismatches
//!
//! This is the CLI shell over the compatibility engine: it loads the
//! configuration, maps subcommands to engine operations, renders results and
//! turns Ctrl-C into a cooperative stop.

mod cli;
mod display;
mod error;
mod events;
mod logging;

use crate::cli::{Cli, Commands};
use crate::display::OutputRenderer;
use crate::error::CliError;
use crate::events::EventHandler;
use archfix_config::Config;
use archfix_events::EventReceiver;
use archfix_ops::{CompatibilityEngine, EngineBuilder, OperationResult};
use archfix_platform::{NativeProbe, Platform};
use archfix_types::{ColorChoice, OutputFormat};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;
use tokio::select;
use tracing::{error, info, warn};

/// Exit code for a check that found an incompatible transcoder
const EXIT_INCOMPATIBLE: i32 = 2;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Load configuration with proper precedence:
    // 1. Start with file config (or defaults)
    // 2. Merge environment variables
    // 3. Apply CLI flags (highest precedence)
    let config = match load_config(&cli).await {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    };
    let json_mode = cli.global.json || config.general.default_output == OutputFormat::Json;

    init_tracing(json_mode, cli.global.debug, &config.log_dir());

    let renderer = OutputRenderer::new(json_mode, config.general.color);
    match run(cli, config, json_mode).await {
        Ok(result) => {
            let incompatible =
                matches!(&result, OperationResult::Compatibility(report) if !report.is_compatible);
            if let Err(e) = renderer.render_result(&result) {
                error!("Failed to render result: {}", e);
                process::exit(1);
            }
            if incompatible {
                process::exit(EXIT_INCOMPATIBLE);
            }
        }
        Err(e) => {
            error!("Application error: {}", e);
            let _ = renderer.render_error(&e.to_string(), e.code());
            process::exit(1);
        }
    }
}

async fn load_config(cli: &Cli) -> Result<Config, CliError> {
    let mut config = Config::load_or_default(cli.global.config.as_deref()).await?;
    config.merge_env()?;
    if let Some(color) = cli.global.color {
        config.general.color = color;
    }
    Ok(config)
}

/// Main application logic
async fn run(
    cli: Cli,
    config: Config,
    json_mode: bool,
) -> Result<OperationResult, CliError> {
    info!("Starting archfix v{}", env!("CARGO_PKG_VERSION"));

    let bundle = match cli.command.bundle_path() {
        Some(path) => Some(resolve_bundle_path(path, &config)?),
        None => None,
    };

    let platform = match cli.global.assume_host {
        Some(host) => {
            warn!(%host, "host architecture overridden");
            Platform::with_probe(Arc::new(NativeProbe::with_host(host)))
        }
        None => Platform::native(),
    };

    let colors_enabled = match config.general.color {
        ColorChoice::Always => true,
        ColorChoice::Never => false,
        ColorChoice::Auto => console::Term::stderr().features().colors_supported(),
    };

    let (event_sender, event_receiver) = archfix_events::channel();
    let engine = EngineBuilder::new()
        .with_config(config)
        .with_platform(platform)
        .with_event_sender(event_sender)
        .build()?;

    let mut event_handler = EventHandler::new(colors_enabled, cli.global.debug, json_mode);

    let result = execute_command_with_events(
        cli.command,
        bundle,
        engine,
        event_receiver,
        &mut event_handler,
    )
    .await?;

    info!("Command completed successfully");
    Ok(result)
}

/// Use the given path, or the first known install that exists
fn resolve_bundle_path(path: Option<&PathBuf>, config: &Config) -> Result<PathBuf, CliError> {
    match path {
        Some(path) => Ok(path.clone()),
        None => {
            let found = config.default_bundle_path().ok_or(CliError::NoBundle)?;
            info!(bundle = %found.display(), "using default bundle");
            Ok(found)
        }
    }
}

/// Execute command with concurrent event handling and Ctrl-C forwarding
async fn execute_command_with_events(
    command: Commands,
    bundle: Option<PathBuf>,
    engine: CompatibilityEngine,
    mut event_receiver: EventReceiver,
    event_handler: &mut EventHandler,
) -> Result<OperationResult, CliError> {
    let stoppable = command.is_mutating();
    let name = command.name();
    let mut command_future = Box::pin(execute_command(command, bundle, engine.clone()));
    let mut interrupted = false;

    loop {
        select! {
            // Command completed
            result = &mut command_future => {
                // Drain any remaining events
                while let Ok(event) = event_receiver.try_recv() {
                    event_handler.handle_event(event);
                }
                return result;
            }

            // Event received
            event = event_receiver.recv() => {
                match event {
                    Some(event) => event_handler.handle_event(event),
                    None => { /* Channel closed: keep waiting for command to finish */ }
                }
            }

            // First Ctrl-C stops cooperatively; the command future then settles
            signal = tokio::signal::ctrl_c(), if stoppable && !interrupted => {
                if signal.is_ok() {
                    interrupted = true;
                    let response = engine.stop();
                    warn!(command = name, stopped = response.stopped, "interrupt received");
                }
            }
        }
    }
}

/// Execute the specified command
async fn execute_command(
    command: Commands,
    bundle: Option<PathBuf>,
    engine: CompatibilityEngine,
) -> Result<OperationResult, CliError> {
    let bundle = bundle.unwrap_or_default();
    let path: &Path = &bundle;
    match command {
        Commands::Check(_) => {
            let report = engine.check(path).await?;
            Ok(OperationResult::Compatibility(report))
        }
        Commands::Fix(_) => {
            let report = engine.fix(path).await?;
            Ok(OperationResult::Repair(report))
        }
        Commands::Restore(_) => {
            let report = engine.restore(path).await?;
            Ok(OperationResult::Repair(report))
        }
        Commands::Force { arch, .. } => {
            let report = engine.force_test(path, arch).await?;
            Ok(OperationResult::Repair(report))
        }
        Commands::Backup(_) => {
            let status = engine.check_backup(path).await?;
            Ok(OperationResult::Backup(status))
        }
        Commands::Select(_) => {
            let selection = engine.select_bundle(path).await?;
            Ok(OperationResult::Bundle(selection))
        }
        Commands::State => Ok(OperationResult::Process(engine.process_state())),
        Commands::Log { text } => {
            if text {
                Ok(OperationResult::Success(engine.get_log_text()))
            } else {
                Ok(OperationResult::Log(engine.get_log()))
            }
        }
    }
}

/// Initialize tracing/logging
fn init_tracing(json_mode: bool, debug_enabled_flag: bool, log_dir: &Path) {
    // Check if debug logging is enabled
    let debug_enabled = std::env::var("RUST_LOG").is_ok() || debug_enabled_flag;
    let debug_filter = || {
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            tracing_subscriber::EnvFilter::new("info,archfix=debug,archfix_ops=debug")
        })
    };

    if debug_enabled {
        // Debug mode: structured JSON logs to file
        if let Err(e) = std::fs::create_dir_all(log_dir) {
            if !json_mode {
                eprintln!("Warning: Failed to create log directory: {e}");
            }
        }

        let log_file = log_dir.join(format!(
            "archfix-{}.log",
            chrono::Utc::now().format("%Y%m%d-%H%M%S")
        ));

        match std::fs::File::create(&log_file) {
            Ok(file) => {
                tracing_subscriber::fmt()
                    .json()
                    .with_writer(file)
                    .with_env_filter(debug_filter())
                    .init();
                if !json_mode {
                    eprintln!("Debug logging enabled: {}", log_file.display());
                }
                return;
            }
            Err(e) => {
                if !json_mode {
                    eprintln!("Warning: Failed to create log file: {e}");
                }
            }
        }
    }

    if json_mode {
        // JSON mode: suppress all console output to avoid contaminating JSON
        tracing_subscriber::fmt()
            .with_writer(std::io::sink)
            .with_env_filter("off")
            .init();
    } else {
        // Normal mode: minimal logging to stderr
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                    tracing_subscriber::EnvFilter::new("warn,archfix=warn,archfix_ops=warn")
                }),
            )
            .init();
    }
}

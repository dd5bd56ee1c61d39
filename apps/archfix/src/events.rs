//! Event handling and progress display

use archfix_events::{AppEvent, BundleEvent, EngineEvent, EventMessage, GeneralEvent};
use console::{Style, Term};

use crate::logging::log_event_with_tracing;

/// Event handler for progress lines and user feedback
pub struct EventHandler {
    term: Term,
    colors_enabled: bool,
    debug_enabled: bool,
    /// Suppress terminal output entirely (JSON mode)
    quiet: bool,
}

impl EventHandler {
    /// Create new event handler
    pub fn new(colors_enabled: bool, debug_enabled: bool, quiet: bool) -> Self {
        Self {
            term: Term::stderr(),
            colors_enabled,
            debug_enabled,
            quiet,
        }
    }

    /// Handle incoming event
    pub fn handle_event(&mut self, message: EventMessage) {
        log_event_with_tracing(&message);
        if self.quiet {
            return;
        }

        match message.event {
            AppEvent::Engine(EngineEvent::StepStarted { step, .. }) => {
                self.show_status(&format!("{step}..."));
            }
            AppEvent::Engine(EngineEvent::StopRequested { operation }) => {
                self.show_warning(&format!("Stopping {operation} after the current step"));
            }
            AppEvent::Bundle(BundleEvent::BackupExists { backup_dir, .. }) => {
                self.show_status(&format!("Keeping existing backup in {backup_dir}"));
            }
            AppEvent::Bundle(BundleEvent::BackupCompleted {
                backup_dir, files, ..
            }) => {
                self.show_success(&format!("Backed up {files} file(s) to {backup_dir}"));
            }
            AppEvent::Bundle(BundleEvent::ReplaceCompleted { target, files, .. }) => {
                self.show_success(&format!("Installed {target} binaries ({files} file(s))"));
            }
            AppEvent::Bundle(BundleEvent::RestoreCompleted { files, .. }) => {
                self.show_success(&format!("Restored {files} file(s)"));
            }
            AppEvent::Bundle(BundleEvent::RestoreFailed { restored, .. }) => {
                self.show_error(&format!(
                    "Restore stopped after {restored} file(s); run restore again to finish"
                ));
            }
            AppEvent::Bundle(BundleEvent::FileCopied {
                source,
                destination,
            }) if self.debug_enabled => {
                self.show_status(&format!("  {source} -> {destination}"));
            }
            AppEvent::General(GeneralEvent::Warning { message, context }) => {
                match context {
                    Some(context) => self.show_warning(&format!("{message} ({context})")),
                    None => self.show_warning(&message),
                }
            }
            AppEvent::General(GeneralEvent::Error { message, .. }) => {
                self.show_error(&message);
            }
            _ => {}
        }
    }

    fn style(&self, style: Style) -> Style {
        if self.colors_enabled {
            style
        } else {
            Style::new()
        }
    }

    fn show_status(&self, message: &str) {
        let _ = self.term.write_line(&self.style(Style::new().dim()).apply_to(message).to_string());
    }

    fn show_success(&self, message: &str) {
        let styled = self.style(Style::new().green()).apply_to(message);
        let _ = self.term.write_line(&styled.to_string());
    }

    fn show_warning(&self, message: &str) {
        let styled = self.style(Style::new().yellow()).apply_to(format!("Warning: {message}"));
        let _ = self.term.write_line(&styled.to_string());
    }

    fn show_error(&self, message: &str) {
        let styled = self.style(Style::new().red().bold()).apply_to(message);
        let _ = self.term.write_line(&styled.to_string());
    }
}

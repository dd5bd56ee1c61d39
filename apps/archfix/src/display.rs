//! Output rendering and formatting

use archfix_ops::{
    BackupStatus, BundleSelection, CompatibilityReport, OperationResult, ProcessStatus,
    RepairReport,
};
use archfix_oplog::LogNode;
use archfix_repository::BundleKind;
use archfix_types::{ColorChoice, LogStatus};
use comfy_table::{presets::UTF8_FULL, Attribute, Cell, Color, ContentArrangement, Table};
use console::{Style, Term};
use std::io;

/// Output renderer for CLI results
#[derive(Clone)]
pub struct OutputRenderer {
    /// Use JSON output format
    json_output: bool,
    /// Color configuration
    color_choice: ColorChoice,
    /// Terminal instance
    term: Term,
}

impl OutputRenderer {
    /// Create new output renderer
    pub fn new(json_output: bool, color_choice: ColorChoice) -> Self {
        Self {
            json_output,
            color_choice,
            term: Term::stdout(),
        }
    }

    /// Render operation result
    pub fn render_result(&self, result: &OperationResult) -> io::Result<()> {
        if self.json_output {
            self.render_json(result)
        } else {
            self.render_table(result)
        }
    }

    /// Render a failure; JSON mode keeps stdout machine readable
    pub fn render_error(&self, message: &str, code: Option<&str>) -> io::Result<()> {
        if self.json_output {
            let json = serde_json::json!({
                "type": "Error",
                "data": { "message": message, "code": code },
            });
            println!(
                "{}",
                serde_json::to_string_pretty(&json).map_err(io::Error::other)?
            );
        } else {
            eprintln!("{}", self.paint(Style::new().red().bold(), &format!("Error: {message}")));
        }
        Ok(())
    }

    /// Render as JSON
    fn render_json(&self, result: &OperationResult) -> io::Result<()> {
        let json = result.to_json().map_err(io::Error::other)?;
        println!("{json}");
        Ok(())
    }

    /// Render as formatted table
    fn render_table(&self, result: &OperationResult) -> io::Result<()> {
        match result {
            OperationResult::Compatibility(report) => self.render_compatibility(report),
            OperationResult::Repair(report) => self.render_repair(report),
            OperationResult::Backup(status) => self.render_backup_status(status),
            OperationResult::Stop(response) => {
                if response.stopped {
                    println!("Stop requested; the running operation ends after its current step.");
                } else {
                    println!("No operation is running.");
                }
                Ok(())
            }
            OperationResult::Process(status) => self.render_process_status(status),
            OperationResult::Log(nodes) => self.render_log(nodes),
            OperationResult::Bundle(selection) => self.render_selection(selection),
            OperationResult::Success(message) => self.render_success_message(message),
        }
    }

    fn render_compatibility(&self, report: &CompatibilityReport) -> io::Result<()> {
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic);

        table.set_header(vec![
            Cell::new("Bundle").add_attribute(Attribute::Bold),
            Cell::new("Host").add_attribute(Attribute::Bold),
            Cell::new("Transcoder").add_attribute(Attribute::Bold),
            Cell::new("Compatible").add_attribute(Attribute::Bold),
        ]);
        table.add_row(vec![
            Cell::new(report.bundle.display()),
            Cell::new(report.host_architecture),
            Cell::new(&report.binary_architecture),
            Self::verdict_cell(report.is_compatible),
        ]);
        println!("{table}");

        if !report.is_compatible {
            println!();
            println!(
                "The transcoder does not run natively on {}. Run `archfix fix` to install a matching build.",
                report.host_architecture
            );
        }
        Ok(())
    }

    fn render_repair(&self, report: &RepairReport) -> io::Result<()> {
        println!("{}", self.paint(Style::new().bold(), &report.message));
        if let Some(created) = report.backup_created {
            let note = if created {
                "Backup created"
            } else {
                "Existing backup kept"
            };
            println!("{note}");
        }
        if !report.files.is_empty() {
            println!("Files: {}", report.files.join(", "));
        }
        println!();
        self.render_compatibility(&report.verdict)
    }

    fn render_backup_status(&self, status: &BackupStatus) -> io::Result<()> {
        if status.has_backup {
            println!("Backup present: {}", status.backup_dir.display());
        } else {
            println!("No backup at {}", status.backup_dir.display());
        }
        Ok(())
    }

    fn render_process_status(&self, status: &ProcessStatus) -> io::Result<()> {
        let state = status.state.to_string();
        if status.is_processing {
            println!("{}", self.paint(Style::new().yellow(), &state));
        } else {
            println!("{state}");
        }
        Ok(())
    }

    fn render_log(&self, nodes: &[LogNode]) -> io::Result<()> {
        if nodes.is_empty() {
            println!("No operations recorded.");
            return Ok(());
        }

        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic);

        table.set_header(vec![
            Cell::new("Time").add_attribute(Attribute::Bold),
            Cell::new("Status").add_attribute(Attribute::Bold),
            Cell::new("Step").add_attribute(Attribute::Bold),
        ]);

        for node in nodes {
            table.add_row(vec![
                Cell::new(node.entry.timestamp.format("%Y-%m-%d %H:%M:%S")),
                Self::status_cell(node.entry.status),
                Cell::new(&node.entry.label).add_attribute(Attribute::Bold),
            ]);
            for child in &node.children {
                table.add_row(vec![
                    Cell::new(child.timestamp.format("%H:%M:%S")),
                    Self::status_cell(child.status),
                    Cell::new(format!("  {}", child.label)),
                ]);
            }
        }

        println!("{table}");
        Ok(())
    }

    fn render_selection(&self, selection: &BundleSelection) -> io::Result<()> {
        let location = &selection.location;
        let kind = match location.kind {
            BundleKind::AppBundle => "application bundle",
            BundleKind::InstallDir => "install directory",
        };
        println!(
            "{} ({kind})",
            self.paint(Style::new().bold(), &location.root.display().to_string())
        );
        println!();
        println!("Executables:   {}", location.executable_dir.display());
        println!("Resources:     {}", location.resource_dir.display());
        println!("Binaries:      {}", selection.binaries.names().join(", "));
        println!("Variant store: {}", selection.variant_store.display());
        println!(
            "Backup:        {}",
            if selection.has_backup { "present" } else { "none" }
        );
        Ok(())
    }

    fn render_success_message(&self, message: &str) -> io::Result<()> {
        println!("{message}");
        Ok(())
    }

    fn verdict_cell(compatible: bool) -> Cell {
        if compatible {
            Cell::new("yes").fg(Color::Green)
        } else {
            Cell::new("no").fg(Color::Red).add_attribute(Attribute::Bold)
        }
    }

    fn status_cell(status: LogStatus) -> Cell {
        let cell = Cell::new(status);
        match status {
            LogStatus::Active => cell.fg(Color::Yellow),
            LogStatus::Complete => cell.fg(Color::Green),
            LogStatus::Error => cell.fg(Color::Red),
        }
    }

    fn paint(&self, style: Style, text: &str) -> String {
        if self.supports_color() {
            style.apply_to(text).to_string()
        } else {
            text.to_string()
        }
    }

    /// Check if color output is supported
    fn supports_color(&self) -> bool {
        match self.color_choice {
            ColorChoice::Always => true,
            ColorChoice::Never => false,
            ColorChoice::Auto => self.term.features().colors_supported(),
        }
    }
}

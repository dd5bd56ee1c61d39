//! JSON-lines persistence for the operation log
//!
//! Each line is the full state of one entry after a change. Replaying the
//! file in order, last line per id wins.

use archfix_errors::Error;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::entry::LogEntry;

/// Appends are small synchronous writes made under the log's lock through
/// one handle kept open between records.
#[derive(Debug)]
pub(crate) struct Journal {
    path: PathBuf,
    writer: Option<File>,
}

impl Journal {
    pub(crate) fn new(path: PathBuf) -> Self {
        Self { path, writer: None }
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    /// Replay the journal into entries ordered by first appearance.
    ///
    /// A missing file is an empty log. Lines that fail to parse are skipped.
    pub(crate) fn replay(&self) -> Result<Vec<LogEntry>, Error> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(Error::io_with_path(&e, &self.path)),
        };

        let mut entries: Vec<LogEntry> = Vec::new();
        for (number, line) in BufReader::new(file).lines().enumerate() {
            let line = line.map_err(|e| Error::io_with_path(&e, &self.path))?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<LogEntry>(&line) {
                Ok(entry) => {
                    if let Some(existing) = entries.iter_mut().find(|e| e.id == entry.id) {
                        *existing = entry;
                    } else {
                        entries.push(entry);
                    }
                }
                Err(err) => {
                    tracing::warn!(
                        journal = %self.path.display(),
                        line = number + 1,
                        error = %err,
                        "skipping unreadable journal line"
                    );
                }
            }
        }
        Ok(entries)
    }

    /// Rewrite the journal to hold exactly `entries`
    pub(crate) fn compact(&mut self, entries: &[LogEntry]) -> Result<(), Error> {
        // The rename below replaces the file the handle points at
        self.writer = None;
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| Error::io_with_path(&e, parent))?;
        }
        let tmp = self.path.with_extension("jsonl.tmp");
        {
            let file = File::create(&tmp).map_err(|e| Error::io_with_path(&e, &tmp))?;
            let mut writer = BufWriter::new(file);
            for entry in entries {
                serde_json::to_writer(&mut writer, entry)?;
                writer
                    .write_all(b"\n")
                    .map_err(|e| Error::io_with_path(&e, &tmp))?;
            }
            writer.flush().map_err(|e| Error::io_with_path(&e, &tmp))?;
        }
        fs::rename(&tmp, &self.path).map_err(|e| Error::io_with_path(&e, &self.path))
    }

    /// Append the current state of one entry
    pub(crate) fn record(&mut self, entry: &LogEntry) -> Result<(), Error> {
        let mut line = serde_json::to_vec(entry)?;
        line.push(b'\n');
        let file = match &mut self.writer {
            Some(file) => file,
            None => {
                let file = OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(&self.path)
                    .map_err(|e| Error::io_with_path(&e, &self.path))?;
                self.writer.insert(file)
            }
        };
        if let Err(e) = file.write_all(&line) {
            self.writer = None;
            return Err(Error::io_with_path(&e, &self.path));
        }
        Ok(())
    }
}

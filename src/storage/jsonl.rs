//! JSONL storage for operation logs
//!
//! One JSON object per line. Appends go straight to the end of the file;
//! popping the last record rewrites the file through a temp file and rename.
//! Uses file locking for concurrent access safety.

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use fs2::FileExt;
use tracing::warn;

use crate::domain::Operation;

/// A line of the log that could not be decoded
#[derive(Debug)]
pub struct CorruptLine {
    pub line: usize,
    pub error: serde_json::Error,
}

/// Append-only log of operations
#[derive(Debug, Clone)]
pub struct OperationLog {
    path: PathBuf,
}

impl OperationLog {
    /// Creates a log at the given path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the path to the log file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the non-blank lines of the log with their 1-based file line
    fn read_lines(&self) -> Result<Vec<(usize, String)>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let file = File::open(&self.path)
            .with_context(|| format!("Failed to open log: {}", self.path.display()))?;

        // Acquire shared lock for reading
        file.lock_shared()
            .context("Failed to acquire read lock on log")?;

        let reader = BufReader::new(&file);
        let mut lines = Vec::new();

        for (line_num, line) in reader.lines().enumerate() {
            let line = line.with_context(|| format!("Failed to read line {}", line_num + 1))?;
            if !line.trim().is_empty() {
                lines.push((line_num + 1, line));
            }
        }

        Ok(lines)
    }

    /// Reads every decodable operation, oldest first.
    ///
    /// Lines that fail to decode are skipped with a warning.
    pub fn read_all(&self) -> Result<Vec<Operation>> {
        let (ops, corrupt) = self.read_checked()?;
        for bad in corrupt {
            warn!(
                path = %self.path.display(),
                line = bad.line,
                error = %bad.error,
                "skipping unreadable log entry"
            );
        }
        Ok(ops)
    }

    /// Reads every operation, returning undecodable lines separately
    pub fn read_checked(&self) -> Result<(Vec<Operation>, Vec<CorruptLine>)> {
        let mut ops = Vec::new();
        let mut corrupt = Vec::new();

        for (line, text) in self.read_lines()? {
            match serde_json::from_str(&text) {
                Ok(op) => ops.push(op),
                Err(error) => corrupt.push(CorruptLine { line, error }),
            }
        }

        Ok((ops, corrupt))
    }

    /// Returns the newest raw line, if any, with its 1-based file line
    pub fn last_line(&self) -> Result<Option<(usize, String)>> {
        Ok(self.read_lines()?.pop())
    }

    /// Returns true if the log holds no records
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.read_lines()?.is_empty())
    }

    /// Appends a single operation
    pub fn append(&self, op: &Operation) -> Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Failed to open log: {}", self.path.display()))?;

        // Acquire exclusive lock
        file.lock_exclusive()
            .context("Failed to acquire write lock on log")?;

        let mut writer = BufWriter::new(&file);
        let line = serde_json::to_string(op).context("Failed to serialize operation")?;
        writeln!(writer, "{}", line).context("Failed to write operation")?;

        writer.flush().context("Failed to flush log")?;

        Ok(())
    }

    /// Drops the newest record. Returns false if the log was already empty.
    pub fn pop_last(&self) -> Result<bool> {
        let mut lines = self.read_lines()?;
        if lines.pop().is_none() {
            return Ok(false);
        }
        let lines: Vec<String> = lines.into_iter().map(|(_, text)| text).collect();
        self.write_lines(&lines)?;
        Ok(true)
    }

    /// Rewrites the log with the given lines (atomic)
    fn write_lines(&self, lines: &[String]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        // Write to temp file first
        let temp_path = self.path.with_extension("jsonl.tmp");

        {
            let file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(&temp_path)
                .with_context(|| format!("Failed to create temp file: {}", temp_path.display()))?;

            file.lock_exclusive()
                .context("Failed to acquire write lock on log")?;

            let mut writer = BufWriter::new(&file);
            for line in lines {
                writeln!(writer, "{}", line).context("Failed to write operation")?;
            }

            writer.flush().context("Failed to flush log")?;
        }

        // Atomic rename
        fs::rename(&temp_path, &self.path).with_context(|| {
            format!(
                "Failed to rename {} to {}",
                temp_path.display(),
                self.path.display()
            )
        })?;

        Ok(())
    }

    /// Deletes the log file. Missing files are fine.
    pub fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => {
                Err(e).with_context(|| format!("Failed to remove log: {}", self.path.display()))
            }
        }
    }
}

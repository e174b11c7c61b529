//! Undo and redo over two operation logs
//!
//! The history log holds applied operations, the undo stack holds operations
//! that were rolled back. An operation lives in exactly one of them at a time:
//! undo moves the newest history entry onto the undo stack, redo moves the
//! newest undo entry back after recreating its effect.
//!
//! Recording a fresh operation clears the undo stack.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use super::jsonl::OperationLog;
use crate::domain::{Operation, OperationKind};

pub const HISTORY_FILE: &str = "history.jsonl";
pub const UNDO_FILE: &str = "undo.jsonl";

/// Which end of the history had nothing to offer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryEmpty {
    Undo,
    Redo,
}

impl fmt::Display for HistoryEmpty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HistoryEmpty::Undo => f.write_str("Nothing to undo"),
            HistoryEmpty::Redo => f.write_str("Nothing to redo"),
        }
    }
}

#[derive(Debug, Error)]
pub enum RecreateError {
    #[error("Cannot recreate a {kind} operation")]
    Unsupported { kind: OperationKind },

    #[error("Cannot recreate {kind} operation: no {field} recorded")]
    MissingProvenance {
        kind: OperationKind,
        field: &'static str,
    },

    #[error(transparent)]
    Failed(#[from] anyhow::Error),
}

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("{0}")]
    Empty(HistoryEmpty),

    #[error(
        "Cannot redo a {kind} operation automatically; run it again manually. It stays on the redo stack, blocking older undone entries, until a new operation is recorded"
    )]
    RecreationUnsupported { kind: OperationKind },

    #[error("Redo failed: {0}")]
    Recreate(#[source] RecreateError),

    #[error("Corrupt entry at {}:{line}: {source}", .path.display())]
    Corrupt {
        path: PathBuf,
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Log(#[from] anyhow::Error),
}

impl HistoryError {
    /// Returns true for the expected "nothing to do" outcome
    pub fn is_empty(&self) -> bool {
        matches!(self, HistoryError::Empty(_))
    }
}

/// Rebuilds the effect of an undone operation.
///
/// Supplied by whoever owns the generation pipeline, so the history never
/// depends on how trees are produced.
pub trait Recreator {
    /// Re-runs `op` and returns the operation to record in its place
    fn recreate(&self, op: &Operation) -> Result<Operation, RecreateError>;
}

/// A path undo could not remove
#[derive(Debug, Clone, Serialize)]
pub struct RollbackFailure {
    pub path: PathBuf,
    pub error: String,
}

/// Outcome of a successful undo
#[derive(Debug, Clone, Serialize)]
pub struct UndoReport {
    pub operation: Operation,
    pub failures: Vec<RollbackFailure>,
}

/// The operation history of one workspace
#[derive(Debug, Clone)]
pub struct History {
    log: OperationLog,
    undo_log: OperationLog,
}

impl History {
    /// Uses `history.jsonl` and `undo.jsonl` inside `dir`
    pub fn for_dir(dir: &Path) -> Self {
        Self::new(dir.join(HISTORY_FILE), dir.join(UNDO_FILE))
    }

    pub fn new(log: impl Into<PathBuf>, undo_log: impl Into<PathBuf>) -> Self {
        Self {
            log: OperationLog::new(log),
            undo_log: OperationLog::new(undo_log),
        }
    }

    pub fn log_path(&self) -> &Path {
        self.log.path()
    }

    /// Appends `op` (timestamped if needed) and drops any pending redo
    pub fn record(&self, mut op: Operation) -> Result<(), HistoryError> {
        op.stamp();
        self.log.append(&op)?;
        self.undo_log.clear()?;
        debug!(kind = %op.kind, target = %op.target.display(), "recorded operation");
        Ok(())
    }

    /// Rolls back the newest operation and moves it onto the undo stack
    pub fn undo(&self) -> Result<UndoReport, HistoryError> {
        let op = newest(&self.log)?.ok_or(HistoryError::Empty(HistoryEmpty::Undo))?;

        let failures = rollback(&op);
        for failure in &failures {
            debug!(path = %failure.path.display(), error = %failure.error, "could not remove");
        }

        self.undo_log.append(&op)?;
        self.log.pop_last()?;

        info!(kind = %op.kind, target = %op.target.display(), "undid operation");
        Ok(UndoReport {
            operation: op,
            failures,
        })
    }

    /// Recreates the newest undone operation and moves it back to history
    pub fn redo(&self, recreator: &dyn Recreator) -> Result<Operation, HistoryError> {
        let op = newest(&self.undo_log)?.ok_or(HistoryError::Empty(HistoryEmpty::Redo))?;

        if !op.kind.is_recreatable() {
            return Err(HistoryError::RecreationUnsupported { kind: op.kind });
        }

        let mut redone = recreator.recreate(&op).map_err(|e| match e {
            RecreateError::Unsupported { kind } => HistoryError::RecreationUnsupported { kind },
            other => HistoryError::Recreate(other),
        })?;

        redone.stamp();
        self.log.append(&redone)?;
        self.undo_log.pop_last()?;

        info!(kind = %redone.kind, target = %redone.target.display(), "redid operation");
        Ok(redone)
    }

    /// Applied operations, oldest first
    pub fn list(&self) -> Result<Vec<Operation>, HistoryError> {
        Ok(self.log.read_all()?)
    }

    /// Undone operations, oldest first (the last one is redone next)
    pub fn list_undo_stack(&self) -> Result<Vec<Operation>, HistoryError> {
        Ok(self.undo_log.read_all()?)
    }

    /// Forgets everything in both logs
    pub fn clear(&self) -> Result<(), HistoryError> {
        self.log.clear()?;
        self.undo_log.clear()?;
        Ok(())
    }
}

fn newest(log: &OperationLog) -> Result<Option<Operation>, HistoryError> {
    let Some((line, text)) = log.last_line()? else {
        return Ok(None);
    };

    serde_json::from_str(&text)
        .map(Some)
        .map_err(|source| HistoryError::Corrupt {
            path: log.path().to_path_buf(),
            line,
            source,
        })
}

/// Removes what `op` created. Missing paths count as removed.
fn rollback(op: &Operation) -> Vec<RollbackFailure> {
    let mut failures = Vec::new();

    if op.kind.rolls_back_receipt() {
        let Some(receipt) = &op.receipt else {
            return failures;
        };

        for file in &receipt.created_files {
            remove(file, |p| fs::remove_file(p), &mut failures);
        }
        for dir in receipt.dirs_deepest_first() {
            remove(dir, |p| fs::remove_dir(p), &mut failures);
        }
    } else {
        remove(&op.target, |p| fs::remove_file(p), &mut failures);
    }

    failures
}

fn remove(path: &Path, op: impl Fn(&Path) -> io::Result<()>, failures: &mut Vec<RollbackFailure>) {
    match op(path) {
        Ok(()) => debug!(path = %path.display(), "removed"),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => failures.push(RollbackFailure {
            path: path.to_path_buf(),
            error: e.to_string(),
        }),
    }
}

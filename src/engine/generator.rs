//! Tree -> directories and files on disk
//!
//! The root's children populate the output directory directly. Every created
//! (or, in a dry run, would-be created) path is appended to the [`Receipt`]
//! in creation order, parents before children, so undo can replay it
//! backwards.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, trace};

use crate::domain::{CancelToken, Node, NodeKind, Receipt, Tree};

/// Options for one generation run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GenerateOptions {
    /// Record paths without touching the filesystem
    pub dry_run: bool,

    /// Overwrite existing files whose content differs
    pub force: bool,
}

impl GenerateOptions {
    pub fn forced() -> Self {
        Self {
            dry_run: false,
            force: true,
        }
    }

    pub fn dry_run() -> Self {
        Self {
            dry_run: true,
            force: false,
        }
    }
}

#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("{} already exists as a {found}, expected a {expected}", .path.display())]
    TypeConflict {
        path: PathBuf,
        expected: NodeKind,
        found: NodeKind,
    },

    #[error("File already exists: {} (use --force to overwrite)", .path.display())]
    Exists { path: PathBuf },

    #[error("Filesystem error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Generation cancelled")]
    Cancelled,
}

impl GenerateError {
    fn io(path: &Path, source: io::Error) -> Self {
        GenerateError::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    /// The path the error is about, if any
    pub fn path(&self) -> Option<&Path> {
        match self {
            GenerateError::TypeConflict { path, .. }
            | GenerateError::Exists { path }
            | GenerateError::Io { path, .. } => Some(path),
            GenerateError::Cancelled => None,
        }
    }
}

/// A generation that stopped early, with everything created before the stop
#[derive(Debug, Error)]
#[error("Generation stopped after {} entries", .receipt.len())]
pub struct GenerateFailure {
    pub receipt: Receipt,

    #[source]
    pub error: GenerateError,
}

/// Outcome of writing one file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FileWrite {
    Created,
    Overwritten,
    Unchanged,
}

/// Writes trees to disk
#[derive(Debug, Clone, Default)]
pub struct Generator {
    cancel: CancelToken,
}

impl Generator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses the given token to stop between node visits
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Generates the tree below `output_dir`.
    ///
    /// On failure the paths created so far are returned in the
    /// [`GenerateFailure`]; nothing is cleaned up.
    pub fn generate(
        &self,
        tree: &Tree,
        output_dir: &Path,
        options: GenerateOptions,
    ) -> Result<Receipt, GenerateFailure> {
        let mut receipt = Receipt::new();

        match self.run(tree, output_dir, options, &mut receipt) {
            Ok(()) => {
                debug!(
                    dirs = receipt.created_dirs.len(),
                    files = receipt.created_files.len(),
                    dry_run = options.dry_run,
                    "generation finished"
                );
                Ok(receipt)
            }
            Err(error) => Err(GenerateFailure { receipt, error }),
        }
    }

    fn run(
        &self,
        tree: &Tree,
        output_dir: &Path,
        options: GenerateOptions,
        receipt: &mut Receipt,
    ) -> Result<(), GenerateError> {
        let base = std::path::absolute(output_dir).map_err(|e| GenerateError::io(output_dir, e))?;

        if !options.dry_run {
            ensure_dir(&base)?;
        }

        for child in &tree.root.children {
            self.write_node(child, &base, options, receipt)?;
        }

        Ok(())
    }

    fn write_node(
        &self,
        node: &Node,
        parent: &Path,
        options: GenerateOptions,
        receipt: &mut Receipt,
    ) -> Result<(), GenerateError> {
        if self.cancel.is_cancelled() {
            return Err(GenerateError::Cancelled);
        }

        let target = parent.join(&node.name);

        match node.kind {
            NodeKind::Directory => {
                if !options.dry_run {
                    ensure_dir(&target)?;
                }
                receipt.record_dir(&target);

                for child in &node.children {
                    self.write_node(child, &target, options, receipt)?;
                }
            }
            NodeKind::File => {
                if !options.dry_run {
                    let outcome = write_file(&target, &node.content, options.force)?;
                    trace!(path = %target.display(), ?outcome, "file");
                }
                receipt.record_file(target);
            }
        }

        Ok(())
    }
}

/// Creates a directory (and parents) unless it already exists as one
fn ensure_dir(path: &Path) -> Result<(), GenerateError> {
    match fs::metadata(path) {
        Ok(meta) if meta.is_dir() => Ok(()),
        Ok(_) => Err(GenerateError::TypeConflict {
            path: path.to_path_buf(),
            expected: NodeKind::Directory,
            found: NodeKind::File,
        }),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            fs::create_dir_all(path).map_err(|e| GenerateError::io(path, e))
        }
        Err(e) => Err(GenerateError::io(path, e)),
    }
}

/// Writes a file, refusing to clobber without `force` and skipping identical content
fn write_file(path: &Path, content: &[u8], force: bool) -> Result<FileWrite, GenerateError> {
    match fs::metadata(path) {
        Ok(meta) if meta.is_dir() => Err(GenerateError::TypeConflict {
            path: path.to_path_buf(),
            expected: NodeKind::File,
            found: NodeKind::Directory,
        }),
        Ok(_) if !force => Err(GenerateError::Exists {
            path: path.to_path_buf(),
        }),
        Ok(_) => {
            let existing = fs::read(path).map_err(|e| GenerateError::io(path, e))?;
            if existing == content {
                debug!(path = %path.display(), "content unchanged, skipping write");
                return Ok(FileWrite::Unchanged);
            }
            fs::write(path, content).map_err(|e| GenerateError::io(path, e))?;
            Ok(FileWrite::Overwritten)
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            fs::write(path, content).map_err(|e| GenerateError::io(path, e))?;
            Ok(FileWrite::Created)
        }
        Err(e) => Err(GenerateError::io(path, e)),
    }
}

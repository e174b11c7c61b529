//! Directory on disk -> tree
//!
//! Kind is never guessed here: the filesystem says what each entry is.
//! Entries are visited directories-first and then by name, so reversing a
//! generated folder yields the order a blueprint author usually writes.

use std::cmp::Ordering;
use std::path::{Component, Path, PathBuf};

use thiserror::Error;
use tracing::debug;
use walkdir::{DirEntry, WalkDir};

use crate::domain::{CancelToken, Node, NodeKind, Tree};

#[derive(Debug, Error)]
pub enum ReverseError {
    #[error("Not a directory: {}", .path.display())]
    NotADirectory { path: PathBuf },

    #[error("Failed to read {}: {source}", .path.display())]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("Reverse cancelled")]
    Cancelled,
}

/// Reads folders into trees
#[derive(Debug, Clone, Default)]
pub struct Reverser {
    cancel: CancelToken,
    ignore: Vec<String>,
}

impl Reverser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses the given token to stop between entries
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Entry names that are neither recorded nor descended into
    pub fn with_ignored(mut self, names: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.ignore = names.into_iter().map(Into::into).collect();
        self
    }

    fn is_ignored(&self, entry: &DirEntry) -> bool {
        let name = entry.file_name().to_string_lossy();
        self.ignore.iter().any(|ignored| *ignored == name)
    }

    /// Builds a tree from `input_dir`; the root is named after its base name
    pub fn reverse(&self, input_dir: &Path) -> Result<Tree, ReverseError> {
        if !input_dir.is_dir() {
            return Err(ReverseError::NotADirectory {
                path: input_dir.to_path_buf(),
            });
        }

        let mut tree = Tree::new(root_name(input_dir));

        let walker = WalkDir::new(input_dir)
            .min_depth(1)
            .sort_by(dirs_first)
            .into_iter()
            .filter_entry(|entry| !self.is_ignored(entry));

        for entry in walker {
            if self.cancel.is_cancelled() {
                return Err(ReverseError::Cancelled);
            }

            let entry = entry.map_err(|source| ReverseError::Walk {
                path: source
                    .path()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| input_dir.to_path_buf()),
                source,
            })?;

            let Ok(relative) = entry.path().strip_prefix(input_dir) else {
                continue;
            };
            let segments = segments(relative);
            let kind = if entry.file_type().is_dir() {
                NodeKind::Directory
            } else {
                NodeKind::File
            };

            insert_path(&mut tree.root, &segments, kind);
        }

        let (dirs, files) = tree.stats();
        debug!(path = %input_dir.display(), dirs, files, "reversed folder");
        Ok(tree)
    }
}

/// Base name of the folder, resolving `.` and similar through the filesystem
fn root_name(dir: &Path) -> String {
    let named = |p: &Path| p.file_name().map(|n| n.to_string_lossy().into_owned());

    named(dir)
        .or_else(|| dir.canonicalize().ok().and_then(|p| named(&p)))
        .unwrap_or_else(|| "root".to_string())
}

fn dirs_first(a: &DirEntry, b: &DirEntry) -> Ordering {
    b.file_type()
        .is_dir()
        .cmp(&a.file_type().is_dir())
        .then_with(|| a.file_name().cmp(b.file_name()))
}

fn segments(relative: &Path) -> Vec<String> {
    relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect()
}

/// Inserts one path below `root`, one segment at a time.
///
/// Existing children are reused by name. Intermediate segments are
/// directories, promoting an existing file node if needed; the terminal
/// segment takes `kind`.
pub fn insert_path(root: &mut Node, segments: &[String], kind: NodeKind) {
    let mut current = root;

    for (i, name) in segments.iter().enumerate() {
        let last = i + 1 == segments.len();
        let wanted = if last { kind } else { NodeKind::Directory };

        let index = match current.children.iter().position(|c| &c.name == name) {
            Some(index) => {
                let existing = &mut current.children[index];
                if wanted == NodeKind::Directory {
                    existing.promote();
                }
                index
            }
            None => {
                let node = match wanted {
                    NodeKind::Directory => Node::dir(name.clone()),
                    NodeKind::File => Node::file(name.clone()),
                };
                current.push_child(node);
                current.children.len() - 1
            }
        };

        current = &mut current.children[index];
    }
}

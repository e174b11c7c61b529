//! Making a folder follow its blueprint
//!
//! Generation only ever adds. To mirror deletions made in a blueprint, the
//! folder is compared against the set of paths the tree names and every
//! other entry is removed.

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::info;
use walkdir::WalkDir;

use super::generator::GenerateError;
use crate::domain::{Node, Tree};

/// Relative paths of every node below the root
pub fn collect_allowed(tree: &Tree) -> HashSet<PathBuf> {
    fn visit(node: &Node, prefix: &Path, allowed: &mut HashSet<PathBuf>) {
        for child in &node.children {
            let path = prefix.join(&child.name);
            visit(child, &path, allowed);
            allowed.insert(path);
        }
    }

    let mut allowed = HashSet::new();
    visit(&tree.root, Path::new(""), &mut allowed);
    allowed
}

/// Entries pruning leaves alone, wherever they sit in the folder.
///
/// Keeping an entry also keeps every folder above it.
#[derive(Debug, Clone, Default)]
pub struct Protected {
    /// Names skipped together with their contents
    pub names: Vec<String>,
    /// Folder names kept with their contents, compared case-insensitively
    pub reserved_dirs: Vec<String>,
    /// Absolute paths of files that must survive
    pub paths: Vec<PathBuf>,
    /// Files with this extension survive
    pub extension: Option<String>,
}

impl Protected {
    fn is_reserved_dir(&self, name: &str) -> bool {
        self.reserved_dirs.iter().any(|r| r.eq_ignore_ascii_case(name))
    }

    fn keeps_file(&self, path: &Path) -> bool {
        self.paths.iter().any(|p| p == path)
            || self
                .extension
                .as_deref()
                .is_some_and(|ext| path.extension().is_some_and(|e| e == ext))
    }
}

/// Removes entries of `dir` that are neither in `allowed` nor protected.
///
/// Returns the removed paths; a removed folder is listed once.
pub fn prune_extra(
    dir: &Path,
    allowed: &HashSet<PathBuf>,
    protected: &Protected,
) -> Result<Vec<PathBuf>, GenerateError> {
    let mut keep = allowed.clone();
    let mut candidates = Vec::new();
    let mut walker = WalkDir::new(dir).min_depth(1).sort_by_file_name().into_iter();

    while let Some(entry) = walker.next() {
        let entry = entry.map_err(|e| GenerateError::Io {
            path: e.path().map(Path::to_path_buf).unwrap_or_else(|| dir.to_path_buf()),
            source: io::Error::from(e),
        })?;

        let is_dir = entry.file_type().is_dir();
        let name = entry.file_name().to_string_lossy();
        if protected.names.iter().any(|i| *i == name) {
            if is_dir {
                walker.skip_current_dir();
            }
            continue;
        }

        let Ok(relative) = entry.path().strip_prefix(dir) else {
            continue;
        };
        let relative = relative.to_path_buf();

        if is_dir && protected.is_reserved_dir(&name) {
            walker.skip_current_dir();
            keep_with_parents(&mut keep, &relative);
            continue;
        }
        if !is_dir && protected.keeps_file(entry.path()) {
            keep_with_parents(&mut keep, &relative);
            continue;
        }

        candidates.push((relative, is_dir));
    }

    // Walk order is pre-order, so a doomed folder precedes its contents
    let mut doomed: Vec<(PathBuf, bool)> = Vec::new();
    for (relative, is_dir) in candidates {
        if keep.contains(&relative)
            || doomed
                .iter()
                .any(|(d, dir_entry)| *dir_entry && relative.starts_with(d))
        {
            continue;
        }
        doomed.push((relative, is_dir));
    }

    let mut removed = Vec::with_capacity(doomed.len());
    for (relative, is_dir) in doomed {
        let path = dir.join(relative);
        let result = if is_dir {
            fs::remove_dir_all(&path)
        } else {
            fs::remove_file(&path)
        };
        match result {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
            Err(source) => return Err(GenerateError::Io { path, source }),
        }
        info!(path = %path.display(), "removed entry not in blueprint");
        removed.push(path);
    }

    Ok(removed)
}

fn keep_with_parents(keep: &mut HashSet<PathBuf>, relative: &Path) {
    for ancestor in relative.ancestors() {
        if ancestor.as_os_str().is_empty() {
            break;
        }
        keep.insert(ancestor.to_path_buf());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::parser::{Parser, BLUEPRINT_EXTENSION};
    use tempfile::TempDir;

    #[test]
    fn allowed_set_is_relative() {
        let tree = Parser::new()
            .parse_str("app/\n\tsrc/\n\t\tmain.rs\n\tREADME.md\n", "app")
            .unwrap()
            .tree;
        let allowed = collect_allowed(&tree);

        assert_eq!(allowed.len(), 3);
        assert!(allowed.contains(Path::new("src/main.rs")));
        assert!(!allowed.contains(Path::new("app")));
    }

    #[test]
    fn prunes_unlisted_entries() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("src")).unwrap();
        fs::create_dir_all(dir.path().join("old/deep")).unwrap();
        fs::write(dir.path().join("src/main.rs"), "").unwrap();
        fs::write(dir.path().join("src/stale.rs"), "").unwrap();
        fs::write(dir.path().join("old/deep/x.txt"), "").unwrap();

        let tree = Parser::new()
            .parse_str("app/\n\tsrc/\n\t\tmain.rs\n", "app")
            .unwrap()
            .tree;
        let removed =
            prune_extra(dir.path(), &collect_allowed(&tree), &Protected::default()).unwrap();

        assert_eq!(removed.len(), 2);
        assert!(dir.path().join("src/main.rs").exists());
        assert!(!dir.path().join("src/stale.rs").exists());
        assert!(!dir.path().join("old").exists());
    }

    #[test]
    fn ignored_entries_survive() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join(".blueprint")).unwrap();
        fs::write(dir.path().join(".blueprint/history.jsonl"), "").unwrap();

        let tree = Parser::new().parse_str("app/\n", "app").unwrap().tree;
        let protected = Protected {
            names: vec![".blueprint".to_string()],
            ..Protected::default()
        };
        let removed = prune_extra(dir.path(), &collect_allowed(&tree), &protected).unwrap();

        assert!(removed.is_empty());
        assert!(dir.path().join(".blueprint/history.jsonl").exists());
    }

    #[test]
    fn reserved_dirs_survive_with_contents() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("node_modules/left-pad")).unwrap();
        fs::write(dir.path().join("node_modules/left-pad/index.js"), "").unwrap();
        fs::create_dir_all(dir.path().join("web/Dist")).unwrap();
        fs::write(dir.path().join("web/Dist/app.js"), "").unwrap();
        fs::write(dir.path().join("web/stale.js"), "").unwrap();

        let tree = Parser::new().parse_str("app/\n\tsrc/\n", "app").unwrap().tree;
        let protected = Protected {
            reserved_dirs: vec!["node_modules".to_string(), "dist".to_string()],
            ..Protected::default()
        };
        let removed = prune_extra(dir.path(), &collect_allowed(&tree), &protected).unwrap();

        assert_eq!(removed, vec![dir.path().join("web/stale.js")]);
        assert!(dir.path().join("node_modules/left-pad/index.js").exists());
        assert!(dir.path().join("web/Dist/app.js").exists());
    }

    #[test]
    fn blueprint_files_survive_in_unlisted_folders() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("docs")).unwrap();
        fs::write(dir.path().join("docs/other.struct"), "").unwrap();
        fs::write(dir.path().join("docs/notes.txt"), "").unwrap();
        fs::write(dir.path().join("layout.bp"), "").unwrap();

        let tree = Parser::new().parse_str("app/\n", "app").unwrap().tree;
        let protected = Protected {
            paths: vec![dir.path().join("layout.bp")],
            extension: Some(BLUEPRINT_EXTENSION.to_string()),
            ..Protected::default()
        };
        let removed = prune_extra(dir.path(), &collect_allowed(&tree), &protected).unwrap();

        assert_eq!(removed, vec![dir.path().join("docs/notes.txt")]);
        assert!(dir.path().join("docs/other.struct").exists());
        assert!(dir.path().join("layout.bp").exists());
    }
}

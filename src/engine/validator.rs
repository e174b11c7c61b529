//! Tree checks before generation
//!
//! Reserved entries (VCS metadata, dependency folders, build output) are
//! pruned from the tree with a report instead of failing. Duplicate sibling
//! paths and tokens that try to escape the output directory are errors.

use std::collections::HashSet;
use std::path::Path;

use thiserror::Error;
use tracing::debug;

use crate::domain::{Node, Tree};

/// Names managed by tools rather than by blueprints
pub const DEFAULT_RESERVED: &[&str] = &[
    ".git",
    "node_modules",
    "vendor",
    ".next",
    ".nuxt",
    "dist",
    "build",
    ".cache",
    "__pycache__",
    ".venv",
    "venv",
];

#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("Duplicate path in blueprint: {0}")]
    DuplicatePath(String),

    #[error("Path traversal detected: {0}")]
    Traversal(String),
}

/// What validation removed from the tree
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    /// Slash-separated paths (below the root) of pruned reserved entries
    pub skipped: Vec<String>,
}

impl ValidationReport {
    pub fn is_clean(&self) -> bool {
        self.skipped.is_empty()
    }
}

/// Validates and prunes trees
#[derive(Debug, Clone)]
pub struct Validator {
    reserved: Vec<String>,
    allow_reserved: bool,
}

impl Default for Validator {
    fn default() -> Self {
        Self::new(DEFAULT_RESERVED.iter().copied())
    }
}

impl Validator {
    pub fn new(reserved: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            reserved: reserved.into_iter().map(Into::into).collect(),
            allow_reserved: false,
        }
    }

    /// Keeps reserved entries instead of pruning them
    pub fn allow_reserved(mut self, allow: bool) -> Self {
        self.allow_reserved = allow;
        self
    }

    pub fn reserved(&self) -> &[String] {
        &self.reserved
    }

    pub fn is_reserved(&self, name: &str) -> bool {
        self.reserved.iter().any(|r| r.eq_ignore_ascii_case(name))
    }

    /// Prunes reserved entries, then checks for duplicates and traversal
    pub fn validate(&self, tree: &mut Tree) -> Result<ValidationReport, ValidationError> {
        let mut report = ValidationReport::default();

        if !self.allow_reserved {
            self.prune(&mut tree.root, "", &mut report.skipped);
            for path in &report.skipped {
                debug!(path = %path, "reserved entry skipped");
            }
        }

        check(&tree.root, "")?;
        Ok(report)
    }

    fn prune(&self, node: &mut Node, prefix: &str, skipped: &mut Vec<String>) {
        node.children.retain(|child| {
            if self.is_reserved(&child.name) {
                skipped.push(join(prefix, &child.name));
                false
            } else {
                true
            }
        });

        for child in &mut node.children {
            let path = join(prefix, &child.name);
            self.prune(child, &path, skipped);
        }
    }
}

fn join(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", prefix, name)
    }
}

fn is_traversal(raw: &str) -> bool {
    let raw = raw.trim();
    raw.is_empty() || raw.starts_with("..") || Path::new(raw).is_absolute()
}

fn check(node: &Node, prefix: &str) -> Result<(), ValidationError> {
    let mut seen = HashSet::new();

    for child in &node.children {
        let path = join(prefix, &child.name);

        if !seen.insert(child.name.as_str()) {
            return Err(ValidationError::DuplicatePath(path));
        }
        if is_traversal(&child.original_text) {
            return Err(ValidationError::Traversal(child.original_text.clone()));
        }

        check(child, &path)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::parser::Parser;

    fn tree(text: &str) -> Tree {
        Parser::new().parse_str(text, "app").unwrap().tree
    }

    #[test]
    fn clean_tree_passes() {
        let mut t = tree("app/\n\tsrc/\n\t\tmain.rs\n");
        let report = Validator::default().validate(&mut t).unwrap();
        assert!(report.is_clean());
    }

    #[test]
    fn reserved_entries_are_pruned() {
        let mut t = tree("app/\n\tnode_modules/\n\t\tleft-pad/\n\tweb/\n\t\t.GIT/\n\tindex.js\n");
        let report = Validator::default().validate(&mut t).unwrap();

        assert_eq!(report.skipped, vec!["node_modules", "web/.GIT"]);
        assert!(t.root.child("node_modules").is_none());
        assert!(t.root.child("web").unwrap().children.is_empty());
        assert!(t.root.child("index.js").is_some());
    }

    #[test]
    fn reserved_entries_can_be_allowed() {
        let mut t = tree("app/\n\tdist/\n");
        let report = Validator::default()
            .allow_reserved(true)
            .validate(&mut t)
            .unwrap();

        assert!(report.is_clean());
        assert!(t.root.child("dist").is_some());
    }

    #[test]
    fn custom_reserved_list() {
        let mut t = tree("app/\n\ttmp/\n\tdist/\n");
        let report = Validator::new(["tmp"]).validate(&mut t).unwrap();

        assert_eq!(report.skipped, vec!["tmp"]);
        assert!(t.root.child("dist").is_some());
    }

    #[test]
    fn duplicate_siblings_fail() {
        let mut t = tree("app/\n\tsrc/\n\tsrc/\n");
        let err = Validator::default().validate(&mut t).unwrap_err();
        assert_eq!(err, ValidationError::DuplicatePath("src".to_string()));
    }

    #[test]
    fn same_name_in_different_folders_is_fine() {
        let mut t = tree("app/\n\ta/\n\t\tmod.rs\n\tb/\n\t\tmod.rs\n");
        assert!(Validator::default().validate(&mut t).is_ok());
    }

    #[test]
    fn traversal_tokens_fail() {
        let mut t = tree("app/\n\t../secrets.txt\n");
        let err = Validator::default().validate(&mut t).unwrap_err();
        assert_eq!(err, ValidationError::Traversal("../secrets.txt".to_string()));
    }
}

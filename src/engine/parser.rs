//! Blueprint text <-> tree
//!
//! A blueprint has one entry per non-blank, non-comment line. The first entry
//! declares the root folder and must end with `/`; every later entry is
//! indented below it with tabs (pairs of spaces are tolerated).
//!
//! ```text
//! app/
//!     src/
//!         main.go
//!     README.md
//! ```
//!
//! Kind is decided by convention: a trailing `/` is a directory, otherwise a
//! name containing `.` is a file and anything else is a directory. After the
//! whole text is read, every node that ended up with children is promoted to
//! a directory.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::domain::{CancelToken, Node, NodeKind, Tree};

/// Failure to turn text into a tree (or a tree back into a file)
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Failed to read blueprint {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write blueprint {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Blueprint is empty")]
    Empty,

    #[error("Line {line}: root entry '{text}' must be a folder ending with '/'")]
    RootNotDirectory { line: usize, text: String },

    #[error("Line {line}: '{text}' is a second root entry; indent it below the root folder")]
    MultipleRoots { line: usize, text: String },

    #[error("Line {line}: indentation jumps to depth {depth}, at most {max} is allowed here")]
    IndentJump { line: usize, depth: usize, max: usize },

    #[error("Line {line}: entry has an empty name after sanitizing")]
    EmptyName { line: usize },

    #[error("Parse cancelled")]
    Cancelled,
}

/// Non-fatal findings reported alongside a parsed tree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Diagnostic {
    /// Space indentation was used, first seen at this line
    SpaceIndentation { line: usize },
    /// Tabs and spaces were both used, first seen at this line
    MixedIndentation { line: usize },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::SpaceIndentation { line } => write!(
                f,
                "line {}: indentation uses spaces, tabs are recommended for consistency",
                line
            ),
            Diagnostic::MixedIndentation { line } => {
                write!(f, "line {}: indentation mixes tabs and spaces", line)
            }
        }
    }
}

/// Result of a successful parse
#[derive(Debug, Clone)]
pub struct Parsed {
    pub tree: Tree,
    pub diagnostics: Vec<Diagnostic>,
}

/// File extension of blueprint files
pub const BLUEPRINT_EXTENSION: &str = "struct";

/// Leading whitespace of one line
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Indent {
    depth: usize,
    tabs: bool,
    spaces: bool,
}

/// Measures indentation: each tab is one level, every two consecutive spaces
/// are one level, a stray single space is absorbed.
fn measure_indent(line: &str) -> Indent {
    let mut indent = Indent::default();
    let mut run = 0;

    for c in line.chars() {
        match c {
            '\t' => {
                indent.depth += 1;
                indent.tabs = true;
                run = 0;
            }
            ' ' => {
                indent.spaces = true;
                run += 1;
                if run == 2 {
                    indent.depth += 1;
                    run = 0;
                }
            }
            _ => break,
        }
    }

    indent
}

/// Sanitizes one blueprint token into a path segment.
///
/// Separators split the token; empty, `.` and `..` pieces are dropped and
/// the rest is joined with `-`. Returns `None` when nothing usable remains.
pub fn sanitize_name(raw: &str) -> Option<String> {
    let segments: Vec<&str> = raw
        .trim()
        .split(['/', '\\'])
        .map(str::trim)
        .filter(|s| !s.is_empty() && *s != "." && *s != "..")
        .collect();

    if segments.is_empty() {
        None
    } else {
        Some(segments.join("-"))
    }
}

/// Builds a provisional node from a trimmed token
fn provisional_node(token: &str, line: usize) -> Result<Node, ParseError> {
    let (body, explicit_dir) = match token.strip_suffix('/') {
        Some(body) => (body, true),
        None => (token, false),
    };

    let name = sanitize_name(body).ok_or(ParseError::EmptyName { line })?;

    let kind = if explicit_dir || !name.contains('.') {
        NodeKind::Directory
    } else {
        NodeKind::File
    };

    Ok(Node {
        kind,
        name,
        original_text: token.to_string(),
        content: Vec::new(),
        children: Vec::new(),
    })
}

/// Attaches the top of the stack to its parent
fn close_top(stack: &mut Vec<(usize, Node)>) {
    if stack.len() < 2 {
        return;
    }
    if let Some((_, node)) = stack.pop() {
        if let Some((_, parent)) = stack.last_mut() {
            parent.children.push(node);
        }
    }
}

/// Token written back for a node
fn blueprint_token(node: &Node) -> String {
    let text = if node.original_text.trim().is_empty() {
        node.name.as_str()
    } else {
        node.original_text.trim()
    };

    match node.kind {
        NodeKind::Directory if !text.ends_with('/') && text.contains('.') => format!("{}/", text),
        NodeKind::File if text.ends_with('/') => text.trim_end_matches('/').to_string(),
        _ => text.to_string(),
    }
}

/// Serializes a tree: the root entry first, then each descendant on its own
/// line indented with one tab per level below the root.
pub fn serialize(tree: &Tree) -> String {
    let mut out = String::new();

    let root = blueprint_token(&tree.root);
    out.push_str(&root);
    if !root.ends_with('/') {
        out.push('/');
    }
    out.push('\n');

    tree.root.walk(&mut |node, depth| {
        for _ in 0..depth {
            out.push('\t');
        }
        out.push_str(&blueprint_token(node));
        out.push('\n');
    });

    out
}

/// Blueprint parser and writer
#[derive(Debug, Clone, Default)]
pub struct Parser {
    cancel: CancelToken,
}

impl Parser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses the given token to stop between lines
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Parses a blueprint file; the root is named after the file stem
    pub fn parse(&self, path: &Path) -> Result<Parsed, ParseError> {
        let text = fs::read_to_string(path).map_err(|source| ParseError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let root_name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        debug!(path = %path.display(), "parsing blueprint");
        self.parse_str(&text, &root_name)
    }

    /// Parses blueprint text.
    ///
    /// The root node takes `root_name`; the declared root entry is kept as
    /// its blueprint text. An empty `root_name` falls back to the declared
    /// name.
    pub fn parse_str(&self, text: &str, root_name: &str) -> Result<Parsed, ParseError> {
        let mut stack: Vec<(usize, Node)> = Vec::new();
        let mut diagnostics = Vec::new();
        let mut seen_tabs = false;
        let mut seen_spaces = false;

        for (idx, raw) in text.lines().enumerate() {
            if self.cancel.is_cancelled() {
                return Err(ParseError::Cancelled);
            }

            let line = idx + 1;
            let token = raw.trim();
            if token.is_empty() || token.starts_with('#') {
                continue;
            }

            let indent = measure_indent(raw);
            if indent.spaces && !seen_spaces {
                seen_spaces = true;
                diagnostics.push(Diagnostic::SpaceIndentation { line });
            }
            seen_tabs |= indent.tabs;
            if seen_tabs
                && seen_spaces
                && !diagnostics
                    .iter()
                    .any(|d| matches!(d, Diagnostic::MixedIndentation { .. }))
            {
                diagnostics.push(Diagnostic::MixedIndentation { line });
            }

            if stack.is_empty() {
                if indent.depth != 0 {
                    return Err(ParseError::IndentJump {
                        line,
                        depth: indent.depth,
                        max: 0,
                    });
                }
                let Some(declared) = token.strip_suffix('/') else {
                    return Err(ParseError::RootNotDirectory {
                        line,
                        text: token.to_string(),
                    });
                };
                let declared = sanitize_name(declared).ok_or(ParseError::EmptyName { line })?;
                let name = if root_name.trim().is_empty() {
                    declared
                } else {
                    root_name.trim().to_string()
                };

                let mut root = Node::dir(name);
                root.original_text = token.to_string();
                stack.push((0, root));
                continue;
            }

            if indent.depth == 0 {
                return Err(ParseError::MultipleRoots {
                    line,
                    text: token.to_string(),
                });
            }

            while stack.last().is_some_and(|(depth, _)| *depth >= indent.depth) {
                close_top(&mut stack);
            }

            let max = stack.last().map(|(depth, _)| depth + 1).unwrap_or(1);
            if indent.depth > max {
                return Err(ParseError::IndentJump {
                    line,
                    depth: indent.depth,
                    max,
                });
            }

            stack.push((indent.depth, provisional_node(token, line)?));
        }

        while stack.len() > 1 {
            close_top(&mut stack);
        }
        let (_, mut root) = stack.pop().ok_or(ParseError::Empty)?;

        let promoted = root.promote_containers();
        if promoted > 0 {
            debug!(promoted, "promoted file entries with children to folders");
        }

        for diagnostic in &diagnostics {
            debug!(%diagnostic, "blueprint diagnostic");
        }

        Ok(Parsed {
            tree: Tree::from_root(root),
            diagnostics,
        })
    }

    /// Serializes a tree to blueprint text
    pub fn serialize(&self, tree: &Tree) -> String {
        serialize(tree)
    }

    /// Writes a tree as a blueprint file, creating parent directories
    pub fn write(&self, tree: &Tree, path: &Path) -> Result<(), ParseError> {
        let write_err = |source| ParseError::Write {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(write_err)?;
        }

        fs::write(path, serialize(tree)).map_err(write_err)?;
        debug!(path = %path.display(), "wrote blueprint");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use tempfile::TempDir;

    const SCENARIO: &str = "app/\n\tsrc/\n\t\tmain.go\n\tREADME.md\n";

    fn parse(text: &str) -> Result<Parsed, ParseError> {
        Parser::new().parse_str(text, "app")
    }

    #[test]
    fn parses_scenario_tree() {
        let parsed = parse(SCENARIO).unwrap();
        let root = &parsed.tree.root;

        assert_eq!(root.name, "app");
        assert_eq!(root.kind, NodeKind::Directory);
        assert_eq!(root.count(), 4);

        let src = root.child("src").unwrap();
        assert_eq!(src.kind, NodeKind::Directory);
        assert_eq!(src.child("main.go").unwrap().kind, NodeKind::File);
        assert_eq!(root.child("README.md").unwrap().kind, NodeKind::File);
        assert!(parsed.diagnostics.is_empty());
    }

    #[test]
    fn serialize_reproduces_input() {
        let parsed = parse(SCENARIO).unwrap();
        assert_eq!(serialize(&parsed.tree), SCENARIO);
    }

    #[test]
    fn skips_comments_and_blank_lines() {
        let text = "# layout\napp/\n\n\t# sources\n\tsrc/\n";
        let parsed = parse(text).unwrap();
        assert_eq!(parsed.tree.root.children.len(), 1);
    }

    #[test]
    fn kind_by_convention() {
        let text = "app/\n\tdocs\n\tv1.0/\n\tMakefile\n\tCargo.toml\n";
        let root = parse(text).unwrap().tree.root;

        assert_eq!(root.child("docs").unwrap().kind, NodeKind::Directory);
        assert_eq!(root.child("v1.0").unwrap().kind, NodeKind::Directory);
        assert_eq!(root.child("Makefile").unwrap().kind, NodeKind::Directory);
        assert_eq!(root.child("Cargo.toml").unwrap().kind, NodeKind::File);
    }

    #[test]
    fn file_with_children_is_promoted() {
        let text = "app/\n\tconfig.d\n\t\tbase.yml\n";
        let parsed = parse(text).unwrap();
        let node = parsed.tree.root.child("config.d").unwrap();

        assert_eq!(node.kind, NodeKind::Directory);
        assert_eq!(node.original_text, "config.d/");
        assert!(parsed.tree.containers_are_dirs());
    }

    #[test]
    fn dedent_returns_to_ancestor() {
        let text = "app/\n\ta/\n\t\tb/\n\t\t\tc.txt\n\td.txt\n";
        let root = parse(text).unwrap().tree.root;

        let names: Vec<_> = root.children.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["a", "d.txt"]);
        assert!(root.child("a").unwrap().child("b").unwrap().child("c.txt").is_some());
    }

    #[test]
    fn space_indentation_warns_once() {
        let text = "app/\n  src/\n    main.rs\n  lib.rs\n";
        let parsed = parse(text).unwrap();

        assert_eq!(
            parsed.diagnostics,
            vec![Diagnostic::SpaceIndentation { line: 2 }]
        );
        assert!(parsed.tree.root.child("src").unwrap().child("main.rs").is_some());
    }

    #[test]
    fn warnings_are_per_call() {
        let parser = Parser::new();
        let text = "app/\n  src/\n";
        let first = parser.parse_str(text, "app").unwrap();
        let second = parser.parse_str(text, "app").unwrap();

        assert_eq!(first.diagnostics, second.diagnostics);
    }

    #[test]
    fn mixed_indentation_is_tolerated() {
        let text = "app/\n\tsrc/\n\t  main.rs\n";
        let parsed = parse(text).unwrap();

        assert!(parsed
            .diagnostics
            .contains(&Diagnostic::MixedIndentation { line: 3 }));
        assert!(parsed.tree.root.child("src").unwrap().child("main.rs").is_some());
    }

    #[test]
    fn odd_space_is_absorbed() {
        assert_eq!(measure_indent("   x").depth, 1);
        assert_eq!(measure_indent("\t x").depth, 1);
        assert_eq!(measure_indent("\t\tx").depth, 2);
    }

    #[test]
    fn indentation_jump_is_an_error() {
        let err = parse("app/\n\tsrc/\n\t\t\tmain.go\n").unwrap_err();
        assert!(matches!(
            err,
            ParseError::IndentJump {
                line: 3,
                depth: 3,
                max: 2
            }
        ));
    }

    #[test]
    fn empty_blueprint_fails() {
        assert!(matches!(parse(""), Err(ParseError::Empty)));
        assert!(matches!(parse("# only a comment\n\n"), Err(ParseError::Empty)));
    }

    #[test]
    fn root_without_slash_fails() {
        let err = parse("app\n\tsrc/\n").unwrap_err();
        assert!(matches!(err, ParseError::RootNotDirectory { line: 1, .. }));
    }

    #[test]
    fn second_root_fails() {
        let err = parse("app/\nother/\n").unwrap_err();
        assert!(matches!(err, ParseError::MultipleRoots { line: 2, .. }));
    }

    #[test]
    fn empty_name_reports_line() {
        let err = parse("app/\n\tsrc/\n\t../\n").unwrap_err();
        assert!(matches!(err, ParseError::EmptyName { line: 3 }));
    }

    #[test]
    fn sanitize_neutralizes_paths() {
        assert_eq!(sanitize_name("  main.rs "), Some("main.rs".to_string()));
        assert_eq!(sanitize_name("../etc/passwd"), Some("etc-passwd".to_string()));
        assert_eq!(sanitize_name("/abs"), Some("abs".to_string()));
        assert_eq!(sanitize_name("a\\b"), Some("a-b".to_string()));
        assert_eq!(sanitize_name(".."), None);
        assert_eq!(sanitize_name("   "), None);
        assert_eq!(sanitize_name(".env"), Some(".env".to_string()));
    }

    #[test]
    fn empty_root_name_uses_declared_root() {
        let parsed = Parser::new().parse_str("web/\n\tindex.html\n", "").unwrap();
        assert_eq!(parsed.tree.root.name, "web");
    }

    #[test]
    fn parse_file_uses_stem() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("service.struct");
        fs::write(&path, SCENARIO).unwrap();

        let parsed = Parser::new().parse(&path).unwrap();
        assert_eq!(parsed.tree.root.name, "service");
        assert_eq!(parsed.tree.root.original_text, "app/");
    }

    #[test]
    fn parse_missing_file_fails() {
        let dir = TempDir::new().unwrap();
        let err = Parser::new()
            .parse(&dir.path().join("missing.struct"))
            .unwrap_err();
        assert!(matches!(err, ParseError::Read { .. }));
    }

    #[test]
    fn write_creates_parents() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("app.struct");
        let parser = Parser::new();

        let tree = parser.parse_str(SCENARIO, "app").unwrap().tree;
        parser.write(&tree, &path).unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), SCENARIO);
    }

    #[test]
    fn cancelled_parse_stops() {
        let token = CancelToken::new();
        token.cancel();
        let err = Parser::new()
            .with_cancel(token)
            .parse_str(SCENARIO, "app")
            .unwrap_err();
        assert!(matches!(err, ParseError::Cancelled));
    }

    #[test]
    fn serialize_marks_dotted_directories() {
        let mut node = Node::file("v2.0");
        node.kind = NodeKind::Directory;
        let tree = Tree::from_root(Node::dir("app").with_child(node));

        assert_eq!(serialize(&tree), "app/\n\tv2.0/\n");
    }

    fn arb_node() -> impl Strategy<Value = Node> {
        let leaf = prop_oneof![
            "[a-z]{1,8}\\.[a-z]{1,3}".prop_map(Node::file),
            "[a-z_]{1,8}".prop_map(Node::dir),
        ];
        leaf.prop_recursive(4, 32, 4, |inner| {
            ("[a-z]{1,8}", prop::collection::vec(inner, 0..4)).prop_map(|(name, children)| {
                let mut node = Node::dir(name);
                for child in children {
                    node.push_child(child);
                }
                node
            })
        })
    }

    fn arb_tree() -> impl Strategy<Value = Tree> {
        prop::collection::vec(arb_node(), 0..5).prop_map(|children| {
            let mut root = Node::dir("root");
            for child in children {
                root.push_child(child);
            }
            Tree::from_root(root)
        })
    }

    proptest! {
        #[test]
        fn parse_inverts_serialize(tree in arb_tree()) {
            let text = serialize(&tree);
            let parsed = Parser::new().parse_str(&text, "root").unwrap();
            prop_assert_eq!(parsed.tree, tree);
            prop_assert!(parsed.diagnostics.is_empty());
        }

        #[test]
        fn parsed_containers_are_dirs(tree in arb_tree()) {
            let text = serialize(&tree);
            let parsed = Parser::new().parse_str(&text, "root").unwrap();
            prop_assert!(parsed.tree.containers_are_dirs());
        }
    }
}

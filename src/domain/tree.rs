//! Blueprint tree model
//!
//! A [`Tree`] owns a single root [`Node`]; every node owns its children in
//! document order. There are no back-references, so the whole structure is a
//! plain owned value that can be cloned, compared and moved freely.

use std::fmt;

/// Kind of a filesystem entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Directory,
    File,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Directory => "directory",
            NodeKind::File => "file",
        }
    }

    pub fn is_dir(&self) -> bool {
        matches!(self, NodeKind::Directory)
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// One entry of a blueprint tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub kind: NodeKind,

    /// Sanitized path segment used on disk
    pub name: String,

    /// The token as it appeared in the blueprint, re-emitted on serialization
    pub original_text: String,

    /// Payload for file nodes
    pub content: Vec<u8>,

    pub children: Vec<Node>,
}

impl Node {
    /// Creates a directory node whose blueprint text carries the trailing slash
    pub fn dir(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            kind: NodeKind::Directory,
            original_text: format!("{}/", name),
            name,
            content: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Creates an empty file node
    pub fn file(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            kind: NodeKind::File,
            original_text: name.clone(),
            name,
            content: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Sets the file payload
    pub fn with_content(mut self, content: impl Into<Vec<u8>>) -> Self {
        self.content = content.into();
        self
    }

    /// Appends a child, builder style
    pub fn with_child(mut self, child: Node) -> Self {
        self.push_child(child);
        self
    }

    /// Appends a child, promoting this node to a directory if needed
    pub fn push_child(&mut self, child: Node) {
        self.promote();
        self.children.push(child);
    }

    pub fn is_dir(&self) -> bool {
        self.kind.is_dir()
    }

    /// Returns the child with the given name
    pub fn child(&self, name: &str) -> Option<&Node> {
        self.children.iter().find(|c| c.name == name)
    }

    /// Returns the child with the given name, mutably
    pub fn child_mut(&mut self, name: &str) -> Option<&mut Node> {
        self.children.iter_mut().find(|c| c.name == name)
    }

    /// Reclassifies this node as a directory and adds the trailing marker
    /// to its blueprint text. Returns true if the kind changed.
    pub fn promote(&mut self) -> bool {
        if self.kind == NodeKind::Directory {
            return false;
        }
        self.kind = NodeKind::Directory;
        self.content.clear();
        if !self.original_text.ends_with('/') {
            self.original_text.push('/');
        }
        true
    }

    /// Promotes every node with children to a directory, depth-first.
    /// Returns the number of nodes that changed kind.
    pub fn promote_containers(&mut self) -> usize {
        let mut promoted = 0;
        for child in &mut self.children {
            promoted += child.promote_containers();
        }
        if !self.children.is_empty() && self.promote() {
            promoted += 1;
        }
        promoted
    }

    /// Total number of nodes in this subtree, including self
    pub fn count(&self) -> usize {
        1 + self.children.iter().map(Node::count).sum::<usize>()
    }

    /// Visits every node below this one with its depth (children are depth 1)
    pub fn walk<'a>(&'a self, f: &mut impl FnMut(&'a Node, usize)) {
        fn visit<'a>(node: &'a Node, depth: usize, f: &mut impl FnMut(&'a Node, usize)) {
            for child in &node.children {
                f(child, depth);
                visit(child, depth + 1, f);
            }
        }
        visit(self, 1, f);
    }
}

/// A blueprint tree with a single owned root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tree {
    pub root: Node,
}

impl Tree {
    /// Creates a tree with an empty directory root
    pub fn new(root_name: impl Into<String>) -> Self {
        Self {
            root: Node::dir(root_name),
        }
    }

    pub fn from_root(root: Node) -> Self {
        Self { root }
    }

    /// Counts (directories, files) below the root
    pub fn stats(&self) -> (usize, usize) {
        let mut dirs = 0;
        let mut files = 0;
        self.root.walk(&mut |node, _| {
            if node.is_dir() {
                dirs += 1;
            } else {
                files += 1;
            }
        });
        (dirs, files)
    }

    /// Returns true if every node with children is a directory
    pub fn containers_are_dirs(&self) -> bool {
        fn check(node: &Node) -> bool {
            (node.children.is_empty() || node.is_dir()) && node.children.iter().all(check)
        }
        check(&self.root)
    }

    /// Renders an indented, human-readable listing (two spaces per level)
    pub fn display_lines(&self) -> Vec<String> {
        let mut lines = Vec::new();
        self.root.walk(&mut |node, depth| {
            let marker = if node.is_dir() { "/" } else { "" };
            lines.push(format!("{}{}{}", "  ".repeat(depth - 1), node.name, marker));
        });
        lines
    }
}

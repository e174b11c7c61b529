//! Workspace management
//!
//! A workspace is a directory holding `.blueprint/`, which keeps the
//! configuration, the operation logs and local plugins.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use thiserror::Error;

use super::config::WORKSPACE_DIR;
use super::{Config, History};

#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error("No blueprint workspace at {0}. Run 'blueprint init' first.")]
    NotAWorkspace(PathBuf),
}

const DEFAULT_CONFIG: &str = r#"# blueprint configuration

[history]
# Directory for history.jsonl and undo.jsonl, relative to this workspace
# dir = ".blueprint"

[validate]
# Names pruned from blueprints before generation
# reserved = [".git", "node_modules", "vendor", "dist", "build"]
allow_reserved = false

[reverse]
# Entries skipped when reading a folder
ignore = [".blueprint", ".git"]

[source]
# Blueprint source plugin; runs blueprint-source-<plugin>
# plugin = "openai"
root_name = "project"
"#;

const GITIGNORE: &str = r#"# Operation logs are local to this machine
history.jsonl
undo.jsonl
*.tmp
"#;

/// A blueprint workspace
#[derive(Debug)]
pub struct Workspace {
    root: PathBuf,
    config: Config,
    history_override: Option<PathBuf>,
}

impl Workspace {
    /// Opens an existing workspace at the given path
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();

        if !root.join(WORKSPACE_DIR).is_dir() {
            return Err(WorkspaceError::NotAWorkspace(root).into());
        }

        Self::load(root)
    }

    /// Opens the nearest workspace above `dir`, or treats `dir` as one
    pub fn discover(dir: &Path) -> Result<Self> {
        let root = Config::find_workspace_root(dir).unwrap_or_else(|| dir.to_path_buf());
        Self::load(root)
    }

    /// [`Workspace::discover`] from the current directory
    pub fn open_current() -> Result<Self> {
        let cwd = std::env::current_dir().context("Failed to read current directory")?;
        Self::discover(&cwd)
    }

    fn load(root: PathBuf) -> Result<Self> {
        let config = Config::for_workspace(&root)?;

        Ok(Self {
            root,
            config,
            history_override: None,
        })
    }

    /// Initializes a new workspace at the given path
    pub fn init(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let workspace_dir = root.join(WORKSPACE_DIR);

        fs::create_dir_all(&workspace_dir).with_context(|| {
            format!(
                "Failed to create {} directory: {}",
                WORKSPACE_DIR,
                workspace_dir.display()
            )
        })?;

        let plugins_dir = workspace_dir.join("plugins");
        fs::create_dir_all(&plugins_dir).with_context(|| {
            format!(
                "Failed to create plugins directory: {}",
                plugins_dir.display()
            )
        })?;

        let config_path = workspace_dir.join("config.toml");
        if !config_path.exists() {
            fs::write(&config_path, DEFAULT_CONFIG)
                .with_context(|| format!("Failed to write config: {}", config_path.display()))?;
        }

        let gitignore_path = workspace_dir.join(".gitignore");
        if !gitignore_path.exists() {
            fs::write(&gitignore_path, GITIGNORE).with_context(|| {
                format!("Failed to write .gitignore: {}", gitignore_path.display())
            })?;
        }

        Self::open(root)
    }

    /// Logs go to `dir` instead of the configured location
    pub fn with_history_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.history_override = dir;
        self
    }

    /// Returns the workspace root path
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the .blueprint directory path
    pub fn blueprint_dir(&self) -> PathBuf {
        self.root.join(WORKSPACE_DIR)
    }

    /// Returns the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns the plugins directory
    pub fn plugins_dir(&self) -> PathBuf {
        self.blueprint_dir().join("plugins")
    }

    /// Directory holding the operation logs
    pub fn history_dir(&self) -> PathBuf {
        if let Some(dir) = &self.history_override {
            return dir.clone();
        }

        match &self.config.workspace.history.dir {
            Some(dir) if dir.is_absolute() => dir.clone(),
            Some(dir) => self.root.join(dir),
            None => self.blueprint_dir(),
        }
    }

    /// Returns the operation history
    pub fn history(&self) -> History {
        History::for_dir(&self.history_dir())
    }
}

//! Configuration handling for blueprint
//!
//! Configuration is stored in `.blueprint/config.toml` (workspace) and
//! `~/.config/blueprint/config.toml` (global).

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::engine::DEFAULT_RESERVED;

/// Name of the per-workspace directory
pub const WORKSPACE_DIR: &str = ".blueprint";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to parse configuration: {0}")]
    Parse(String),
}

/// Where the operation logs live
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct HistoryConfig {
    /// Log directory, relative to the workspace root (default `.blueprint`)
    pub dir: Option<PathBuf>,
}

/// Reserved-name handling before generation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidateConfig {
    /// Names pruned from blueprints
    pub reserved: Vec<String>,

    /// Keep reserved names instead of pruning them
    pub allow_reserved: bool,
}

impl Default for ValidateConfig {
    fn default() -> Self {
        Self {
            reserved: DEFAULT_RESERVED.iter().map(|s| s.to_string()).collect(),
            allow_reserved: false,
        }
    }
}

/// Folder reading settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReverseConfig {
    /// Entry names skipped while reading a folder
    pub ignore: Vec<String>,
}

impl Default for ReverseConfig {
    fn default() -> Self {
        Self {
            ignore: vec![WORKSPACE_DIR.to_string(), ".git".to_string()],
        }
    }
}

/// Blueprint source (prompt -> blueprint text) settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Plugin name; runs `blueprint-source-<plugin>`
    pub plugin: Option<String>,

    /// Root name given to trees parsed from generated text
    pub root_name: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            plugin: None,
            root_name: "project".to_string(),
        }
    }
}

/// Workspace-level configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct WorkspaceConfig {
    pub history: HistoryConfig,
    pub validate: ValidateConfig,
    pub reverse: ReverseConfig,
    pub source: SourceConfig,
}

/// Global user configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct GlobalConfig {
    /// Default output format (text or json)
    pub default_format: OutputFormat,

    /// Plugin used when the workspace names none
    pub source_plugin: Option<String>,
}

/// Output format for commands
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Combined configuration (global + workspace)
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub workspace: WorkspaceConfig,
    pub global: GlobalConfig,
}

impl Config {
    /// Loads configuration for a workspace rooted at `root`
    pub fn for_workspace(root: &Path) -> Result<Self> {
        let global = Self::load_global()?;
        let workspace = Self::load_workspace_config(root)?;

        Ok(Self { workspace, global })
    }

    /// Returns the global config directory
    pub fn global_config_dir() -> Option<PathBuf> {
        ProjectDirs::from("dev", "blueprint", "blueprint")
            .map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// Loads global configuration
    fn load_global() -> Result<GlobalConfig> {
        let config_dir = match Self::global_config_dir() {
            Some(dir) => dir,
            None => return Ok(GlobalConfig::default()),
        };

        let config_path = config_dir.join("config.toml");
        if !config_path.exists() {
            return Ok(GlobalConfig::default());
        }

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read global config: {}", config_path.display()))?;

        toml::from_str(&content)
            .map_err(|e| ConfigError::Parse(e.to_string()))
            .context("Failed to parse global config")
    }

    /// Loads workspace configuration from a specific root
    fn load_workspace_config(root: &Path) -> Result<WorkspaceConfig> {
        let config_path = root.join(WORKSPACE_DIR).join("config.toml");

        if !config_path.exists() {
            return Ok(WorkspaceConfig::default());
        }

        let content = fs::read_to_string(&config_path).with_context(|| {
            format!("Failed to read workspace config: {}", config_path.display())
        })?;

        toml::from_str(&content)
            .map_err(|e| ConfigError::Parse(e.to_string()))
            .with_context(|| format!("Failed to parse {}", config_path.display()))
    }

    /// Finds the nearest ancestor of `start` holding a `.blueprint/` directory
    pub fn find_workspace_root(start: &Path) -> Option<PathBuf> {
        let mut current = start.to_path_buf();

        loop {
            if current.join(WORKSPACE_DIR).is_dir() {
                return Some(current);
            }

            if !current.pop() {
                return None;
            }
        }
    }

    /// The plugin to ask for blueprints, workspace setting first
    pub fn source_plugin(&self) -> Option<&str> {
        self.workspace
            .source
            .plugin
            .as_deref()
            .or(self.global.source_plugin.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config() {
        let config = Config::default();

        assert_eq!(config.global.default_format, OutputFormat::Text);
        assert_eq!(config.workspace.source.root_name, "project");
        assert!(config.workspace.history.dir.is_none());
        assert!(config.workspace.validate.reserved.contains(&"node_modules".to_string()));
        assert_eq!(config.workspace.reverse.ignore, vec![".blueprint", ".git"]);
    }

    #[test]
    fn parse_workspace_config() {
        let toml = r#"
[history]
dir = "logs"

[validate]
reserved = ["tmp"]
allow_reserved = true

[source]
plugin = "openai"
"#;

        let config: WorkspaceConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.history.dir, Some(PathBuf::from("logs")));
        assert_eq!(config.validate.reserved, vec!["tmp"]);
        assert!(config.validate.allow_reserved);
        assert_eq!(config.source.plugin.as_deref(), Some("openai"));
        // Untouched sections keep their defaults
        assert_eq!(config.source.root_name, "project");
        assert_eq!(config.reverse.ignore.len(), 2);
    }

    #[test]
    fn parse_global_config() {
        let toml = r#"
default_format = "json"
source_plugin = "local"
"#;

        let config: GlobalConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.default_format, OutputFormat::Json);
        assert_eq!(config.source_plugin, Some("local".to_string()));
    }

    #[test]
    fn workspace_plugin_wins() {
        let mut config = Config::default();
        config.global.source_plugin = Some("global".to_string());
        assert_eq!(config.source_plugin(), Some("global"));

        config.workspace.source.plugin = Some("local".to_string());
        assert_eq!(config.source_plugin(), Some("local"));
    }

    #[test]
    fn find_workspace_root() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join(WORKSPACE_DIR)).unwrap();

        let sub_dir = dir.path().join("sub").join("dir");
        fs::create_dir_all(&sub_dir).unwrap();

        let root = Config::find_workspace_root(&sub_dir);
        assert_eq!(root.as_deref(), Some(dir.path()));
    }

    #[test]
    fn invalid_workspace_config_names_file() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join(WORKSPACE_DIR)).unwrap();
        fs::write(
            dir.path().join(WORKSPACE_DIR).join("config.toml"),
            "history = 3",
        )
        .unwrap();

        let err = Config::load_workspace_config(dir.path()).unwrap_err();
        assert!(format!("{:#}", err).contains("config.toml"));
    }
}

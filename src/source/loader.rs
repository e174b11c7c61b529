//! Plugin discovery and execution
//!
//! Plugins are discovered from:
//! 1. `.blueprint/plugins/` and any other added directories
//! 2. PATH
//!
//! Only executables whose name starts with [`PLUGIN_PREFIX`] are considered.
//! The first one found under a given name wins.

use std::collections::BTreeMap;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use anyhow::{Context, Result};
use tracing::debug;

use super::protocol::{PluginManifest, PluginRequest, PluginResponse};

/// Executable name prefix of blueprint-source plugins
pub const PLUGIN_PREFIX: &str = "blueprint-source-";

/// Information about a discovered plugin
#[derive(Debug, Clone)]
pub struct PluginInfo {
    /// Plugin name without the prefix
    pub name: String,

    /// Path to the plugin executable
    pub path: PathBuf,
}

/// Plugin loader and executor
#[derive(Debug, Default)]
pub struct PluginLoader {
    /// Discovered plugins
    plugins: BTreeMap<String, PluginInfo>,

    /// Directories searched before PATH
    plugin_dirs: Vec<PathBuf>,
}

impl PluginLoader {
    /// Creates a new plugin loader
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a plugin directory to search
    pub fn add_plugin_dir(&mut self, dir: impl Into<PathBuf>) {
        self.plugin_dirs.push(dir.into());
    }

    /// Discovers all available plugins
    pub fn discover(&mut self) -> Result<()> {
        self.discover_in(std::env::var_os("PATH").as_deref())
    }

    fn discover_in(&mut self, path_var: Option<&std::ffi::OsStr>) -> Result<()> {
        self.plugins.clear();

        for dir in self.plugin_dirs.clone() {
            self.scan_directory(&dir);
        }

        if let Some(path_var) = path_var {
            for dir in std::env::split_paths(path_var) {
                self.scan_directory(&dir);
            }
        }

        debug!(count = self.plugins.len(), "discovered source plugins");
        Ok(())
    }

    /// Scans a directory for plugins
    fn scan_directory(&mut self, dir: &Path) {
        let entries = match std::fs::read_dir(dir) {
            Ok(e) => e,
            Err(_) => return, // Ignore missing or unreadable directories
        };

        for entry in entries.flatten() {
            let path = entry.path();

            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let Some(short) = name.strip_prefix(PLUGIN_PREFIX) else {
                continue;
            };
            let short = short.trim_end_matches(".exe");

            if !short.is_empty() && is_executable(&path) && !self.plugins.contains_key(short) {
                self.plugins.insert(
                    short.to_string(),
                    PluginInfo {
                        name: short.to_string(),
                        path,
                    },
                );
            }
        }
    }

    /// Lists all discovered plugins, by name
    pub fn list(&self) -> Vec<&PluginInfo> {
        self.plugins.values().collect()
    }

    /// Gets a plugin by name (without the prefix)
    pub fn get(&self, name: &str) -> Option<&PluginInfo> {
        self.plugins.get(name)
    }

    /// Loads the manifest from a plugin
    pub fn manifest(&self, name: &str) -> Result<PluginManifest> {
        let info = self.require(name)?;

        let output = Command::new(&info.path)
            .arg("--manifest")
            .output()
            .with_context(|| format!("Failed to execute plugin: {}", info.path.display()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("Plugin returned error: {}", stderr.trim());
        }

        serde_json::from_slice(&output.stdout).context("Failed to parse plugin manifest")
    }

    /// Executes a plugin request
    pub fn execute(&self, name: &str, request: &PluginRequest) -> Result<PluginResponse> {
        let info = self.require(name)?;

        let mut child = Command::new(&info.path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .with_context(|| format!("Failed to spawn plugin: {}", info.path.display()))?;

        // Send request; dropping stdin closes the pipe
        {
            let mut stdin = child
                .stdin
                .take()
                .context("Failed to open plugin stdin")?;
            let request_json =
                serde_json::to_string(request).context("Failed to serialize request")?;
            writeln!(stdin, "{}", request_json).context("Failed to write to plugin")?;
        }

        // Read response
        let stdout = child.stdout.take().context("Failed to open plugin stdout")?;
        let reader = BufReader::new(stdout);

        let response_line = reader
            .lines()
            .next()
            .ok_or_else(|| anyhow::anyhow!("No response from plugin {}", name))?
            .context("Failed to read plugin response")?;

        let response: PluginResponse =
            serde_json::from_str(&response_line).context("Failed to parse plugin response")?;

        // Wait for child to exit
        let _ = child.wait();

        Ok(response)
    }

    fn require(&self, name: &str) -> Result<&PluginInfo> {
        self.plugins.get(name).ok_or_else(|| {
            anyhow::anyhow!(
                "Plugin not found: {}{} (looked in plugin directories and PATH)",
                PLUGIN_PREFIX,
                name
            )
        })
    }
}

/// Checks if a file is executable
fn is_executable(path: &Path) -> bool {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if let Ok(meta) = path.metadata() {
            return meta.is_file() && meta.permissions().mode() & 0o111 != 0;
        }
    }

    #[cfg(windows)]
    {
        if let Some(ext) = path.extension() {
            return ext == "exe" || ext == "bat" || ext == "cmd";
        }
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn new_loader_is_empty() {
        let loader = PluginLoader::new();
        assert!(loader.list().is_empty());
    }

    #[test]
    fn discover_empty_dir() {
        let dir = TempDir::new().unwrap();
        let mut loader = PluginLoader::new();
        loader.add_plugin_dir(dir.path());
        loader.discover_in(None).unwrap();

        assert!(loader.list().is_empty());
    }

    #[test]
    fn missing_plugin_is_an_error() {
        let loader = PluginLoader::new();
        assert!(loader.get("nonexistent").is_none());

        let err = loader
            .execute("nonexistent", &PluginRequest::generate("x"))
            .unwrap_err();
        assert!(err.to_string().contains("blueprint-source-nonexistent"));
    }

    #[cfg(unix)]
    #[test]
    fn discovers_prefixed_executables_only() {
        use std::fs;
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        for name in ["blueprint-source-local", "blueprint-source-plain", "other-tool"] {
            fs::write(dir.path().join(name), "#!/bin/sh\n").unwrap();
        }
        for name in ["blueprint-source-local", "other-tool"] {
            fs::set_permissions(dir.path().join(name), fs::Permissions::from_mode(0o755)).unwrap();
        }

        let mut loader = PluginLoader::new();
        loader.add_plugin_dir(dir.path());
        loader.discover_in(None).unwrap();

        let names: Vec<_> = loader.list().iter().map(|p| p.name.clone()).collect();
        assert_eq!(names, vec!["local"]);
    }
}

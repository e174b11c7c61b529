//! # Blueprint Sources
//!
//! Anything that can turn a natural-language prompt into blueprint text.
//! The generation pipeline itself lives outside this crate; it is reached
//! through plugins.
//!
//! ## Plugins
//!
//! Plugins are separate binaries that communicate via JSON over stdin/stdout,
//! so they can be written in any language. They are discovered in two
//! locations:
//! 1. `.blueprint/plugins/` - Workspace-local plugins
//! 2. `$PATH` - System-wide plugins
//!
//! ## Protocol
//!
//! ```text
//! CLI                              Plugin Binary
//!  │                                   │
//!  ├── Spawn: blueprint-source-openai  │
//!  │                                   │
//!  ├── Stdin: {"operation": "generate", "params": {"prompt": "..."}}
//!  │                                   │
//!  └── Stdout: {"success": true, "data": {"blueprint": "..."}}
//! ```
//!
//! Every plugin must support `--manifest` to declare its capabilities.

mod loader;
mod protocol;

use anyhow::{Context, Result};

pub use loader::{PluginInfo, PluginLoader, PLUGIN_PREFIX};
pub use protocol::{GenerateData, PluginManifest, PluginRequest, PluginResponse, GENERATE};

/// Produces blueprint text from a prompt
pub trait BlueprintSource {
    /// Name shown in logs and errors
    fn name(&self) -> &str;

    /// Returns blueprint text for `prompt`
    fn generate(&self, prompt: &str) -> Result<String>;
}

/// A blueprint source backed by an external plugin
#[derive(Debug)]
pub struct PluginSource {
    loader: PluginLoader,
    name: String,
}

impl PluginSource {
    /// Uses the plugin `name` (without prefix) from an already discovered loader
    pub fn new(loader: PluginLoader, name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        if loader.get(&name).is_none() {
            anyhow::bail!(
                "Plugin not found: {}{} (looked in plugin directories and PATH)",
                PLUGIN_PREFIX,
                name
            );
        }
        Ok(Self { loader, name })
    }

    pub fn manifest(&self) -> Result<PluginManifest> {
        self.loader.manifest(&self.name)
    }
}

impl BlueprintSource for PluginSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn generate(&self, prompt: &str) -> Result<String> {
        let response = self
            .loader
            .execute(&self.name, &PluginRequest::generate(prompt))?;

        if !response.success {
            anyhow::bail!(
                "Plugin {} failed: {}",
                self.name,
                response.error.as_deref().unwrap_or("unknown error")
            );
        }

        let data = response
            .data
            .with_context(|| format!("Plugin {} returned no data", self.name))?;
        let data: GenerateData = serde_json::from_value(data)
            .with_context(|| format!("Plugin {} returned no blueprint", self.name))?;

        Ok(data.blueprint)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::TempDir;

    const SCRIPT: &str = r#"#!/bin/sh
if [ "$1" = "--manifest" ]; then
  echo '{"name":"blueprint-source-canned","version":"0.1.0","operations":["generate"]}'
  exit 0
fi
read line
case "$line" in
  *fail*) echo '{"success":false,"error":"quota exceeded"}' ;;
  *) printf '%s\n' '{"success":true,"data":{"blueprint":"app/\n\tsrc/\n"}}' ;;
esac
"#;

    fn canned() -> (TempDir, PluginSource) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("blueprint-source-canned");
        fs::write(&path, SCRIPT).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();

        let mut loader = PluginLoader::new();
        loader.add_plugin_dir(dir.path());
        loader.discover().unwrap();

        let source = PluginSource::new(loader, "canned").unwrap();
        (dir, source)
    }

    #[test]
    fn plugin_returns_blueprint() {
        let (_dir, source) = canned();
        let text = source.generate("a small app").unwrap();
        assert_eq!(text, "app/\n\tsrc/\n");
    }

    #[test]
    fn plugin_failure_is_reported() {
        let (_dir, source) = canned();
        let err = source.generate("please fail").unwrap_err();
        assert!(err.to_string().contains("quota exceeded"));
    }

    #[test]
    fn plugin_manifest() {
        let (_dir, source) = canned();
        let manifest = source.manifest().unwrap();
        assert!(manifest.supports(GENERATE));
    }

    #[test]
    fn unknown_plugin_is_rejected() {
        let err = PluginSource::new(PluginLoader::new(), "missing").unwrap_err();
        assert!(err.to_string().contains("blueprint-source-missing"));
    }
}

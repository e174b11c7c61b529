//! Plugin management commands

use anyhow::Result;
use clap::Subcommand;

use super::output::Output;
use crate::source::{PluginLoader, GENERATE, PLUGIN_PREFIX};
use crate::storage::Workspace;

#[derive(Subcommand, Debug)]
pub enum PluginCommands {
    /// List available blueprint-source plugins
    List,

    /// Show a plugin's manifest
    Info {
        /// Plugin name (without the blueprint-source- prefix)
        name: String,
    },
}

pub fn run(cmd: PluginCommands, output: &Output, workspace: &Workspace) -> Result<()> {
    let mut loader = PluginLoader::new();
    loader.add_plugin_dir(workspace.plugins_dir());
    loader.discover()?;

    match cmd {
        PluginCommands::List => list_plugins(output, &loader),
        PluginCommands::Info { name } => plugin_info(output, &loader, &name),
    }
}

fn list_plugins(output: &Output, loader: &PluginLoader) -> Result<()> {
    let plugins = loader.list();

    if output.is_json() {
        let items: Vec<_> = plugins
            .iter()
            .map(|p| {
                serde_json::json!({
                    "name": p.name,
                    "path": p.path.display().to_string(),
                })
            })
            .collect();
        output.data(&items);
    } else if plugins.is_empty() {
        println!("No plugins found.");
        println!();
        println!("Plugins are discovered from:");
        println!("  - .blueprint/plugins/ directory");
        println!("  - PATH (executables starting with '{}')", PLUGIN_PREFIX);
    } else {
        println!("Available plugins:");
        println!("{:<20} PATH", "NAME");
        println!("{}", "-".repeat(70));
        for plugin in plugins {
            println!("{:<20} {}", plugin.name, plugin.path.display());
        }
    }

    Ok(())
}

fn plugin_info(output: &Output, loader: &PluginLoader, name: &str) -> Result<()> {
    let manifest = loader.manifest(name)?;

    if output.is_json() {
        output.data(&manifest);
    } else {
        println!("Plugin: {}", manifest.name);
        println!("Version: {}", manifest.version);
        println!("Description: {}", manifest.description);
        println!("Operations: {}", manifest.operations.join(", "));
        if !manifest.supports(GENERATE) {
            output.warn(&format!("{} does not declare the '{}' operation", name, GENERATE));
        }
    }

    Ok(())
}

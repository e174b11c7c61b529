//! `blueprint ai` - layouts from prompts through a source plugin

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::Subcommand;

use super::output::Output;
use super::reverse::resolve_output_path;
use crate::engine::GenerateOptions;
use crate::service::Service;
use crate::source::{PluginLoader, PluginSource};
use crate::storage::Workspace;

#[derive(Subcommand, Debug)]
pub enum AiCommands {
    /// Save a generated blueprint file
    Blueprint {
        /// What the project should look like
        prompt: String,

        /// Blueprint file or directory (defaults to <root_name>.struct here)
        #[arg(long, short)]
        output: Option<PathBuf>,

        /// Source plugin to use instead of the configured one
        #[arg(long)]
        plugin: Option<String>,
    },

    /// Generate a folder straight from a prompt
    Apply {
        /// What the project should look like
        prompt: String,

        /// Output directory
        #[arg(default_value = ".")]
        output_dir: PathBuf,

        /// Overwrite existing files
        #[arg(long)]
        force: bool,

        /// Show what would be created without touching the filesystem
        #[arg(long)]
        dry_run: bool,

        /// Source plugin to use instead of the configured one
        #[arg(long)]
        plugin: Option<String>,
    },
}

pub fn run(cmd: AiCommands, output: &Output, workspace: &Workspace) -> Result<()> {
    match cmd {
        AiCommands::Blueprint {
            prompt,
            output: target,
            plugin,
        } => blueprint(output, workspace, &prompt, target, plugin.as_deref()),
        AiCommands::Apply {
            prompt,
            output_dir,
            force,
            dry_run,
            plugin,
        } => apply(
            output,
            workspace,
            &prompt,
            &output_dir,
            GenerateOptions { dry_run, force },
            plugin.as_deref(),
        ),
    }
}

/// The configured (or named) source plugin
pub(super) fn load_source(workspace: &Workspace, name: Option<&str>) -> Result<PluginSource> {
    let name = name
        .or_else(|| workspace.config().source_plugin())
        .ok_or_else(|| {
            anyhow::anyhow!(
                "No blueprint source configured. Set [source] plugin in .blueprint/config.toml or pass --plugin"
            )
        })?;

    let mut loader = PluginLoader::new();
    loader.add_plugin_dir(workspace.plugins_dir());
    loader.discover()?;

    PluginSource::new(loader, name)
}

fn blueprint(
    output: &Output,
    workspace: &Workspace,
    prompt: &str,
    target: Option<PathBuf>,
    plugin: Option<&str>,
) -> Result<()> {
    let source = load_source(workspace, plugin)?;
    let root_name = &workspace.config().workspace.source.root_name;
    let target = resolve_output_path(root_name, target.as_deref());

    let service = Service::for_workspace(workspace).with_source(Box::new(source));
    let outcome = service.ai_blueprint(prompt, &target)?;
    let (dirs, files) = outcome.tree.stats();

    if output.is_json() {
        output.data(&serde_json::json!({
            "target": outcome.path.display().to_string(),
            "directories": dirs,
            "files": files,
            "blueprint": outcome.text,
        }));
    } else {
        output.success(&format!(
            "Wrote {} ({} directories, {} files)",
            outcome.path.display(),
            dirs,
            files
        ));
        output.tree(&outcome.tree);
    }

    Ok(())
}

fn apply(
    output: &Output,
    workspace: &Workspace,
    prompt: &str,
    output_dir: &Path,
    options: GenerateOptions,
    plugin: Option<&str>,
) -> Result<()> {
    let source = load_source(workspace, plugin)?;
    let service = Service::for_workspace(workspace).with_source(Box::new(source));

    let outcome = service
        .ai_apply(prompt, output_dir, options)
        .inspect_err(|e| super::create::hint_partial(output, e))?;

    super::create::report(output, &outcome, output_dir, options.dry_run);
    Ok(())
}

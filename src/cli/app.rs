//! Main CLI application structure

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

use super::output::{Output, OutputFormat};
use super::{ai, create, history_cmd, plugin_cmd, reverse, sync_cmd};
use crate::storage::Workspace;

#[derive(Parser, Debug)]
#[command(name = "blueprint")]
#[command(author, version, about = "Project layouts as text: generate, reverse, undo, redo")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output format (defaults to the global config, then text)
    #[arg(long, short = 'f', global = true)]
    pub format: Option<OutputFormat>,

    /// Enable debug logging on stderr
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Directory holding history.jsonl and undo.jsonl
    #[arg(long, global = true, env = "BLUEPRINT_HISTORY_DIR")]
    pub history_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize a blueprint workspace
    Init {
        /// Path to initialize (defaults to current directory)
        #[arg(default_value = ".")]
        path: PathBuf,
    },

    /// Generate a folder from a blueprint file
    Create {
        /// Blueprint file
        blueprint: PathBuf,

        /// Output directory
        #[arg(default_value = ".")]
        output_dir: PathBuf,

        /// Overwrite existing files
        #[arg(long)]
        force: bool,

        /// Show what would be created without touching the filesystem
        #[arg(long)]
        dry_run: bool,
    },

    /// Write a blueprint file describing a folder
    Reverse {
        /// Folder to read
        input_dir: PathBuf,

        /// Blueprint file or directory (defaults to <folder>.struct here)
        #[arg(long, short)]
        output: Option<PathBuf>,

        /// Print the blueprint instead of writing it
        #[arg(long)]
        dry_run: bool,
    },

    /// Blueprints from natural-language prompts
    #[command(subcommand)]
    Ai(ai::AiCommands),

    /// Make a folder follow a blueprint (not recorded in history)
    Sync {
        /// Blueprint file
        blueprint: PathBuf,

        /// Folder to update
        #[arg(default_value = ".")]
        dir: PathBuf,

        /// Remove entries the blueprint does not name
        #[arg(long)]
        prune: bool,
    },

    /// Show, undo, redo or clear recorded operations
    #[command(subcommand)]
    History(history_cmd::HistoryCommands),

    /// Manage blueprint-source plugins
    #[command(subcommand)]
    Plugin(plugin_cmd::PluginCommands),
}

fn init_tracing(verbose: bool) {
    let level = if verbose { "debug" } else { "warn" };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    // A subscriber may already be installed when running inside tests
    let _ = fmt::Subscriber::builder()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .try_init();
}

/// Main entry point for the CLI
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    tracing::debug!(command = ?cli.command, "starting");

    if let Commands::Init { path } = &cli.command {
        let output = Output::new(cli.format.unwrap_or_default(), cli.verbose);
        let workspace = Workspace::init(path)?;
        output.success(&format!(
            "Initialized blueprint workspace at {}",
            workspace.root().display()
        ));
        return Ok(());
    }

    let workspace = Workspace::open_current()?.with_history_dir(cli.history_dir);
    let format = cli
        .format
        .unwrap_or_else(|| workspace.config().global.default_format.into());
    let output = Output::new(format, cli.verbose);
    tracing::debug!(
        root = %workspace.root().display(),
        history = %workspace.history_dir().display(),
        "opened workspace"
    );

    match cli.command {
        Commands::Init { .. } => {}

        Commands::Create {
            blueprint,
            output_dir,
            force,
            dry_run,
        } => create::run(&output, &workspace, &blueprint, &output_dir, force, dry_run)?,

        Commands::Reverse {
            input_dir,
            output: target,
            dry_run,
        } => reverse::run(&output, &workspace, &input_dir, target.as_deref(), dry_run)?,

        Commands::Ai(cmd) => ai::run(cmd, &output, &workspace)?,

        Commands::Sync {
            blueprint,
            dir,
            prune,
        } => sync_cmd::run(&output, &workspace, &blueprint, &dir, prune)?,

        Commands::History(cmd) => history_cmd::run(cmd, &output, &workspace)?,

        Commands::Plugin(cmd) => plugin_cmd::run(cmd, &output, &workspace)?,
    }

    tracing::debug!("command completed");
    Ok(())
}

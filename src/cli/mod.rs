//! # Command-Line Interface
//!
//! User-facing CLI commands and output formatting.
//!
//! ## Commands
//!
//! | Command | Purpose |
//! |---------|---------|
//! | `init` | Create `.blueprint/` in a folder |
//! | `create` | Blueprint file -> folder |
//! | `reverse` | Folder -> blueprint file |
//! | `ai blueprint`, `ai apply` | Prompt -> blueprint file or folder |
//! | `sync` | Folder follows a blueprint, optionally pruning extras |
//! | `history list/undo/redo/clear` | Recorded operations |
//! | `plugin list/info` | Blueprint-source plugins |
//!
//! ## Output Formats
//!
//! All commands support `--format` flag:
//! - `text` (default) - Human-readable output
//! - `json` - Machine-parseable JSON
//!
//! ## Logging
//!
//! Logs go to stderr. `--verbose` (or `-v`) raises the level to debug;
//! `RUST_LOG` overrides both:
//! ```bash
//! RUST_LOG=blueprint_cli=trace blueprint create app.struct out/
//! ```
//!
//! ## Entry Point
//!
//! Call [`run()`] to parse arguments and execute the appropriate command.

mod ai;
mod app;
mod create;
mod history_cmd;
mod output;
mod plugin_cmd;
mod reverse;
mod sync_cmd;

pub use app::{run, Cli, Commands};
pub use output::{Output, OutputFormat};
pub use reverse::resolve_output_path;

//! # Storage Layer
//!
//! Persistence for blueprint workspaces with line-oriented, git-friendly files.
//!
//! ## Storage Formats
//!
//! | Data | Format | Location |
//! |------|--------|----------|
//! | Applied operations | JSONL (one JSON per line) | `.blueprint/history.jsonl` |
//! | Undone operations | JSONL | `.blueprint/undo.jsonl` |
//! | Config | TOML | `.blueprint/config.toml` |
//!
//! ## Concurrency Safety
//!
//! - [`OperationLog`] uses file locking (`fs2`) for concurrent access
//! - Rewrites are atomic (temp file + rename)
//!
//! ## Workspace Structure
//!
//! ```text
//! .blueprint/
//! ├── history.jsonl         # Applied operations, oldest first
//! ├── undo.jsonl            # Undone operations awaiting redo
//! ├── config.toml           # Workspace configuration
//! ├── plugins/              # Local blueprint-source plugins
//! └── .gitignore            # Ignores the logs
//! ```

mod config;
mod history;
mod jsonl;
mod workspace;

pub use config::{
    Config, ConfigError, GlobalConfig, OutputFormat, WorkspaceConfig, WORKSPACE_DIR,
};
pub use history::{
    History, HistoryEmpty, HistoryError, RecreateError, Recreator, RollbackFailure, UndoReport,
    HISTORY_FILE, UNDO_FILE,
};
pub use jsonl::{CorruptLine, OperationLog};
pub use workspace::{Workspace, WorkspaceError};

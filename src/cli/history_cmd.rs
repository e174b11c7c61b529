//! `blueprint history` - list, undo, redo and clear recorded operations

use anyhow::Result;
use clap::Subcommand;
use tracing::debug;

use super::ai::load_source;
use super::output::Output;
use crate::domain::{Operation, OperationKind};
use crate::service::Service;
use crate::storage::{History, HistoryError, Workspace};

#[derive(Subcommand, Debug)]
pub enum HistoryCommands {
    /// List recorded operations, oldest first
    List {
        /// Show undone operations waiting for redo instead
        #[arg(long)]
        undo_stack: bool,
    },

    /// Delete what the last operation created
    Undo {
        /// Actually undo; without it the undo is only previewed
        #[arg(long, short = 'y')]
        confirm: bool,
    },

    /// Recreate the last undone operation
    Redo,

    /// Forget all recorded and undone operations
    Clear {
        /// Actually clear; without it nothing is removed
        #[arg(long, short = 'y')]
        confirm: bool,
    },
}

pub fn run(cmd: HistoryCommands, output: &Output, workspace: &Workspace) -> Result<()> {
    let history = workspace.history();

    let result = match cmd {
        HistoryCommands::List { undo_stack } => list(output, &history, undo_stack),
        HistoryCommands::Undo { confirm } => undo(output, workspace, &history, confirm),
        HistoryCommands::Redo => redo(output, workspace, &history),
        HistoryCommands::Clear { confirm } => clear(output, &history, confirm),
    };

    match result {
        Err(HistoryError::Empty(which)) => {
            output.success(&which.to_string());
            Ok(())
        }
        other => other.map_err(Into::into),
    }
}

fn list(output: &Output, history: &History, undo_stack: bool) -> Result<(), HistoryError> {
    let ops = if undo_stack {
        history.list_undo_stack()?
    } else {
        history.list()?
    };

    if output.is_json() {
        output.data(&ops);
        return Ok(());
    }

    if ops.is_empty() {
        if undo_stack {
            println!("No undone operations.");
        } else {
            println!("No recorded operations.");
        }
        return Ok(());
    }

    println!("{:<4} {:<20} {:<13} {:<40} DETAILS", "#", "WHEN", "KIND", "TARGET");
    println!("{}", "-".repeat(100));
    for (i, op) in ops.iter().enumerate() {
        let when = op
            .timestamp
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<4} {:<20} {:<13} {:<40} {}",
            i + 1,
            when,
            op.kind,
            op.target.display(),
            details(op)
        );
    }

    if undo_stack {
        println!();
        println!("'blueprint history redo' recreates the last entry");
    }

    Ok(())
}

fn details(op: &Operation) -> String {
    let mut parts = Vec::new();

    if op.receipt.is_some() {
        let (dirs, files) = op.created_counts();
        parts.push(format!("{} dirs, {} files", dirs, files));
    }
    if let Some(blueprint) = &op.blueprint_path {
        parts.push(format!("from {}", blueprint.display()));
    }
    if let Some(prompt) = op.prompt_preview(40) {
        parts.push(format!("prompt \"{}\"", prompt));
    }
    if op.meta.get("partial").is_some_and(|v| v == "true") {
        parts.push("partial".to_string());
    }

    parts.join("; ")
}

fn undo(
    output: &Output,
    workspace: &Workspace,
    history: &History,
    confirm: bool,
) -> Result<(), HistoryError> {
    if !confirm {
        return preview_undo(output, history);
    }

    let report = Service::for_workspace(workspace).undo()?;
    let op = &report.operation;

    if output.is_json() {
        output.data(&report);
        return Ok(());
    }

    for failure in &report.failures {
        output.warn(&format!(
            "could not remove {}: {}",
            failure.path.display(),
            failure.error
        ));
    }
    output.success(&format!("Undid {} {}", op.kind, op.target.display()));
    if op.kind.is_recreatable() {
        println!("'blueprint history redo' reapplies it");
    }

    Ok(())
}

fn preview_undo(output: &Output, history: &History) -> Result<(), HistoryError> {
    let ops = history.list()?;
    let Some(last) = ops.last() else {
        return Err(HistoryError::Empty(crate::storage::HistoryEmpty::Undo));
    };

    if output.is_json() {
        output.data(&serde_json::json!({
            "confirmed": false,
            "operation": last,
        }));
        return Ok(());
    }

    println!("Will undo: [{}] {}", last.kind, last.target.display());
    if last.kind.rolls_back_receipt() {
        let (dirs, files) = last.created_counts();
        println!("  deletes {} files and {} directories", files, dirs);
    } else {
        println!("  deletes {}", last.target.display());
    }
    if let Some(blueprint) = &last.blueprint_path {
        println!("  can be recreated from {}", blueprint.display());
    }
    if last.source_prompt.is_some() {
        println!("  can be recreated from its prompt");
    }
    println!();
    println!("Run 'blueprint history undo --confirm' to proceed");

    Ok(())
}

fn redo(output: &Output, workspace: &Workspace, history: &History) -> Result<(), HistoryError> {
    let mut service = Service::for_workspace(workspace);

    let needs_source = history
        .list_undo_stack()?
        .last()
        .is_some_and(|op| matches!(op.kind, OperationKind::AiApply | OperationKind::AiBlueprint));
    if needs_source {
        match load_source(workspace, None) {
            Ok(source) => service = service.with_source(Box::new(source)),
            Err(e) => debug!(error = %e, "no blueprint source available for redo"),
        }
    }

    let op = service.redo()?;

    if output.is_json() {
        output.data(&op);
    } else {
        output.success(&format!("Redid {} {}", op.kind, op.target.display()));
    }

    Ok(())
}

fn clear(output: &Output, history: &History, confirm: bool) -> Result<(), HistoryError> {
    let recorded = history.list()?.len();
    let undone = history.list_undo_stack()?.len();

    if !confirm {
        if output.is_json() {
            output.data(&serde_json::json!({
                "confirmed": false,
                "recorded": recorded,
                "undone": undone,
            }));
        } else {
            println!(
                "Will forget {} recorded and {} undone operations. Files on disk are kept.",
                recorded, undone
            );
            println!("Run 'blueprint history clear --confirm' to proceed");
        }
        return Ok(());
    }

    history.clear()?;
    output.success(&format!(
        "Cleared {} recorded and {} undone operations",
        recorded, undone
    ));
    Ok(())
}

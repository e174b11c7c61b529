//! `blueprint create`

use std::path::Path;

use anyhow::Result;

use super::output::Output;
use crate::engine::{GenerateFailure, GenerateOptions};
use crate::service::{GenerateOutcome, Service};
use crate::storage::Workspace;

pub fn run(
    output: &Output,
    workspace: &Workspace,
    blueprint: &Path,
    output_dir: &Path,
    force: bool,
    dry_run: bool,
) -> Result<()> {
    let service = Service::for_workspace(workspace);
    let options = GenerateOptions { dry_run, force };

    let outcome = service
        .create(blueprint, output_dir, options)
        .inspect_err(|e| hint_partial(output, e))?;

    report(output, &outcome, output_dir, dry_run);
    Ok(())
}

/// Prints the result of a generation run
pub(super) fn report(output: &Output, outcome: &GenerateOutcome, target: &Path, dry_run: bool) {
    let receipt = &outcome.receipt;

    if output.is_json() {
        output.data(&serde_json::json!({
            "target": target.display().to_string(),
            "dry_run": dry_run,
            "created_dirs": receipt.created_dirs,
            "created_files": receipt.created_files,
            "skipped": outcome.skipped,
            "warnings": outcome.diagnostics.iter().map(ToString::to_string).collect::<Vec<_>>(),
        }));
        return;
    }

    output.diagnostics(&outcome.diagnostics);
    for skipped in &outcome.skipped {
        output.warn(&format!("skipped reserved entry: {}", skipped));
    }

    if dry_run {
        println!("Would create in {}:", target.display());
        output.tree(&outcome.tree);
    } else {
        output.success(&format!(
            "Created {} directories and {} files in {}",
            receipt.created_dirs.len(),
            receipt.created_files.len(),
            target.display()
        ));
        if output.is_verbose() {
            for path in receipt.created_dirs.iter().chain(&receipt.created_files) {
                println!("  {}", path.display());
            }
        }
    }
}

/// Points at undo when a failed run left entries behind
pub(super) fn hint_partial(output: &Output, err: &anyhow::Error) {
    if let Some(failure) = err.downcast_ref::<GenerateFailure>() {
        if !failure.receipt.is_empty() {
            output.warn(&format!(
                "{} entries were created before the failure; 'blueprint history undo --confirm' removes them",
                failure.receipt.len()
            ));
        }
    }
}

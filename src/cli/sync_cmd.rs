//! `blueprint sync` - one-shot folder update from a blueprint

use std::path::Path;

use anyhow::Result;

use super::output::Output;
use crate::service::Service;
use crate::storage::Workspace;

pub fn run(
    output: &Output,
    workspace: &Workspace,
    blueprint: &Path,
    dir: &Path,
    prune: bool,
) -> Result<()> {
    let service = Service::for_workspace(workspace);
    let outcome = service.sync(blueprint, dir, prune)?;

    if output.is_json() {
        output.data(&serde_json::json!({
            "target": dir.display().to_string(),
            "entries": outcome.receipt.len(),
            "removed": outcome.removed,
        }));
        return Ok(());
    }

    for path in &outcome.removed {
        println!("  removed {}", path.display());
    }
    output.success(&format!(
        "Synced {} entries into {}{}",
        outcome.receipt.len(),
        dir.display(),
        if prune {
            format!(", removed {}", outcome.removed.len())
        } else {
            String::new()
        }
    ));

    Ok(())
}

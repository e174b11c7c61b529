//! `blueprint reverse`

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use super::output::Output;
use crate::engine::BLUEPRINT_EXTENSION as EXTENSION;
use crate::service::Service;
use crate::storage::Workspace;

pub fn run(
    output: &Output,
    workspace: &Workspace,
    input_dir: &Path,
    target: Option<&Path>,
    dry_run: bool,
) -> Result<()> {
    let base = base_name(input_dir)?;
    let path = resolve_output_path(&base, target);

    let service = Service::for_workspace(workspace);
    let outcome = service.reverse(input_dir, &path, dry_run)?;
    let (dirs, files) = outcome.tree.stats();

    if output.is_json() {
        output.data(&serde_json::json!({
            "source": input_dir.display().to_string(),
            "target": outcome.path.display().to_string(),
            "dry_run": dry_run,
            "directories": dirs,
            "files": files,
            "blueprint": outcome.text,
        }));
    } else if dry_run {
        print!("{}", outcome.text);
    } else {
        output.success(&format!(
            "Wrote {} ({} directories, {} files)",
            outcome.path.display(),
            dirs,
            files
        ));
    }

    Ok(())
}

fn base_name(dir: &Path) -> Result<String> {
    if let Some(name) = dir.file_name() {
        return Ok(name.to_string_lossy().into_owned());
    }

    let resolved = dir
        .canonicalize()
        .with_context(|| format!("Failed to resolve {}", dir.display()))?;
    Ok(resolved
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "root".to_string()))
}

/// Where a reversed blueprint goes.
///
/// - nothing given: `<base>.struct` in the current directory
/// - a `.struct` path: used as is
/// - an existing directory or a path ending in `/`: `<dir>/<base>.struct`
/// - a path without extension: `.struct` appended
/// - anything else: used as is
pub fn resolve_output_path(base: &str, target: Option<&Path>) -> PathBuf {
    let file_name = format!("{}.{}", base, EXTENSION);

    let Some(target) = target else {
        return PathBuf::from(file_name);
    };

    if target.extension().is_some_and(|ext| ext == EXTENSION) {
        return target.to_path_buf();
    }

    let raw = target.to_string_lossy();
    if raw.ends_with('/') || raw.ends_with(std::path::MAIN_SEPARATOR) || target.is_dir() {
        return target.join(file_name);
    }

    if target.extension().is_none() {
        return target.with_extension(EXTENSION);
    }

    target.to_path_buf()
}

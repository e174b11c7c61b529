//! Orchestration of the engine and the history
//!
//! Each driving operation runs the engine steps it needs and then records
//! one [`Operation`]. The same pipelines back [`ServiceRecreator`], which
//! lets the history redo an operation without knowing how trees are made.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::domain::{CancelToken, Operation, OperationKind, Receipt, Tree};
use crate::engine::{
    serialize, sync, Diagnostic, GenerateFailure, GenerateOptions, Generator, Parser, Reverser,
    Validator, BLUEPRINT_EXTENSION,
};
use crate::source::BlueprintSource;
use crate::storage::{History, HistoryError, RecreateError, Recreator, UndoReport, Workspace};

/// Result of turning a tree into a folder
#[derive(Debug)]
pub struct GenerateOutcome {
    pub tree: Tree,
    pub receipt: Receipt,
    pub diagnostics: Vec<Diagnostic>,
    /// Reserved entries pruned before generation
    pub skipped: Vec<String>,
}

/// Result of turning a folder or prompt into blueprint text
#[derive(Debug)]
pub struct BlueprintOutcome {
    pub tree: Tree,
    pub text: String,
    pub path: PathBuf,
}

/// Result of making a folder follow its blueprint
#[derive(Debug)]
pub struct SyncOutcome {
    pub receipt: Receipt,
    pub removed: Vec<PathBuf>,
}

/// Runs the transformation pipelines and records what they did
pub struct Service {
    parser: Parser,
    generator: Generator,
    reverser: Reverser,
    validator: Validator,
    history: History,
    source: Option<Box<dyn BlueprintSource>>,
    ignore: Vec<String>,
    root_name: String,
}

impl Service {
    /// A service with default engine settings recording into `history`
    pub fn new(history: History) -> Self {
        Self {
            parser: Parser::new(),
            generator: Generator::new(),
            reverser: Reverser::new(),
            validator: Validator::default(),
            history,
            source: None,
            ignore: Vec::new(),
            root_name: "project".to_string(),
        }
    }

    /// A service configured from the workspace settings
    pub fn for_workspace(workspace: &Workspace) -> Self {
        let config = &workspace.config().workspace;
        Self::new(workspace.history())
            .with_validator(
                Validator::new(config.validate.reserved.iter().cloned())
                    .allow_reserved(config.validate.allow_reserved),
            )
            .with_ignored(config.reverse.ignore.iter().cloned())
            .with_root_name(config.source.root_name.clone())
    }

    pub fn with_validator(mut self, validator: Validator) -> Self {
        self.validator = validator;
        self
    }

    /// Entry names skipped by reverse and by pruning
    pub fn with_ignored(mut self, names: impl IntoIterator<Item = String>) -> Self {
        self.ignore = names.into_iter().collect();
        self.reverser = self.reverser.with_ignored(self.ignore.clone());
        self
    }

    pub fn with_source(mut self, source: Box<dyn BlueprintSource>) -> Self {
        self.source = Some(source);
        self
    }

    pub fn with_root_name(mut self, name: impl Into<String>) -> Self {
        self.root_name = name.into();
        self
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.parser = self.parser.with_cancel(cancel.clone());
        self.generator = self.generator.with_cancel(cancel.clone());
        self.reverser = self.reverser.with_cancel(cancel);
        self
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    fn source(&self) -> Result<&dyn BlueprintSource> {
        self.source.as_deref().context(
            "No blueprint source configured. Set [source] plugin in .blueprint/config.toml",
        )
    }

    /// Blueprint file -> folder. Records a Create operation unless dry.
    pub fn create(
        &self,
        blueprint: &Path,
        output_dir: &Path,
        options: GenerateOptions,
    ) -> Result<GenerateOutcome> {
        let blueprint = absolute(blueprint)?;
        let output_dir = absolute(output_dir)?;

        let parsed = self.parser.parse(&blueprint)?;
        let mut tree = parsed.tree;
        let report = self.validator.validate(&mut tree)?;

        let receipt = match self.generator.generate(&tree, &output_dir, options) {
            Ok(receipt) => receipt,
            Err(failure) => {
                if !options.dry_run {
                    let op = Operation::create(&output_dir, &blueprint, Receipt::new());
                    self.record_partial(op, &failure)?;
                }
                return Err(failure.into());
            }
        };

        if !options.dry_run {
            self.history.record(Operation::create(
                &output_dir,
                &blueprint,
                receipt.clone(),
            ))?;
            info!(
                blueprint = %blueprint.display(),
                target = %output_dir.display(),
                entries = receipt.len(),
                "created layout"
            );
        }

        Ok(GenerateOutcome {
            tree,
            receipt,
            diagnostics: parsed.diagnostics,
            skipped: report.skipped,
        })
    }

    /// Folder -> blueprint file. Records a Reverse operation unless dry.
    pub fn reverse(&self, input_dir: &Path, output: &Path, dry_run: bool) -> Result<BlueprintOutcome> {
        let input_dir = absolute(input_dir)?;
        let output = absolute(output)?;

        let tree = self.reverser.reverse(&input_dir)?;
        let text = serialize(&tree);

        if !dry_run {
            self.parser.write(&tree, &output)?;
            self.history.record(
                Operation::reverse(&output).with_meta("source_dir", input_dir.display().to_string()),
            )?;
            info!(source = %input_dir.display(), target = %output.display(), "reversed folder");
        }

        Ok(BlueprintOutcome {
            tree,
            text,
            path: output,
        })
    }

    /// Prompt -> blueprint file. Records an AiBlueprint operation.
    pub fn ai_blueprint(&self, prompt: &str, output: &Path) -> Result<BlueprintOutcome> {
        let output = absolute(output)?;
        let outcome = self.write_generated(prompt, &output)?;

        self.history
            .record(Operation::ai_blueprint(&output, prompt))?;
        info!(target = %output.display(), "saved generated blueprint");

        Ok(outcome)
    }

    /// Prompt -> folder. Records an AiApply operation unless dry.
    pub fn ai_apply(
        &self,
        prompt: &str,
        output_dir: &Path,
        options: GenerateOptions,
    ) -> Result<GenerateOutcome> {
        let output_dir = absolute(output_dir)?;
        let (mut tree, diagnostics) = self.tree_from_prompt(prompt)?;
        let report = self.validator.validate(&mut tree)?;

        let receipt = match self.generator.generate(&tree, &output_dir, options) {
            Ok(receipt) => receipt,
            Err(failure) => {
                if !options.dry_run {
                    let op = Operation::ai_apply(&output_dir, prompt, Receipt::new());
                    self.record_partial(op, &failure)?;
                }
                return Err(failure.into());
            }
        };

        if !options.dry_run {
            self.history
                .record(Operation::ai_apply(&output_dir, prompt, receipt.clone()))?;
            info!(
                target = %output_dir.display(),
                entries = receipt.len(),
                "applied generated layout"
            );
        }

        Ok(GenerateOutcome {
            tree,
            receipt,
            diagnostics,
            skipped: report.skipped,
        })
    }

    /// Generates `blueprint` into `dir` with force and, if asked, removes
    /// entries the blueprint does not name. Reserved folders, ignored
    /// entries and blueprint files are never pruned. Not recorded.
    pub fn sync(&self, blueprint: &Path, dir: &Path, prune: bool) -> Result<SyncOutcome> {
        let blueprint = absolute(blueprint)?;
        let dir = absolute(dir)?;
        let mut tree = self.parser.parse(&blueprint)?.tree;
        self.validator.validate(&mut tree)?;

        let receipt = self
            .generator
            .generate(&tree, &dir, GenerateOptions::forced())?;

        let removed = if prune {
            let protected = sync::Protected {
                names: self.ignore.clone(),
                reserved_dirs: self.validator.reserved().to_vec(),
                paths: vec![blueprint],
                extension: Some(BLUEPRINT_EXTENSION.to_string()),
            };
            sync::prune_extra(&dir, &sync::collect_allowed(&tree), &protected)?
        } else {
            Vec::new()
        };

        Ok(SyncOutcome { receipt, removed })
    }

    /// Rolls back the newest recorded operation
    pub fn undo(&self) -> Result<UndoReport, HistoryError> {
        self.history.undo()
    }

    /// Recreates the newest undone operation
    pub fn redo(&self) -> Result<Operation, HistoryError> {
        self.history.redo(&self.recreator())
    }

    pub fn recreator(&self) -> ServiceRecreator<'_> {
        ServiceRecreator { service: self }
    }

    fn tree_from_prompt(&self, prompt: &str) -> Result<(Tree, Vec<Diagnostic>)> {
        let source = self.source()?;
        let text = source
            .generate(prompt)
            .with_context(|| format!("Blueprint source {} failed", source.name()))?;

        let parsed = self
            .parser
            .parse_str(&text, &self.root_name)
            .with_context(|| format!("Blueprint source {} returned an invalid blueprint", source.name()))?;
        Ok((parsed.tree, parsed.diagnostics))
    }

    fn write_generated(&self, prompt: &str, output: &Path) -> Result<BlueprintOutcome> {
        let (tree, _) = self.tree_from_prompt(prompt)?;
        self.parser.write(&tree, output)?;

        Ok(BlueprintOutcome {
            text: serialize(&tree),
            tree,
            path: output.to_path_buf(),
        })
    }

    /// Records what a failed generation left behind so it can be undone
    fn record_partial(&self, op: Operation, failure: &GenerateFailure) -> Result<()> {
        if failure.receipt.is_empty() {
            return Ok(());
        }

        debug!(
            entries = failure.receipt.len(),
            error = %failure.error,
            "recording partial generation"
        );
        self.history.record(
            op.with_receipt(failure.receipt.clone())
                .with_meta("partial", "true"),
        )?;
        Ok(())
    }
}

/// Redoes operations by running their pipelines again
pub struct ServiceRecreator<'a> {
    service: &'a Service,
}

impl ServiceRecreator<'_> {
    fn create(&self, op: &Operation) -> Result<Operation, RecreateError> {
        let blueprint = op
            .blueprint_path
            .as_deref()
            .ok_or(RecreateError::MissingProvenance {
                kind: op.kind,
                field: "blueprint_path",
            })?;

        let service = self.service;
        let mut tree = service
            .parser
            .parse(blueprint)
            .with_context(|| format!("Failed to re-read {}", blueprint.display()))?
            .tree;
        service.validator.validate(&mut tree).map_err(anyhow::Error::from)?;

        let receipt = service
            .generator
            .generate(&tree, &op.target, GenerateOptions::forced())
            .map_err(anyhow::Error::from)?;

        Ok(Operation::create(&op.target, blueprint, receipt))
    }

    fn ai_apply(&self, op: &Operation) -> Result<Operation, RecreateError> {
        let prompt = prompt_of(op)?;

        let service = self.service;
        let (mut tree, _) = service.tree_from_prompt(prompt)?;
        service.validator.validate(&mut tree).map_err(anyhow::Error::from)?;

        let receipt = service
            .generator
            .generate(&tree, &op.target, GenerateOptions::forced())
            .map_err(anyhow::Error::from)?;

        Ok(Operation::ai_apply(&op.target, prompt, receipt))
    }

    fn ai_blueprint(&self, op: &Operation) -> Result<Operation, RecreateError> {
        let prompt = prompt_of(op)?;
        self.service.write_generated(prompt, &op.target)?;
        Ok(Operation::ai_blueprint(&op.target, prompt))
    }
}

impl Recreator for ServiceRecreator<'_> {
    fn recreate(&self, op: &Operation) -> Result<Operation, RecreateError> {
        match op.kind {
            OperationKind::Create => self.create(op),
            OperationKind::AiApply => self.ai_apply(op),
            OperationKind::AiBlueprint => self.ai_blueprint(op),
            OperationKind::Reverse => Err(RecreateError::Unsupported { kind: op.kind }),
        }
    }
}

fn prompt_of(op: &Operation) -> Result<&str, RecreateError> {
    op.source_prompt
        .as_deref()
        .ok_or(RecreateError::MissingProvenance {
            kind: op.kind,
            field: "source_prompt",
        })
}

fn absolute(path: &Path) -> Result<PathBuf> {
    std::path::absolute(path).with_context(|| format!("Invalid path: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    struct Canned(&'static str);

    impl BlueprintSource for Canned {
        fn name(&self) -> &str {
            "canned"
        }

        fn generate(&self, _prompt: &str) -> Result<String> {
            Ok(self.0.to_string())
        }
    }

    fn service(dir: &Path) -> Service {
        Service::new(History::for_dir(&dir.join(".blueprint")))
    }

    fn blueprint(dir: &Path, text: &str) -> PathBuf {
        let path = dir.join("app.struct");
        fs::write(&path, text).unwrap();
        path
    }

    #[test]
    fn create_records_operation() {
        let dir = TempDir::new().unwrap();
        let bp = blueprint(dir.path(), "app/\n\tsrc/\n\t\tmain.go\n\tREADME.md\n");
        let out = dir.path().join("out");
        let service = service(dir.path());

        let outcome = service.create(&bp, &out, GenerateOptions::default()).unwrap();

        assert_eq!(outcome.receipt.created_files.len(), 2);
        let ops = service.history().list().unwrap();
        assert_eq!(ops.len(), 1);
        assert_eq!(ops[0].kind, OperationKind::Create);
        assert_eq!(ops[0].blueprint_path.as_deref(), Some(bp.as_path()));
    }

    #[test]
    fn dry_run_is_not_recorded() {
        let dir = TempDir::new().unwrap();
        let bp = blueprint(dir.path(), "app/\n\tsrc/\n");
        let out = dir.path().join("out");
        let service = service(dir.path());

        let outcome = service.create(&bp, &out, GenerateOptions::dry_run()).unwrap();

        assert_eq!(outcome.receipt.created_dirs.len(), 1);
        assert!(!out.exists());
        assert!(service.history().list().unwrap().is_empty());
    }

    #[test]
    fn partial_generation_is_recorded() {
        let dir = TempDir::new().unwrap();
        let bp = blueprint(dir.path(), "app/\n\tsrc/\n\tREADME.md\n");
        let out = dir.path().join("out");
        fs::create_dir_all(&out).unwrap();
        fs::write(out.join("README.md"), "keep").unwrap();
        let service = service(dir.path());

        let err = service.create(&bp, &out, GenerateOptions::default()).unwrap_err();
        assert!(format!("{:#}", err).contains("already exists"));

        let ops = service.history().list().unwrap();
        assert_eq!(ops.len(), 1);
        assert_eq!(ops[0].meta.get("partial").map(String::as_str), Some("true"));
        assert_eq!(ops[0].receipt.as_ref().unwrap().created_dirs, vec![out.join("src")]);
    }

    #[test]
    fn reserved_entries_are_skipped() {
        let dir = TempDir::new().unwrap();
        let bp = blueprint(dir.path(), "app/\n\tnode_modules/\n\tsrc/\n");
        let out = dir.path().join("out");
        let service = service(dir.path());

        let outcome = service.create(&bp, &out, GenerateOptions::default()).unwrap();

        assert_eq!(outcome.skipped, vec!["node_modules"]);
        assert!(!out.join("node_modules").exists());
    }

    #[test]
    fn reverse_writes_and_records() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("out");
        fs::create_dir_all(input.join("src")).unwrap();
        fs::write(input.join("src/main.go"), "").unwrap();
        let target = dir.path().join("out.struct");
        let service = service(dir.path());

        let outcome = service.reverse(&input, &target, false).unwrap();

        assert_eq!(outcome.text, "out/\n\tsrc/\n\t\tmain.go\n");
        assert_eq!(fs::read_to_string(&target).unwrap(), outcome.text);
        assert_eq!(service.history().list().unwrap()[0].kind, OperationKind::Reverse);
    }

    #[test]
    fn ai_needs_a_source() {
        let dir = TempDir::new().unwrap();
        let service = service(dir.path());

        let err = service
            .ai_blueprint("anything", &dir.path().join("x.struct"))
            .unwrap_err();
        assert!(err.to_string().contains("No blueprint source"));
    }

    #[test]
    fn ai_apply_and_redo() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("svc");
        let service = service(dir.path())
            .with_source(Box::new(Canned("svc/\n\tcmd/\n\t\tmain.go\n")));

        service
            .ai_apply("a go service", &out, GenerateOptions::default())
            .unwrap();
        assert!(out.join("cmd/main.go").is_file());

        service.undo().unwrap();
        assert!(!out.join("cmd").exists());

        let redone = service.redo().unwrap();
        assert_eq!(redone.kind, OperationKind::AiApply);
        assert_eq!(redone.source_prompt.as_deref(), Some("a go service"));
        assert!(out.join("cmd/main.go").is_file());
    }

    #[test]
    fn ai_blueprint_is_normalized() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("api.struct");
        let service = service(dir.path()).with_source(Box::new(Canned("api/\n  src/\n")));

        let outcome = service.ai_blueprint("an api", &target).unwrap();

        assert_eq!(outcome.text, "api/\n\tsrc/\n");
        assert_eq!(fs::read_to_string(&target).unwrap(), "api/\n\tsrc/\n");
    }

    #[test]
    fn invalid_generated_blueprint_is_rejected() {
        let dir = TempDir::new().unwrap();
        let service = service(dir.path()).with_source(Box::new(Canned("not a root\n")));

        let err = service
            .ai_blueprint("x", &dir.path().join("x.struct"))
            .unwrap_err();
        assert!(format!("{:#}", err).contains("invalid blueprint"));
        assert!(service.history().list().unwrap().is_empty());
    }

    #[test]
    fn create_redo_regenerates() {
        let dir = TempDir::new().unwrap();
        let bp = blueprint(dir.path(), "app/\n\tsrc/\n\t\tlib.rs\n");
        let out = dir.path().join("out");
        let service = service(dir.path());

        service.create(&bp, &out, GenerateOptions::default()).unwrap();
        service.undo().unwrap();
        assert!(!out.join("src").exists());

        service.redo().unwrap();
        assert!(out.join("src/lib.rs").is_file());
        assert_eq!(service.history().list().unwrap().len(), 1);
    }

    #[test]
    fn recreator_refuses_reverse() {
        let dir = TempDir::new().unwrap();
        let service = service(dir.path());

        let err = service
            .recreator()
            .recreate(&Operation::reverse("/tmp/a.struct"))
            .unwrap_err();
        assert!(matches!(err, RecreateError::Unsupported { .. }));
    }

    #[test]
    fn sync_prunes_extra_entries() {
        let dir = TempDir::new().unwrap();
        let bp = blueprint(dir.path(), "app/\n\tsrc/\n");
        let out = dir.path().join("out");
        fs::create_dir_all(out.join("old")).unwrap();
        let service = service(dir.path());

        let outcome = service.sync(&bp, &out, true).unwrap();

        assert_eq!(outcome.removed, vec![out.join("old")]);
        assert!(out.join("src").is_dir());
        assert!(service.history().list().unwrap().is_empty());
    }

    #[test]
    fn sync_keeps_reserved_folders_and_blueprints() {
        let dir = TempDir::new().unwrap();
        let proj = dir.path().join("proj");
        fs::create_dir_all(proj.join("node_modules/left-pad")).unwrap();
        fs::write(proj.join("node_modules/left-pad/index.js"), "").unwrap();
        fs::write(proj.join("scratch.txt"), "").unwrap();
        let bp = blueprint(&proj, "app/\n\tsrc/\n\tnode_modules/\n");
        let service = service(dir.path());

        let outcome = service.sync(&bp, &proj, true).unwrap();

        assert_eq!(outcome.removed, vec![proj.join("scratch.txt")]);
        assert!(proj.join("node_modules/left-pad/index.js").exists());
        assert!(bp.exists());
        assert!(proj.join("src").is_dir());
    }
}

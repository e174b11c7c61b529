//! Operation records
//!
//! Every completed side-effecting action is described by one [`Operation`].
//! All kinds share one record shape so they can live interleaved in a single
//! newline-delimited JSON log.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of recorded operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    /// Blueprint file generated into a folder
    Create,
    /// Folder reversed into a blueprint file
    Reverse,
    /// Prompt turned into a blueprint file
    AiBlueprint,
    /// Prompt turned into a folder
    AiApply,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Create => "create",
            OperationKind::Reverse => "reverse",
            OperationKind::AiBlueprint => "ai_blueprint",
            OperationKind::AiApply => "ai_apply",
        }
    }

    /// Returns true if undo deletes the receipt rather than the target file
    pub fn rolls_back_receipt(&self) -> bool {
        matches!(self, OperationKind::Create | OperationKind::AiApply)
    }

    /// Returns true if redo can rebuild the effect from the saved provenance
    pub fn is_recreatable(&self) -> bool {
        !matches!(self, OperationKind::Reverse)
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Paths created by one generation run, in creation order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    #[serde(default)]
    pub created_dirs: Vec<PathBuf>,

    #[serde(default)]
    pub created_files: Vec<PathBuf>,
}

impl Receipt {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.created_dirs.is_empty() && self.created_files.is_empty()
    }

    /// Total number of recorded paths
    pub fn len(&self) -> usize {
        self.created_dirs.len() + self.created_files.len()
    }

    pub fn record_dir(&mut self, path: impl Into<PathBuf>) {
        self.created_dirs.push(path.into());
    }

    pub fn record_file(&mut self, path: impl Into<PathBuf>) {
        self.created_files.push(path.into());
    }

    /// Directories ordered deepest first, for deletion
    pub fn dirs_deepest_first(&self) -> Vec<&Path> {
        let mut dirs: Vec<&Path> = self.created_dirs.iter().map(PathBuf::as_path).collect();
        dirs.sort_by_key(|d| std::cmp::Reverse(d.components().count()));
        dirs
    }
}

/// A durable record of one completed operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    pub kind: OperationKind,

    /// Output directory or written blueprint file
    pub target: PathBuf,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receipt: Option<Receipt>,

    /// Filled in by the history when recording
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,

    /// Blueprint the operation was generated from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blueprint_path: Option<PathBuf>,

    /// Prompt an AI-sourced tree was generated from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_prompt: Option<String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub meta: BTreeMap<String, String>,
}

impl Operation {
    pub fn new(kind: OperationKind, target: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            target: target.into(),
            receipt: None,
            timestamp: None,
            blueprint_path: None,
            source_prompt: None,
            meta: BTreeMap::new(),
        }
    }

    /// A blueprint generated into `target`
    pub fn create(target: impl Into<PathBuf>, blueprint: impl Into<PathBuf>, receipt: Receipt) -> Self {
        Self::new(OperationKind::Create, target)
            .with_receipt(receipt)
            .with_blueprint(blueprint)
    }

    /// A folder reversed into the blueprint file `target`
    pub fn reverse(target: impl Into<PathBuf>) -> Self {
        Self::new(OperationKind::Reverse, target)
    }

    /// A prompt saved as the blueprint file `target`
    pub fn ai_blueprint(target: impl Into<PathBuf>, prompt: impl Into<String>) -> Self {
        Self::new(OperationKind::AiBlueprint, target).with_prompt(prompt)
    }

    /// A prompt generated into the folder `target`
    pub fn ai_apply(target: impl Into<PathBuf>, prompt: impl Into<String>, receipt: Receipt) -> Self {
        Self::new(OperationKind::AiApply, target)
            .with_receipt(receipt)
            .with_prompt(prompt)
    }

    pub fn with_receipt(mut self, receipt: Receipt) -> Self {
        self.receipt = Some(receipt);
        self
    }

    pub fn with_blueprint(mut self, path: impl Into<PathBuf>) -> Self {
        self.blueprint_path = Some(path.into());
        self
    }

    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.source_prompt = Some(prompt.into());
        self
    }

    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.meta.insert(key.into(), value.into());
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Sets the timestamp to now unless one is present
    pub fn stamp(&mut self) {
        if self.timestamp.is_none() {
            self.timestamp = Some(Utc::now());
        }
    }

    /// (dirs, files) created by this operation
    pub fn created_counts(&self) -> (usize, usize) {
        self.receipt
            .as_ref()
            .map(|r| (r.created_dirs.len(), r.created_files.len()))
            .unwrap_or((0, 0))
    }

    /// Shortened prompt for listings
    pub fn prompt_preview(&self, max_chars: usize) -> Option<String> {
        self.source_prompt.as_ref().map(|prompt| {
            if prompt.chars().count() > max_chars {
                let cut: String = prompt.chars().take(max_chars).collect();
                format!("{}...", cut)
            } else {
                prompt.clone()
            }
        })
    }
}

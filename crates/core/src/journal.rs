use anyhow::{bail, Context, Result};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenameOperation {
    pub from: PathBuf,
    pub to: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct JournalLog {
    created_at: DateTime<Local>,
    root: PathBuf,
    operations: Vec<RenameOperation>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UndoResult {
    pub restored: usize,
    /// Entries whose renamed file is gone or whose old name is taken again.
    pub skipped: usize,
}

/// On-disk record of the last committed batch.
#[derive(Debug, Clone)]
pub struct Journal {
    path: PathBuf,
}

impl Journal {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Replaces the journal with `operations`. An empty list leaves the
    /// previous journal in place.
    pub fn record(&self, root: &Path, operations: &[RenameOperation]) -> Result<()> {
        if operations.is_empty() {
            return Ok(());
        }
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)
                .with_context(|| format!("failed to create journal directory: {}", dir.display()))?;
        }

        let log = JournalLog {
            created_at: Local::now(),
            root: root.to_path_buf(),
            operations: operations.to_vec(),
        };
        let body = serde_json::to_string_pretty(&log).context("failed to serialize journal")?;
        fs::write(&self.path, body)
            .with_context(|| format!("failed to write journal: {}", self.path.display()))?;
        Ok(())
    }

    /// Renames every journaled file back, newest first, then deletes the
    /// journal.
    pub fn undo_last(&self) -> Result<UndoResult> {
        if !self.path.exists() {
            bail!("nothing to undo");
        }

        let raw = fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read journal: {}", self.path.display()))?;
        let log = serde_json::from_str::<JournalLog>(&raw).context("journal is corrupted")?;

        let result = restore_operations(&log.operations)?;
        info!(
            restored = result.restored,
            skipped = result.skipped,
            root = %log.root.display(),
            "undid last rename batch"
        );

        fs::remove_file(&self.path)
            .with_context(|| format!("failed to delete journal: {}", self.path.display()))?;
        Ok(result)
    }
}

fn restore_operations(operations: &[RenameOperation]) -> Result<UndoResult> {
    let mut result = UndoResult::default();
    for op in operations.iter().rev() {
        if !op.to.exists() {
            warn!(path = %op.to.display(), "renamed file is gone, skipping");
            result.skipped += 1;
            continue;
        }
        if op.from.exists() {
            warn!(path = %op.from.display(), "original name is taken, skipping");
            result.skipped += 1;
            continue;
        }
        fs::rename(&op.to, &op.from).with_context(|| {
            format!(
                "failed to undo rename: {} -> {}",
                op.to.display(),
                op.from.display()
            )
        })?;
        result.restored += 1;
    }
    Ok(result)
}

use crate::commit::{CommitOutcome, Committer};
use crate::filter::{FileFilter, PathMeta};
use crate::history::{History, HistorySnapshot};
use crate::image_info::MetadataProbe;
use crate::journal::RenameOperation;
use crate::model::FileId;
use crate::naming::{validate_name, InvalidName};
use crate::pipeline::{FileContext, Pipeline};
use crate::store::StateStore;
use chrono::Local;
use rayon::prelude::*;
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunOptions {
    /// Report what would happen without touching the filesystem.
    pub preview: bool,
    /// Log every rename at info level.
    pub verbose: bool,
    /// Ask before each rename.
    pub confirm: bool,
    /// `0` disables the length check.
    pub max_filename_len: usize,
}

/// Asked once per file when [`RunOptions::confirm`] is set.
pub trait Confirm {
    fn confirm(&mut self, from: &Path, to: &Path) -> bool;
}

/// Confirms everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct AssumeYes;

impl Confirm for AssumeYes {
    fn confirm(&mut self, _from: &Path, _to: &Path) -> bool {
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Something already lives at the target path.
    TargetExists,
    /// An earlier file in the same batch claimed the target.
    DuplicateTarget,
    InvalidName(InvalidName),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FileStatus {
    Renamed,
    Previewed,
    Declined,
    Skipped { reason: SkipReason },
    Failed { outcome: CommitOutcome },
}

impl fmt::Display for FileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Renamed => f.write_str("renamed"),
            Self::Previewed => f.write_str("preview"),
            Self::Declined => f.write_str("declined"),
            Self::Skipped { reason } => match reason {
                SkipReason::TargetExists => f.write_str("skipped: target exists"),
                SkipReason::DuplicateTarget => f.write_str("skipped: duplicate target"),
                SkipReason::InvalidName(why) => write!(f, "skipped: {}", why.as_str()),
            },
            Self::Failed { outcome } => match outcome {
                CommitOutcome::PermissionDenied => f.write_str("failed: permission denied"),
                CommitOutcome::Other(message) => write!(f, "failed: {message}"),
                other => write!(f, "failed: {other:?}"),
            },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub file: FileId,
    /// Relative to the store root.
    pub from: PathBuf,
    pub to: PathBuf,
    pub status: FileStatus,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunStats {
    /// Enabled files looked at.
    pub considered: usize,
    pub filtered_out: usize,
    pub unchanged: usize,
    pub renamed: usize,
    pub previewed: usize,
    pub declined: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl RunStats {
    fn count(&mut self, status: &FileStatus) {
        match status {
            FileStatus::Renamed => self.renamed += 1,
            FileStatus::Previewed => self.previewed += 1,
            FileStatus::Declined => self.declined += 1,
            FileStatus::Skipped { .. } => self.skipped += 1,
            FileStatus::Failed { .. } => self.failed += 1,
        }
    }
}

/// Per-file outcome list of one batch run or commit.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub root: PathBuf,
    pub preview: bool,
    pub files: Vec<FileReport>,
    pub stats: RunStats,
    /// Renames that reached the disk, for the journal.
    #[serde(skip)]
    pub operations: Vec<RenameOperation>,
}

/// Result of staging a pipeline onto pending names.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StageResult {
    pub changed: usize,
    pub stats: RunStats,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NameSource {
    /// Start from the name on disk.
    Current,
    /// Start from the pending name so transforms compose.
    Pending,
}

struct Proposal {
    file: FileId,
    new_name: String,
}

struct Input {
    file: FileId,
    name: String,
    abs_path: PathBuf,
}

/// Runs a compiled pipeline over the selected files of a store and commits
/// the results through a [`Committer`].
pub struct Orchestrator<'a> {
    pipeline: Pipeline,
    filter: FileFilter,
    probe: &'a dyn MetadataProbe,
    committer: &'a dyn Committer,
    options: RunOptions,
}

impl<'a> Orchestrator<'a> {
    pub fn new(
        pipeline: Pipeline,
        filter: FileFilter,
        probe: &'a dyn MetadataProbe,
        committer: &'a dyn Committer,
        options: RunOptions,
    ) -> Self {
        Self {
            pipeline,
            filter,
            probe,
            committer,
            options,
        }
    }

    pub fn set_pipeline(&mut self, pipeline: Pipeline) {
        self.pipeline = pipeline;
    }

    /// Batch mode: transform current names, record them as pending and
    /// commit (or preview) them right away.
    pub fn run_batch(&self, store: &mut StateStore, confirm: &mut dyn Confirm) -> RunReport {
        let (proposals, selection) = self.propose(store, NameSource::Current);
        store.batch(|store| {
            for proposal in proposals {
                store.set_file_name(proposal.file, proposal.new_name);
            }
        });

        let mut report = self.commit_pending(store, confirm);
        report.stats.considered = selection.considered;
        report.stats.filtered_out = selection.filtered_out;
        report.stats.unchanged = selection.unchanged;
        report
    }

    /// Interactive mode: snapshot the pending names, then transform them in
    /// place. Nothing touches the disk.
    pub fn stage(&self, store: &mut StateStore, history: &mut History) -> StageResult {
        history.push(HistorySnapshot::capture(store));
        let (proposals, stats) = self.propose(store, NameSource::Pending);
        let changed = store.batch(|store| {
            proposals
                .into_iter()
                .filter(|p| store.set_file_name(p.file, p.new_name.clone()))
                .count()
        });
        debug!(changed, "staged pending names");
        StageResult { changed, stats }
    }

    /// Commits every enabled file with a pending name, in store order.
    ///
    /// A file is skipped when its name is unusable, when an earlier file in
    /// this run claimed the same target or when the target already exists.
    /// Skips and failures never stop the run.
    pub fn commit_pending(&self, store: &mut StateStore, confirm: &mut dyn Confirm) -> RunReport {
        let candidates: Vec<FileId> = store
            .files()
            .filter(|f| f.is_enabled && store.folder(f.folder).is_enabled)
            .filter(|f| f.has_pending_rename())
            .map(|f| f.id)
            .collect();

        let mut claimed = HashSet::<PathBuf>::new();
        let mut files = Vec::with_capacity(candidates.len());
        let mut operations = Vec::new();
        let mut stats = RunStats::default();

        store.start_batch_update();
        for id in candidates {
            let record = store.file(id);
            let from_abs = record.abs_path.clone();
            let to_abs = record.pending_abs_path();
            let from = record.rel_path.clone();
            let to = record.pending_rel_path();
            let new_name = record.new_name.clone();

            let status = self.commit_one(
                store, id, &new_name, &from_abs, &to_abs, &mut claimed, confirm,
            );
            match &status {
                FileStatus::Renamed => operations.push(RenameOperation {
                    from: from_abs,
                    to: to_abs,
                }),
                FileStatus::Skipped { reason } => {
                    warn!(from = %from.display(), to = %to.display(), ?reason, "rename skipped")
                }
                FileStatus::Failed { outcome } => {
                    warn!(from = %from.display(), to = %to.display(), ?outcome, "rename failed")
                }
                _ => {}
            }
            stats.count(&status);
            files.push(FileReport {
                file: id,
                from,
                to,
                status,
            });
        }
        store.end_batch_update();

        info!(
            renamed = stats.renamed,
            previewed = stats.previewed,
            skipped = stats.skipped,
            failed = stats.failed,
            "rename run finished"
        );
        RunReport {
            root: store.root().to_path_buf(),
            preview: self.options.preview,
            files,
            stats,
            operations,
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn commit_one(
        &self,
        store: &mut StateStore,
        id: FileId,
        new_name: &str,
        from: &Path,
        to: &Path,
        claimed: &mut HashSet<PathBuf>,
        confirm: &mut dyn Confirm,
    ) -> FileStatus {
        if let Err(why) = validate_name(new_name, self.options.max_filename_len) {
            return FileStatus::Skipped {
                reason: SkipReason::InvalidName(why),
            };
        }
        if !claimed.insert(to.to_path_buf()) {
            return FileStatus::Skipped {
                reason: SkipReason::DuplicateTarget,
            };
        }

        if self.options.preview {
            if self.committer.would_collide(from, to) {
                return FileStatus::Skipped {
                    reason: SkipReason::TargetExists,
                };
            }
            self.log_rename("would rename", from, to);
            return FileStatus::Previewed;
        }

        if self.options.confirm && !confirm.confirm(from, to) {
            claimed.remove(to);
            return FileStatus::Declined;
        }

        match self.committer.rename(from, to) {
            CommitOutcome::Ok => {
                store.commit_file_name(id);
                self.log_rename("renamed", from, to);
                FileStatus::Renamed
            }
            CommitOutcome::AlreadyExists => FileStatus::Skipped {
                reason: SkipReason::TargetExists,
            },
            outcome => FileStatus::Failed { outcome },
        }
    }

    fn log_rename(&self, action: &str, from: &Path, to: &Path) {
        if self.options.verbose {
            info!(from = %from.display(), to = %to.display(), "{action}");
        } else {
            debug!(from = %from.display(), to = %to.display(), "{action}");
        }
    }

    /// Runs the pipeline over enabled files that pass the filter. Names are
    /// computed in parallel; the store is only read.
    fn propose(&self, store: &StateStore, source: NameSource) -> (Vec<Proposal>, RunStats) {
        let mut stats = RunStats::default();
        let mut inputs = Vec::new();
        for file in store.files() {
            if !file.is_enabled || !store.folder(file.folder).is_enabled {
                continue;
            }
            stats.considered += 1;
            let meta = PathMeta {
                name: &file.current_name,
                size: file.size,
                modified: file.modified,
            };
            if !self.filter.matches(&meta) {
                stats.filtered_out += 1;
                continue;
            }
            let name = match source {
                NameSource::Current => file.current_name.clone(),
                NameSource::Pending => file.new_name.clone(),
            };
            inputs.push(Input {
                file: file.id,
                name,
                abs_path: file.abs_path.clone(),
            });
        }

        let now = Local::now();
        let pipeline = &self.pipeline;
        let probe = self.probe;
        let computed: Vec<(FileId, String, bool)> = inputs
            .par_iter()
            .map(|input| {
                let ctx = FileContext {
                    path: &input.abs_path,
                    now,
                    probe,
                };
                let new_name = pipeline.apply(&input.name, &ctx);
                let changed = new_name != input.name;
                (input.file, new_name, changed)
            })
            .collect();

        let mut proposals = Vec::with_capacity(computed.len());
        for (file, new_name, changed) in computed {
            if changed {
                proposals.push(Proposal { file, new_name });
            } else {
                stats.unchanged += 1;
            }
        }
        (proposals, stats)
    }
}

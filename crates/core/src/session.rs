use crate::history::{History, HistorySnapshot};
use crate::journal::Journal;
use crate::model::{FileId, Summary};
use crate::naming::TransformOptions;
use crate::orchestrator::{Confirm, Orchestrator, RunReport, StageResult};
use crate::pipeline::{OperationStep, Pipeline, StepDiagnostic};
use crate::store::{Observer, ObserverId, StateStore};
use anyhow::Result;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;

/// One line of interactive input, already tokenized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Transform(Vec<OperationStep>),
    /// Enables or disables a folder given relative to the root, optionally
    /// with every folder below it.
    SetFolderEnabled {
        folder: PathBuf,
        enabled: bool,
        recursive: bool,
    },
    ToggleFile(PathBuf),
    /// Sets one file's pending name; `None` drops its pending rename.
    Edit {
        file: PathBuf,
        name: Option<String>,
    },
    Undo,
    Apply,
    Status,
    List,
    Exit,
}

/// A file with a pending rename.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PendingRow {
    pub file: FileId,
    pub from: PathBuf,
    pub to: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionStatus {
    pub summary: Summary,
    pub pending: usize,
    pub undo_depth: usize,
}

#[derive(Debug)]
pub enum Reply {
    Staged {
        result: StageResult,
        diagnostics: Vec<StepDiagnostic>,
    },
    /// Summary after an enable-state change.
    Enabled(Summary),
    /// `applied == false` when the file sits in a disabled folder.
    Toggled {
        enabled: bool,
        applied: bool,
    },
    /// `false` when the pending name did not change.
    Edited(bool),
    /// No folder or file at this relative path.
    NotFound(PathBuf),
    /// `false` when the history was empty.
    Undone(bool),
    Applied(RunReport),
    Status(SessionStatus),
    Pending(Vec<PendingRow>),
    Exit,
}

/// Interactive rename session: transforms edit pending names, `apply` commits
/// them, `undo` walks back through the history.
pub struct Session<'a> {
    store: StateStore,
    orchestrator: Orchestrator<'a>,
    history: History,
    options: TransformOptions,
    journal: Option<Journal>,
}

impl<'a> Session<'a> {
    pub fn new(
        store: StateStore,
        orchestrator: Orchestrator<'a>,
        options: TransformOptions,
        journal: Option<Journal>,
    ) -> Self {
        Self {
            store,
            orchestrator,
            history: History::new(),
            options,
            journal,
        }
    }

    pub fn store(&self) -> &StateStore {
        &self.store
    }

    pub fn add_observer(&mut self, observer: Box<dyn Observer>) -> ObserverId {
        self.store.add_observer(observer)
    }

    pub fn execute(&mut self, command: Command, confirm: &mut dyn Confirm) -> Result<Reply> {
        match command {
            Command::Transform(steps) => {
                let compiled = Pipeline::compile(&steps, self.options);
                self.orchestrator.set_pipeline(compiled.pipeline);
                let result = self.orchestrator.stage(&mut self.store, &mut self.history);
                Ok(Reply::Staged {
                    result,
                    diagnostics: compiled.diagnostics,
                })
            }
            Command::SetFolderEnabled {
                folder,
                enabled,
                recursive,
            } => {
                let Some(id) = self.store.folder_by_rel_path(&folder) else {
                    return Ok(Reply::NotFound(folder));
                };
                if recursive {
                    self.store.set_subtree_enabled(id, enabled);
                } else {
                    self.store.set_folder_enabled(id, enabled);
                }
                Ok(Reply::Enabled(self.store.summary()))
            }
            Command::ToggleFile(file) => {
                let Some(id) = self.store.file_by_rel_path(&file) else {
                    return Ok(Reply::NotFound(file));
                };
                let applied = self.store.toggle_file_enabled(id);
                Ok(Reply::Toggled {
                    enabled: self.store.file(id).is_enabled,
                    applied,
                })
            }
            Command::Edit { file, name } => {
                let Some(id) = self.file_id(&file) else {
                    return Ok(Reply::NotFound(file));
                };
                self.history.push(HistorySnapshot::capture(&self.store));
                let changed = match name {
                    Some(name) => self.store.set_file_name(id, name),
                    None => self.store.clear_file_name(id),
                };
                Ok(Reply::Edited(changed))
            }
            Command::Undo => Ok(Reply::Undone(self.history.undo(&mut self.store))),
            Command::Apply => {
                let report = self.orchestrator.commit_pending(&mut self.store, confirm);
                if !report.preview {
                    self.history.clear();
                    if let Some(journal) = &self.journal {
                        journal.record(&report.root, &report.operations)?;
                    }
                }
                Ok(Reply::Applied(report))
            }
            Command::Status => Ok(Reply::Status(self.status())),
            Command::List => Ok(Reply::Pending(self.pending())),
            Command::Exit => {
                self.history.clear();
                info!("session closed");
                Ok(Reply::Exit)
            }
        }
    }

    /// Accepts the on-disk relative path or the pending one.
    fn file_id(&self, rel_path: &Path) -> Option<FileId> {
        self.store.file_by_rel_path(rel_path).or_else(|| {
            self.store
                .files()
                .find(|f| f.pending_rel_path() == rel_path)
                .map(|f| f.id)
        })
    }

    pub fn status(&self) -> SessionStatus {
        SessionStatus {
            summary: self.store.summary(),
            pending: self.store.files().filter(|f| f.has_pending_rename()).count(),
            undo_depth: self.history.depth(),
        }
    }

    pub fn pending(&self) -> Vec<PendingRow> {
        self.store
            .files()
            .filter(|f| f.has_pending_rename())
            .map(|f| PendingRow {
                file: f.id,
                from: f.rel_path.clone(),
                to: f.pending_rel_path(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commit::FsCommitter;
    use crate::filter::FileFilter;
    use crate::orchestrator::{AssumeYes, RunOptions};
    use crate::probe::NoProbe;
    use crate::scan::{scan, ScanOptions};
    use std::fs;
    use tempfile::tempdir;

    fn steps(line: &[(&str, &[&str])]) -> Command {
        Command::Transform(
            line.iter()
                .map(|(name, args)| OperationStep::new(*name, args.iter().copied()))
                .collect(),
        )
    }

    #[test]
    fn transform_undo_apply_cycle() {
        let dir = tempdir().expect("tempdir");
        let state = tempdir().expect("state dir");
        fs::write(dir.path().join("Draft Report.txt"), b"x").expect("write");
        let result = scan(dir.path(), ScanOptions::default()).expect("scan");
        let store = StateStore::populate(result.root, &result.entries);
        let journal = Journal::new(state.path().join("last-rename.json"));

        let orchestrator = Orchestrator::new(
            Pipeline::default(),
            FileFilter::default(),
            &NoProbe,
            &FsCommitter,
            RunOptions::default(),
        );
        let mut session = Session::new(
            store,
            orchestrator,
            TransformOptions::default(),
            Some(journal.clone()),
        );

        session
            .execute(steps(&[("case", &["kebab"])]), &mut AssumeYes)
            .expect("kebab");
        session
            .execute(steps(&[("upper", &[])]), &mut AssumeYes)
            .expect("upper");
        assert_eq!(session.pending()[0].to, PathBuf::from("DRAFT-REPORT.txt"));
        assert_eq!(session.status().undo_depth, 2);

        let Reply::Undone(true) = session.execute(Command::Undo, &mut AssumeYes).expect("undo")
        else {
            panic!("expected a successful undo");
        };
        assert_eq!(session.pending()[0].to, PathBuf::from("draft-report.txt"));
        assert!(dir.path().join("Draft Report.txt").exists());

        let Reply::Applied(report) = session.execute(Command::Apply, &mut AssumeYes).expect("apply")
        else {
            panic!("expected an apply report");
        };
        assert_eq!(report.stats.renamed, 1);
        assert!(dir.path().join("draft-report.txt").exists());
        assert!(session.pending().is_empty());
        assert_eq!(session.status().undo_depth, 0);
        assert!(journal.exists());
    }

    fn virtual_session<'a>(committer: &'a FsCommitter) -> Session<'a> {
        let mut store = StateStore::new("/virtual");
        let root = store.root_folder();
        let raw = store.add_folder("/virtual/raw", root);
        let deep = store.add_folder("/virtual/raw/deep", raw);
        store.add_file(root, "a.txt", 1, None);
        store.add_file(raw, "b.txt", 2, None);
        store.add_file(deep, "c.txt", 4, None);
        let orchestrator = Orchestrator::new(
            Pipeline::default(),
            FileFilter::default(),
            &NoProbe,
            committer,
            RunOptions::default(),
        );
        Session::new(store, orchestrator, TransformOptions::default(), None)
    }

    #[test]
    fn folder_toggles_update_summary() {
        let committer = FsCommitter;
        let mut session = virtual_session(&committer);
        let disable = |recursive| Command::SetFolderEnabled {
            folder: PathBuf::from("raw"),
            enabled: false,
            recursive,
        };

        let Reply::Enabled(summary) = session.execute(disable(false), &mut AssumeYes).expect("disable")
        else {
            panic!("expected a summary");
        };
        assert_eq!(summary.enabled_folders_count, 2);
        assert_eq!(summary.enabled_files_count, 2);

        let Reply::Enabled(summary) = session.execute(disable(true), &mut AssumeYes).expect("disable")
        else {
            panic!("expected a summary");
        };
        assert_eq!(summary.enabled_folders_count, 1);
        assert_eq!(summary.enabled_files_count, 1);
        assert_eq!(summary.total_size, 1);

        assert!(matches!(
            session
                .execute(
                    Command::SetFolderEnabled {
                        folder: PathBuf::from("missing"),
                        enabled: true,
                        recursive: false,
                    },
                    &mut AssumeYes
                )
                .expect("missing folder"),
            Reply::NotFound(_)
        ));
    }

    #[test]
    fn toggling_a_file_in_a_disabled_folder_is_refused() {
        let committer = FsCommitter;
        let mut session = virtual_session(&committer);
        let toggle = |path: &str| Command::ToggleFile(PathBuf::from(path));

        assert!(matches!(
            session.execute(toggle("a.txt"), &mut AssumeYes).expect("toggle"),
            Reply::Toggled {
                enabled: false,
                applied: true
            }
        ));
        assert_eq!(session.status().summary.enabled_files_count, 2);

        session
            .execute(
                Command::SetFolderEnabled {
                    folder: PathBuf::from("raw/deep"),
                    enabled: false,
                    recursive: false,
                },
                &mut AssumeYes,
            )
            .expect("disable");
        assert!(matches!(
            session.execute(toggle("raw/deep/c.txt"), &mut AssumeYes).expect("toggle"),
            Reply::Toggled {
                enabled: false,
                applied: false
            }
        ));
        assert_eq!(session.status().summary.enabled_files_count, 1);
    }

    #[test]
    fn edit_sets_one_name_and_can_be_undone() {
        let committer = FsCommitter;
        let mut session = virtual_session(&committer);
        let edit = |file: &str, name: Option<&str>| Command::Edit {
            file: PathBuf::from(file),
            name: name.map(str::to_string),
        };

        let reply = session
            .execute(edit("raw/b.txt", Some("beta.txt")), &mut AssumeYes)
            .expect("edit");
        assert!(matches!(reply, Reply::Edited(true)));
        assert_eq!(session.pending()[0].to, PathBuf::from("raw/beta.txt"));
        assert_eq!(session.status().undo_depth, 1);

        // The pending path also finds the file.
        session
            .execute(edit("raw/beta.txt", None), &mut AssumeYes)
            .expect("clear");
        assert!(session.pending().is_empty());

        session.execute(Command::Undo, &mut AssumeYes).expect("undo");
        assert_eq!(session.pending()[0].to, PathBuf::from("raw/beta.txt"));
        assert!(matches!(
            session.execute(edit("zzz.txt", Some("x")), &mut AssumeYes).expect("edit"),
            Reply::NotFound(_)
        ));
    }

    #[test]
    fn bad_step_is_reported_and_rest_runs() {
        let mut store = StateStore::new("/virtual");
        let root = store.root_folder();
        store.add_file(root, "a.txt", 1, None);
        let orchestrator = Orchestrator::new(
            Pipeline::default(),
            FileFilter::default(),
            &NoProbe,
            &FsCommitter,
            RunOptions::default(),
        );
        let mut session = Session::new(store, orchestrator, TransformOptions::default(), None);

        let reply = session
            .execute(steps(&[("frobnicate", &[]), ("prefix", &["x_"])]), &mut AssumeYes)
            .expect("transform");
        let Reply::Staged {
            result,
            diagnostics,
        } = reply
        else {
            panic!("expected staged reply");
        };
        assert_eq!(result.changed, 1);
        assert_eq!(diagnostics.len(), 1);

        assert!(matches!(
            session.execute(Command::Exit, &mut AssumeYes).expect("exit"),
            Reply::Exit
        ));
        assert!(matches!(
            session.execute(Command::Undo, &mut AssumeYes).expect("undo"),
            Reply::Undone(false)
        ));
    }
}

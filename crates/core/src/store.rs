use crate::model::{sibling, FileId, FileRecord, FolderId, FolderRecord, Summary};
use crate::naming::extension_of;
use crate::scan::ScannedEntry;
use chrono::{DateTime, Local};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Change notifications sent to observers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delta {
    FolderChanged {
        folder: FolderId,
        summary: Summary,
    },
    FileChanged {
        file: FileId,
        summary: Summary,
    },
    /// A pending (`committed == false`) or committed rename. The paths are
    /// relative to the store root so views can re-key their rows.
    FileRenamed {
        file: FileId,
        old_rel_path: PathBuf,
        new_rel_path: PathBuf,
        committed: bool,
    },
    SummaryChanged(Summary),
    /// Sent once when the outermost batch ends.
    BatchDone(Summary),
}

/// A view that follows the store.
pub trait Observer {
    fn on_update(&mut self, delta: &Delta);
}

impl<F: FnMut(&Delta)> Observer for F {
    fn on_update(&mut self, delta: &Delta) {
        self(delta)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

/// Names what changed since the cached summary was last correct.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummaryDelta {
    Folder(FolderId),
    File(FileId),
}

/// Owner of all folder and file records.
///
/// Records are only handed out by shared reference; every mutation goes
/// through a setter so observers and the summary stay in step.
pub struct StateStore {
    root: PathBuf,
    folders: Vec<FolderRecord>,
    files: Vec<FileRecord>,
    folder_index: HashMap<PathBuf, FolderId>,
    // What each record currently contributes to `summary`.
    folder_counted: Vec<bool>,
    file_counted: Vec<bool>,
    summary: Summary,
    observers: Vec<(ObserverId, Box<dyn Observer>)>,
    next_observer: u64,
    batch_depth: usize,
}

impl StateStore {
    /// Empty store with the root folder registered.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let mut store = Self {
            root: root.clone(),
            folders: Vec::new(),
            files: Vec::new(),
            folder_index: HashMap::new(),
            folder_counted: Vec::new(),
            file_counted: Vec::new(),
            summary: Summary::default(),
            observers: Vec::new(),
            next_observer: 0,
            batch_depth: 0,
        };
        store.insert_folder(root, None);
        store
    }

    /// Builds a store from a scan. Every entry must live under `root`.
    pub fn populate(root: impl Into<PathBuf>, entries: &[ScannedEntry]) -> Self {
        let mut store = Self::new(root);
        for entry in entries {
            if entry.is_dir {
                store.ensure_folder(&entry.path);
            } else {
                let parent = entry.path.parent().unwrap_or(&store.root).to_path_buf();
                let folder = store.ensure_folder(&parent);
                let name = entry
                    .path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                store.add_file(folder, name, entry.size, entry.modified);
            }
        }
        debug!(
            folders = store.folders.len(),
            files = store.files.len(),
            "store populated"
        );
        store
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn root_folder(&self) -> FolderId {
        FolderId(0)
    }

    pub fn summary(&self) -> Summary {
        self.summary
    }

    pub fn file(&self, id: FileId) -> &FileRecord {
        &self.files[id.0]
    }

    pub fn folder(&self, id: FolderId) -> &FolderRecord {
        &self.folders[id.0]
    }

    pub fn files(&self) -> impl Iterator<Item = &FileRecord> {
        self.files.iter()
    }

    pub fn folders(&self) -> impl Iterator<Item = &FolderRecord> {
        self.folders.iter()
    }

    pub fn folder_by_path(&self, path: &Path) -> Option<FolderId> {
        self.folder_index.get(path).copied()
    }

    /// Folder at `rel_path` below the root. `""` and `.` name the root.
    pub fn folder_by_rel_path(&self, rel_path: &Path) -> Option<FolderId> {
        if rel_path.as_os_str().is_empty() || rel_path == Path::new(".") {
            return Some(self.root_folder());
        }
        self.folders
            .iter()
            .find(|folder| folder.rel_path == rel_path)
            .map(|folder| folder.id)
    }

    /// File whose on-disk path relative to the root is `rel_path`.
    pub fn file_by_rel_path(&self, rel_path: &Path) -> Option<FileId> {
        self.files
            .iter()
            .find(|file| file.rel_path == rel_path)
            .map(|file| file.id)
    }

    pub fn in_batch(&self) -> bool {
        self.batch_depth > 0
    }

    /// Registers a folder below `parent`.
    pub fn add_folder(&mut self, abs_path: impl Into<PathBuf>, parent: FolderId) -> FolderId {
        let abs_path = abs_path.into();
        if let Some(existing) = self.folder_index.get(&abs_path) {
            return *existing;
        }
        self.insert_folder(abs_path, Some(parent))
    }

    /// Registers a file in `folder`. It starts enabled when the folder is.
    pub fn add_file(
        &mut self,
        folder: FolderId,
        name: impl Into<String>,
        size: u64,
        modified: Option<DateTime<Local>>,
    ) -> FileId {
        let name = name.into();
        let id = FileId(self.files.len());
        let parent = &self.folders[folder.0];
        let record = FileRecord {
            id,
            current_name: name.clone(),
            new_name: name.clone(),
            size,
            modified,
            is_enabled: parent.is_enabled,
            rel_path: parent.rel_path.join(&name),
            abs_path: parent.abs_path.join(&name),
            extension: extension_of(&name),
            folder,
            name,
        };
        self.files.push(record);
        self.file_counted.push(false);
        self.folders[folder.0].files.push(id);
        self.summary.files_count += 1;
        self.refresh_file(id);
        id
    }

    /// Sets a folder's flag and copies it to every file in the folder.
    pub fn set_folder_enabled(&mut self, id: FolderId, enabled: bool) {
        let folder = &mut self.folders[id.0];
        folder.is_enabled = enabled;
        for file in &folder.files {
            self.files[file.0].is_enabled = enabled;
        }
        self.changed(SummaryDelta::Folder(id));
    }

    /// Applies [`Self::set_folder_enabled`] to a folder and all its
    /// descendants as one batch.
    pub fn set_subtree_enabled(&mut self, id: FolderId, enabled: bool) {
        let mut pending = vec![id];
        self.batch(|store| {
            while let Some(folder) = pending.pop() {
                pending.extend(store.folders[folder.0].children.iter().copied());
                store.set_folder_enabled(folder, enabled);
            }
        });
    }

    /// Returns `false` without changing anything when enabling a file whose
    /// folder is disabled.
    pub fn set_file_enabled(&mut self, id: FileId, enabled: bool) -> bool {
        let folder = self.files[id.0].folder;
        if enabled && !self.folders[folder.0].is_enabled {
            return false;
        }
        self.files[id.0].is_enabled = enabled;
        self.changed(SummaryDelta::File(id));
        true
    }

    pub fn toggle_file_enabled(&mut self, id: FileId) -> bool {
        let enabled = !self.files[id.0].is_enabled;
        self.set_file_enabled(id, enabled)
    }

    /// Records a pending rename. Returns `false` when the name is unchanged.
    pub fn set_file_name(&mut self, id: FileId, new_name: impl Into<String>) -> bool {
        let new_name = new_name.into();
        let file = &mut self.files[id.0];
        if file.new_name == new_name {
            return false;
        }
        let old_rel_path = file.pending_rel_path();
        file.new_name = new_name;
        let new_rel_path = file.pending_rel_path();
        self.notify(Delta::FileRenamed {
            file: id,
            old_rel_path,
            new_rel_path,
            committed: false,
        });
        true
    }

    /// Drops any pending rename of the file.
    pub fn clear_file_name(&mut self, id: FileId) -> bool {
        let current = self.files[id.0].current_name.clone();
        self.set_file_name(id, current)
    }

    /// Marks the pending rename as done on disk: `current_name` takes the
    /// pending name and the paths are rebuilt from it.
    pub fn commit_file_name(&mut self, id: FileId) {
        let file = &mut self.files[id.0];
        if !file.has_pending_rename() {
            return;
        }
        let old_rel_path = file.rel_path.clone();
        file.current_name = file.new_name.clone();
        file.rel_path = sibling(&file.rel_path, &file.current_name);
        file.abs_path = sibling(&file.abs_path, &file.current_name);
        file.extension = extension_of(&file.current_name);
        let new_rel_path = file.rel_path.clone();
        self.notify(Delta::FileRenamed {
            file: id,
            old_rel_path,
            new_rel_path,
            committed: true,
        });
    }

    /// Brings the cached summary up to date.
    ///
    /// With a delta only the named folder or file is re-examined; the result
    /// equals a full recount as long as nothing else changed since the last
    /// update. `None` recounts everything and tells observers.
    pub fn recalculate_summary(&mut self, delta: Option<SummaryDelta>) -> Summary {
        match delta {
            Some(SummaryDelta::File(id)) => self.refresh_file(id),
            Some(SummaryDelta::Folder(id)) => self.refresh_folder(id),
            None => {
                self.recount();
                self.notify(Delta::SummaryChanged(self.summary));
            }
        }
        self.summary
    }

    pub fn add_observer(&mut self, observer: Box<dyn Observer>) -> ObserverId {
        let id = ObserverId(self.next_observer);
        self.next_observer += 1;
        self.observers.push((id, observer));
        id
    }

    pub fn remove_observer(&mut self, id: ObserverId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(existing, _)| *existing != id);
        self.observers.len() != before
    }

    /// Suppresses notifications until the matching [`Self::end_batch_update`].
    /// Batches nest.
    pub fn start_batch_update(&mut self) {
        self.batch_depth += 1;
    }

    /// Ends a batch. Closing the outermost batch recounts the summary once and
    /// sends a single [`Delta::BatchDone`].
    pub fn end_batch_update(&mut self) {
        assert!(self.batch_depth > 0, "end_batch_update without start_batch_update");
        self.batch_depth -= 1;
        if self.batch_depth == 0 {
            self.recount();
            self.notify(Delta::BatchDone(self.summary));
        }
    }

    /// Runs `f` inside a batch.
    pub fn batch<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        self.start_batch_update();
        let out = f(self);
        self.end_batch_update();
        out
    }

    fn insert_folder(&mut self, abs_path: PathBuf, parent: Option<FolderId>) -> FolderId {
        let id = FolderId(self.folders.len());
        let rel_path = abs_path
            .strip_prefix(&self.root)
            .map(Path::to_path_buf)
            .unwrap_or_else(|_| abs_path.clone());
        let is_enabled = parent.is_none_or(|p| self.folders[p.0].is_enabled);
        if let Some(parent) = parent {
            self.folders[parent.0].children.push(id);
        }
        self.folders.push(FolderRecord {
            id,
            abs_path: abs_path.clone(),
            rel_path,
            parent,
            children: Vec::new(),
            is_enabled,
            files: Vec::new(),
        });
        self.folder_index.insert(abs_path, id);
        self.folder_counted.push(false);
        self.summary.folders_count += 1;
        self.refresh_folder(id);
        id
    }

    fn ensure_folder(&mut self, abs_path: &Path) -> FolderId {
        if let Some(id) = self.folder_index.get(abs_path) {
            return *id;
        }
        let parent = match abs_path.parent() {
            Some(parent) if parent.starts_with(&self.root) => self.ensure_folder(parent),
            _ => self.root_folder(),
        };
        self.add_folder(abs_path, parent)
    }

    /// Post-mutation bookkeeping: one incremental update and one notification,
    /// or nothing while a batch is open.
    fn changed(&mut self, delta: SummaryDelta) {
        if self.in_batch() {
            return;
        }
        let summary = self.recalculate_summary(Some(delta));
        self.notify(match delta {
            SummaryDelta::Folder(folder) => Delta::FolderChanged { folder, summary },
            SummaryDelta::File(file) => Delta::FileChanged { file, summary },
        });
    }

    fn notify(&mut self, delta: Delta) {
        if self.in_batch() {
            return;
        }
        for (_, observer) in &mut self.observers {
            observer.on_update(&delta);
        }
    }

    fn refresh_file(&mut self, id: FileId) {
        let file = &self.files[id.0];
        let counted = file.is_enabled && self.folders[file.folder.0].is_enabled;
        let size = file.size;
        match (self.file_counted[id.0], counted) {
            (false, true) => {
                self.summary.enabled_files_count += 1;
                self.summary.total_size += size;
            }
            (true, false) => {
                self.summary.enabled_files_count -= 1;
                self.summary.total_size -= size;
            }
            _ => {}
        }
        self.file_counted[id.0] = counted;
    }

    fn refresh_folder(&mut self, id: FolderId) {
        let enabled = self.folders[id.0].is_enabled;
        match (self.folder_counted[id.0], enabled) {
            (false, true) => self.summary.enabled_folders_count += 1,
            (true, false) => self.summary.enabled_folders_count -= 1,
            _ => {}
        }
        self.folder_counted[id.0] = enabled;
        for index in 0..self.folders[id.0].files.len() {
            let file = self.folders[id.0].files[index];
            self.refresh_file(file);
        }
    }

    fn recount(&mut self) {
        self.summary = full_summary(&self.folders, &self.files);
        for (counted, folder) in self.folder_counted.iter_mut().zip(&self.folders) {
            *counted = folder.is_enabled;
        }
        for (counted, file) in self.file_counted.iter_mut().zip(&self.files) {
            *counted = file.is_enabled && self.folders[file.folder.0].is_enabled;
        }
    }
}

/// Summary computed from scratch.
pub fn full_summary(folders: &[FolderRecord], files: &[FileRecord]) -> Summary {
    let mut summary = Summary {
        folders_count: folders.len(),
        enabled_folders_count: folders.iter().filter(|f| f.is_enabled).count(),
        files_count: files.len(),
        ..Summary::default()
    };
    for file in files {
        if file.is_enabled && folders[file.folder.0].is_enabled {
            summary.enabled_files_count += 1;
            summary.total_size += file.size;
        }
    }
    summary
}

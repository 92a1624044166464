use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Index of a file in the store arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FileId(pub(crate) usize);

/// Index of a folder in the store arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FolderId(pub(crate) usize);

impl FileId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl FolderId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FileRecord {
    pub id: FileId,
    /// Name found by the scan.
    pub name: String,
    /// Name currently on disk.
    pub current_name: String,
    /// Pending rename target. Equal to `current_name` when nothing is pending.
    pub new_name: String,
    pub size: u64,
    pub modified: Option<DateTime<Local>>,
    pub is_enabled: bool,
    /// Relative to the store root, always built from `current_name`.
    pub rel_path: PathBuf,
    pub abs_path: PathBuf,
    /// Lowercase, without the dot.
    pub extension: String,
    pub folder: FolderId,
}

impl FileRecord {
    pub fn has_pending_rename(&self) -> bool {
        self.new_name != self.current_name
    }

    /// Where the file would live after its pending rename.
    pub fn pending_abs_path(&self) -> PathBuf {
        sibling(&self.abs_path, &self.new_name)
    }

    pub fn pending_rel_path(&self) -> PathBuf {
        sibling(&self.rel_path, &self.new_name)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FolderRecord {
    pub id: FolderId,
    pub abs_path: PathBuf,
    pub rel_path: PathBuf,
    pub parent: Option<FolderId>,
    pub children: Vec<FolderId>,
    pub is_enabled: bool,
    /// Files in scan order.
    pub files: Vec<FileId>,
}

/// Aggregate counters over the whole store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub folders_count: usize,
    pub enabled_folders_count: usize,
    pub files_count: usize,
    /// Files enabled inside an enabled folder.
    pub enabled_files_count: usize,
    /// Size of the files counted by `enabled_files_count`.
    pub total_size: u64,
}

pub(crate) fn sibling(path: &Path, name: &str) -> PathBuf {
    match path.parent() {
        Some(parent) => parent.join(name),
        None => PathBuf::from(name),
    }
}

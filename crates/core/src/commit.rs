use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// Result of one filesystem rename.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommitOutcome {
    Ok,
    AlreadyExists,
    PermissionDenied,
    Other(String),
}

impl CommitOutcome {
    fn from_io(err: &io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::AlreadyExists => Self::AlreadyExists,
            io::ErrorKind::PermissionDenied => Self::PermissionDenied,
            _ => Self::Other(err.to_string()),
        }
    }
}

/// Performs renames. The orchestrator only ever sees [`CommitOutcome`].
pub trait Committer {
    fn rename(&self, from: &Path, to: &Path) -> CommitOutcome;

    /// Whether [`Committer::rename`] would refuse with
    /// [`CommitOutcome::AlreadyExists`]. Previews ask this instead of renaming.
    fn would_collide(&self, from: &Path, to: &Path) -> bool;
}

/// Renames on the real filesystem and never overwrites an existing file.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsCommitter;

impl Committer for FsCommitter {
    fn rename(&self, from: &Path, to: &Path) -> CommitOutcome {
        if self.would_collide(from, to) {
            return CommitOutcome::AlreadyExists;
        }
        let result = if to.exists() {
            // Case-insensitive filesystems see `to` as `from`; hop through a
            // temporary name so the new casing sticks.
            rename_via_temp(from, to)
        } else {
            fs::rename(from, to)
        };

        match result {
            Ok(()) => CommitOutcome::Ok,
            Err(err) => CommitOutcome::from_io(&err),
        }
    }

    /// `to` is taken by anything other than `from` under a different casing.
    fn would_collide(&self, from: &Path, to: &Path) -> bool {
        to.exists() && !(is_case_only_change(from, to) && same_file(from, to))
    }
}

/// Same folder, same name ignoring ASCII case.
fn is_case_only_change(from: &Path, to: &Path) -> bool {
    from != to
        && from.parent() == to.parent()
        && from
            .to_string_lossy()
            .eq_ignore_ascii_case(&to.to_string_lossy())
}

#[cfg(unix)]
fn same_file(a: &Path, b: &Path) -> bool {
    use std::os::unix::fs::MetadataExt;
    match (fs::metadata(a), fs::metadata(b)) {
        (Ok(x), Ok(y)) => x.dev() == y.dev() && x.ino() == y.ino(),
        _ => false,
    }
}

#[cfg(not(unix))]
fn same_file(_a: &Path, _b: &Path) -> bool {
    true
}

fn rename_via_temp(from: &Path, to: &Path) -> io::Result<()> {
    let temp = temp_path_for(from);
    fs::rename(from, &temp)?;
    if let Err(err) = fs::rename(&temp, to) {
        // Put the file back under its old name before reporting.
        let _ = fs::rename(&temp, from);
        return Err(err);
    }
    Ok(())
}

fn temp_path_for(original_path: &Path) -> PathBuf {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0);
    let parent = original_path.parent().unwrap_or_else(|| Path::new("."));
    let file_name = original_path
        .file_name()
        .map(|v| v.to_string_lossy().to_string())
        .unwrap_or_else(|| "file".to_string());
    parent.join(format!(".namnbyte_tmp_{now}_{file_name}"))
}

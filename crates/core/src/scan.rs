use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Debug, Clone, Copy, Default)]
pub struct ScanOptions {
    pub recursive: bool,
    pub include_hidden: bool,
}

/// One traversal result, in the order the store should register it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedEntry {
    pub path: PathBuf,
    pub is_dir: bool,
    pub size: u64,
    pub modified: Option<DateTime<Local>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanStats {
    pub scanned_files: usize,
    pub scanned_folders: usize,
    pub skipped_hidden: usize,
}

#[derive(Debug, Clone)]
pub struct ScanResult {
    /// Folder the relative paths are based on. The parent folder when the
    /// target is a single file.
    pub root: PathBuf,
    pub entries: Vec<ScannedEntry>,
    pub stats: ScanStats,
}

/// Lists the target. Directories come before their contents and siblings are
/// sorted by name.
pub fn scan(target: &Path, options: ScanOptions) -> Result<ScanResult> {
    let target = fs::canonicalize(target)
        .with_context(|| format!("target does not exist: {}", target.display()))?;
    let meta = fs::metadata(&target)
        .with_context(|| format!("failed to read target: {}", target.display()))?;

    let mut stats = ScanStats::default();
    if meta.is_file() {
        let root = target
            .parent()
            .context("target file has no parent folder")?
            .to_path_buf();
        stats.scanned_files = 1;
        return Ok(ScanResult {
            root,
            entries: vec![entry_from_metadata(target, &meta)],
            stats,
        });
    }

    let entries = if options.recursive {
        walk_recursive(&target, options.include_hidden, &mut stats)?
    } else {
        list_flat(&target, options.include_hidden, &mut stats)?
    };

    Ok(ScanResult {
        root: target,
        entries,
        stats,
    })
}

fn walk_recursive(
    root: &Path,
    include_hidden: bool,
    stats: &mut ScanStats,
) -> Result<Vec<ScannedEntry>> {
    let mut out = Vec::new();
    let walker = WalkDir::new(root)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| include_hidden || !is_hidden(entry.path()));

    for entry in walker {
        let entry = entry.with_context(|| format!("failed to walk folder: {}", root.display()))?;
        let meta = entry
            .metadata()
            .with_context(|| format!("failed to read entry: {}", entry.path().display()))?;
        if meta.is_dir() {
            stats.scanned_folders += 1;
        } else {
            stats.scanned_files += 1;
        }
        out.push(entry_from_metadata(entry.into_path(), &meta));
    }

    if !include_hidden {
        stats.skipped_hidden = count_hidden(root)?;
    }
    Ok(out)
}

fn list_flat(
    root: &Path,
    include_hidden: bool,
    stats: &mut ScanStats,
) -> Result<Vec<ScannedEntry>> {
    let mut out = Vec::new();
    for entry in
        fs::read_dir(root).with_context(|| format!("failed to read folder: {}", root.display()))?
    {
        let entry = entry.with_context(|| format!("failed to read entry: {}", root.display()))?;
        let path = entry.path();
        let meta = entry
            .metadata()
            .with_context(|| format!("failed to read entry: {}", path.display()))?;
        if meta.is_dir() {
            continue;
        }
        if is_hidden(&path) && !include_hidden {
            stats.skipped_hidden += 1;
            continue;
        }
        stats.scanned_files += 1;
        out.push(entry_from_metadata(path, &meta));
    }
    out.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(out)
}

/// Hidden entries anywhere below `root`; a hidden folder counts once.
fn count_hidden(root: &Path) -> Result<usize> {
    let mut hidden = 0;
    let walker = WalkDir::new(root)
        .min_depth(1)
        .into_iter()
        .filter_entry(|entry| {
            // Stop below hidden folders so their contents are not counted.
            entry
                .path()
                .parent()
                .is_none_or(|parent| parent == root || !is_hidden(parent))
        });
    for entry in walker {
        let entry = entry.with_context(|| format!("failed to walk folder: {}", root.display()))?;
        if is_hidden(entry.path()) {
            hidden += 1;
        }
    }
    Ok(hidden)
}

fn entry_from_metadata(path: PathBuf, meta: &fs::Metadata) -> ScannedEntry {
    ScannedEntry {
        path,
        is_dir: meta.is_dir(),
        size: if meta.is_dir() { 0 } else { meta.len() },
        modified: meta.modified().ok().map(DateTime::from),
    }
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .map(|name| name.to_string_lossy().starts_with('.'))
        .unwrap_or(false)
}

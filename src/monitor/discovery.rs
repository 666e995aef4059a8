//! Session log discovery

use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

/// Default extension of session logs
pub const LOG_EXTENSION: &str = "jsonl";

fn is_hidden(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry
            .file_name()
            .to_str()
            .map(|name| name.starts_with('.'))
            .unwrap_or(false)
}

fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext == extension)
}

/// List every log file below `root`, sorted by path.
///
/// Hidden files and directories are skipped. A missing or unreadable root
/// yields an empty list rather than an error.
pub fn list_log_files(root: &Path, extension: &str) -> Vec<PathBuf> {
    if !root.exists() {
        debug!("Session root {:?} does not exist", root);
        return Vec::new();
    }

    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|entry| !is_hidden(entry))
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!("Failed to read entry under {:?}: {}", root, e);
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .map(DirEntry::into_path)
        .filter(|path| has_extension(path, extension))
        .collect();

    files.sort();
    files
}

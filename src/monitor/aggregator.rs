//! Recency filtering and reduction of per-session results

use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::debug;

use super::discovery::{list_log_files, LOG_EXTENSION};
use super::monitor_trait::Recheck;
use super::parser::{extract, ExtractOptions};
use super::state::{MonitorSnapshot, SessionInfo};

/// Default recency window
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(60 * 60);

/// Keep the sessions modified within `window` of `now` and fold their
/// attention flags into one.
pub fn reduce(all: Vec<SessionInfo>, now: DateTime<Utc>, window: Duration) -> MonitorSnapshot {
    // A window too large to represent keeps everything
    let cutoff = chrono::Duration::from_std(window)
        .ok()
        .and_then(|window| now.checked_sub_signed(window));

    let sessions: Vec<SessionInfo> = all
        .into_iter()
        .filter(|s| cutoff.map_or(true, |cutoff| s.last_modified >= cutoff))
        .collect();
    let any_needs_attention = sessions.iter().any(|s| s.needs_attention);

    MonitorSnapshot {
        sessions,
        any_needs_attention,
        checked_at: now,
    }
}

/// Discovery, extraction and aggregation over one session root
#[derive(Debug, Clone)]
pub struct SessionScanner {
    root: PathBuf,
    extension: String,
    window: Duration,
    options: ExtractOptions,
}

impl SessionScanner {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            extension: LOG_EXTENSION.to_string(),
            window: DEFAULT_WINDOW,
            options: ExtractOptions::default(),
        }
    }

    pub fn with_window(mut self, window: Duration) -> Self {
        self.window = window;
        self
    }

    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    pub fn with_options(mut self, options: ExtractOptions) -> Self {
        self.options = options;
        self
    }

    pub fn root(&self) -> &PathBuf {
        &self.root
    }

    /// Extract every discovered log, skipping unreadable ones
    pub fn scan_all(&self) -> Vec<SessionInfo> {
        list_log_files(&self.root, &self.extension)
            .iter()
            .filter_map(|path| extract(path, &self.options))
            .collect()
    }

    pub fn snapshot_at(&self, now: DateTime<Utc>) -> MonitorSnapshot {
        let snapshot = reduce(self.scan_all(), now, self.window);
        debug!(
            "Scanned {:?}: {} recent sessions, attention needed: {}",
            self.root,
            snapshot.sessions.len(),
            snapshot.any_needs_attention
        );
        snapshot
    }
}

impl Recheck for SessionScanner {
    fn recheck(&self) -> MonitorSnapshot {
        self.snapshot_at(Utc::now())
    }
}

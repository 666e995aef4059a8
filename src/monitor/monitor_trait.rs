//! Session monitoring traits

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;

use super::state::MonitorSnapshot;

/// Consumer of monitor results
///
/// All calls are made from a single delivery task, one at a time, so
/// implementations can keep plain mutable state. A panic in either method
/// ends delivery, and the scheduler stops rechecking after it.
#[async_trait]
pub trait SessionObserver: Send {
    /// Called after every recheck with the fresh snapshot
    async fn on_snapshot(&mut self, any_needs_attention: bool, snapshot: Arc<MonitorSnapshot>);

    /// Called once each time attention flips from not needed to needed
    async fn on_attention_raised(&mut self, _snapshot: Arc<MonitorSnapshot>) {}
}

/// One full pass over the session logs
///
/// Runs on a blocking thread; implementations may do synchronous file I/O.
pub trait Recheck: Send + Sync + 'static {
    fn recheck(&self) -> MonitorSnapshot;
}

/// Errors that can occur while monitoring
#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    #[error("Session root does not exist: {0}")]
    RootMissing(PathBuf),

    #[error("File watcher error: {0}")]
    Watch(#[from] notify::Error),

    #[error("Recheck task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

//! Change scheduler
//!
//! Filesystem events on the session root and a fixed-interval timer both
//! push [`Trigger`]s onto one FIFO queue. A single worker task drains the
//! queue and runs each recheck to completion before taking the next, so
//! rechecks never overlap. Finished snapshots go to a separate delivery
//! task, the only place the observer is called from.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use super::alert::AlertEdge;
use super::discovery::LOG_EXTENSION;
use super::monitor_trait::{MonitorError, Recheck, SessionObserver};
use super::state::MonitorSnapshot;

/// Default polling cadence
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Shortest polling cadence accepted
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// What caused a recheck
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    Startup,
    FileSystem,
    Timer,
    Manual,
}

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Directory watched for changes
    pub root: PathBuf,
    pub poll_interval: Duration,
    /// Only events on files with this extension trigger a recheck
    pub extension: String,
}

impl SchedulerConfig {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            extension: LOG_EXTENSION.to_string(),
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }
}

/// Running scheduler; call [`ChangeScheduler::stop`] to shut it down
pub struct ChangeScheduler {
    triggers: mpsc::UnboundedSender<Trigger>,
    watcher: Option<RecommendedWatcher>,
    timer: JoinHandle<()>,
    worker: JoinHandle<()>,
    delivery: JoinHandle<()>,
    latest: watch::Receiver<Arc<MonitorSnapshot>>,
}

impl ChangeScheduler {
    /// Start monitoring.
    ///
    /// Returns once the first snapshot has been delivered to `observer`.
    /// The watch and the timer are armed only after that.
    pub async fn start(
        config: SchedulerConfig,
        recheck: Arc<dyn Recheck>,
        observer: Box<dyn SessionObserver>,
    ) -> Self {
        let (trigger_tx, trigger_rx) = mpsc::unbounded_channel();
        let (snapshot_tx, snapshot_rx) = mpsc::unbounded_channel();
        let (latest_tx, latest_rx) = watch::channel(Arc::new(MonitorSnapshot::default()));
        let (first_tx, first_rx) = oneshot::channel();

        let delivery = tokio::spawn(run_delivery(snapshot_rx, observer, first_tx));
        let worker = tokio::spawn(run_worker(trigger_rx, recheck, snapshot_tx, latest_tx));

        // Cannot fail: the worker holds the receiver
        let _ = trigger_tx.send(Trigger::Startup);
        if first_rx.await.is_err() {
            warn!("Initial recheck was not delivered");
        }

        let watcher = match watch_root(&config.root, &config.extension, trigger_tx.clone()) {
            Ok(watcher) => Some(watcher),
            Err(e) => {
                warn!("{}; falling back to polling only", e);
                None
            }
        };

        let timer = tokio::spawn(run_timer(config.poll_interval, trigger_tx.clone()));

        info!(
            "Monitoring {:?} (watch: {}, poll every {:?})",
            config.root,
            watcher.is_some(),
            config.poll_interval.max(MIN_POLL_INTERVAL)
        );

        Self {
            triggers: trigger_tx,
            watcher,
            timer,
            worker,
            delivery,
            latest: latest_rx,
        }
    }

    /// Queue a recheck now. Returns `false` if the worker has gone away.
    pub fn check_now(&self) -> bool {
        self.triggers.send(Trigger::Manual).is_ok()
    }

    /// Whether filesystem events are being received
    pub fn is_watching(&self) -> bool {
        self.watcher.is_some()
    }

    /// Most recently completed snapshot
    pub fn latest(&self) -> Arc<MonitorSnapshot> {
        self.latest.borrow().clone()
    }

    /// Receiver that is updated after each completed recheck
    pub fn subscribe(&self) -> watch::Receiver<Arc<MonitorSnapshot>> {
        self.latest.clone()
    }

    /// Stop the watch and the timer.
    ///
    /// A recheck already running or queued still completes and is
    /// delivered before this returns.
    pub async fn stop(self) {
        let Self {
            triggers,
            watcher,
            timer,
            worker,
            delivery,
            ..
        } = self;

        drop(watcher);
        timer.abort();
        let _ = timer.await;
        drop(triggers);

        if let Err(e) = worker.await {
            error!("Recheck worker ended abnormally: {}", e);
        }
        if let Err(e) = delivery.await {
            error!("Delivery task ended abnormally: {}", e);
        }
        debug!("Scheduler stopped");
    }
}

async fn run_worker(
    mut triggers: mpsc::UnboundedReceiver<Trigger>,
    recheck: Arc<dyn Recheck>,
    snapshots: mpsc::UnboundedSender<Arc<MonitorSnapshot>>,
    latest: watch::Sender<Arc<MonitorSnapshot>>,
) {
    while let Some(trigger) = triggers.recv().await {
        let unit = Arc::clone(&recheck);
        let snapshot = match tokio::task::spawn_blocking(move || unit.recheck()).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                error!("{}", MonitorError::from(e));
                MonitorSnapshot::default()
            }
        };
        debug!(
            ?trigger,
            sessions = snapshot.sessions.len(),
            attention = snapshot.any_needs_attention,
            "Recheck finished"
        );

        let snapshot = Arc::new(snapshot);
        latest.send_replace(Arc::clone(&snapshot));
        if snapshots.send(snapshot).is_err() {
            error!("Snapshot delivery stopped; no further rechecks will run");
            break;
        }
    }
}

async fn run_delivery(
    mut snapshots: mpsc::UnboundedReceiver<Arc<MonitorSnapshot>>,
    mut observer: Box<dyn SessionObserver>,
    first: oneshot::Sender<()>,
) {
    let mut first = Some(first);
    let mut edge = AlertEdge::default();

    while let Some(snapshot) = snapshots.recv().await {
        let any = snapshot.any_needs_attention;
        observer.on_snapshot(any, Arc::clone(&snapshot)).await;
        if edge.observe(any) {
            observer.on_attention_raised(snapshot).await;
        }
        if let Some(first) = first.take() {
            let _ = first.send(());
        }
    }
}

async fn run_timer(period: Duration, triggers: mpsc::UnboundedSender<Trigger>) {
    let mut ticker = tokio::time::interval(period.max(MIN_POLL_INTERVAL));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately
    ticker.tick().await;

    loop {
        ticker.tick().await;
        if triggers.send(Trigger::Timer).is_err() {
            break;
        }
    }
}

/// Whether a notify event concerns a session log
pub fn is_relevant_event(event: &Event, extension: &str) -> bool {
    let is_relevant_kind = matches!(
        event.kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    );

    is_relevant_kind
        && event.paths.iter().any(|p| {
            p.extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext == extension)
        })
}

fn watch_root(
    root: &Path,
    extension: &str,
    triggers: mpsc::UnboundedSender<Trigger>,
) -> Result<RecommendedWatcher, MonitorError> {
    if !root.exists() {
        return Err(MonitorError::RootMissing(root.to_path_buf()));
    }

    let extension = extension.to_string();
    let mut watcher =
        notify::recommended_watcher(move |res: Result<Event, notify::Error>| match res {
            Ok(event) => {
                if is_relevant_event(&event, &extension) {
                    let _ = triggers.send(Trigger::FileSystem);
                }
            }
            Err(e) => warn!("File watcher error: {}", e),
        })?;

    watcher.watch(root, RecursiveMode::Recursive)?;
    debug!("Watching {:?} for session log changes", root);

    Ok(watcher)
}

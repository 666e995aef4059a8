//! Session monitoring module
//! Decides whether any Claude Code session is waiting on the human

pub mod aggregator;
pub mod alert;
pub mod discovery;
pub mod monitor_trait;
pub mod parser;
pub mod scheduler;
pub mod state;

pub use aggregator::{reduce, SessionScanner, DEFAULT_WINDOW};
pub use alert::AlertEdge;
pub use discovery::{list_log_files, LOG_EXTENSION};
pub use monitor_trait::{MonitorError, Recheck, SessionObserver};
pub use parser::{extract, ExtractOptions, LogMessage, DEFAULT_TAIL_BYTES, QUESTION_TOOL};
pub use scheduler::{ChangeScheduler, SchedulerConfig, Trigger, DEFAULT_POLL_INTERVAL};
pub use state::{MonitorSnapshot, QuestionKind, SessionInfo, SessionState};

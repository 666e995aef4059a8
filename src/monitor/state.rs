//! Session state definitions

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Per-file scan state, folded over the messages of one log.
///
/// The three flags are independent; a session needs attention as soon as
/// any of them is set. A fresh value is built for every extraction pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    /// The assistant asked a question through the question tool and no
    /// user turn has followed it yet
    pub unanswered_question: bool,
    /// The latest assistant turn invoked a tool whose result has not arrived
    pub tool_pending: bool,
    /// The latest user prompt has not been answered by the assistant
    pub prompt_unanswered: bool,
}

impl SessionState {
    pub fn needs_attention(&self) -> bool {
        self.unanswered_question || self.tool_pending || self.prompt_unanswered
    }

    /// Presentation classifier, most specific reason first
    pub fn question_kind(&self) -> Option<QuestionKind> {
        if self.unanswered_question {
            Some(QuestionKind::AskUserQuestion)
        } else if self.tool_pending {
            Some(QuestionKind::ToolPending)
        } else if self.prompt_unanswered {
            Some(QuestionKind::UserPrompt)
        } else {
            None
        }
    }
}

/// Why a session is waiting on the human
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuestionKind {
    /// The assistant is blocked on an explicit question
    AskUserQuestion,
    /// A tool call is waiting for approval or completion
    ToolPending,
    /// A prompt was sent and the assistant has not replied
    UserPrompt,
}

impl QuestionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionKind::AskUserQuestion => "AskUserQuestion",
            QuestionKind::ToolPending => "ToolPending",
            QuestionKind::UserPrompt => "UserPrompt",
        }
    }

    pub fn glyph(&self) -> &'static str {
        match self {
            QuestionKind::AskUserQuestion => "❓",
            QuestionKind::ToolPending => "⏸",
            QuestionKind::UserPrompt => "🔴",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            QuestionKind::AskUserQuestion => "question",
            QuestionKind::ToolPending => "tool pending",
            QuestionKind::UserPrompt => "prompt unanswered",
        }
    }
}

/// Extraction result for one session log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionInfo {
    /// Log file this session was read from
    pub file_path: PathBuf,
    /// Working directory of the session, or one decoded from the log's folder
    pub project_path: String,
    /// Session identifier, empty when the log never carried one
    pub session_id: String,
    pub needs_attention: bool,
    pub last_modified: DateTime<Utc>,
    pub question_kind: Option<QuestionKind>,
}

impl SessionInfo {
    /// Last component of the project path, used as a short display name
    pub fn project_name(&self) -> &str {
        self.project_path
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .filter(|name| !name.is_empty())
            .unwrap_or(&self.project_path)
    }

    /// First eight characters of the session id
    pub fn short_id(&self) -> &str {
        match self.session_id.char_indices().nth(8) {
            Some((idx, _)) => &self.session_id[..idx],
            None => &self.session_id,
        }
    }
}

/// Aggregated view delivered to observers after every recheck
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorSnapshot {
    /// Sessions inside the recency window, in discovery order
    pub sessions: Vec<SessionInfo>,
    pub any_needs_attention: bool,
    pub checked_at: DateTime<Utc>,
}

impl Default for MonitorSnapshot {
    fn default() -> Self {
        Self::empty(Utc::now())
    }
}

impl MonitorSnapshot {
    pub fn empty(checked_at: DateTime<Utc>) -> Self {
        Self {
            sessions: Vec::new(),
            any_needs_attention: false,
            checked_at,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Sessions currently waiting on the human
    pub fn waiting(&self) -> impl Iterator<Item = &SessionInfo> {
        self.sessions.iter().filter(|s| s.needs_attention)
    }

    /// Sessions that are active but not blocked
    pub fn others(&self) -> impl Iterator<Item = &SessionInfo> {
        self.sessions.iter().filter(|s| !s.needs_attention)
    }
}

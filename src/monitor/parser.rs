//! Session log parsing
//!
//! Reads the tail of a Claude Code JSONL transcript and folds its messages
//! into a [`SessionState`]. Only enough of each record is decoded to
//! classify it; everything else on the line is ignored.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::debug;

use super::state::{SessionInfo, SessionState};

/// Default number of trailing bytes read from each log
pub const DEFAULT_TAIL_BYTES: u64 = 50_000;

/// Tool the assistant uses to block on a human answer
pub const QUESTION_TOOL: &str = "AskUserQuestion";

const TOOL_USE: &str = "tool_use";
const TOOL_RESULT: &str = "tool_result";

/// One line of a session log
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogMessage {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub message: Option<MessageBody>,
    pub timestamp: Option<String>,
    pub cwd: Option<String>,
    pub session_id: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct MessageBody {
    pub role: Option<String>,
    pub content: Option<MessageContent>,
}

/// Plain user prompts carry a bare string instead of content blocks
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Items(Vec<ContentItem>),
    Text(String),
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct ContentItem {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub name: Option<String>,
    pub id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Assistant,
    User,
    /// Summaries, system records and anything else; metadata only
    Other,
}

impl LogMessage {
    pub fn kind(&self) -> MessageKind {
        match self.kind.as_deref() {
            Some("assistant") => MessageKind::Assistant,
            Some("user") => MessageKind::User,
            _ => MessageKind::Other,
        }
    }

    pub fn content_items(&self) -> &[ContentItem] {
        match self.message.as_ref().and_then(|m| m.content.as_ref()) {
            Some(MessageContent::Items(items)) => items,
            _ => &[],
        }
    }

    pub fn is_tool_result(&self) -> bool {
        self.content_items()
            .iter()
            .any(|item| item.kind.as_deref() == Some(TOOL_RESULT))
    }
}

impl SessionState {
    /// Advance the state by one message
    pub fn apply(mut self, message: &LogMessage, question_tool: &str) -> Self {
        match message.kind() {
            MessageKind::Assistant => {
                self.prompt_unanswered = false;
                self.tool_pending = false;
                for item in message.content_items() {
                    if item.name.as_deref() == Some(question_tool) {
                        self.unanswered_question = true;
                    }
                    if item.kind.as_deref() == Some(TOOL_USE) {
                        self.tool_pending = true;
                    }
                }
            }
            MessageKind::User => {
                if message.is_tool_result() {
                    self.tool_pending = false;
                    self.unanswered_question = false;
                } else {
                    self.prompt_unanswered = true;
                }
            }
            MessageKind::Other => {}
        }
        self
    }
}

/// Accumulator for one pass over a log
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Scan {
    pub state: SessionState,
    /// First working directory seen
    pub cwd: Option<String>,
    /// First session id seen
    pub session_id: Option<String>,
}

impl Scan {
    fn absorb(mut self, message: &LogMessage, question_tool: &str) -> Self {
        if self.cwd.is_none() {
            self.cwd = message.cwd.clone().filter(|cwd| !cwd.is_empty());
        }
        if self.session_id.is_none() {
            self.session_id = message.session_id.clone().filter(|id| !id.is_empty());
        }
        self.state = self.state.apply(message, question_tool);
        self
    }
}

/// Decode and fold a sequence of log lines. Lines that are not valid
/// records are skipped.
pub fn scan_lines<'a, I>(lines: I, question_tool: &str) -> Scan
where
    I: IntoIterator<Item = &'a str>,
{
    lines
        .into_iter()
        .filter_map(|line| serde_json::from_str::<LogMessage>(line).ok())
        .fold(Scan::default(), |scan, message| {
            scan.absorb(&message, question_tool)
        })
}

/// The trailing bytes of a log file
#[derive(Debug)]
pub struct TailWindow {
    /// Window contents with any leading partial record removed
    pub text: String,
    /// Whether the window was cut inside a record
    pub starts_mid_record: bool,
    pub modified: Option<SystemTime>,
}

impl TailWindow {
    /// Complete, non-empty lines of the window
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.text.lines().filter(|line| !line.is_empty())
    }
}

/// Read at most `cap` trailing bytes of `path`.
///
/// When the window does not start on a line boundary, everything up to and
/// including the first newline is a partial record and is dropped.
pub fn read_tail(path: &Path, cap: u64) -> io::Result<TailWindow> {
    let mut file = File::open(path)?;
    let modified = file.metadata().and_then(|m| m.modified()).ok();
    let len = file.seek(SeekFrom::End(0))?;

    let start = len.saturating_sub(cap);
    let mut buf = Vec::with_capacity(len.min(cap) as usize + 1);
    let starts_mid_record = if start > 0 {
        // Read one byte early to see whether the window is line-aligned
        file.seek(SeekFrom::Start(start - 1))?;
        file.read_to_end(&mut buf)?;
        let aligned = buf.first() == Some(&b'\n');
        buf.drain(..1.min(buf.len()));
        if !aligned {
            let partial = buf
                .iter()
                .position(|&b| b == b'\n')
                .map_or(buf.len(), |idx| idx + 1);
            buf.drain(..partial);
        }
        !aligned
    } else {
        file.seek(SeekFrom::Start(0))?;
        file.read_to_end(&mut buf)?;
        false
    };

    Ok(TailWindow {
        text: String::from_utf8_lossy(&buf).into_owned(),
        starts_mid_record,
        modified,
    })
}

/// Knobs for [`extract`]
#[derive(Debug, Clone)]
pub struct ExtractOptions {
    pub tail_bytes: u64,
    pub question_tool: String,
    /// Home directory used to shorten decoded project paths
    pub home_dir: Option<PathBuf>,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            tail_bytes: DEFAULT_TAIL_BYTES,
            question_tool: QUESTION_TOOL.to_string(),
            home_dir: dirs::home_dir(),
        }
    }
}

/// Extract session information from one log file.
///
/// Returns `None` only when the file cannot be opened or read. Malformed
/// content never fails the extraction.
pub fn extract(path: &Path, options: &ExtractOptions) -> Option<SessionInfo> {
    let window = match read_tail(path, options.tail_bytes) {
        Ok(window) => window,
        Err(e) => {
            debug!("Skipping unreadable session log {:?}: {}", path, e);
            return None;
        }
    };

    let scan = scan_lines(window.lines(), &options.question_tool);
    let project_path = scan
        .cwd
        .unwrap_or_else(|| project_path_from_file(path, options.home_dir.as_deref()));
    let last_modified = window
        .modified
        .map(DateTime::<Utc>::from)
        .unwrap_or_else(Utc::now);

    Some(SessionInfo {
        file_path: path.to_path_buf(),
        project_path,
        session_id: scan.session_id.unwrap_or_default(),
        needs_attention: scan.state.needs_attention(),
        last_modified,
        question_kind: scan.state.question_kind(),
    })
}

/// Project path derived from the folder a log lives in
pub fn project_path_from_file(path: &Path, home: Option<&Path>) -> String {
    path.parent()
        .and_then(|dir| dir.file_name())
        .map(|name| decode_project_dir(&name.to_string_lossy(), home))
        .unwrap_or_default()
}

/// Undo the folder-name flattening of a project path.
///
/// `-home-alice-code-app` becomes `/home/alice/code/app`, or `~/code/app`
/// when `/home/alice` is the home directory. Dashes that were part of the
/// original names cannot be told apart from separators.
pub fn decode_project_dir(name: &str, home: Option<&Path>) -> String {
    if let Some(flat_home) = home.and_then(flatten_path) {
        if name == flat_home {
            return "~".to_string();
        }
        if let Some(rest) = name
            .strip_prefix(flat_home.as_str())
            .and_then(|rest| rest.strip_prefix('-'))
        {
            return format!("~/{}", rest.replace('-', "/"));
        }
    }
    format!("/{}", name.trim_start_matches('-').replace('-', "/"))
}

fn flatten_path(path: &Path) -> Option<String> {
    let path = path.to_str()?.trim_end_matches('/');
    if path.is_empty() {
        return None;
    }
    Some(path.replace('/', "-"))
}

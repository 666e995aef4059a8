//! Claude Indicator configuration management
//! Handles loading and saving the config file

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::monitor::{
    ExtractOptions, SchedulerConfig, SessionScanner, DEFAULT_TAIL_BYTES, LOG_EXTENSION,
    QUESTION_TOOL,
};

/// Selectable recency windows, in minutes
pub const WINDOW_PRESETS: [(&str, u64); 6] = [
    ("5 minutes", 5),
    ("15 minutes", 15),
    ("30 minutes", 30),
    ("1 hour", 60),
    ("4 hours", 240),
    ("1 day", 1440),
];

const DEFAULT_WINDOW_MINUTES: u64 = 60;

/// Claude Indicator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Root of the Claude Code session logs
    #[serde(default = "default_projects_dir")]
    pub projects_dir: String,

    /// Sessions untouched for longer than this are ignored (0 = default)
    #[serde(default = "default_window_minutes")]
    pub window_minutes: u64,

    /// Polling cadence backing up the file watcher
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Bytes read from the end of each session log
    #[serde(default = "default_tail_bytes")]
    pub tail_bytes: u64,

    /// Tool name that marks an explicit question to the user
    #[serde(default = "default_question_tool")]
    pub question_tool: String,

    /// Extension of session log files
    #[serde(default = "default_extension")]
    pub extension: String,
}

fn default_projects_dir() -> String {
    "~/.claude/projects".to_string()
}

fn default_window_minutes() -> u64 {
    DEFAULT_WINDOW_MINUTES
}

fn default_poll_interval_ms() -> u64 {
    500
}

fn default_tail_bytes() -> u64 {
    DEFAULT_TAIL_BYTES
}

fn default_question_tool() -> String {
    QUESTION_TOOL.to_string()
}

fn default_extension() -> String {
    LOG_EXTENSION.to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            projects_dir: default_projects_dir(),
            window_minutes: default_window_minutes(),
            poll_interval_ms: default_poll_interval_ms(),
            tail_bytes: default_tail_bytes(),
            question_tool: default_question_tool(),
            extension: default_extension(),
        }
    }
}

impl Config {
    /// Load config from the default location or specified path
    pub fn load(path: Option<&str>) -> Result<Self> {
        let config_path = Self::config_path(path)?;

        if !config_path.exists() {
            info!(
                "Config file not found, creating default at {:?}",
                config_path
            );
            let config = Config::default();
            config.save(path)?;
            return Ok(config);
        }

        let raw = fs::read_to_string(&config_path).context("Failed to read config file")?;

        let config: Config = serde_yaml::from_str(&raw).context("Failed to parse config file")?;

        debug!("Loaded config from {:?}", config_path);
        Ok(config)
    }

    /// Save config to the default location or specified path
    pub fn save(&self, path: Option<&str>) -> Result<()> {
        let config_path = Self::config_path(path)?;

        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = serde_yaml::to_string(&self)?;
        fs::write(&config_path, content).context("Failed to write config file")?;

        info!("Saved config to {:?}", config_path);
        Ok(())
    }

    /// Get the config file path
    fn config_path(path: Option<&str>) -> Result<PathBuf> {
        // Check env override first
        if let Ok(env_path) = std::env::var("CLAUDE_INDICATOR_CONFIG") {
            return Ok(PathBuf::from(env_path));
        }

        if let Some(p) = path {
            return Ok(PathBuf::from(p));
        }

        let home = dirs::home_dir().context("Cannot find home directory")?;
        Ok(home.join(".claude-indicator").join("config.yml"))
    }

    /// Resolve the projects directory (expand ~)
    pub fn resolve_projects_dir(&self) -> Result<PathBuf> {
        match self.projects_dir.strip_prefix('~') {
            Some(rest) => {
                let home = dirs::home_dir().context("Cannot find home directory")?;
                Ok(home.join(rest.trim_start_matches('/')))
            }
            None => Ok(PathBuf::from(&self.projects_dir)),
        }
    }

    /// Recency window in minutes, with zero meaning the default
    pub fn effective_window_minutes(&self) -> u64 {
        if self.window_minutes == 0 {
            DEFAULT_WINDOW_MINUTES
        } else {
            self.window_minutes
        }
    }

    pub fn window(&self) -> Duration {
        Duration::from_secs(self.effective_window_minutes().saturating_mul(60))
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn extract_options(&self) -> ExtractOptions {
        ExtractOptions {
            tail_bytes: self.tail_bytes,
            question_tool: self.question_tool.clone(),
            home_dir: dirs::home_dir(),
        }
    }

    /// Scanner over the configured projects directory
    pub fn scanner(&self) -> Result<SessionScanner> {
        Ok(SessionScanner::new(self.resolve_projects_dir()?)
            .with_window(self.window())
            .with_extension(self.extension.clone())
            .with_options(self.extract_options()))
    }

    pub fn scheduler_config(&self) -> Result<SchedulerConfig> {
        Ok(SchedulerConfig::new(self.resolve_projects_dir()?)
            .with_poll_interval(self.poll_interval())
            .with_extension(self.extension.clone()))
    }
}

/// Human readable window length, e.g. "15 min", "4 hours", "1 day"
pub fn format_time_window(minutes: u64) -> String {
    if minutes < 60 {
        format!("{} min", minutes)
    } else if minutes < 1440 {
        let hours = minutes / 60;
        format!("{} hour{}", hours, if hours > 1 { "s" } else { "" })
    } else {
        let days = minutes / 1440;
        format!("{} day{}", days, if days > 1 { "s" } else { "" })
    }
}

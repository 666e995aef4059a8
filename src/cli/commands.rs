//! CLI commands

use std::io::Write;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing::info;

use crate::config::{format_time_window, Config, WINDOW_PRESETS};
use crate::monitor::{ChangeScheduler, MonitorSnapshot, Recheck, SessionInfo, SessionObserver};

#[derive(Parser)]
#[command(name = "claude-indicator")]
#[command(about = "Shows whether any Claude Code session is waiting for you", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path (default: ~/.claude-indicator/config.yml)
    #[arg(long)]
    config: Option<String>,

    /// Only consider sessions modified within this many minutes
    #[arg(long)]
    window: Option<u64>,

    /// Session log root (default: ~/.claude/projects)
    #[arg(long)]
    projects_dir: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Watch sessions and report whenever their state changes
    Watch,

    /// Check all sessions once and print them
    Status,

    /// Print the resolved configuration
    Config,
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(window) = cli.window {
        config.window_minutes = window;
    }
    if let Some(dir) = cli.projects_dir {
        config.projects_dir = dir;
    }

    match cli.command {
        Commands::Watch => {
            // Create a multi-threaded runtime for the scheduler
            let rt = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()?;
            rt.block_on(watch(config))
        }

        Commands::Status => {
            let snapshot = config.scanner()?.recheck();
            print_snapshot(&snapshot, config.effective_window_minutes());
            Ok(())
        }

        Commands::Config => {
            print!("{}", serde_yaml::to_string(&config)?);
            println!();
            println!("# window presets:");
            for (label, minutes) in WINDOW_PRESETS {
                println!("#   {:>4}  {}", minutes, label);
            }
            Ok(())
        }
    }
}

async fn watch(config: Config) -> Result<()> {
    let scanner = Arc::new(config.scanner()?);
    let observer = TerminalObserver::new(config.effective_window_minutes());

    let scheduler =
        ChangeScheduler::start(config.scheduler_config()?, scanner, Box::new(observer)).await;

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;

    info!("Shutting down");
    scheduler.stop().await;
    Ok(())
}

/// Observer that reports to the terminal
struct TerminalObserver {
    window_minutes: u64,
    last_any: Option<bool>,
    last_listing: Vec<(String, bool)>,
}

impl TerminalObserver {
    fn new(window_minutes: u64) -> Self {
        Self {
            window_minutes,
            last_any: None,
            last_listing: Vec::new(),
        }
    }
}

#[async_trait]
impl SessionObserver for TerminalObserver {
    async fn on_snapshot(&mut self, any_needs_attention: bool, snapshot: Arc<MonitorSnapshot>) {
        if self.last_any != Some(any_needs_attention) {
            if any_needs_attention {
                info!("A session is waiting for input");
            } else {
                info!("No session is waiting for input");
            }
            self.last_any = Some(any_needs_attention);
        }

        // Only reprint when the listing itself changed
        let listing: Vec<(String, bool)> = snapshot
            .sessions
            .iter()
            .map(|s| (s.file_path.to_string_lossy().to_string(), s.needs_attention))
            .collect();
        if listing != self.last_listing {
            print_snapshot(&snapshot, self.window_minutes);
            self.last_listing = listing;
        }
    }

    async fn on_attention_raised(&mut self, snapshot: Arc<MonitorSnapshot>) {
        let names: Vec<&str> = snapshot.waiting().map(SessionInfo::project_name).collect();
        info!("Attention needed: {}", names.join(", "));
        // Terminal bell
        print!("\x07");
        let _ = std::io::stdout().flush();
    }
}

fn print_snapshot(snapshot: &MonitorSnapshot, window_minutes: u64) {
    if snapshot.is_empty() {
        println!(
            "No active Claude Code sessions in the last {}",
            format_time_window(window_minutes)
        );
        return;
    }

    let waiting: Vec<&SessionInfo> = snapshot.waiting().collect();
    if !waiting.is_empty() {
        println!("Waiting for input:");
        for session in waiting {
            println!("  {}", describe_session(session));
        }
    }

    let others: Vec<&SessionInfo> = snapshot.others().collect();
    if !others.is_empty() {
        println!("Other sessions:");
        for session in others {
            println!("  {}", describe_session(session));
        }
    }
}

fn describe_session(session: &SessionInfo) -> String {
    let marker = session
        .question_kind
        .map(|kind| format!("{} {}", kind.glyph(), kind.label()))
        .unwrap_or_else(|| "✓ idle".to_string());
    let minutes = (Utc::now() - session.last_modified).num_minutes().max(0);
    let id = if session.session_id.is_empty() {
        "-"
    } else {
        session.short_id()
    };

    format!(
        "[{}] {} - {} ({} min ago)",
        id, session.project_path, marker, minutes
    )
}

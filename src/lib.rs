//! Claude Indicator - tells you when a Claude Code session is waiting for input

pub mod cli;
pub mod config;
pub mod monitor;

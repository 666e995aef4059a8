//! Claude Indicator configuration module
//! Handles loading, saving, and resolving the config file

pub mod config;

pub use config::{format_time_window, Config, WINDOW_PRESETS};

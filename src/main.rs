//! Claude Indicator - tells you when a Claude Code session is waiting for input

use anyhow::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "claude_indicator=debug,info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Claude Indicator v{}", env!("CARGO_PKG_VERSION"));

    // Run CLI
    claude_indicator::cli::run()?;

    Ok(())
}

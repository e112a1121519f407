//! Sitecraft - prompt-driven website generation with live preview and version history

use anyhow::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sitecraft=debug,info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::info!("Starting Sitecraft v{}", env!("CARGO_PKG_VERSION"));

    // Run CLI
    sitecraft::cli::run()?;

    Ok(())
}

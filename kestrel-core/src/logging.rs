//! Tracing subscriber initialisation, shared by the binaries.

use anyhow::Result;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialise the global subscriber. `RUST_LOG` overrides `level`.
pub fn init_logging(level: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(level))?;

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_thread_names(true))
        .with(filter)
        .init();

    Ok(())
}

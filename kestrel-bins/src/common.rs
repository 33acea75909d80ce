//! Common utilities for the binaries: logging, thread placement, shutdown.

use anyhow::Result;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Initialise tracing. `RUST_LOG` overrides the CLI level.
pub fn init_logging(level: &str) -> Result<()> {
    kestrel_core::logging::init_logging(level)
}

/// Pin the calling thread and optionally raise it to real-time priority.
pub fn setup_performance(cpu_core: Option<usize>, realtime: bool) -> Result<()> {
    if let Some(core) = cpu_core {
        kestrel_core::runtime::cpu::pin_to_core(core)?;
    }
    if realtime {
        kestrel_core::runtime::cpu::set_realtime_priority(50)?;
    }
    Ok(())
}

/// Install a SIGINT handler that flips `shutdown`.
pub fn install_sigint_handler(shutdown: Arc<AtomicBool>) -> Result<()> {
    ctrlc::set_handler(move || {
        tracing::info!("SIGINT received, beginning shutdown");
        shutdown.store(true, Ordering::Release);
    })?;
    Ok(())
}

/// Sleep in short slices so shutdown stays responsive.
pub fn sleep_interruptible(total: Duration, shutdown: &AtomicBool) {
    let slice = Duration::from_millis(100);
    let mut remaining = total;
    while remaining > Duration::ZERO && !shutdown.load(Ordering::Acquire) {
        let step = remaining.min(slice);
        std::thread::sleep(step);
        remaining -= step;
    }
}

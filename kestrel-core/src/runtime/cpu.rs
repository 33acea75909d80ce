//! CPU affinity and thread priority helpers
//!
//! Each stage of the plant runs on its own thread; pinning them keeps the
//! spin loops from migrating between cores and thrashing caches.

use anyhow::Result;
use core_affinity::CoreId;

/// Pin the current thread to a specific CPU core.
pub fn pin_to_core(core: usize) -> Result<()> {
    if core_affinity::set_for_current(CoreId { id: core }) {
        tracing::info!("pinned thread to CPU core {core}");
        Ok(())
    } else {
        anyhow::bail!("failed to pin thread to core {core}")
    }
}

/// Set SCHED_FIFO real-time priority for the current thread (Linux only).
///
/// Requires CAP_SYS_NICE or root.
#[cfg(target_os = "linux")]
pub fn set_realtime_priority(priority: i32) -> Result<()> {
    use libc::{sched_param, sched_setscheduler, SCHED_FIFO};

    let param = sched_param {
        sched_priority: priority,
    };

    // Pid 0 targets the calling thread.
    if unsafe { sched_setscheduler(0, SCHED_FIFO, &param) } == 0 {
        tracing::info!("set thread priority to SCHED_FIFO:{priority}");
        Ok(())
    } else {
        anyhow::bail!("failed to set SCHED_FIFO priority (needs CAP_SYS_NICE or root)")
    }
}

#[cfg(not(target_os = "linux"))]
pub fn set_realtime_priority(_priority: i32) -> Result<()> {
    tracing::warn!("real-time priority is only supported on Linux");
    Ok(())
}

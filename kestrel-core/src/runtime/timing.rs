//! Wall-clock time in nanoseconds.

use crate::core::Nanos;
use std::time::{SystemTime, UNIX_EPOCH};

pub const NANOS_PER_SEC: Nanos = 1_000_000_000;

/// Nanoseconds since the Unix epoch.
#[inline(always)]
pub fn nanos_now() -> Nanos {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before Unix epoch")
        .as_nanos() as Nanos
}

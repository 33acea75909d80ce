//! Shared wiring for the exchange and participant binaries.

pub mod common;

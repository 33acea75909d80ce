//! Message types: in-process ring payloads and their packed wire frames.

pub mod messages;
pub mod wire;

pub use messages::*;
pub use wire::{MarketDataFrame, RequestFrame, ResponseFrame};

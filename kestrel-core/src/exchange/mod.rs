//! Exchange side of the plant: order gateway, FIFO sequencer, matching
//! engine, market-data publisher, and snapshot synthesiser.

pub mod book;
pub mod engine;
pub mod order_server;
pub mod publisher;
pub mod sequencer;
pub mod snapshot;

pub use book::ExchangeBook;
pub use engine::MatchingEngine;
pub use order_server::OrderServer;
pub use publisher::MarketDataPublisher;
pub use sequencer::FifoSequencer;
pub use snapshot::{SnapshotSynthesizer, SnapshotTable};

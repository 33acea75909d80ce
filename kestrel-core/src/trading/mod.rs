//! Participant side of the plant: market-data consumption and recovery,
//! the reconstructed book, and the trading engine with its supporting
//! components.

pub mod book;
pub mod consumer;
pub mod engine;
pub mod features;
pub mod gateway;
pub mod orders;
pub mod position;
pub mod risk;

pub use book::{Bbo, BookEvent, MarketBook};
pub use consumer::{MarketDataConsumer, RecoverySync, StreamSource, SyncTransition};
pub use engine::{EngineClock, PassiveStrategy, Strategy, StrategyCtx, TradingEngine};
pub use features::{FeatureEngine, FEATURE_INVALID};
pub use gateway::GatewayClient;
pub use orders::{OmOrder, OmOrderState, OrderManager};
pub use position::{PositionInfo, PositionKeeper};
pub use risk::{RiskCheck, RiskManager};

//! Trading strategies for the kestrel participant
//!
//! Two stock algorithms ship with the plant: a market maker that captures
//! the spread and a liquidity taker that chases large aggressive trades.
//! [`Algo`] wraps them (plus the passive default) in a tagged enum, so the
//! engine's hot-path dispatch is a match, not an indirect call.

pub mod liquidity_taker;
pub mod market_maker;

#[cfg(test)]
mod test_helpers;

pub use liquidity_taker::LiquidityTaker;
pub use market_maker::MarketMaker;

use kestrel_core::core::*;
use kestrel_core::protocol::*;
use kestrel_core::trading::{MarketBook, PassiveStrategy, Strategy, StrategyCtx};

/// The strategy actually mounted in the engine, chosen at start-up.
pub enum Algo {
    Passive(PassiveStrategy),
    Maker(MarketMaker),
    Taker(LiquidityTaker),
}

impl Algo {
    /// Build the algorithm the CLI asked for. `Random` runs the passive
    /// strategy in-engine; the random order flow is driven by the binary.
    pub fn new(algo_type: AlgoType, ticker_cfg: &TickerCfgMap) -> Self {
        match algo_type {
            AlgoType::Maker => Algo::Maker(MarketMaker::new(ticker_cfg)),
            AlgoType::Taker => Algo::Taker(LiquidityTaker::new(ticker_cfg)),
            AlgoType::Random => Algo::Passive(PassiveStrategy),
        }
    }
}

impl Strategy for Algo {
    fn on_order_book_update(
        &mut self,
        ticker_id: TickerId,
        price: Price,
        side: Side,
        book: &MarketBook,
        ctx: &mut StrategyCtx,
    ) {
        match self {
            Algo::Passive(algo) => algo.on_order_book_update(ticker_id, price, side, book, ctx),
            Algo::Maker(algo) => algo.on_order_book_update(ticker_id, price, side, book, ctx),
            Algo::Taker(algo) => algo.on_order_book_update(ticker_id, price, side, book, ctx),
        }
    }

    fn on_trade_update(&mut self, update: &MarketUpdate, book: &MarketBook, ctx: &mut StrategyCtx) {
        match self {
            Algo::Passive(algo) => algo.on_trade_update(update, book, ctx),
            Algo::Maker(algo) => algo.on_trade_update(update, book, ctx),
            Algo::Taker(algo) => algo.on_trade_update(update, book, ctx),
        }
    }

    fn on_order_update(&mut self, response: &ClientResponse, ctx: &mut StrategyCtx) {
        match self {
            Algo::Passive(algo) => algo.on_order_update(response, ctx),
            Algo::Maker(algo) => algo.on_order_update(response, ctx),
            Algo::Taker(algo) => algo.on_order_update(response, ctx),
        }
    }
}

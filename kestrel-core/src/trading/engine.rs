//! Trading engine
//!
//! The participant's single event-loop thread: drains gateway responses and
//! market updates from their rings, keeps the mirror books current, and
//! fans each event out to the position keeper, feature engine, and the
//! strategy. Strategy dispatch is monomorphised; the stock algo set is a
//! tagged enum over the maker and taker implementations.

use crate::core::*;
use crate::protocol::*;
use crate::runtime::timing::{nanos_now, NANOS_PER_SEC};
use crate::runtime::Consumer;
use crate::trading::book::{BookEvent, MarketBook};
use crate::trading::features::FeatureEngine;
use crate::trading::orders::OrderManager;
use crate::trading::position::PositionKeeper;
use crate::trading::risk::RiskManager;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::debug;

/// Mutable slice of the engine a strategy callback may act through.
pub struct StrategyCtx<'a> {
    pub orders: &'a mut OrderManager,
    pub features: &'a FeatureEngine,
    pub positions: &'a PositionKeeper,
    pub risk: &'a RiskManager,
}

/// A trading algorithm plugged into the engine.
///
/// Implementations should be cheap to call; all three hooks sit on the
/// market-data hot path.
pub trait Strategy {
    fn on_order_book_update(
        &mut self,
        ticker_id: TickerId,
        price: Price,
        side: Side,
        book: &MarketBook,
        ctx: &mut StrategyCtx,
    );

    fn on_trade_update(&mut self, update: &MarketUpdate, book: &MarketBook, ctx: &mut StrategyCtx);

    fn on_order_update(&mut self, response: &ClientResponse, ctx: &mut StrategyCtx);
}

/// Shared view of the engine's last-activity clock; the binary's main
/// thread polls it to decide when the plant has gone quiet.
#[derive(Clone)]
pub struct EngineClock {
    last_event_time: Arc<AtomicU64>,
}

impl EngineClock {
    fn new() -> Self {
        Self {
            last_event_time: Arc::new(AtomicU64::new(nanos_now())),
        }
    }

    #[inline(always)]
    fn touch(&self) {
        self.last_event_time.store(nanos_now(), Ordering::Relaxed);
    }

    /// Reset the clock, e.g. after start-up warm-up.
    pub fn restart(&self) {
        self.touch();
    }

    /// Seconds since the engine last saw any input.
    pub fn silent_seconds(&self) -> u64 {
        nanos_now().saturating_sub(self.last_event_time.load(Ordering::Relaxed)) / NANOS_PER_SEC
    }
}

pub struct TradingEngine<S: Strategy> {
    client_id: ClientId,
    books: Vec<MarketBook>,
    positions: PositionKeeper,
    features: FeatureEngine,
    orders: OrderManager,
    risk: RiskManager,
    strategy: S,

    responses: Consumer<ClientResponse>,
    updates: Consumer<MarketUpdate>,

    clock: EngineClock,
    running: Arc<AtomicBool>,
}

impl<S: Strategy + Send + 'static> TradingEngine<S> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        client_id: ClientId,
        ticker_cfg: &TickerCfgMap,
        strategy: S,
        orders: OrderManager,
        responses: Consumer<ClientResponse>,
        updates: Consumer<MarketUpdate>,
        running: Arc<AtomicBool>,
    ) -> Self {
        Self {
            client_id,
            books: (0..MAX_TICKERS as TickerId).map(MarketBook::new).collect(),
            positions: PositionKeeper::new(),
            features: FeatureEngine::new(),
            orders,
            risk: RiskManager::new(ticker_cfg),
            strategy,
            responses,
            updates,
            clock: EngineClock::new(),
            running,
        }
    }

    pub fn clock(&self) -> EngineClock {
        self.clock.clone()
    }

    pub fn run(&mut self) {
        tracing::info!("trading engine {} running", self.client_id);
        while self.running.load(Ordering::Acquire) {
            while let Some(response) = self.responses.pop() {
                debug!("processing {response}");
                self.on_order_update(&response);
                self.clock.touch();
            }

            while let Some(update) = self.updates.pop() {
                debug!("processing {update}");
                self.on_market_update(&update);
                self.clock.touch();
            }
        }
        // Drain both rings once more so nothing in flight is lost.
        while let Some(response) = self.responses.pop() {
            self.on_order_update(&response);
        }
        while let Some(update) = self.updates.pop() {
            self.on_market_update(&update);
        }
        tracing::info!(
            "trading engine {} stopped: pnl {:.2} volume {}",
            self.client_id,
            self.positions.total_pnl(),
            self.positions.total_volume()
        );
    }

    /// Apply one public-stream update to its book and fan out.
    pub fn on_market_update(&mut self, update: &MarketUpdate) {
        let ticker = update.ticker_id as usize;
        assert!(
            ticker < self.books.len(),
            "market update for unknown ticker: {update}"
        );

        match self.books[ticker].apply(update) {
            Some(BookEvent::Book) => {
                let Self {
                    books,
                    positions,
                    features,
                    orders,
                    risk,
                    strategy,
                    ..
                } = self;
                let book = &books[ticker];

                positions.update_bbo(update.ticker_id, book.bbo());
                features.on_order_book_update(update.ticker_id, book);

                let mut ctx = StrategyCtx {
                    orders,
                    features,
                    positions,
                    risk,
                };
                strategy.on_order_book_update(
                    update.ticker_id,
                    update.price,
                    update.side,
                    book,
                    &mut ctx,
                );
            }
            Some(BookEvent::Trade) => {
                let Self {
                    books,
                    positions,
                    features,
                    orders,
                    risk,
                    strategy,
                    ..
                } = self;
                let book = &books[ticker];

                features.on_trade_update(update, book);

                let mut ctx = StrategyCtx {
                    orders,
                    features,
                    positions,
                    risk,
                };
                strategy.on_trade_update(update, book, &mut ctx);
            }
            None => {}
        }
    }

    /// Apply one gateway response: fills move the position, then the
    /// strategy (and through it the order manager) sees the response.
    pub fn on_order_update(&mut self, response: &ClientResponse) {
        if response.kind == ClientResponseKind::Filled {
            self.positions.add_fill(response);
        }

        let Self {
            positions,
            features,
            orders,
            risk,
            strategy,
            ..
        } = self;
        let mut ctx = StrategyCtx {
            orders,
            features,
            positions,
            risk,
        };
        strategy.on_order_update(response, &mut ctx);
    }

    pub fn book(&self, ticker_id: TickerId) -> &MarketBook {
        &self.books[ticker_id as usize]
    }

    pub fn positions(&self) -> &PositionKeeper {
        &self.positions
    }

    pub fn spawn(mut self, core: Option<usize>) -> JoinHandle<()> {
        std::thread::Builder::new()
            .name("kestrel-trading-engine".into())
            .spawn(move || {
                if let Some(core) = core {
                    let _ = crate::runtime::cpu::pin_to_core(core);
                }
                self.run();
            })
            .expect("spawn trading engine thread")
    }
}

/// The no-op strategy: watches the market, never quotes.
#[derive(Debug, Default, Clone, Copy)]
pub struct PassiveStrategy;

impl Strategy for PassiveStrategy {
    fn on_order_book_update(
        &mut self,
        ticker_id: TickerId,
        price: Price,
        side: Side,
        _book: &MarketBook,
        _ctx: &mut StrategyCtx,
    ) {
        debug!("book update ticker:{ticker_id} price:{price} side:{side}");
    }

    fn on_trade_update(
        &mut self,
        update: &MarketUpdate,
        _book: &MarketBook,
        _ctx: &mut StrategyCtx,
    ) {
        debug!("trade {update}");
    }

    fn on_order_update(&mut self, response: &ClientResponse, _ctx: &mut StrategyCtx) {
        debug!("order update {response}");
    }
}

//! Shared fixtures for strategy tests: a book, the engine-side components,
//! and a captive request ring to observe what a strategy sends.

use kestrel_core::core::*;
use kestrel_core::protocol::*;
use kestrel_core::runtime::{ring, Consumer};
use kestrel_core::trading::{
    FeatureEngine, MarketBook, OrderManager, PositionKeeper, RiskManager, Strategy, StrategyCtx,
};

/// Uniform per-ticker config with wide-open risk limits.
pub fn ticker_cfg(clip: Qty, threshold: f64) -> TickerCfgMap {
    let mut cfg = TickerCfgMap::default();
    for ticker in cfg.iter_mut() {
        *ticker = TickerCfg {
            clip,
            threshold,
            risk: RiskCfg {
                max_order_size: 1_000,
                max_position: 10_000,
                max_loss: -1_000_000.0,
            },
        };
    }
    cfg
}

pub struct StrategyFixture {
    cfg: TickerCfgMap,
    book: MarketBook,
    features: FeatureEngine,
    positions: PositionKeeper,
    risk: RiskManager,
    orders: OrderManager,
    requests_rx: Consumer<ClientRequest>,
    next_order_id: OrderId,
}

impl StrategyFixture {
    pub fn new(cfg: TickerCfgMap) -> Self {
        let (requests_tx, requests_rx) = ring(256);
        Self {
            cfg,
            book: MarketBook::with_capacity(0, 1024, MAX_PRICE_LEVELS),
            features: FeatureEngine::new(),
            positions: PositionKeeper::new(),
            risk: RiskManager::new(&cfg),
            orders: OrderManager::new(1, requests_tx),
            requests_rx,
            next_order_id: 1,
        }
    }

    pub fn cfg(&self) -> TickerCfgMap {
        self.cfg
    }

    fn add(&mut self, side: Side, price: Price, qty: Qty) {
        let order_id = self.next_order_id;
        self.next_order_id += 1;
        self.book.apply(&MarketUpdate {
            kind: MarketUpdateKind::Add,
            order_id,
            ticker_id: 0,
            side,
            price,
            qty,
            priority: order_id,
        });
        self.features.on_order_book_update(0, &self.book);
    }

    pub fn set_book(&mut self, bid_price: Price, bid_qty: Qty, ask_price: Price, ask_qty: Qty) {
        self.add(Side::Buy, bid_price, bid_qty);
        self.add(Side::Sell, ask_price, ask_qty);
    }

    pub fn set_bid_only(&mut self, bid_price: Price, bid_qty: Qty) {
        self.add(Side::Buy, bid_price, bid_qty);
    }

    /// Fire the book-update hook the way the engine would.
    pub fn drive_book_update<S: Strategy>(&mut self, strategy: &mut S, ticker_id: TickerId) {
        let price = self.book.bbo().bid_price;
        let mut ctx = StrategyCtx {
            orders: &mut self.orders,
            features: &self.features,
            positions: &self.positions,
            risk: &self.risk,
        };
        strategy.on_order_book_update(ticker_id, price, Side::Buy, &self.book, &mut ctx);
    }

    /// Fire the trade hook, updating the feature engine first as the
    /// engine does.
    pub fn drive_trade<S: Strategy>(&mut self, strategy: &mut S, side: Side, qty: Qty) {
        let trade = MarketUpdate {
            kind: MarketUpdateKind::Trade,
            order_id: ORDER_ID_INVALID,
            ticker_id: 0,
            side,
            price: 0,
            qty,
            priority: PRIORITY_INVALID,
        };
        self.features.on_trade_update(&trade, &self.book);
        let mut ctx = StrategyCtx {
            orders: &mut self.orders,
            features: &self.features,
            positions: &self.positions,
            risk: &self.risk,
        };
        strategy.on_trade_update(&trade, &self.book, &mut ctx);
    }

    /// Everything the strategy has asked the gateway to send so far.
    pub fn sent_requests(&mut self) -> Vec<ClientRequest> {
        std::iter::from_fn(|| self.requests_rx.pop()).collect()
    }
}

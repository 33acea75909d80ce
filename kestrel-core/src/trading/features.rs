//! Feature engine
//!
//! Two derived signals drive the stock strategies: the quantity-weighted
//! fair price, and the ratio of an aggressive trade's size to the depth it
//! hit. `f64::NAN` marks a feature that cannot be computed yet.

use crate::core::*;
use crate::protocol::MarketUpdate;
use crate::trading::book::MarketBook;
use tracing::debug;

pub const FEATURE_INVALID: f64 = f64::NAN;

pub struct FeatureEngine {
    market_price: f64,
    agg_trade_qty_ratio: f64,
}

impl Default for FeatureEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl FeatureEngine {
    pub fn new() -> Self {
        Self {
            market_price: FEATURE_INVALID,
            agg_trade_qty_ratio: FEATURE_INVALID,
        }
    }

    /// Fair price: mid weighted by opposite-side depth, so a heavy bid
    /// pushes fair value toward the ask.
    pub fn on_order_book_update(&mut self, ticker_id: TickerId, book: &MarketBook) {
        let bbo = book.bbo();
        if bbo.is_valid() {
            self.market_price = (bbo.bid_price as f64 * bbo.ask_qty as f64
                + bbo.ask_price as f64 * bbo.bid_qty as f64)
                / (bbo.bid_qty as f64 + bbo.ask_qty as f64);
        }
        debug!(
            "ticker:{ticker_id} mkt-price:{} agg-ratio:{}",
            self.market_price, self.agg_trade_qty_ratio
        );
    }

    /// Aggressive-trade ratio: trade quantity over the BBO depth on the
    /// side it consumed.
    pub fn on_trade_update(&mut self, update: &MarketUpdate, book: &MarketBook) {
        let bbo = book.bbo();
        if bbo.is_valid() {
            let depth = match update.side {
                Side::Buy => bbo.ask_qty,
                Side::Sell => bbo.bid_qty,
                Side::Invalid => return,
            };
            self.agg_trade_qty_ratio = update.qty as f64 / depth as f64;
        }
        debug!(
            "{update} mkt-price:{} agg-ratio:{}",
            self.market_price, self.agg_trade_qty_ratio
        );
    }

    pub fn market_price(&self) -> f64 {
        self.market_price
    }

    pub fn agg_trade_qty_ratio(&self) -> f64 {
        self.agg_trade_qty_ratio
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::MarketUpdateKind;

    fn book_with_bbo(bid_qty: Qty, ask_qty: Qty) -> MarketBook {
        let mut book = MarketBook::with_capacity(0, 64, MAX_PRICE_LEVELS);
        book.apply(&MarketUpdate {
            kind: MarketUpdateKind::Add,
            order_id: 1,
            ticker_id: 0,
            side: Side::Buy,
            price: 100,
            qty: bid_qty,
            priority: 1,
        });
        book.apply(&MarketUpdate {
            kind: MarketUpdateKind::Add,
            order_id: 2,
            ticker_id: 0,
            side: Side::Sell,
            price: 102,
            qty: ask_qty,
            priority: 1,
        });
        book
    }

    #[test]
    fn fair_price_weights_by_opposite_depth() {
        let book = book_with_bbo(30, 10);
        let mut features = FeatureEngine::new();
        features.on_order_book_update(0, &book);
        // (100*10 + 102*30) / 40 = 101.5: heavy bid drags fair price up.
        assert!((features.market_price() - 101.5).abs() < 1e-9);
    }

    #[test]
    fn agg_ratio_uses_hit_side_depth() {
        let book = book_with_bbo(20, 10);
        let mut features = FeatureEngine::new();
        let trade = MarketUpdate {
            kind: MarketUpdateKind::Trade,
            side: Side::Sell,
            qty: 5,
            ..MarketUpdate::default()
        };
        features.on_trade_update(&trade, &book);
        // Sell aggressor consumed bid depth: 5 / 20.
        assert!((features.agg_trade_qty_ratio() - 0.25).abs() < 1e-9);
    }

    #[test]
    fn features_start_invalid() {
        let features = FeatureEngine::new();
        assert!(features.market_price().is_nan());
        assert!(features.agg_trade_qty_ratio().is_nan());
    }
}

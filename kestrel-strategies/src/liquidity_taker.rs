//! Liquidity-taking strategy
//!
//! Crosses the spread in the direction of large aggressive trades. The
//! sole signal is the ratio of a trade's size to the depth it consumed;
//! above the configured threshold the strategy lifts the offer (or hits
//! the bid) with a single clip.

use kestrel_core::core::*;
use kestrel_core::protocol::*;
use kestrel_core::trading::{MarketBook, Strategy, StrategyCtx};
use tracing::debug;

pub struct LiquidityTaker {
    ticker_cfg: TickerCfgMap,
}

impl LiquidityTaker {
    pub fn new(ticker_cfg: &TickerCfgMap) -> Self {
        Self {
            ticker_cfg: *ticker_cfg,
        }
    }
}

impl Strategy for LiquidityTaker {
    fn on_order_book_update(
        &mut self,
        ticker_id: TickerId,
        price: Price,
        side: Side,
        _book: &MarketBook,
        _ctx: &mut StrategyCtx,
    ) {
        debug!("ticker:{ticker_id} price:{price} side:{side}");
    }

    fn on_trade_update(&mut self, update: &MarketUpdate, book: &MarketBook, ctx: &mut StrategyCtx) {
        debug!("trade {update}");

        let bbo = book.bbo();
        let agg_ratio = ctx.features.agg_trade_qty_ratio();
        if !bbo.is_valid() || agg_ratio.is_nan() {
            return;
        }
        debug!("{bbo} agg-qty-ratio:{agg_ratio:.3}");

        let cfg = &self.ticker_cfg[update.ticker_id as usize];
        if agg_ratio < cfg.threshold {
            return;
        }

        // Follow the aggressor: buy at the offer after a large buy, sell
        // at the bid after a large sell.
        match update.side {
            Side::Buy => ctx.orders.move_orders(
                ctx.positions,
                ctx.risk,
                update.ticker_id,
                bbo.ask_price,
                PRICE_INVALID,
                cfg.clip,
            ),
            Side::Sell => ctx.orders.move_orders(
                ctx.positions,
                ctx.risk,
                update.ticker_id,
                PRICE_INVALID,
                bbo.bid_price,
                cfg.clip,
            ),
            Side::Invalid => {}
        }
    }

    fn on_order_update(&mut self, response: &ClientResponse, ctx: &mut StrategyCtx) {
        debug!("order update {response}");
        ctx.orders.on_order_update(response);
    }
}

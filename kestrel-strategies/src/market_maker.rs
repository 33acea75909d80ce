//! Market-making strategy
//!
//! Quotes both sides of the book to capture the spread. When the fair
//! price sits close to one touch, the quote on that side backs off one
//! tick to avoid being picked off by informed flow.

use kestrel_core::core::*;
use kestrel_core::protocol::*;
use kestrel_core::trading::{MarketBook, Strategy, StrategyCtx};
use tracing::debug;

pub struct MarketMaker {
    ticker_cfg: TickerCfgMap,
}

impl MarketMaker {
    pub fn new(ticker_cfg: &TickerCfgMap) -> Self {
        Self {
            ticker_cfg: *ticker_cfg,
        }
    }
}

impl Strategy for MarketMaker {
    fn on_order_book_update(
        &mut self,
        ticker_id: TickerId,
        price: Price,
        side: Side,
        book: &MarketBook,
        ctx: &mut StrategyCtx,
    ) {
        debug!("ticker:{ticker_id} price:{price} side:{side}");

        let bbo = book.bbo();
        let fair_price = ctx.features.market_price();
        if !bbo.is_valid() || fair_price.is_nan() {
            return;
        }
        debug!("{bbo} fair-price:{fair_price:.3}");

        let cfg = &self.ticker_cfg[ticker_id as usize];

        // Quote at the touch while fair value is comfortably away from it,
        // one tick behind otherwise.
        let bid_price = bbo.bid_price
            - if fair_price - bbo.bid_price as f64 >= cfg.threshold {
                0
            } else {
                1
            };
        let ask_price = bbo.ask_price
            + if bbo.ask_price as f64 - fair_price >= cfg.threshold {
                0
            } else {
                1
            };

        ctx.orders.move_orders(
            ctx.positions,
            ctx.risk,
            ticker_id,
            bid_price,
            ask_price,
            cfg.clip,
        );
    }

    fn on_trade_update(&mut self, update: &MarketUpdate, _book: &MarketBook, _ctx: &mut StrategyCtx) {
        debug!("trade {update}");
    }

    fn on_order_update(&mut self, response: &ClientResponse, ctx: &mut StrategyCtx) {
        debug!("order update {response}");
        ctx.orders.on_order_update(response);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::*;

    #[test]
    fn quotes_at_touch_when_fair_price_is_away() {
        let mut fixture = StrategyFixture::new(ticker_cfg(10, 5.0));
        // Bid 100 x ask 110, balanced depth: fair price 105, both touches
        // are 5 away, so quote at the touch on both sides.
        fixture.set_book(100, 10, 110, 10);

        let mut maker = MarketMaker::new(&fixture.cfg());
        fixture.drive_book_update(&mut maker, 0);

        let sent = fixture.sent_requests();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].side, Side::Buy);
        assert_eq!(sent[0].price, 100);
        assert_eq!(sent[0].qty, 10);
        assert_eq!(sent[1].side, Side::Sell);
        assert_eq!(sent[1].price, 110);
    }

    #[test]
    fn backs_off_one_tick_when_fair_price_hugs_a_touch() {
        let mut fixture = StrategyFixture::new(ticker_cfg(10, 5.0));
        // Heavy bid drags fair value toward the ask:
        // (100*10 + 110*30)/40 = 107.5, within 5 ticks of the offer.
        fixture.set_book(100, 30, 110, 10);

        let mut maker = MarketMaker::new(&fixture.cfg());
        fixture.drive_book_update(&mut maker, 0);

        let sent = fixture.sent_requests();
        assert_eq!(sent.len(), 2);
        // Bid side: 107.5 - 100 = 7.5 >= 5, quote at touch.
        assert_eq!(sent[0].price, 100);
        // Ask side: 110 - 107.5 = 2.5 < 5, back off one tick.
        assert_eq!(sent[1].price, 111);
    }

    #[test]
    fn no_quotes_without_a_two_sided_book() {
        let mut fixture = StrategyFixture::new(ticker_cfg(10, 5.0));
        fixture.set_bid_only(100, 10);

        let mut maker = MarketMaker::new(&fixture.cfg());
        fixture.drive_book_update(&mut maker, 0);

        assert!(fixture.sent_requests().is_empty());
    }
}

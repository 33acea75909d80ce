//! Participant order book
//!
//! The mirror image of the exchange book, rebuilt from the public stream
//! and keyed only by market order id. Same level and FIFO discipline, same
//! arena-index links; the id map is a direct-mapped vector since market
//! order ids are dense and exchange-assigned.
//!
//! Applying an update returns what happened so the trading engine can fan
//! out to the position keeper, feature engine, and strategy without the
//! book calling back into it.

use crate::core::*;
use crate::protocol::*;
use crate::runtime::{Pool, SlotIdx, NULL_IDX};
use std::fmt;

/// Best bid and offer with summed quantity at each touch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bbo {
    pub bid_price: Price,
    pub bid_qty: Qty,
    pub ask_price: Price,
    pub ask_qty: Qty,
}

impl Default for Bbo {
    fn default() -> Self {
        Self {
            bid_price: PRICE_INVALID,
            bid_qty: QTY_INVALID,
            ask_price: PRICE_INVALID,
            ask_qty: QTY_INVALID,
        }
    }
}

impl Bbo {
    pub fn is_valid(&self) -> bool {
        self.bid_price != PRICE_INVALID && self.ask_price != PRICE_INVALID
    }

    pub fn mid_price(&self) -> Option<f64> {
        self.is_valid()
            .then(|| (self.bid_price + self.ask_price) as f64 * 0.5)
    }
}

impl fmt::Display for Bbo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "BBO{{{}@{} X {}@{}}}",
            self.bid_qty, self.bid_price, self.ask_price, self.ask_qty
        )
    }
}

/// What applying a market update did, from the engine's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookEvent {
    /// Book state (and possibly the BBO) changed.
    Book,
    /// A trade print; the book itself is untouched.
    Trade,
}

#[derive(Debug, Clone, Copy, Default)]
struct BookOrder {
    order_id: OrderId,
    side: Side,
    price: Price,
    qty: Qty,
    priority: Priority,
    prev: SlotIdx,
    next: SlotIdx,
}

#[derive(Debug, Clone, Copy, Default)]
struct PriceLevel {
    side: Side,
    price: Price,
    first_order: SlotIdx,
    prev: SlotIdx,
    next: SlotIdx,
}

pub struct MarketBook {
    ticker_id: TickerId,

    orders: Pool<BookOrder>,
    levels: Pool<PriceLevel>,

    level_at_price: Vec<SlotIdx>,
    best_bid: SlotIdx,
    best_ask: SlotIdx,

    /// Direct map market order id → order slot.
    oid_to_order: Vec<SlotIdx>,

    bbo: Bbo,
}

impl MarketBook {
    pub fn new(ticker_id: TickerId) -> Self {
        Self::with_capacity(ticker_id, MAX_ORDER_IDS, MAX_PRICE_LEVELS)
    }

    pub fn with_capacity(ticker_id: TickerId, max_order_ids: usize, max_levels: usize) -> Self {
        Self {
            ticker_id,
            orders: Pool::new(max_order_ids),
            levels: Pool::new(max_levels),
            level_at_price: vec![NULL_IDX; MAX_PRICE_LEVELS],
            best_bid: NULL_IDX,
            best_ask: NULL_IDX,
            oid_to_order: vec![NULL_IDX; max_order_ids],
            bbo: Bbo::default(),
        }
    }

    /// Apply one public-stream update. Returns `None` when the update is of
    /// a kind this layer ignores.
    pub fn apply(&mut self, update: &MarketUpdate) -> Option<BookEvent> {
        match update.kind {
            MarketUpdateKind::Add => {
                let order_idx = self.orders.insert(BookOrder {
                    order_id: update.order_id,
                    side: update.side,
                    price: update.price,
                    qty: update.qty,
                    priority: update.priority,
                    prev: NULL_IDX,
                    next: NULL_IDX,
                });
                self.attach_order(order_idx);
            }
            MarketUpdateKind::Modify => {
                let order_idx = self.order_slot(update.order_id);
                // Partial fills do not move the order in the FIFO.
                self.orders.get_mut(order_idx).qty = update.qty;
            }
            MarketUpdateKind::Cancel => {
                let order_idx = self.order_slot(update.order_id);
                self.detach_order(order_idx);
            }
            MarketUpdateKind::Trade => return Some(BookEvent::Trade),
            MarketUpdateKind::Clear => self.clear(),
            MarketUpdateKind::SnapshotStart
            | MarketUpdateKind::SnapshotEnd
            | MarketUpdateKind::Invalid => return None,
        }

        self.refresh_bbo(update.side);
        Some(BookEvent::Book)
    }

    #[inline]
    fn order_slot(&self, order_id: OrderId) -> SlotIdx {
        let idx = self.oid_to_order[order_id as usize];
        assert_ne!(
            idx, NULL_IDX,
            "public stream referenced unknown order id {order_id}"
        );
        idx
    }

    /// Free every order and level and forget both sides.
    fn clear(&mut self) {
        for side in [Side::Buy, Side::Sell] {
            let head = self.best(side);
            if head == NULL_IDX {
                continue;
            }
            let mut level_idx = head;
            loop {
                let level = *self.levels.get(level_idx);
                let mut order_idx = level.first_order;
                loop {
                    let order = *self.orders.get(order_idx);
                    self.oid_to_order[order.order_id as usize] = NULL_IDX;
                    self.orders.remove(order_idx);
                    order_idx = order.next;
                    if order_idx == level.first_order {
                        break;
                    }
                }
                self.level_at_price[Self::price_index(level.price)] = NULL_IDX;
                self.levels.remove(level_idx);
                level_idx = level.next;
                if level_idx == head {
                    break;
                }
            }
            self.set_best(side, NULL_IDX);
        }
    }

    /// Recompute the touch for whichever side the update may have moved.
    fn refresh_bbo(&mut self, side: Side) {
        if side != Side::Sell {
            let (price, qty) = self.touch(self.best_bid);
            self.bbo.bid_price = price;
            self.bbo.bid_qty = qty;
        }
        if side != Side::Buy {
            let (price, qty) = self.touch(self.best_ask);
            self.bbo.ask_price = price;
            self.bbo.ask_qty = qty;
        }
    }

    fn touch(&self, level_idx: SlotIdx) -> (Price, Qty) {
        if level_idx == NULL_IDX {
            return (PRICE_INVALID, QTY_INVALID);
        }
        let level = self.levels.get(level_idx);
        let mut qty = 0;
        let mut order_idx = level.first_order;
        loop {
            let order = self.orders.get(order_idx);
            qty += order.qty;
            order_idx = order.next;
            if order_idx == level.first_order {
                break;
            }
        }
        (level.price, qty)
    }

    #[inline(always)]
    fn price_index(price: Price) -> usize {
        price.rem_euclid(MAX_PRICE_LEVELS as Price) as usize
    }

    #[inline(always)]
    fn level_at(&self, price: Price) -> SlotIdx {
        self.level_at_price[Self::price_index(price)]
    }

    #[inline(always)]
    fn best(&self, side: Side) -> SlotIdx {
        match side {
            Side::Buy => self.best_bid,
            Side::Sell => self.best_ask,
            Side::Invalid => unreachable!("book side lookup with invalid side"),
        }
    }

    #[inline(always)]
    fn set_best(&mut self, side: Side, idx: SlotIdx) {
        match side {
            Side::Buy => self.best_bid = idx,
            Side::Sell => self.best_ask = idx,
            Side::Invalid => unreachable!("book side update with invalid side"),
        }
    }

    #[inline(always)]
    fn quotes_ahead(side: Side, a: Price, b: Price) -> bool {
        match side {
            Side::Buy => a > b,
            Side::Sell => a < b,
            Side::Invalid => false,
        }
    }

    fn attach_order(&mut self, order_idx: SlotIdx) {
        let (order_id, side, price) = {
            let o = self.orders.get(order_idx);
            (o.order_id, o.side, o.price)
        };

        let level_idx = self.level_at(price);
        if level_idx == NULL_IDX {
            {
                let o = self.orders.get_mut(order_idx);
                o.prev = order_idx;
                o.next = order_idx;
            }
            let new_level = self.levels.insert(PriceLevel {
                side,
                price,
                first_order: order_idx,
                prev: NULL_IDX,
                next: NULL_IDX,
            });
            self.insert_level(new_level);
        } else {
            let first = self.levels.get(level_idx).first_order;
            let tail = self.orders.get(first).prev;
            {
                let o = self.orders.get_mut(order_idx);
                o.prev = tail;
                o.next = first;
            }
            self.orders.get_mut(tail).next = order_idx;
            self.orders.get_mut(first).prev = order_idx;
        }

        self.oid_to_order[order_id as usize] = order_idx;
    }

    fn detach_order(&mut self, order_idx: SlotIdx) {
        let (order_id, side, price, prev, next) = {
            let o = self.orders.get(order_idx);
            (o.order_id, o.side, o.price, o.prev, o.next)
        };

        if prev == order_idx {
            self.remove_level(side, price);
        } else {
            self.orders.get_mut(prev).next = next;
            self.orders.get_mut(next).prev = prev;

            let level_idx = self.level_at(price);
            if self.levels.get(level_idx).first_order == order_idx {
                self.levels.get_mut(level_idx).first_order = next;
            }
        }

        self.oid_to_order[order_id as usize] = NULL_IDX;
        self.orders.remove(order_idx);
    }

    fn insert_level(&mut self, level_idx: SlotIdx) {
        let (side, price) = {
            let l = self.levels.get(level_idx);
            (l.side, l.price)
        };
        self.level_at_price[Self::price_index(price)] = level_idx;

        let best = self.best(side);
        if best == NULL_IDX {
            let l = self.levels.get_mut(level_idx);
            l.prev = level_idx;
            l.next = level_idx;
            self.set_best(side, level_idx);
        } else if Self::quotes_ahead(side, price, self.levels.get(best).price) {
            self.link_level_before(level_idx, best);
            self.set_best(side, level_idx);
        } else {
            let mut cursor = best;
            loop {
                let next = self.levels.get(cursor).next;
                if next == best || !Self::quotes_ahead(side, self.levels.get(next).price, price) {
                    break;
                }
                cursor = next;
            }
            self.link_level_after(level_idx, cursor);
        }
    }

    fn link_level_before(&mut self, new_idx: SlotIdx, at: SlotIdx) {
        let prev = self.levels.get(at).prev;
        {
            let l = self.levels.get_mut(new_idx);
            l.prev = prev;
            l.next = at;
        }
        self.levels.get_mut(prev).next = new_idx;
        self.levels.get_mut(at).prev = new_idx;
    }

    fn link_level_after(&mut self, new_idx: SlotIdx, at: SlotIdx) {
        let next = self.levels.get(at).next;
        {
            let l = self.levels.get_mut(new_idx);
            l.prev = at;
            l.next = next;
        }
        self.levels.get_mut(next).prev = new_idx;
        self.levels.get_mut(at).next = new_idx;
    }

    fn remove_level(&mut self, side: Side, price: Price) {
        let level_idx = self.level_at(price);
        debug_assert_ne!(level_idx, NULL_IDX);

        let (prev, next) = {
            let l = self.levels.get(level_idx);
            (l.prev, l.next)
        };

        if next == level_idx {
            self.set_best(side, NULL_IDX);
        } else {
            self.levels.get_mut(prev).next = next;
            self.levels.get_mut(next).prev = prev;
            if self.best(side) == level_idx {
                self.set_best(side, next);
            }
        }

        self.level_at_price[Self::price_index(price)] = NULL_IDX;
        self.levels.remove(level_idx);
    }

    pub fn ticker_id(&self) -> TickerId {
        self.ticker_id
    }

    pub fn bbo(&self) -> &Bbo {
        &self.bbo
    }

    pub fn live_order_count(&self) -> usize {
        self.orders.len()
    }

    /// Walk one side best-first: `(price, [(order id, qty, priority)])` per
    /// level in FIFO order. Test and inspection surface.
    pub fn side_levels(&self, side: Side) -> Vec<(Price, Vec<(OrderId, Qty, Priority)>)> {
        let mut out = Vec::new();
        let head = self.best(side);
        if head == NULL_IDX {
            return out;
        }
        let mut level_idx = head;
        loop {
            let level = self.levels.get(level_idx);
            let mut orders = Vec::new();
            let mut order_idx = level.first_order;
            loop {
                let order = self.orders.get(order_idx);
                orders.push((order.order_id, order.qty, order.priority));
                order_idx = order.next;
                if order_idx == level.first_order {
                    break;
                }
            }
            out.push((level.price, orders));
            level_idx = level.next;
            if level_idx == head {
                break;
            }
        }
        out
    }
}

//! Authoritative limit order book
//!
//! One book per ticker. Each side is a circular doubly-linked list of price
//! levels, bids descending and asks ascending from the best-price head, and
//! each level holds its resting orders in a circular FIFO ordered by
//! priority. All records live in fixed pools and link by `u32` slot index;
//! `NULL_IDX` plays the role of the null pointer.
//!
//! The price-to-level index is direct-mapped by `price % MAX_PRICE_LEVELS`.
//! Two live prices must never collide in that window; the integer tick
//! domain is sized so they cannot.
//!
//! Book operations emit client responses and market updates directly onto
//! the producer halves passed in, preserving the emission order the
//! downstream consumers rely on.

use crate::core::*;
use crate::protocol::*;
use crate::runtime::{Pool, Producer, SlotIdx, NULL_IDX};
use rustc_hash::FxHashMap;

/// A resting order: a node in its level's FIFO ring.
#[derive(Debug, Clone, Copy, Default)]
struct BookOrder {
    client_id: ClientId,
    client_order_id: OrderId,
    market_order_id: OrderId,
    side: Side,
    price: Price,
    qty: Qty,
    priority: Priority,
    prev: SlotIdx,
    next: SlotIdx,
}

/// A price level: a node in its side's sorted ring of levels.
#[derive(Debug, Clone, Copy, Default)]
struct PriceLevel {
    side: Side,
    price: Price,
    first_order: SlotIdx,
    prev: SlotIdx,
    next: SlotIdx,
}

pub struct ExchangeBook {
    ticker_id: TickerId,

    orders: Pool<BookOrder>,
    levels: Pool<PriceLevel>,

    /// Direct-mapped `price % MAX_PRICE_LEVELS` → level slot.
    level_at_price: Vec<SlotIdx>,
    best_bid: SlotIdx,
    best_ask: SlotIdx,

    /// Live orders by (owner, client order id).
    live_orders: FxHashMap<(ClientId, OrderId), SlotIdx>,

    next_market_order_id: OrderId,
}

impl ExchangeBook {
    pub fn new(ticker_id: TickerId) -> Self {
        Self::with_capacity(ticker_id, MAX_ORDER_IDS, MAX_PRICE_LEVELS)
    }

    /// Reduced-capacity constructor for tests and benches.
    pub fn with_capacity(ticker_id: TickerId, max_orders: usize, max_levels: usize) -> Self {
        Self {
            ticker_id,
            orders: Pool::new(max_orders),
            levels: Pool::new(max_levels),
            level_at_price: vec![NULL_IDX; MAX_PRICE_LEVELS],
            best_bid: NULL_IDX,
            best_ask: NULL_IDX,
            live_orders: FxHashMap::default(),
            next_market_order_id: 1,
        }
    }

    /// Handle a NEW order: acknowledge, match against the opposite side,
    /// and rest any remainder.
    pub fn add(
        &mut self,
        client_id: ClientId,
        client_order_id: OrderId,
        side: Side,
        price: Price,
        qty: Qty,
        responses: &mut Producer<ClientResponse>,
        updates: &mut Producer<MarketUpdate>,
    ) {
        let market_order_id = self.next_market_order_id;
        self.next_market_order_id += 1;

        responses.push(ClientResponse {
            kind: ClientResponseKind::Accepted,
            client_id,
            ticker_id: self.ticker_id,
            client_order_id,
            market_order_id,
            side,
            price,
            exec_qty: 0,
            leaves_qty: qty,
        });

        let leaves_qty = self.check_for_match(
            client_id,
            client_order_id,
            side,
            price,
            qty,
            market_order_id,
            responses,
            updates,
        );

        if leaves_qty > 0 {
            let priority = self.next_priority(price);
            let order_idx = self.orders.insert(BookOrder {
                client_id,
                client_order_id,
                market_order_id,
                side,
                price,
                qty: leaves_qty,
                priority,
                prev: NULL_IDX,
                next: NULL_IDX,
            });
            self.attach_order(order_idx);

            updates.push(MarketUpdate {
                kind: MarketUpdateKind::Add,
                order_id: market_order_id,
                ticker_id: self.ticker_id,
                side,
                price,
                qty: leaves_qty,
                priority,
            });
        }
    }

    /// Handle a CANCEL. An unknown (client, order id) pair is rejected to
    /// the client and leaves no trace on the public stream.
    pub fn cancel(
        &mut self,
        client_id: ClientId,
        order_id: OrderId,
        responses: &mut Producer<ClientResponse>,
        updates: &mut Producer<MarketUpdate>,
    ) {
        let Some(order_idx) = self.live_orders.get(&(client_id, order_id)).copied() else {
            responses.push(ClientResponse {
                kind: ClientResponseKind::CancelRejected,
                client_id,
                ticker_id: self.ticker_id,
                client_order_id: order_id,
                market_order_id: ORDER_ID_INVALID,
                side: Side::Invalid,
                price: PRICE_INVALID,
                exec_qty: QTY_INVALID,
                leaves_qty: QTY_INVALID,
            });
            return;
        };

        let order = *self.orders.get(order_idx);

        responses.push(ClientResponse {
            kind: ClientResponseKind::Canceled,
            client_id,
            ticker_id: self.ticker_id,
            client_order_id: order_id,
            market_order_id: order.market_order_id,
            side: order.side,
            price: order.price,
            exec_qty: QTY_INVALID,
            leaves_qty: order.qty,
        });
        updates.push(MarketUpdate {
            kind: MarketUpdateKind::Cancel,
            order_id: order.market_order_id,
            ticker_id: self.ticker_id,
            side: order.side,
            price: order.price,
            qty: 0,
            priority: order.priority,
        });

        self.detach_order(order_idx);
    }

    /// Consume opposite-side liquidity while the new order still crosses.
    /// Returns the unfilled remainder.
    #[allow(clippy::too_many_arguments)]
    fn check_for_match(
        &mut self,
        client_id: ClientId,
        client_order_id: OrderId,
        side: Side,
        price: Price,
        qty: Qty,
        market_order_id: OrderId,
        responses: &mut Producer<ClientResponse>,
        updates: &mut Producer<MarketUpdate>,
    ) -> Qty {
        let mut leaves_qty = qty;

        while leaves_qty > 0 {
            let best = match side {
                Side::Buy => self.best_ask,
                Side::Sell => self.best_bid,
                Side::Invalid => break,
            };
            if best == NULL_IDX {
                break;
            }

            let resting_idx = self.levels.get(best).first_order;
            let resting_price = self.orders.get(resting_idx).price;
            let crosses = match side {
                Side::Buy => price >= resting_price,
                Side::Sell => price <= resting_price,
                Side::Invalid => false,
            };
            if !crosses {
                break;
            }

            self.execute_match(
                client_id,
                client_order_id,
                side,
                market_order_id,
                resting_idx,
                &mut leaves_qty,
                responses,
                updates,
            );
        }

        leaves_qty
    }

    /// Fill the aggressor against one resting order at the resting order's
    /// price. Emits, in order: FILLED to the aggressor, FILLED to the
    /// resting owner, the public TRADE, then the CANCEL or MODIFY that
    /// reflects the resting order's new state.
    #[allow(clippy::too_many_arguments)]
    fn execute_match(
        &mut self,
        client_id: ClientId,
        client_order_id: OrderId,
        side: Side,
        market_order_id: OrderId,
        resting_idx: SlotIdx,
        leaves_qty: &mut Qty,
        responses: &mut Producer<ClientResponse>,
        updates: &mut Producer<MarketUpdate>,
    ) {
        let resting = *self.orders.get(resting_idx);
        let fill_qty = (*leaves_qty).min(resting.qty);

        *leaves_qty -= fill_qty;
        let resting_leaves = resting.qty - fill_qty;
        self.orders.get_mut(resting_idx).qty = resting_leaves;

        responses.push(ClientResponse {
            kind: ClientResponseKind::Filled,
            client_id,
            ticker_id: self.ticker_id,
            client_order_id,
            market_order_id,
            side,
            price: resting.price,
            exec_qty: fill_qty,
            leaves_qty: *leaves_qty,
        });
        responses.push(ClientResponse {
            kind: ClientResponseKind::Filled,
            client_id: resting.client_id,
            ticker_id: self.ticker_id,
            client_order_id: resting.client_order_id,
            market_order_id: resting.market_order_id,
            side: resting.side,
            price: resting.price,
            exec_qty: fill_qty,
            leaves_qty: resting_leaves,
        });

        updates.push(MarketUpdate {
            kind: MarketUpdateKind::Trade,
            order_id: ORDER_ID_INVALID,
            ticker_id: self.ticker_id,
            side,
            price: resting.price,
            qty: fill_qty,
            priority: PRIORITY_INVALID,
        });

        if resting_leaves == 0 {
            updates.push(MarketUpdate {
                kind: MarketUpdateKind::Cancel,
                order_id: resting.market_order_id,
                ticker_id: self.ticker_id,
                side: resting.side,
                price: resting.price,
                qty: 0,
                priority: PRIORITY_INVALID,
            });
            self.detach_order(resting_idx);
        } else {
            updates.push(MarketUpdate {
                kind: MarketUpdateKind::Modify,
                order_id: resting.market_order_id,
                ticker_id: self.ticker_id,
                side: resting.side,
                price: resting.price,
                qty: resting_leaves,
                priority: resting.priority,
            });
        }
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

    /// `a` quotes ahead of `b` on `side`.
    #[inline(always)]
    fn quotes_ahead(side: Side, a: Price, b: Price) -> bool {
        match side {
            Side::Buy => a > b,
            Side::Sell => a < b,
            Side::Invalid => false,
        }
    }

    /// Next FIFO priority at `price`: one past the tail's, or 1 for a fresh
    /// level. Priorities never reset while the level lives.
    fn next_priority(&self, price: Price) -> Priority {
        let level_idx = self.level_at(price);
        if level_idx == NULL_IDX {
            return 1;
        }
        let first = self.levels.get(level_idx).first_order;
        let tail = self.orders.get(first).prev;
        self.orders.get(tail).priority + 1
    }

    /// Link a resting order into its level's FIFO tail, creating the level
    /// if this is the first order at that price.
    fn attach_order(&mut self, order_idx: SlotIdx) {
        let (client_id, client_order_id, side, price) = {
            let o = self.orders.get(order_idx);
            (o.client_id, o.client_order_id, o.side, o.price)
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

        self.live_orders
            .insert((client_id, client_order_id), order_idx);
    }

    /// Unlink a resting order, removing its level when it was the last one
    /// there, and free its slot.
    fn detach_order(&mut self, order_idx: SlotIdx) {
        let (client_id, client_order_id, side, price, prev, next) = {
            let o = self.orders.get(order_idx);
            (
                o.client_id,
                o.client_order_id,
                o.side,
                o.price,
                o.prev,
                o.next,
            )
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

        self.live_orders.remove(&(client_id, client_order_id));
        self.orders.remove(order_idx);
    }

    /// Splice a fresh level into its side's sorted circular ring, moving
    /// the best-price head when the new level quotes ahead of it.
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
            // Walk to the last level still quoting ahead of the new price.
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

    /// Unlink and free an empty level, advancing the best-price head when
    /// it was the best.
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

    pub fn best_bid_price(&self) -> Option<Price> {
        (self.best_bid != NULL_IDX).then(|| self.levels.get(self.best_bid).price)
    }

    pub fn best_ask_price(&self) -> Option<Price> {
        (self.best_ask != NULL_IDX).then(|| self.levels.get(self.best_ask).price)
    }

    pub fn live_order_count(&self) -> usize {
        self.live_orders.len()
    }

    /// Walk one side best-first, returning `(price, [(market order id, qty,
    /// priority)])` per level in FIFO order. Test and inspection surface.
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
                orders.push((order.market_order_id, order.qty, order.priority));
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::{ring, Consumer};

    fn harness() -> (
        ExchangeBook,
        Producer<ClientResponse>,
        Consumer<ClientResponse>,
        Producer<MarketUpdate>,
        Consumer<MarketUpdate>,
    ) {
        let (resp_tx, resp_rx) = ring(1024);
        let (upd_tx, upd_rx) = ring(1024);
        (
            ExchangeBook::with_capacity(0, 1024, MAX_PRICE_LEVELS),
            resp_tx,
            resp_rx,
            upd_tx,
            upd_rx,
        )
    }

    fn drain<T: Copy>(rx: &mut Consumer<T>) -> Vec<T> {
        let mut out = Vec::new();
        while let Some(v) = rx.pop() {
            out.push(v);
        }
        out
    }

    #[test]
    fn resting_order_is_acknowledged_and_published() {
        let (mut book, mut resp_tx, mut resp_rx, mut upd_tx, mut upd_rx) = harness();
        book.add(1, 10, Side::Buy, 100, 5, &mut resp_tx, &mut upd_tx);

        let responses = drain(&mut resp_rx);
        assert_eq!(responses.len(), 1);
        assert_eq!(responses[0].kind, ClientResponseKind::Accepted);
        assert_eq!(responses[0].market_order_id, 1);
        assert_eq!(responses[0].leaves_qty, 5);

        let updates = drain(&mut upd_rx);
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].kind, MarketUpdateKind::Add);
        assert_eq!(updates[0].order_id, 1);
        assert_eq!(updates[0].priority, 1);
        assert_eq!(book.best_bid_price(), Some(100));
    }

    #[test]
    fn aggressive_sell_fills_at_resting_bid_price() {
        let (mut book, mut resp_tx, mut resp_rx, mut upd_tx, mut upd_rx) = harness();
        book.add(1, 10, Side::Buy, 100, 5, &mut resp_tx, &mut upd_tx);
        drain(&mut resp_rx);
        drain(&mut upd_rx);

        // Sell 99 crosses the 100 bid and trades at 100.
        book.add(2, 20, Side::Sell, 99, 5, &mut resp_tx, &mut upd_tx);

        let responses = drain(&mut resp_rx);
        assert_eq!(responses[0].kind, ClientResponseKind::Accepted);
        assert_eq!(responses[1].kind, ClientResponseKind::Filled);
        assert_eq!(responses[1].client_id, 2);
        assert_eq!(responses[1].price, 100);
        assert_eq!(responses[1].leaves_qty, 0);
        assert_eq!(responses[2].kind, ClientResponseKind::Filled);
        assert_eq!(responses[2].client_id, 1);
        assert_eq!(responses[2].leaves_qty, 0);

        let updates = drain(&mut upd_rx);
        assert_eq!(updates[0].kind, MarketUpdateKind::Trade);
        assert_eq!(updates[0].side, Side::Sell);
        assert_eq!(updates[0].price, 100);
        assert_eq!(updates[0].qty, 5);
        assert_eq!(updates[1].kind, MarketUpdateKind::Cancel);
        assert_eq!(updates[1].order_id, 1);
        assert_eq!(updates[1].qty, 0);

        assert_eq!(book.best_bid_price(), None);
        assert_eq!(book.live_order_count(), 0);
    }

    #[test]
    fn partial_fill_keeps_priority_and_modifies() {
        let (mut book, mut resp_tx, mut resp_rx, mut upd_tx, mut upd_rx) = harness();
        book.add(1, 10, Side::Buy, 100, 5, &mut resp_tx, &mut upd_tx);
        drain(&mut resp_rx);
        drain(&mut upd_rx);

        book.add(2, 20, Side::Sell, 100, 3, &mut resp_tx, &mut upd_tx);

        let responses = drain(&mut resp_rx);
        assert_eq!(responses[2].kind, ClientResponseKind::Filled);
        assert_eq!(responses[2].exec_qty, 3);
        assert_eq!(responses[2].leaves_qty, 2);

        let updates = drain(&mut upd_rx);
        assert_eq!(updates[0].kind, MarketUpdateKind::Trade);
        assert_eq!(updates[1].kind, MarketUpdateKind::Modify);
        assert_eq!(updates[1].qty, 2);
        assert_eq!(updates[1].priority, 1);

        let bids = book.side_levels(Side::Buy);
        assert_eq!(bids, vec![(100, vec![(1, 2, 1)])]);
    }

    #[test]
    fn cancel_unknown_order_is_rejected_without_market_update() {
        let (mut book, mut resp_tx, mut resp_rx, mut upd_tx, mut upd_rx) = harness();
        book.cancel(1, 99, &mut resp_tx, &mut upd_tx);

        let responses = drain(&mut resp_rx);
        assert_eq!(responses.len(), 1);
        assert_eq!(responses[0].kind, ClientResponseKind::CancelRejected);
        assert_eq!(responses[0].client_order_id, 99);
        assert!(drain(&mut upd_rx).is_empty());
    }

    #[test]
    fn fifo_priority_across_clients_at_same_price() {
        let (mut book, mut resp_tx, mut resp_rx, mut upd_tx, mut upd_rx) = harness();
        book.add(1, 11, Side::Buy, 100, 5, &mut resp_tx, &mut upd_tx);
        book.add(2, 21, Side::Buy, 100, 5, &mut resp_tx, &mut upd_tx);
        drain(&mut resp_rx);
        drain(&mut upd_rx);

        book.add(1, 12, Side::Sell, 100, 5, &mut resp_tx, &mut upd_tx);

        let responses = drain(&mut resp_rx);
        // The first resting order (client 1, order 11) fills; client 2 rests.
        let resting_fill = responses
            .iter()
            .find(|r| r.kind == ClientResponseKind::Filled && r.client_order_id == 11)
            .unwrap();
        assert_eq!(resting_fill.client_id, 1);
        assert!(!responses
            .iter()
            .any(|r| r.kind == ClientResponseKind::Filled && r.client_order_id == 21));

        let bids = book.side_levels(Side::Buy);
        assert_eq!(bids.len(), 1);
        assert_eq!(bids[0].1.len(), 1);
        assert_eq!(bids[0].1[0].0, 2); // market order id of client 2's order
    }

    #[test]
    fn levels_stay_sorted_as_they_come_and_go() {
        let (mut book, mut resp_tx, _resp_rx, mut upd_tx, _upd_rx) = harness();
        for (coid, price) in [(1, 100), (2, 98), (3, 102), (4, 99)] {
            book.add(1, coid, Side::Buy, price, 1, &mut resp_tx, &mut upd_tx);
        }
        for (coid, price) in [(11, 110), (12, 108), (13, 112)] {
            book.add(2, coid, Side::Sell, price, 1, &mut resp_tx, &mut upd_tx);
        }

        let bid_prices: Vec<Price> = book.side_levels(Side::Buy).iter().map(|l| l.0).collect();
        assert_eq!(bid_prices, vec![102, 100, 99, 98]);
        let ask_prices: Vec<Price> = book.side_levels(Side::Sell).iter().map(|l| l.0).collect();
        assert_eq!(ask_prices, vec![108, 110, 112]);

        // Cancel the best bid; the head must advance to the next level.
        book.cancel(1, 3, &mut resp_tx, &mut upd_tx);
        assert_eq!(book.best_bid_price(), Some(100));
    }

    #[test]
    fn sweep_through_multiple_levels() {
        let (mut book, mut resp_tx, mut resp_rx, mut upd_tx, mut upd_rx) = harness();
        book.add(1, 1, Side::Sell, 101, 2, &mut resp_tx, &mut upd_tx);
        book.add(1, 2, Side::Sell, 102, 2, &mut resp_tx, &mut upd_tx);
        drain(&mut resp_rx);
        drain(&mut upd_rx);

        // Buy 5 at 103 takes both asks and rests 1 lot.
        book.add(2, 3, Side::Buy, 103, 5, &mut resp_tx, &mut upd_tx);

        let responses = drain(&mut resp_rx);
        let aggressor_fills: Vec<_> = responses
            .iter()
            .filter(|r| r.kind == ClientResponseKind::Filled && r.client_id == 2)
            .collect();
        assert_eq!(aggressor_fills.len(), 2);
        // Price improvement accrues to the aggressor: fills at 101 then 102.
        assert_eq!(aggressor_fills[0].price, 101);
        assert_eq!(aggressor_fills[1].price, 102);
        assert_eq!(aggressor_fills[1].leaves_qty, 1);

        assert_eq!(book.best_ask_price(), None);
        assert_eq!(book.best_bid_price(), Some(103));
        let bids = book.side_levels(Side::Buy);
        assert_eq!(bids[0].1[0].1, 1);
    }
}

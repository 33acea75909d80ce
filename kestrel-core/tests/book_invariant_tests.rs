//! Randomised book invariants
//!
//! Seeded random ADD/CANCEL flows against the authoritative book, checking
//! the structural invariants after every operation and the conservation
//! and lifecycle properties over the full response/update streams.

use kestrel_core::core::*;
use kestrel_core::exchange::ExchangeBook;
use kestrel_core::protocol::*;
use kestrel_core::runtime::{ring, Consumer, Producer};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::collections::HashMap;

// Prices confined to one direct-map window so distinct live prices can
// never collide in the price index.
const PRICE_LO: Price = 100;
const PRICE_HI: Price = 140;

struct Flow {
    book: ExchangeBook,
    responses_tx: Producer<ClientResponse>,
    responses_rx: Consumer<ClientResponse>,
    updates_tx: Producer<MarketUpdate>,
    updates_rx: Consumer<MarketUpdate>,
    all_responses: Vec<ClientResponse>,
    all_updates: Vec<MarketUpdate>,
}

impl Flow {
    fn new() -> Self {
        let (responses_tx, responses_rx) = ring(64 * 1024);
        let (updates_tx, updates_rx) = ring(64 * 1024);
        Self {
            book: ExchangeBook::with_capacity(0, 16 * 1024, MAX_PRICE_LEVELS),
            responses_tx,
            responses_rx,
            updates_tx,
            updates_rx,
            all_responses: Vec::new(),
            all_updates: Vec::new(),
        }
    }

    fn drain(&mut self) {
        while let Some(r) = self.responses_rx.pop() {
            self.all_responses.push(r);
        }
        while let Some(u) = self.updates_rx.pop() {
            self.all_updates.push(u);
        }
    }

    fn add(&mut self, client: ClientId, order: OrderId, side: Side, price: Price, qty: Qty) {
        self.book.add(
            client,
            order,
            side,
            price,
            qty,
            &mut self.responses_tx,
            &mut self.updates_tx,
        );
        self.drain();
    }

    fn cancel(&mut self, client: ClientId, order: OrderId) {
        self.book
            .cancel(client, order, &mut self.responses_tx, &mut self.updates_tx);
        self.drain();
    }

    fn assert_structure(&self) {
        let bids = self.book.side_levels(Side::Buy);
        let asks = self.book.side_levels(Side::Sell);

        // Bid prices strictly descending, ask prices strictly ascending.
        for pair in bids.windows(2) {
            assert!(pair[0].0 > pair[1].0, "bids not descending: {bids:?}");
        }
        for pair in asks.windows(2) {
            assert!(pair[0].0 < pair[1].0, "asks not ascending: {asks:?}");
        }

        // No crossed book at rest.
        if let (Some((best_bid, _)), Some((best_ask, _))) = (bids.first(), asks.first()) {
            assert!(best_bid < best_ask, "crossed book: {best_bid} >= {best_ask}");
        }

        // FIFO priorities strictly increasing within every level.
        for (_, orders) in bids.iter().chain(asks.iter()) {
            for pair in orders.windows(2) {
                assert!(
                    pair[0].2 < pair[1].2,
                    "priorities out of order within level: {orders:?}"
                );
            }
        }
    }
}

fn random_flow(seed: u64, operations: usize) -> Flow {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut flow = Flow::new();
    let mut next_order_id: HashMap<ClientId, OrderId> = HashMap::new();
    let mut issued: Vec<(ClientId, OrderId)> = Vec::new();

    for _ in 0..operations {
        let client = rng.gen_range(1..=4);
        if rng.gen_bool(0.7) || issued.is_empty() {
            let order_id = next_order_id.entry(client).or_insert(1);
            let side = if rng.gen_bool(0.5) { Side::Buy } else { Side::Sell };
            let price = rng.gen_range(PRICE_LO..=PRICE_HI);
            let qty = rng.gen_range(1..=50);
            flow.add(client, *order_id, side, price, qty);
            issued.push((client, *order_id));
            *order_id += 1;
        } else {
            // Cancel something previously issued; rejects for dead orders
            // are part of the flow.
            let (client, order_id) = issued[rng.gen_range(0..issued.len())];
            flow.cancel(client, order_id);
        }
        flow.assert_structure();
    }

    flow
}

#[test]
fn structural_invariants_hold_under_random_flow() {
    for seed in [7, 42, 1337] {
        random_flow(seed, 2_000);
    }
}

/// Property: per-order quantity conservation across the response stream
/// and the book remainder.
#[test]
fn filled_quantity_is_conserved() {
    let flow = random_flow(99, 3_000);

    // Original quantity per order from its ACCEPTED.
    let mut original: HashMap<(ClientId, OrderId), Qty> = HashMap::new();
    // Market order id -> client keys, to find book leftovers.
    let mut by_market_id: HashMap<OrderId, (ClientId, OrderId)> = HashMap::new();
    let mut exec_sum: HashMap<(ClientId, OrderId), Qty> = HashMap::new();
    let mut final_leaves: HashMap<(ClientId, OrderId), Qty> = HashMap::new();

    for r in &flow.all_responses {
        let key = (r.client_id, r.client_order_id);
        match r.kind {
            ClientResponseKind::Accepted => {
                original.insert(key, r.leaves_qty);
                by_market_id.insert(r.market_order_id, key);
                final_leaves.insert(key, r.leaves_qty);
            }
            ClientResponseKind::Filled => {
                *exec_sum.entry(key).or_insert(0) += r.exec_qty;
                final_leaves.insert(key, r.leaves_qty);
            }
            ClientResponseKind::Canceled => {
                // A cancel forfeits the remainder; it counts as the
                // order's unfilled tail.
                final_leaves.insert(key, r.leaves_qty);
            }
            ClientResponseKind::CancelRejected | ClientResponseKind::Invalid => {}
        }
    }

    // Orders still resting keep their remainder on the book.
    let mut on_book: HashMap<(ClientId, OrderId), Qty> = HashMap::new();
    for side in [Side::Buy, Side::Sell] {
        for (_, orders) in flow.book.side_levels(side) {
            for (market_id, qty, _) in orders {
                on_book.insert(by_market_id[&market_id], qty);
            }
        }
    }

    for (key, &qty) in &original {
        let exec = exec_sum.get(key).copied().unwrap_or(0);
        let rest = on_book
            .get(key)
            .copied()
            .unwrap_or_else(|| final_leaves.get(key).copied().unwrap_or(0));
        assert_eq!(
            exec + rest,
            qty,
            "quantity not conserved for order {key:?}: exec {exec} + rest {rest} != {qty}"
        );
    }
}

/// Property: every ACCEPTED precedes that order's fills/cancel, and any
/// finished order ends at zero leaves or with a CANCELED.
#[test]
fn response_lifecycle_is_well_formed() {
    let flow = random_flow(123, 3_000);

    let mut seen_accepted: HashMap<(ClientId, OrderId), bool> = HashMap::new();
    for r in &flow.all_responses {
        let key = (r.client_id, r.client_order_id);
        match r.kind {
            ClientResponseKind::Accepted => {
                assert!(
                    !seen_accepted.contains_key(&key),
                    "duplicate ACCEPTED for {key:?}"
                );
                seen_accepted.insert(key, true);
            }
            ClientResponseKind::Filled | ClientResponseKind::Canceled => {
                assert!(
                    seen_accepted.contains_key(&key),
                    "{:?} for {key:?} before ACCEPTED",
                    r.kind
                );
            }
            ClientResponseKind::CancelRejected | ClientResponseKind::Invalid => {}
        }
    }
}

/// Property: on the public stream each order id is ADD, then MODIFYs with
/// strictly decreasing quantity, then exactly one CANCEL.
#[test]
fn market_update_lifecycle_per_order() {
    let flow = random_flow(2024, 3_000);

    #[derive(Default)]
    struct Lifecycle {
        added: bool,
        cancelled: bool,
        last_qty: Option<Qty>,
    }

    let mut lifecycles: HashMap<OrderId, Lifecycle> = HashMap::new();
    for u in &flow.all_updates {
        match u.kind {
            MarketUpdateKind::Add => {
                let entry = lifecycles.entry(u.order_id).or_default();
                assert!(!entry.added, "double ADD for market order {}", u.order_id);
                entry.added = true;
                entry.last_qty = Some(u.qty);
            }
            MarketUpdateKind::Modify => {
                let entry = lifecycles.get_mut(&u.order_id).expect("MODIFY before ADD");
                assert!(entry.added && !entry.cancelled);
                assert!(
                    u.qty < entry.last_qty.unwrap(),
                    "MODIFY must shrink qty for order {}",
                    u.order_id
                );
                entry.last_qty = Some(u.qty);
            }
            MarketUpdateKind::Cancel => {
                let entry = lifecycles.get_mut(&u.order_id).expect("CANCEL before ADD");
                assert!(entry.added, "CANCEL before ADD for {}", u.order_id);
                assert!(!entry.cancelled, "double CANCEL for {}", u.order_id);
                entry.cancelled = true;
            }
            MarketUpdateKind::Trade => {
                assert_eq!(u.order_id, ORDER_ID_INVALID);
            }
            _ => panic!("unexpected update kind on incremental stream: {u}"),
        }
    }
}

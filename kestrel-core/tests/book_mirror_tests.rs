//! Exchange/participant book equivalence
//!
//! The participant's book is rebuilt purely from the public market-update
//! stream; after every update it must hold exactly the same live orders,
//! prices, quantities, and priorities as the authoritative book.

use kestrel_core::core::*;
use kestrel_core::exchange::ExchangeBook;
use kestrel_core::protocol::*;
use kestrel_core::runtime::{ring, Consumer, Producer};
use kestrel_core::trading::MarketBook;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

fn assert_equivalent(exchange: &ExchangeBook, participant: &MarketBook) {
    for side in [Side::Buy, Side::Sell] {
        assert_eq!(
            exchange.side_levels(side),
            participant.side_levels(side),
            "books diverged on {side}"
        );
    }
}

struct Mirror {
    exchange: ExchangeBook,
    participant: MarketBook,
    responses_tx: Producer<ClientResponse>,
    responses_rx: Consumer<ClientResponse>,
    updates_tx: Producer<MarketUpdate>,
    updates_rx: Consumer<MarketUpdate>,
}

impl Mirror {
    fn new() -> Self {
        let (responses_tx, responses_rx) = ring(64 * 1024);
        let (updates_tx, updates_rx) = ring(64 * 1024);
        Self {
            exchange: ExchangeBook::with_capacity(0, 16 * 1024, MAX_PRICE_LEVELS),
            participant: MarketBook::with_capacity(0, 16 * 1024, MAX_PRICE_LEVELS),
            responses_tx,
            responses_rx,
            updates_tx,
            updates_rx,
        }
    }

    fn replay(&mut self) {
        while self.responses_rx.pop().is_some() {}
        while let Some(update) = self.updates_rx.pop() {
            self.participant.apply(&update);
        }
    }
}

#[test]
fn participant_book_tracks_exchange_book_update_for_update() {
    let mut rng = ChaCha8Rng::seed_from_u64(4242);
    let mut mirror = Mirror::new();
    let mut issued: Vec<(ClientId, OrderId)> = Vec::new();
    let mut next_order_id: OrderId = 1;

    for _ in 0..5_000 {
        let client = rng.gen_range(1..=4);
        if rng.gen_bool(0.7) || issued.is_empty() {
            let side = if rng.gen_bool(0.5) { Side::Buy } else { Side::Sell };
            let price = rng.gen_range(100..=140);
            let qty = rng.gen_range(1..=50);
            mirror.exchange.add(
                client,
                next_order_id,
                side,
                price,
                qty,
                &mut mirror.responses_tx,
                &mut mirror.updates_tx,
            );
            issued.push((client, next_order_id));
            next_order_id += 1;
        } else {
            let (client, order_id) = issued[rng.gen_range(0..issued.len())];
            mirror.exchange.cancel(
                client,
                order_id,
                &mut mirror.responses_tx,
                &mut mirror.updates_tx,
            );
        }

        mirror.replay();
        assert_equivalent(&mirror.exchange, &mirror.participant);
    }

    // The flow must actually have exercised the book.
    assert!(next_order_id > 3_000);
}

#[test]
fn bbo_matches_summed_touch_depth() {
    let mut mirror = Mirror::new();

    mirror.exchange.add(
        1,
        1,
        Side::Buy,
        100,
        5,
        &mut mirror.responses_tx,
        &mut mirror.updates_tx,
    );
    mirror.exchange.add(
        2,
        2,
        Side::Buy,
        100,
        7,
        &mut mirror.responses_tx,
        &mut mirror.updates_tx,
    );
    mirror.exchange.add(
        1,
        3,
        Side::Sell,
        105,
        4,
        &mut mirror.responses_tx,
        &mut mirror.updates_tx,
    );
    mirror.replay();

    let bbo = mirror.participant.bbo();
    assert_eq!(bbo.bid_price, 100);
    assert_eq!(bbo.bid_qty, 12);
    assert_eq!(bbo.ask_price, 105);
    assert_eq!(bbo.ask_qty, 4);
}

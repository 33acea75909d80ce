//! Order manager
//!
//! Owns the participant's outstanding orders: at most one per (ticker,
//! side), driven toward the strategy's target prices by `move_orders`.
//! Sends NEW and CANCEL requests through the gateway ring and digests the
//! exchange's responses back into order state.

use crate::core::*;
use crate::protocol::*;
use crate::runtime::Producer;
use crate::trading::position::PositionKeeper;
use crate::trading::risk::{RiskCheck, RiskManager};
use std::fmt;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OmOrderState {
    #[default]
    Invalid,
    PendingNew,
    Live,
    PendingCancel,
    Dead,
}

impl fmt::Display for OmOrderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OmOrderState::Invalid => write!(f, "INVALID"),
            OmOrderState::PendingNew => write!(f, "PENDING_NEW"),
            OmOrderState::Live => write!(f, "LIVE"),
            OmOrderState::PendingCancel => write!(f, "PENDING_CANCEL"),
            OmOrderState::Dead => write!(f, "DEAD"),
        }
    }
}

/// One managed order slot.
#[derive(Debug, Clone, Copy)]
pub struct OmOrder {
    pub ticker_id: TickerId,
    pub order_id: OrderId,
    pub side: Side,
    pub price: Price,
    pub qty: Qty,
    pub state: OmOrderState,
}

impl Default for OmOrder {
    fn default() -> Self {
        Self {
            ticker_id: TICKER_ID_INVALID,
            order_id: ORDER_ID_INVALID,
            side: Side::Invalid,
            price: PRICE_INVALID,
            qty: QTY_INVALID,
            state: OmOrderState::Invalid,
        }
    }
}

pub struct OrderManager {
    client_id: ClientId,
    requests: Producer<ClientRequest>,
    next_order_id: OrderId,
    ticker_side_orders: [[OmOrder; 2]; MAX_TICKERS],
}

impl OrderManager {
    pub fn new(client_id: ClientId, requests: Producer<ClientRequest>) -> Self {
        Self {
            client_id,
            requests,
            next_order_id: 1,
            ticker_side_orders: [[OmOrder::default(); 2]; MAX_TICKERS],
        }
    }

    /// Digest an exchange response into the owning slot's state machine.
    pub fn on_order_update(&mut self, response: &ClientResponse) {
        if response.side == Side::Invalid {
            // Cancel rejects carry no side; there is no slot to update.
            return;
        }
        let order =
            &mut self.ticker_side_orders[response.ticker_id as usize][response.side.index()];

        match response.kind {
            ClientResponseKind::Accepted => order.state = OmOrderState::Live,
            ClientResponseKind::Canceled => order.state = OmOrderState::Dead,
            ClientResponseKind::Filled => {
                order.qty = response.leaves_qty;
                if order.qty == 0 {
                    order.state = OmOrderState::Dead;
                }
            }
            ClientResponseKind::CancelRejected | ClientResponseKind::Invalid => {}
        }
        debug!("order state now {} after {response}", order.state);
    }

    fn new_order(&mut self, ticker_id: TickerId, price: Price, side: Side, qty: Qty) {
        let order_id = self.next_order_id;
        self.next_order_id += 1;

        let request = ClientRequest {
            kind: ClientRequestKind::New,
            client_id: self.client_id,
            ticker_id,
            order_id,
            side,
            price,
            qty,
        };
        self.requests.push(request);
        debug!("sent {request}");

        self.ticker_side_orders[ticker_id as usize][side.index()] = OmOrder {
            ticker_id,
            order_id,
            side,
            price,
            qty,
            state: OmOrderState::PendingNew,
        };
    }

    fn cancel_order(&mut self, ticker_id: TickerId, side: Side) {
        let order = &mut self.ticker_side_orders[ticker_id as usize][side.index()];
        let request = ClientRequest {
            kind: ClientRequestKind::Cancel,
            client_id: self.client_id,
            ticker_id,
            order_id: order.order_id,
            side,
            price: order.price,
            qty: order.qty,
        };
        order.state = OmOrderState::PendingCancel;
        self.requests.push(request);
        debug!("sent {request}");
    }

    /// Converge one side toward `price`: cancel a live order quoting the
    /// wrong price, send a new one from rest once risk allows it, and let
    /// in-flight transitions settle undisturbed.
    fn move_order(
        &mut self,
        positions: &PositionKeeper,
        risk: &RiskManager,
        ticker_id: TickerId,
        price: Price,
        side: Side,
        qty: Qty,
    ) {
        let order = self.ticker_side_orders[ticker_id as usize][side.index()];
        match order.state {
            OmOrderState::Live => {
                if order.price != price {
                    self.cancel_order(ticker_id, side);
                }
            }
            OmOrderState::Invalid | OmOrderState::Dead => {
                if price != PRICE_INVALID {
                    match risk.check_pre_trade(positions, ticker_id, side, qty) {
                        RiskCheck::Allowed => self.new_order(ticker_id, price, side, qty),
                        result => debug!(
                            "ticker:{ticker_id} side:{side} qty:{qty} blocked by risk: {result}"
                        ),
                    }
                }
            }
            OmOrderState::PendingNew | OmOrderState::PendingCancel => {}
        }
    }

    /// Converge both sides toward the strategy's target quote.
    pub fn move_orders(
        &mut self,
        positions: &PositionKeeper,
        risk: &RiskManager,
        ticker_id: TickerId,
        bid_price: Price,
        ask_price: Price,
        clip: Qty,
    ) {
        self.move_order(positions, risk, ticker_id, bid_price, Side::Buy, clip);
        self.move_order(positions, risk, ticker_id, ask_price, Side::Sell, clip);
    }

    pub fn order(&self, ticker_id: TickerId, side: Side) -> &OmOrder {
        &self.ticker_side_orders[ticker_id as usize][side.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::{ring, Consumer};

    fn harness(max_position: Qty) -> (OrderManager, Consumer<ClientRequest>, PositionKeeper, RiskManager) {
        let (tx, rx) = ring(64);
        let mut cfg = TickerCfgMap::default();
        for ticker in cfg.iter_mut() {
            ticker.risk = RiskCfg {
                max_order_size: 100,
                max_position,
                max_loss: -1_000_000.0,
            };
        }
        (
            OrderManager::new(7, tx),
            rx,
            PositionKeeper::new(),
            RiskManager::new(&cfg),
        )
    }

    #[test]
    fn quotes_both_sides_from_rest() {
        let (mut orders, mut rx, positions, risk) = harness(50);
        orders.move_orders(&positions, &risk, 0, 99, 101, 10);

        let sent: Vec<ClientRequest> = std::iter::from_fn(|| rx.pop()).collect();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].kind, ClientRequestKind::New);
        assert_eq!(sent[0].side, Side::Buy);
        assert_eq!(sent[0].price, 99);
        assert_eq!(sent[0].order_id, 1);
        assert_eq!(sent[1].side, Side::Sell);
        assert_eq!(sent[1].order_id, 2);

        assert_eq!(orders.order(0, Side::Buy).state, OmOrderState::PendingNew);
    }

    #[test]
    fn pending_orders_are_left_alone() {
        let (mut orders, mut rx, positions, risk) = harness(50);
        orders.move_orders(&positions, &risk, 0, 99, 101, 10);
        std::iter::from_fn(|| rx.pop()).count();

        // Still pending; a new target must not produce traffic.
        orders.move_orders(&positions, &risk, 0, 98, 102, 10);
        assert!(rx.pop().is_none());
    }

    #[test]
    fn live_order_at_wrong_price_is_cancelled_then_requoted() {
        let (mut orders, mut rx, positions, risk) = harness(50);
        orders.move_orders(&positions, &risk, 0, 99, PRICE_INVALID, 10);
        let new = rx.pop().unwrap();

        orders.on_order_update(&ClientResponse {
            kind: ClientResponseKind::Accepted,
            ticker_id: 0,
            client_order_id: new.order_id,
            side: Side::Buy,
            price: 99,
            ..ClientResponse::default()
        });
        assert_eq!(orders.order(0, Side::Buy).state, OmOrderState::Live);

        // Target moves: live order is cancelled first.
        orders.move_orders(&positions, &risk, 0, 98, PRICE_INVALID, 10);
        let cancel = rx.pop().unwrap();
        assert_eq!(cancel.kind, ClientRequestKind::Cancel);
        assert_eq!(cancel.order_id, new.order_id);
        assert_eq!(orders.order(0, Side::Buy).state, OmOrderState::PendingCancel);

        // Cancel ack lands; the next move requotes at the new price.
        orders.on_order_update(&ClientResponse {
            kind: ClientResponseKind::Canceled,
            ticker_id: 0,
            side: Side::Buy,
            ..ClientResponse::default()
        });
        orders.move_orders(&positions, &risk, 0, 98, PRICE_INVALID, 10);
        let requote = rx.pop().unwrap();
        assert_eq!(requote.kind, ClientRequestKind::New);
        assert_eq!(requote.price, 98);
    }

    #[test]
    fn full_fill_frees_the_slot() {
        let (mut orders, mut rx, positions, risk) = harness(50);
        orders.move_orders(&positions, &risk, 0, 99, PRICE_INVALID, 10);
        rx.pop().unwrap();

        orders.on_order_update(&ClientResponse {
            kind: ClientResponseKind::Filled,
            ticker_id: 0,
            side: Side::Buy,
            exec_qty: 10,
            leaves_qty: 0,
            ..ClientResponse::default()
        });
        assert_eq!(orders.order(0, Side::Buy).state, OmOrderState::Dead);
    }

    #[test]
    fn risk_block_suppresses_the_order() {
        let (mut orders, mut rx, positions, risk) = harness(5);
        // clip 10 > max_position 5.
        orders.move_orders(&positions, &risk, 0, 99, PRICE_INVALID, 10);
        assert!(rx.pop().is_none());
        assert_eq!(orders.order(0, Side::Buy).state, OmOrderState::Invalid);
    }
}

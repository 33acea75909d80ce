//! In-process message payloads
//!
//! These are the elements carried on the SPSC rings between stages. They use
//! the real enum types; the packed byte-for-byte forms that cross sockets
//! live in [`super::wire`].

use crate::core::*;
use std::fmt;

/// What a participant asks the exchange to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum ClientRequestKind {
    #[default]
    Invalid = 0,
    New = 1,
    Cancel = 2,
}

impl ClientRequestKind {
    #[inline(always)]
    pub const fn from_raw(raw: u8) -> Self {
        match raw {
            1 => ClientRequestKind::New,
            2 => ClientRequestKind::Cancel,
            _ => ClientRequestKind::Invalid,
        }
    }
}

impl fmt::Display for ClientRequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientRequestKind::New => write!(f, "NEW"),
            ClientRequestKind::Cancel => write!(f, "CANCEL"),
            ClientRequestKind::Invalid => write!(f, "INVALID"),
        }
    }
}

/// How the exchange answered a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum ClientResponseKind {
    #[default]
    Invalid = 0,
    Accepted = 1,
    Canceled = 2,
    Filled = 3,
    CancelRejected = 4,
}

impl ClientResponseKind {
    #[inline(always)]
    pub const fn from_raw(raw: u8) -> Self {
        match raw {
            1 => ClientResponseKind::Accepted,
            2 => ClientResponseKind::Canceled,
            3 => ClientResponseKind::Filled,
            4 => ClientResponseKind::CancelRejected,
            _ => ClientResponseKind::Invalid,
        }
    }
}

impl fmt::Display for ClientResponseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientResponseKind::Accepted => write!(f, "ACCEPTED"),
            ClientResponseKind::Canceled => write!(f, "CANCELED"),
            ClientResponseKind::Filled => write!(f, "FILLED"),
            ClientResponseKind::CancelRejected => write!(f, "CANCEL_REJECTED"),
            ClientResponseKind::Invalid => write!(f, "INVALID"),
        }
    }
}

/// Event kinds on the public market-data streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum MarketUpdateKind {
    #[default]
    Invalid = 0,
    Clear = 1,
    Add = 2,
    Modify = 3,
    Cancel = 4,
    Trade = 5,
    SnapshotStart = 6,
    SnapshotEnd = 7,
}

impl MarketUpdateKind {
    #[inline(always)]
    pub const fn from_raw(raw: u8) -> Self {
        match raw {
            1 => MarketUpdateKind::Clear,
            2 => MarketUpdateKind::Add,
            3 => MarketUpdateKind::Modify,
            4 => MarketUpdateKind::Cancel,
            5 => MarketUpdateKind::Trade,
            6 => MarketUpdateKind::SnapshotStart,
            7 => MarketUpdateKind::SnapshotEnd,
            _ => MarketUpdateKind::Invalid,
        }
    }
}

impl fmt::Display for MarketUpdateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarketUpdateKind::Clear => write!(f, "CLEAR"),
            MarketUpdateKind::Add => write!(f, "ADD"),
            MarketUpdateKind::Modify => write!(f, "MODIFY"),
            MarketUpdateKind::Cancel => write!(f, "CANCEL"),
            MarketUpdateKind::Trade => write!(f, "TRADE"),
            MarketUpdateKind::SnapshotStart => write!(f, "SNAPSHOT_START"),
            MarketUpdateKind::SnapshotEnd => write!(f, "SNAPSHOT_END"),
            MarketUpdateKind::Invalid => write!(f, "INVALID"),
        }
    }
}

/// A participant order instruction, as consumed by the matching engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientRequest {
    pub kind: ClientRequestKind,
    pub client_id: ClientId,
    pub ticker_id: TickerId,
    pub order_id: OrderId,
    pub side: Side,
    pub price: Price,
    pub qty: Qty,
}

impl Default for ClientRequest {
    fn default() -> Self {
        Self {
            kind: ClientRequestKind::Invalid,
            client_id: CLIENT_ID_INVALID,
            ticker_id: TICKER_ID_INVALID,
            order_id: ORDER_ID_INVALID,
            side: Side::Invalid,
            price: PRICE_INVALID,
            qty: QTY_INVALID,
        }
    }
}

impl fmt::Display for ClientRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ClientRequest[{} client:{} ticker:{} oid:{} side:{} qty:{} price:{}]",
            self.kind, self.client_id, self.ticker_id, self.order_id, self.side, self.qty, self.price
        )
    }
}

/// The matching engine's answer to one client, keyed by both the client's
/// own order id and the exchange-assigned market order id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientResponse {
    pub kind: ClientResponseKind,
    pub client_id: ClientId,
    pub ticker_id: TickerId,
    pub client_order_id: OrderId,
    pub market_order_id: OrderId,
    pub side: Side,
    pub price: Price,
    pub exec_qty: Qty,
    pub leaves_qty: Qty,
}

impl Default for ClientResponse {
    fn default() -> Self {
        Self {
            kind: ClientResponseKind::Invalid,
            client_id: CLIENT_ID_INVALID,
            ticker_id: TICKER_ID_INVALID,
            client_order_id: ORDER_ID_INVALID,
            market_order_id: ORDER_ID_INVALID,
            side: Side::Invalid,
            price: PRICE_INVALID,
            exec_qty: QTY_INVALID,
            leaves_qty: QTY_INVALID,
        }
    }
}

impl fmt::Display for ClientResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ClientResponse[{} client:{} ticker:{} coid:{} moid:{} side:{} exec:{} leaves:{} price:{}]",
            self.kind,
            self.client_id,
            self.ticker_id,
            self.client_order_id,
            self.market_order_id,
            self.side,
            self.exec_qty,
            self.leaves_qty,
            self.price
        )
    }
}

/// One event on the public market-data stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarketUpdate {
    pub kind: MarketUpdateKind,
    pub order_id: OrderId,
    pub ticker_id: TickerId,
    pub side: Side,
    pub price: Price,
    pub qty: Qty,
    pub priority: Priority,
}

impl Default for MarketUpdate {
    fn default() -> Self {
        Self {
            kind: MarketUpdateKind::Invalid,
            order_id: ORDER_ID_INVALID,
            ticker_id: TICKER_ID_INVALID,
            side: Side::Invalid,
            price: PRICE_INVALID,
            qty: QTY_INVALID,
            priority: PRIORITY_INVALID,
        }
    }
}

impl fmt::Display for MarketUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "MarketUpdate[{} ticker:{} oid:{} side:{} qty:{} price:{} prio:{}]",
            self.kind, self.ticker_id, self.order_id, self.side, self.qty, self.price, self.priority
        )
    }
}

/// A market update paired with its stream sequence number, as teed from the
/// publisher to the snapshot synthesiser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SeqMarketUpdate {
    pub seq: u64,
    pub update: MarketUpdate,
}

impl fmt::Display for SeqMarketUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SeqMarketUpdate[seq:{} {}]", self.seq, self.update)
    }
}

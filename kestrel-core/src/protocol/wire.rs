//! Binary wire format
//!
//! Little-endian, packed, `#[repr(C)]` with zerocopy for safe casts to and
//! from byte slices. One frame per message; receivers slice their inbound
//! buffers into frame-sized chunks and shift any tail fragment down.
//!
//! Enum-valued fields travel as raw bytes (`u8` kind, `i8` side) so every
//! bit pattern is a valid frame; decoding maps unknown values to the
//! `Invalid` variants.

use crate::core::*;
use crate::protocol::messages::*;
use zerocopy::{AsBytes, FromBytes, FromZeroes, Unaligned};

/// Order-gateway request frame (participant → exchange, TCP).
///
/// `seq` is the per-client gateway sequence, strictly increasing from 1.
#[repr(C, packed)]
#[derive(Clone, Copy, FromZeroes, FromBytes, AsBytes, Unaligned)]
pub struct RequestFrame {
    pub seq: u64,
    pub kind: u8,
    pub client_id: u32,
    pub ticker_id: u32,
    pub order_id: u64,
    pub side: i8,
    pub price: i64,
    pub qty: u32,
}

impl RequestFrame {
    pub const SIZE: usize = std::mem::size_of::<Self>();

    #[inline]
    pub fn new(seq: u64, request: &ClientRequest) -> Self {
        Self {
            seq,
            kind: request.kind as u8,
            client_id: request.client_id,
            ticker_id: request.ticker_id,
            order_id: request.order_id,
            side: request.side as i8,
            price: request.price,
            qty: request.qty,
        }
    }

    #[inline]
    pub fn request(&self) -> ClientRequest {
        ClientRequest {
            kind: ClientRequestKind::from_raw(self.kind),
            client_id: self.client_id,
            ticker_id: self.ticker_id,
            order_id: self.order_id,
            side: Side::from_raw(self.side),
            price: self.price,
            qty: self.qty,
        }
    }
}

/// Order-gateway response frame (exchange → participant, TCP).
#[repr(C, packed)]
#[derive(Clone, Copy, FromZeroes, FromBytes, AsBytes, Unaligned)]
pub struct ResponseFrame {
    pub seq: u64,
    pub kind: u8,
    pub client_id: u32,
    pub ticker_id: u32,
    pub client_order_id: u64,
    pub market_order_id: u64,
    pub side: i8,
    pub price: i64,
    pub exec_qty: u32,
    pub leaves_qty: u32,
}

impl ResponseFrame {
    pub const SIZE: usize = std::mem::size_of::<Self>();

    #[inline]
    pub fn new(seq: u64, response: &ClientResponse) -> Self {
        Self {
            seq,
            kind: response.kind as u8,
            client_id: response.client_id,
            ticker_id: response.ticker_id,
            client_order_id: response.client_order_id,
            market_order_id: response.market_order_id,
            side: response.side as i8,
            price: response.price,
            exec_qty: response.exec_qty,
            leaves_qty: response.leaves_qty,
        }
    }

    #[inline]
    pub fn response(&self) -> ClientResponse {
        ClientResponse {
            kind: ClientResponseKind::from_raw(self.kind),
            client_id: self.client_id,
            ticker_id: self.ticker_id,
            client_order_id: self.client_order_id,
            market_order_id: self.market_order_id,
            side: Side::from_raw(self.side),
            price: self.price,
            exec_qty: self.exec_qty,
            leaves_qty: self.leaves_qty,
        }
    }
}

/// Market-data frame (exchange → multicast groups, UDP).
///
/// On the incremental stream `seq` is monotone across all tickers; on the
/// snapshot stream it restarts at 0 for each snapshot, and the
/// SNAPSHOT_START / SNAPSHOT_END records carry the bridging incremental
/// sequence in `order_id`.
#[repr(C, packed)]
#[derive(Clone, Copy, FromZeroes, FromBytes, AsBytes, Unaligned)]
pub struct MarketDataFrame {
    pub seq: u64,
    pub kind: u8,
    pub order_id: u64,
    pub ticker_id: u32,
    pub side: i8,
    pub price: i64,
    pub qty: u32,
    pub priority: u64,
}

impl MarketDataFrame {
    pub const SIZE: usize = std::mem::size_of::<Self>();

    #[inline]
    pub fn new(seq: u64, update: &MarketUpdate) -> Self {
        Self {
            seq,
            kind: update.kind as u8,
            order_id: update.order_id,
            ticker_id: update.ticker_id,
            side: update.side as i8,
            price: update.price,
            qty: update.qty,
            priority: update.priority,
        }
    }

    #[inline]
    pub fn update(&self) -> MarketUpdate {
        MarketUpdate {
            kind: MarketUpdateKind::from_raw(self.kind),
            order_id: self.order_id,
            ticker_id: self.ticker_id,
            side: Side::from_raw(self.side),
            price: self.price,
            qty: self.qty,
            priority: self.priority,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_sizes_are_packed() {
        assert_eq!(RequestFrame::SIZE, 8 + 1 + 4 + 4 + 8 + 1 + 8 + 4);
        assert_eq!(ResponseFrame::SIZE, 8 + 1 + 4 + 4 + 8 + 8 + 1 + 8 + 4 + 4);
        assert_eq!(MarketDataFrame::SIZE, 8 + 1 + 8 + 4 + 1 + 8 + 4 + 8);
    }

    #[test]
    fn request_round_trips_through_bytes() {
        let request = ClientRequest {
            kind: ClientRequestKind::New,
            client_id: 7,
            ticker_id: 3,
            order_id: 42,
            side: Side::Sell,
            price: -5,
            qty: 100,
        };
        let frame = RequestFrame::new(9, &request);
        let parsed = RequestFrame::read_from(frame.as_bytes()).unwrap();
        let seq = parsed.seq;
        assert_eq!(seq, 9);
        assert_eq!(parsed.request(), request);
    }

    #[test]
    fn unknown_enum_bytes_decode_as_invalid() {
        let mut bytes = [0u8; MarketDataFrame::SIZE];
        bytes[8] = 0xff; // kind
        let frame = MarketDataFrame::read_from(&bytes[..]).unwrap();
        let update = frame.update();
        assert_eq!(update.kind, MarketUpdateKind::Invalid);
        assert_eq!(update.side, Side::Invalid);
    }

    #[test]
    fn snapshot_frames_carry_bridge_sequence_in_order_id() {
        let start = MarketUpdate {
            kind: MarketUpdateKind::SnapshotStart,
            order_id: 512,
            ..MarketUpdate::default()
        };
        let frame = MarketDataFrame::new(0, &start);
        let parsed = MarketDataFrame::read_from(frame.as_bytes()).unwrap();
        assert_eq!(parsed.update().order_id, 512);
        let seq = parsed.seq;
        assert_eq!(seq, 0);
    }
}

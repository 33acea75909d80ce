//! Core domain types for the trading plant
//!
//! All identifiers are fixed-width integers with a sentinel "invalid" value
//! equal to the type's maximum. Prices are integer ticks; quantities are
//! whole units. Nothing in this module allocates.

use std::fmt;
use std::str::FromStr;

/// Maximum number of instruments the plant trades.
pub const MAX_TICKERS: usize = 8;

/// Maximum number of connected participants.
pub const MAX_CLIENTS: usize = 256;

/// Maximum number of live order ids per book.
pub const MAX_ORDER_IDS: usize = 1024 * 1024;

/// Maximum number of simultaneously live price levels per book side pair.
pub const MAX_PRICE_LEVELS: usize = 256;

/// Capacity of the client request/response rings.
pub const MAX_CLIENT_UPDATES: usize = 256 * 1024;

/// Capacity of the market update rings.
pub const MAX_MARKET_UPDATES: usize = 256 * 1024;

/// Maximum ingress requests buffered by the FIFO sequencer in one poll round.
pub const MAX_PENDING_SEQ: usize = 1024;

pub type OrderId = u64;
pub const ORDER_ID_INVALID: OrderId = OrderId::MAX;

pub type TickerId = u32;
pub const TICKER_ID_INVALID: TickerId = TickerId::MAX;

pub type ClientId = u32;
pub const CLIENT_ID_INVALID: ClientId = ClientId::MAX;

pub type Price = i64;
pub const PRICE_INVALID: Price = Price::MAX;

pub type Qty = u32;
pub const QTY_INVALID: Qty = Qty::MAX;

pub type Priority = u64;
pub const PRIORITY_INVALID: Priority = Priority::MAX;

/// Nanoseconds since the Unix epoch.
pub type Nanos = u64;

/// Order side. The discriminants are the signed position multipliers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(i8)]
pub enum Side {
    #[default]
    Invalid = 0,
    Buy = 1,
    Sell = -1,
}

impl Side {
    /// Decode a wire byte; anything unrecognised maps to `Invalid`.
    #[inline(always)]
    pub const fn from_raw(raw: i8) -> Self {
        match raw {
            1 => Side::Buy,
            -1 => Side::Sell,
            _ => Side::Invalid,
        }
    }

    /// Signed multiplier applied to fills when updating a position.
    #[inline(always)]
    pub const fn value(self) -> i64 {
        self as i64
    }

    #[inline(always)]
    pub const fn opposite(self) -> Self {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
            Side::Invalid => Side::Invalid,
        }
    }

    /// Index into two-element per-side tables. Must not be called on `Invalid`.
    #[inline(always)]
    pub fn index(self) -> usize {
        match self {
            Side::Buy => 0,
            Side::Sell => 1,
            Side::Invalid => unreachable!("side table indexed with invalid side"),
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => write!(f, "BUY"),
            Side::Sell => write!(f, "SELL"),
            Side::Invalid => write!(f, "INVALID"),
        }
    }
}

/// Which trading algorithm a participant runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlgoType {
    Random,
    Maker,
    Taker,
}

impl fmt::Display for AlgoType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlgoType::Random => write!(f, "RANDOM"),
            AlgoType::Maker => write!(f, "MAKER"),
            AlgoType::Taker => write!(f, "TAKER"),
        }
    }
}

impl FromStr for AlgoType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "RANDOM" => Ok(AlgoType::Random),
            "MAKER" => Ok(AlgoType::Maker),
            "TAKER" => Ok(AlgoType::Taker),
            other => Err(format!("unknown algo type '{other}'")),
        }
    }
}

/// Pre-trade risk limits for one instrument.
#[derive(Debug, Clone, Copy, Default)]
pub struct RiskCfg {
    pub max_order_size: Qty,
    pub max_position: Qty,
    pub max_loss: f64,
}

impl fmt::Display for RiskCfg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "RiskCfg{{max-order-size:{} max-position:{} max-loss:{}}}",
            self.max_order_size, self.max_position, self.max_loss
        )
    }
}

/// Per-instrument strategy parameters: quote size and signal threshold,
/// plus the risk limits the order manager enforces.
#[derive(Debug, Clone, Copy, Default)]
pub struct TickerCfg {
    pub clip: Qty,
    pub threshold: f64,
    pub risk: RiskCfg,
}

impl fmt::Display for TickerCfg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "TickerCfg{{clip:{} thresh:{} risk:{}}}",
            self.clip, self.threshold, self.risk
        )
    }
}

pub type TickerCfgMap = [TickerCfg; MAX_TICKERS];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn side_round_trips_through_raw() {
        for side in [Side::Buy, Side::Sell, Side::Invalid] {
            assert_eq!(Side::from_raw(side as i8), side);
        }
        assert_eq!(Side::from_raw(42), Side::Invalid);
    }

    #[test]
    fn side_value_is_position_multiplier() {
        assert_eq!(Side::Buy.value(), 1);
        assert_eq!(Side::Sell.value(), -1);
        assert_eq!(Side::Buy.opposite(), Side::Sell);
    }

    #[test]
    fn algo_type_parses() {
        assert_eq!("MAKER".parse::<AlgoType>().unwrap(), AlgoType::Maker);
        assert_eq!("TAKER".parse::<AlgoType>().unwrap(), AlgoType::Taker);
        assert_eq!("RANDOM".parse::<AlgoType>().unwrap(), AlgoType::Random);
        assert!("maker".parse::<AlgoType>().is_err());
    }
}

//! Position keeper
//!
//! Tracks the signed position, traded volume, per-side open VWAP
//! accumulators, and realized / unrealized / total PnL per instrument.
//! Fills mutate the position; BBO updates re-mark the unrealized leg to
//! mid. Prices are ticks, PnL is kept in floating point.

use crate::core::*;
use crate::protocol::ClientResponse;
use crate::trading::book::Bbo;
use std::fmt;
use tracing::debug;

#[derive(Debug, Clone, Copy)]
pub struct PositionInfo {
    pub position: i64,
    pub real_pnl: f64,
    pub unreal_pnl: f64,
    pub total_pnl: f64,
    pub volume: Qty,
    /// Open VWAP accumulators, price × qty, indexed by [`Side::index`].
    open_vwap: [f64; 2],
    bbo: Bbo,
}

impl Default for PositionInfo {
    fn default() -> Self {
        Self {
            position: 0,
            real_pnl: 0.0,
            unreal_pnl: 0.0,
            total_pnl: 0.0,
            volume: 0,
            open_vwap: [0.0; 2],
            bbo: Bbo::default(),
        }
    }
}

impl fmt::Display for PositionInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Position{{pos:{} u-pnl:{} r-pnl:{} t-pnl:{} vol:{} {}}}",
            self.position, self.unreal_pnl, self.real_pnl, self.total_pnl, self.volume, self.bbo
        )
    }
}

impl PositionInfo {
    /// Fold one fill into the position.
    ///
    /// A fill in the direction of the current position extends the open
    /// VWAP; a fill against it realizes PnL against the opposite side's
    /// VWAP, and flipping through flat restarts the open side at the fill
    /// price.
    pub fn add_fill(&mut self, response: &ClientResponse) {
        let old_position = self.position;
        let side_index = response.side.index();
        let opp_index = response.side.opposite().index();
        let side_value = response.side.value();
        let exec_qty = response.exec_qty as i64;
        let price = response.price as f64;

        self.position += exec_qty * side_value;
        self.volume += response.exec_qty;

        if old_position * side_value >= 0 {
            // Opened or increased.
            self.open_vwap[side_index] += price * exec_qty as f64;
        } else {
            // Decreased.
            let opp_vwap = self.open_vwap[opp_index] / old_position.abs() as f64;
            self.open_vwap[opp_index] = opp_vwap * self.position.abs() as f64;
            self.real_pnl += exec_qty.min(old_position.abs()) as f64
                * (opp_vwap - price)
                * side_value as f64;
            if self.position * old_position < 0 {
                // Flipped through flat.
                self.open_vwap[side_index] = price * self.position.abs() as f64;
                self.open_vwap[opp_index] = 0.0;
            }
        }

        if self.position == 0 {
            self.open_vwap = [0.0; 2];
            self.unreal_pnl = 0.0;
        } else if self.position > 0 {
            self.unreal_pnl = (price
                - self.open_vwap[Side::Buy.index()] / self.position.abs() as f64)
                * self.position.abs() as f64;
        } else {
            self.unreal_pnl = (self.open_vwap[Side::Sell.index()] / self.position.abs() as f64
                - price)
                * self.position.abs() as f64;
        }

        self.total_pnl = self.unreal_pnl + self.real_pnl;
        debug!("{self} after {response}");
    }

    /// Re-mark the unrealized leg to the new mid.
    pub fn update_bbo(&mut self, bbo: &Bbo) {
        self.bbo = *bbo;

        if self.position == 0 || !bbo.is_valid() {
            return;
        }
        let mid = (bbo.bid_price + bbo.ask_price) as f64 * 0.5;
        if self.position > 0 {
            self.unreal_pnl = (mid - self.open_vwap[Side::Buy.index()] / self.position.abs() as f64)
                * self.position.abs() as f64;
        } else {
            self.unreal_pnl = (self.open_vwap[Side::Sell.index()] / self.position.abs() as f64
                - mid)
                * self.position.abs() as f64;
        }

        let old_total = self.total_pnl;
        self.total_pnl = self.unreal_pnl + self.real_pnl;
        if self.total_pnl != old_total {
            debug!("{self} {bbo}");
        }
    }
}

/// Per-ticker positions for one participant.
#[derive(Default)]
pub struct PositionKeeper {
    positions: [PositionInfo; MAX_TICKERS],
}

impl PositionKeeper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_fill(&mut self, response: &ClientResponse) {
        self.positions[response.ticker_id as usize].add_fill(response);
    }

    pub fn update_bbo(&mut self, ticker_id: TickerId, bbo: &Bbo) {
        self.positions[ticker_id as usize].update_bbo(bbo);
    }

    pub fn position_info(&self, ticker_id: TickerId) -> &PositionInfo {
        &self.positions[ticker_id as usize]
    }

    pub fn total_pnl(&self) -> f64 {
        self.positions.iter().map(|p| p.total_pnl).sum()
    }

    pub fn total_volume(&self) -> Qty {
        self.positions.iter().map(|p| p.volume).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::ClientResponseKind;

    fn fill(side: Side, price: Price, exec_qty: Qty) -> ClientResponse {
        ClientResponse {
            kind: ClientResponseKind::Filled,
            ticker_id: 0,
            side,
            price,
            exec_qty,
            ..ClientResponse::default()
        }
    }

    #[test]
    fn buy_then_sell_realizes_the_spread() {
        let mut info = PositionInfo::default();
        info.add_fill(&fill(Side::Buy, 100, 5));
        assert_eq!(info.position, 5);
        assert_eq!(info.volume, 5);

        info.add_fill(&fill(Side::Sell, 110, 5));
        assert_eq!(info.position, 0);
        assert!((info.real_pnl - 50.0).abs() < 1e-9);
        assert_eq!(info.unreal_pnl, 0.0);
        assert!((info.total_pnl - 50.0).abs() < 1e-9);
    }

    #[test]
    fn partial_close_keeps_remaining_vwap() {
        let mut info = PositionInfo::default();
        info.add_fill(&fill(Side::Buy, 100, 5));
        info.add_fill(&fill(Side::Sell, 110, 3));

        assert_eq!(info.position, 2);
        assert!((info.real_pnl - 30.0).abs() < 1e-9);
        // Remaining 2 lots marked at the 110 fill price against 100 VWAP.
        assert!((info.unreal_pnl - 20.0).abs() < 1e-9);
    }

    #[test]
    fn flip_restarts_open_vwap_at_fill_price() {
        let mut info = PositionInfo::default();
        info.add_fill(&fill(Side::Buy, 100, 2));
        info.add_fill(&fill(Side::Sell, 110, 5));

        assert_eq!(info.position, -3);
        assert!((info.real_pnl - 20.0).abs() < 1e-9);
        // Short leg opened at 110: no unrealized PnL at the same price.
        assert!(info.unreal_pnl.abs() < 1e-9);
    }

    #[test]
    fn bbo_update_marks_to_mid() {
        let mut info = PositionInfo::default();
        info.add_fill(&fill(Side::Buy, 100, 4));

        let bbo = Bbo {
            bid_price: 105,
            bid_qty: 1,
            ask_price: 107,
            ask_qty: 1,
        };
        info.update_bbo(&bbo);
        // Mid 106 against VWAP 100 on 4 lots.
        assert!((info.unreal_pnl - 24.0).abs() < 1e-9);
        assert!((info.total_pnl - 24.0).abs() < 1e-9);
    }

    #[test]
    fn keeper_routes_by_ticker() {
        let mut keeper = PositionKeeper::new();
        let mut response = fill(Side::Buy, 100, 1);
        response.ticker_id = 3;
        keeper.add_fill(&response);
        assert_eq!(keeper.position_info(3).position, 1);
        assert_eq!(keeper.position_info(0).position, 0);
        assert_eq!(keeper.total_volume(), 1);
    }
}

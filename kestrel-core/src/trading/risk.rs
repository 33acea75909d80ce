//! Pre-trade risk checks
//!
//! Gates every order the order manager wants to send: order size, the
//! position the fill would produce, and the running loss, each against the
//! per-ticker limits from the participant's configuration.

use crate::core::*;
use crate::trading::position::PositionKeeper;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RiskCheck {
    Allowed,
    OrderTooLarge,
    PositionTooLarge,
    LossTooLarge,
}

impl fmt::Display for RiskCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskCheck::Allowed => write!(f, "ALLOWED"),
            RiskCheck::OrderTooLarge => write!(f, "ORDER_TOO_LARGE"),
            RiskCheck::PositionTooLarge => write!(f, "POSITION_TOO_LARGE"),
            RiskCheck::LossTooLarge => write!(f, "LOSS_TOO_LARGE"),
        }
    }
}

pub struct RiskManager {
    ticker_risk: [RiskCfg; MAX_TICKERS],
}

impl RiskManager {
    pub fn new(ticker_cfg: &TickerCfgMap) -> Self {
        let mut ticker_risk = [RiskCfg::default(); MAX_TICKERS];
        for (risk, cfg) in ticker_risk.iter_mut().zip(ticker_cfg.iter()) {
            *risk = cfg.risk;
        }
        Self { ticker_risk }
    }

    pub fn check_pre_trade(
        &self,
        positions: &PositionKeeper,
        ticker_id: TickerId,
        side: Side,
        qty: Qty,
    ) -> RiskCheck {
        let cfg = &self.ticker_risk[ticker_id as usize];
        let info = positions.position_info(ticker_id);

        if qty > cfg.max_order_size {
            return RiskCheck::OrderTooLarge;
        }
        if (info.position + side.value() * qty as i64).abs() > cfg.max_position as i64 {
            return RiskCheck::PositionTooLarge;
        }
        if info.total_pnl < cfg.max_loss {
            return RiskCheck::LossTooLarge;
        }

        RiskCheck::Allowed
    }
}

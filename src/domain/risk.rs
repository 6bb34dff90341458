//! Per-position risk state: volatility stop, trailing ratchet and profit
//! target.

use crate::domain::position::{ExitReason, Side};

/// Stop and target prices for one open position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiskState {
    pub stop_price: Option<f64>,
    pub take_price: Option<f64>,
}

/// Multipliers shared by every position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiskParams {
    pub risk_multiplier: f64,
    pub profit_target_pct: f64,
}

impl RiskState {
    /// Stop sits `volatility * risk_multiplier` behind the entry; target sits
    /// `profit_target_pct` beyond it.
    pub fn on_entry(side: Side, close: f64, volatility: f64, params: &RiskParams) -> Self {
        let offset = volatility * params.risk_multiplier;
        let (stop, take) = match side {
            Side::Long => (close - offset, close * (1.0 + params.profit_target_pct)),
            Side::Short => (close + offset, close * (1.0 - params.profit_target_pct)),
        };
        RiskState {
            stop_price: Some(stop),
            take_price: Some(take),
        }
    }

    pub fn is_defined(&self) -> bool {
        self.stop_price.is_some() || self.take_price.is_some()
    }

    /// Ratchet the stop toward price. A long stop only rises, a short stop
    /// only falls.
    pub fn trail(&self, side: Side, close: f64, volatility: f64, params: &RiskParams) -> Self {
        let offset = volatility * params.risk_multiplier;
        let stop_price = match side {
            Side::Long => {
                let candidate = close - offset;
                self.stop_price.unwrap_or(candidate).max(candidate)
            }
            Side::Short => {
                let candidate = close + offset;
                self.stop_price.unwrap_or(candidate).min(candidate)
            }
        };
        RiskState {
            stop_price: Some(stop_price),
            take_price: self.take_price,
        }
    }

    /// Stop is checked before the target, so it wins when both trigger.
    pub fn exit_reason(&self, side: Side, close: f64) -> Option<ExitReason> {
        let (stop_hit, take_hit) = match side {
            Side::Long => (
                self.stop_price.is_some_and(|s| close <= s),
                self.take_price.is_some_and(|t| close >= t),
            ),
            Side::Short => (
                self.stop_price.is_some_and(|s| close >= s),
                self.take_price.is_some_and(|t| close <= t),
            ),
        };

        if stop_hit {
            Some(ExitReason::StopLoss)
        } else if take_hit {
            Some(ExitReason::TakeProfit)
        } else {
            None
        }
    }
}

//! Trend-breakout strategy: parameters, per-instrument state and the pure
//! per-bar decision function.
//!
//! [`step`] takes one instrument's close, its indicator snapshot, its current
//! state and the equity to size against, and returns the state it would move
//! to together with the order that transition needs. The caller applies the
//! new state only once the order is accepted.

use crate::domain::error::TrendbreakError;
use crate::domain::indicator::IndicatorSnapshot;
use crate::domain::position::{ExitReason, Side};
use crate::domain::risk::{RiskParams, RiskState};
use crate::domain::signal::{evaluate_signal, EntryFilter, Signal};
use crate::domain::sizing::position_size;

#[derive(Debug, Clone, PartialEq)]
pub struct StrategyParams {
    pub trend_period: usize,
    pub band_period: usize,
    pub band_deviation: f64,
    pub momentum_period: usize,
    pub momentum_ceiling: f64,
    pub volatility_period: usize,
    pub volatility_min: f64,
    pub risk_multiplier: f64,
    pub profit_target_pct: f64,
    pub max_position_fraction: f64,
}

impl Default for StrategyParams {
    fn default() -> Self {
        StrategyParams {
            trend_period: 20,
            band_period: 20,
            band_deviation: 2.0,
            momentum_period: 14,
            momentum_ceiling: 70.0,
            volatility_period: 14,
            volatility_min: 0.5,
            risk_multiplier: 0.5,
            profit_target_pct: 0.2,
            max_position_fraction: 0.05,
        }
    }
}

fn invalid(key: &str, reason: &str) -> TrendbreakError {
    TrendbreakError::ConfigInvalid {
        section: "strategy".to_string(),
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

impl StrategyParams {
    /// Reject parameter sets the engine cannot run with. Called before any
    /// bar is processed so nothing is re-checked per bar.
    pub fn validate(&self) -> Result<(), TrendbreakError> {
        let periods = [
            ("trend_period", self.trend_period),
            ("band_period", self.band_period),
            ("momentum_period", self.momentum_period),
            ("volatility_period", self.volatility_period),
        ];
        for (key, period) in periods {
            if period == 0 {
                return Err(invalid(key, "period must be positive"));
            }
        }

        if !(self.band_deviation > 0.0 && self.band_deviation.is_finite()) {
            return Err(invalid("band_deviation", "band_deviation must be positive"));
        }
        if !(self.momentum_ceiling > 0.0 && self.momentum_ceiling <= 100.0) {
            return Err(invalid(
                "momentum_ceiling",
                "momentum_ceiling must be in (0, 100]",
            ));
        }
        if !(self.volatility_min >= 0.0 && self.volatility_min.is_finite()) {
            return Err(invalid(
                "volatility_min",
                "volatility_min must be non-negative",
            ));
        }
        if !(self.risk_multiplier > 0.0 && self.risk_multiplier.is_finite()) {
            return Err(invalid("risk_multiplier", "risk_multiplier must be positive"));
        }
        if !(self.profit_target_pct > 0.0 && self.profit_target_pct < 1.0) {
            return Err(invalid(
                "profit_target_pct",
                "profit_target_pct must be in (0, 1)",
            ));
        }
        if !(self.max_position_fraction > 0.0 && self.max_position_fraction <= 1.0) {
            return Err(invalid(
                "max_position_fraction",
                "max_position_fraction must be in (0, 1]",
            ));
        }
        Ok(())
    }

    pub fn entry_filter(&self) -> EntryFilter {
        EntryFilter {
            volatility_min: self.volatility_min,
            momentum_ceiling: self.momentum_ceiling,
        }
    }

    pub fn risk_params(&self) -> RiskParams {
        RiskParams {
            risk_multiplier: self.risk_multiplier,
            profit_target_pct: self.profit_target_pct,
        }
    }

    /// Volatility reading usable this bar, or `None` when the instrument
    /// must be skipped.
    fn usable_volatility(&self, snapshot: &IndicatorSnapshot) -> Option<f64> {
        snapshot.volatility.filter(|v| *v >= self.volatility_min)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OpenPosition {
    pub side: Side,
    pub quantity: u64,
    pub entry_price: f64,
    pub risk: RiskState,
}

/// Engine-side state of one instrument. Risk state only exists inside an
/// open position.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum InstrumentState {
    #[default]
    Flat,
    Open(OpenPosition),
}

impl InstrumentState {
    pub fn is_flat(&self) -> bool {
        matches!(self, InstrumentState::Flat)
    }

    pub fn risk(&self) -> Option<&RiskState> {
        match self {
            InstrumentState::Flat => None,
            InstrumentState::Open(open) => Some(&open.risk),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Order {
    Open {
        side: Side,
        quantity: u64,
        price: f64,
    },
    Close {
        price: f64,
        reason: ExitReason,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Decision {
    pub state: InstrumentState,
    pub order: Option<Order>,
}

impl Decision {
    fn hold(state: InstrumentState) -> Self {
        Decision { state, order: None }
    }
}

/// Decide what one instrument does on one bar.
pub fn step(
    params: &StrategyParams,
    close: f64,
    snapshot: &IndicatorSnapshot,
    state: &InstrumentState,
    equity: f64,
) -> Decision {
    let Some(volatility) = params.usable_volatility(snapshot) else {
        return Decision::hold(*state);
    };

    match state {
        InstrumentState::Flat => {
            let side = match evaluate_signal(close, snapshot, &params.entry_filter()) {
                Signal::None => return Decision::hold(InstrumentState::Flat),
                Signal::EnterLong => Side::Long,
                Signal::EnterShort => Side::Short,
            };
            let quantity = position_size(equity, close, params.max_position_fraction);
            let risk = RiskState::on_entry(side, close, volatility, &params.risk_params());

            Decision {
                state: InstrumentState::Open(OpenPosition {
                    side,
                    quantity,
                    entry_price: close,
                    risk,
                }),
                order: Some(Order::Open {
                    side,
                    quantity,
                    price: close,
                }),
            }
        }
        InstrumentState::Open(open) => {
            let risk = open
                .risk
                .trail(open.side, close, volatility, &params.risk_params());

            match risk.exit_reason(open.side, close) {
                Some(reason) => Decision {
                    state: InstrumentState::Flat,
                    order: Some(Order::Close {
                        price: close,
                        reason,
                    }),
                },
                None => Decision::hold(InstrumentState::Open(OpenPosition { risk, ..*open })),
            }
        }
    }
}

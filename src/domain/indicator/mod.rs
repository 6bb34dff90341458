//! Technical indicators feeding the breakout strategy.
//!
//! Every calculation returns one `Option<f64>` (or [`Band`]) per input bar,
//! `None` until the indicator's warm-up completes. The engine only ever sees
//! the per-bar [`IndicatorSnapshot`].

pub mod atr;
pub mod bollinger;
pub mod ema;
pub mod rsi;
pub mod set;

/// Upper and lower volatility band around a moving average.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Band {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
}

/// Per-instrument, per-bar indicator readings. Any reading may be undefined
/// while its indicator is still warming up.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct IndicatorSnapshot {
    pub trend_ma: Option<f64>,
    pub band_upper: Option<f64>,
    pub band_lower: Option<f64>,
    pub momentum: Option<f64>,
    pub volatility: Option<f64>,
}

impl IndicatorSnapshot {
    /// True when every reading is defined.
    pub fn is_ready(&self) -> bool {
        self.trend_ma.is_some()
            && self.band_upper.is_some()
            && self.band_lower.is_some()
            && self.momentum.is_some()
            && self.volatility.is_some()
    }
}

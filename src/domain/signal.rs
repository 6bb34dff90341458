//! Entry signal evaluation for a flat instrument.
//!
//! Long entries need price above both the trend average and the upper band
//! with momentum below the ceiling. Short entries need price below both the
//! trend average and the lower band; the short side has no momentum filter.

use crate::domain::indicator::IndicatorSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    None,
    EnterLong,
    EnterShort,
}

/// Thresholds gating entries.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EntryFilter {
    pub volatility_min: f64,
    pub momentum_ceiling: f64,
}

pub fn evaluate_signal(close: f64, snapshot: &IndicatorSnapshot, filter: &EntryFilter) -> Signal {
    match snapshot.volatility {
        Some(v) if v >= filter.volatility_min => {}
        _ => return Signal::None,
    }

    let (Some(trend_ma), Some(band_upper), Some(band_lower), Some(momentum)) = (
        snapshot.trend_ma,
        snapshot.band_upper,
        snapshot.band_lower,
        snapshot.momentum,
    ) else {
        return Signal::None;
    };

    let long = close > trend_ma && close > band_upper && momentum < filter.momentum_ceiling;
    let short = close < trend_ma && close < band_lower;

    match (long, short) {
        (true, false) => Signal::EnterLong,
        (false, true) => Signal::EnterShort,
        _ => Signal::None,
    }
}

//! Precomputed indicator series per instrument, served as snapshots.

use std::collections::HashMap;

use super::atr::calculate_atr;
use super::bollinger::calculate_bollinger;
use super::ema::calculate_ema;
use super::rsi::calculate_rsi;
use super::{Band, IndicatorSnapshot};
use crate::domain::instrument::InstrumentData;
use crate::domain::strategy::StrategyParams;
use crate::ports::indicator_port::IndicatorPort;

#[derive(Debug, Clone)]
struct InstrumentSeries {
    trend: Vec<Option<f64>>,
    bands: Vec<Option<Band>>,
    momentum: Vec<Option<f64>>,
    volatility: Vec<Option<f64>>,
}

#[derive(Debug, Clone, Default)]
pub struct IndicatorSet {
    series: HashMap<String, InstrumentSeries>,
}

impl IndicatorSet {
    pub fn compute(instruments: &[InstrumentData], params: &StrategyParams) -> Self {
        let series = instruments
            .iter()
            .map(|inst| {
                let closes = inst.closes();
                let series = InstrumentSeries {
                    trend: calculate_ema(&closes, params.trend_period),
                    bands: calculate_bollinger(&closes, params.band_period, params.band_deviation),
                    momentum: calculate_rsi(&closes, params.momentum_period),
                    volatility: calculate_atr(&inst.bars, params.volatility_period),
                };
                (inst.code.clone(), series)
            })
            .collect();

        IndicatorSet { series }
    }

    /// Index of the first bar at which every indicator is defined.
    pub fn warmup_bars(params: &StrategyParams) -> usize {
        [
            params.trend_period.saturating_sub(1),
            params.band_period.saturating_sub(1),
            params.momentum_period,
            params.volatility_period.saturating_sub(1),
        ]
        .into_iter()
        .max()
        .unwrap_or(0)
    }
}

impl IndicatorPort for IndicatorSet {
    fn snapshot(&self, code: &str, bar_index: usize) -> Option<IndicatorSnapshot> {
        let series = self.series.get(code)?;
        let band = *series.bands.get(bar_index)?;
        Some(IndicatorSnapshot {
            trend_ma: *series.trend.get(bar_index)?,
            band_upper: band.map(|b| b.upper),
            band_lower: band.map(|b| b.lower),
            momentum: *series.momentum.get(bar_index)?,
            volatility: *series.volatility.get(bar_index)?,
        })
    }
}

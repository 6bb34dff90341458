//! Average True Range, the volatility measure behind entry filtering and
//! stop distances.
//!
//! True range of the first bar is high - low; after that it uses the previous
//! close. Seeded with the mean of the first n true ranges, then Wilder
//! smoothing. The first (n-1) bars are undefined.

use crate::domain::ohlcv::OhlcvBar;

pub fn calculate_atr(bars: &[OhlcvBar], period: usize) -> Vec<Option<f64>> {
    let mut values = vec![None; bars.len()];
    if period == 0 || bars.len() < period {
        return values;
    }

    let true_ranges: Vec<f64> = bars
        .iter()
        .enumerate()
        .map(|(i, bar)| {
            if i == 0 {
                bar.high - bar.low
            } else {
                bar.true_range(bars[i - 1].close)
            }
        })
        .collect();

    let mut atr = true_ranges[..period].iter().sum::<f64>() / period as f64;
    values[period - 1] = Some(atr);

    for (i, &tr) in true_ranges.iter().enumerate().skip(period) {
        atr = (atr * (period - 1) as f64 + tr) / period as f64;
        values[i] = Some(atr);
    }

    values
}

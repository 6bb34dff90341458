//! Bollinger Bands, the breakout boundary.
//!
//! Middle is the SMA over n closes; upper/lower sit `deviation` population
//! standard deviations away. The first (n-1) bars are undefined.

use super::Band;

pub fn calculate_bollinger(closes: &[f64], period: usize, deviation: f64) -> Vec<Option<Band>> {
    if period == 0 {
        return vec![None; closes.len()];
    }

    let warmup = period - 1;
    (0..closes.len())
        .map(|i| {
            if i < warmup {
                return None;
            }
            let window = &closes[i + 1 - period..=i];
            let middle = window.iter().sum::<f64>() / period as f64;
            let variance = window
                .iter()
                .map(|c| {
                    let diff = c - middle;
                    diff * diff
                })
                .sum::<f64>()
                / period as f64;
            let width = deviation * variance.sqrt();

            Some(Band {
                upper: middle + width,
                middle,
                lower: middle - width,
            })
        })
        .collect()
}

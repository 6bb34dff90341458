//! Position sizing against account equity.

/// floor(equity * max_fraction / price), never less than one unit.
///
/// `max_fraction` is validated to (0, 1] when the strategy is configured, so
/// it is not re-checked here.
pub fn position_size(equity: f64, price: f64, max_fraction: f64) -> u64 {
    let raw = (equity * max_fraction / price).floor();
    if raw.is_finite() && raw >= 1.0 {
        raw as u64
    } else {
        1
    }
}

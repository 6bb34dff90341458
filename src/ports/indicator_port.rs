//! Indicator provider port trait.

use crate::domain::indicator::IndicatorSnapshot;

pub trait IndicatorPort {
    /// Readings for `code` at its own bar index, or `None` when the
    /// instrument is unknown or the index is out of range.
    fn snapshot(&self, code: &str, bar_index: usize) -> Option<IndicatorSnapshot>;
}

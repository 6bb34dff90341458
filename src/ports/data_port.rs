//! Market data port trait.

use crate::domain::error::TrendbreakError;
use crate::domain::ohlcv::OhlcvBar;

pub trait DataPort {
    /// Bars for `code` in source order. `NoData` when the instrument has none.
    fn fetch_ohlcv(&self, code: &str) -> Result<Vec<OhlcvBar>, TrendbreakError>;

    fn list_symbols(&self) -> Result<Vec<String>, TrendbreakError>;
}

//! Report generation port trait.

use crate::domain::backtest::BacktestResult;
use crate::domain::error::TrendbreakError;
use std::path::Path;

/// Port for writing the executed-trade log of a run.
pub trait ReportPort {
    fn write(&self, result: &BacktestResult, output_path: &Path) -> Result<(), TrendbreakError>;
}

//! CSV trade log adapter implementing ReportPort.

use std::fs;
use std::path::Path;

use crate::domain::backtest::BacktestResult;
use crate::domain::error::TrendbreakError;
use crate::ports::report_port::ReportPort;

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const HEADER: [&str; 9] = [
    "code",
    "side",
    "quantity",
    "entry_time",
    "entry_price",
    "exit_time",
    "exit_price",
    "pnl",
    "exit_reason",
];

pub struct CsvReportAdapter;

impl CsvReportAdapter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for CsvReportAdapter {
    fn default() -> Self {
        Self::new()
    }
}

fn report_error(e: impl std::fmt::Display) -> TrendbreakError {
    TrendbreakError::Report {
        reason: e.to_string(),
    }
}

impl ReportPort for CsvReportAdapter {
    fn write(&self, result: &BacktestResult, output_path: &Path) -> Result<(), TrendbreakError> {
        if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let mut wtr = csv::Writer::from_path(output_path).map_err(report_error)?;
        wtr.write_record(HEADER).map_err(report_error)?;

        for trade in &result.closed_trades {
            wtr.write_record([
                trade.code.clone(),
                trade.side.to_string(),
                trade.quantity.to_string(),
                trade.entry_time.format(TIME_FORMAT).to_string(),
                format!("{:.4}", trade.entry_price),
                trade.exit_time.format(TIME_FORMAT).to_string(),
                format!("{:.4}", trade.exit_price),
                format!("{:.2}", trade.pnl),
                trade.reason.to_string(),
            ])
            .map_err(report_error)?;
        }

        wtr.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::position::{ClosedTrade, ExitReason, Side};
    use chrono::NaiveDate;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    fn sample_result() -> BacktestResult {
        let day = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
        BacktestResult {
            initial_capital: 100_000.0,
            final_equity: 100_100.0,
            closed_trades: vec![ClosedTrade {
                code: "AAPL".into(),
                side: Side::Short,
                quantity: 50,
                entry_price: 110.0,
                exit_price: 108.0,
                entry_time: day.and_hms_opt(10, 0, 0).unwrap(),
                exit_time: day.and_hms_opt(15, 30, 0).unwrap(),
                pnl: 100.0,
                reason: ExitReason::StopLoss,
            }],
            equity_curve: vec![],
            final_states: BTreeMap::new(),
            rejected_orders: 0,
        }
    }

    #[test]
    fn writes_header_and_trades() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out").join("trades.csv");

        CsvReportAdapter::new().write(&sample_result(), &path).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(
            lines[0],
            "code,side,quantity,entry_time,entry_price,exit_time,exit_price,pnl,exit_reason"
        );
        assert_eq!(
            lines[1],
            "AAPL,short,50,2024-03-04 10:00:00,110.0000,2024-03-04 15:30:00,108.0000,100.00,stop"
        );
        assert_eq!(lines.len(), 2);
    }

    #[test]
    fn empty_run_writes_header_only() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("trades.csv");
        let mut result = sample_result();
        result.closed_trades.clear();

        CsvReportAdapter::default().write(&result, &path).unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap().lines().count(), 1);
    }
}

#![allow(dead_code)]

use chrono::{Duration, NaiveDate, NaiveDateTime};
use std::collections::HashMap;
use trendbreak::domain::error::TrendbreakError;
pub use trendbreak::domain::ohlcv::OhlcvBar;
use trendbreak::ports::data_port::DataPort;

pub struct MockDataPort {
    pub data: HashMap<String, Vec<OhlcvBar>>,
    pub errors: HashMap<String, String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_bars(mut self, code: &str, bars: Vec<OhlcvBar>) -> Self {
        self.data.insert(code.to_string(), bars);
        self
    }

    pub fn with_error(mut self, code: &str, reason: &str) -> Self {
        self.errors.insert(code.to_string(), reason.to_string());
        self
    }
}

impl DataPort for MockDataPort {
    fn fetch_ohlcv(&self, code: &str) -> Result<Vec<OhlcvBar>, TrendbreakError> {
        if let Some(reason) = self.errors.get(code) {
            return Err(TrendbreakError::Data {
                code: code.to_string(),
                reason: reason.clone(),
            });
        }
        match self.data.get(code) {
            Some(bars) if !bars.is_empty() => Ok(bars.clone()),
            _ => Err(TrendbreakError::NoData {
                code: code.to_string(),
            }),
        }
    }

    fn list_symbols(&self) -> Result<Vec<String>, TrendbreakError> {
        let mut codes: Vec<String> = self.data.keys().cloned().collect();
        codes.sort();
        Ok(codes)
    }
}

/// Bar `i` of the shared hourly test clock.
pub fn hour(i: usize) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, 2)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
        + Duration::hours(i as i64)
}

pub fn make_bar(code: &str, i: usize, close: f64) -> OhlcvBar {
    OhlcvBar {
        code: code.to_string(),
        timestamp: hour(i),
        open: close - 1.0,
        high: close + 1.0,
        low: close - 2.0,
        close,
        volume: 1000,
    }
}

pub fn bars_from_closes(code: &str, closes: &[f64]) -> Vec<OhlcvBar> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| make_bar(code, i, close))
        .collect()
}

/// 100, 101, 100, 101, ... for `count` bars. Quiet enough that neither band
/// is ever crossed.
pub fn choppy_closes(count: usize) -> Vec<f64> {
    (0..count)
        .map(|i| if i % 2 == 0 { 100.0 } else { 101.0 })
        .collect()
}

/// Thirty choppy bars followed by `tail`.
pub fn choppy_then(tail: &[f64]) -> Vec<f64> {
    let mut closes = choppy_closes(30);
    closes.extend_from_slice(tail);
    closes
}

pub fn generate_bars(code: &str, count: usize, start_price: f64) -> Vec<OhlcvBar> {
    (0..count)
        .map(|i| make_bar(code, i, start_price + i as f64))
        .collect()
}

/// Render bars in the on-disk CSV layout.
pub fn bars_to_csv(bars: &[OhlcvBar]) -> String {
    let mut out = String::from("datetime,open,high,low,close,volume\n");
    for bar in bars {
        out.push_str(&format!(
            "{},{},{},{},{},{}\n",
            bar.timestamp.format("%Y-%m-%d %H:%M:%S"),
            bar.open,
            bar.high,
            bar.low,
            bar.close,
            bar.volume
        ));
    }
    out
}

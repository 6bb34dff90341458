//! Instrument bar sequences and the unified timeline shared by the loop.

use crate::domain::error::TrendbreakError;
use crate::domain::ohlcv::OhlcvBar;
use chrono::NaiveDateTime;
use std::collections::{BTreeSet, HashMap};

#[derive(Debug, Clone)]
pub struct InstrumentData {
    pub code: String,
    pub bars: Vec<OhlcvBar>,
    time_index: HashMap<NaiveDateTime, usize>,
}

impl InstrumentData {
    /// Bars must be strictly increasing in time and carry finite prices.
    pub fn new(code: impl Into<String>, bars: Vec<OhlcvBar>) -> Result<Self, TrendbreakError> {
        let code = code.into();

        for pair in bars.windows(2) {
            if pair[1].timestamp <= pair[0].timestamp {
                return Err(TrendbreakError::Data {
                    code,
                    reason: format!(
                        "bars out of order or duplicated at {}",
                        pair[1].timestamp
                    ),
                });
            }
        }
        if let Some(bar) = bars
            .iter()
            .find(|b| !(b.close.is_finite() && b.close > 0.0 && b.high >= b.low))
        {
            return Err(TrendbreakError::Data {
                code,
                reason: format!("invalid prices at {}", bar.timestamp),
            });
        }

        let time_index = bars
            .iter()
            .enumerate()
            .map(|(i, bar)| (bar.timestamp, i))
            .collect();

        Ok(Self {
            code,
            bars,
            time_index,
        })
    }

    pub fn bar_count(&self) -> usize {
        self.bars.len()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    pub fn bar_index(&self, timestamp: NaiveDateTime) -> Option<usize> {
        self.time_index.get(&timestamp).copied()
    }

    pub fn bar_at(&self, timestamp: NaiveDateTime) -> Option<(usize, &OhlcvBar)> {
        self.bar_index(timestamp).map(|i| (i, &self.bars[i]))
    }
}

pub fn build_unified_timeline(instruments: &[InstrumentData]) -> Vec<NaiveDateTime> {
    let unique: BTreeSet<NaiveDateTime> = instruments
        .iter()
        .flat_map(|inst| inst.bars.iter().map(|bar| bar.timestamp))
        .collect();
    unique.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, day)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    fn make_bar(code: &str, timestamp: NaiveDateTime, close: f64) -> OhlcvBar {
        OhlcvBar {
            code: code.to_string(),
            timestamp,
            open: close - 1.0,
            high: close + 1.0,
            low: close - 2.0,
            close,
            volume: 1000,
        }
    }

    #[test]
    fn builds_time_index() {
        let bars = vec![
            make_bar("AAPL", at(2, 10), 100.0),
            make_bar("AAPL", at(2, 11), 101.0),
            make_bar("AAPL", at(2, 12), 102.0),
        ];
        let inst = InstrumentData::new("AAPL", bars).unwrap();

        assert_eq!(inst.bar_count(), 3);
        assert_eq!(inst.bar_index(at(2, 11)), Some(1));
        let (i, bar) = inst.bar_at(at(2, 12)).unwrap();
        assert_eq!(i, 2);
        assert!((bar.close - 102.0).abs() < f64::EPSILON);
        assert!(inst.bar_at(at(2, 13)).is_none());
        assert_eq!(inst.closes(), vec![100.0, 101.0, 102.0]);
    }

    #[test]
    fn rejects_out_of_order_bars() {
        let bars = vec![
            make_bar("AAPL", at(2, 11), 100.0),
            make_bar("AAPL", at(2, 10), 101.0),
        ];
        let err = InstrumentData::new("AAPL", bars).unwrap_err();
        assert!(matches!(err, TrendbreakError::Data { .. }));
    }

    #[test]
    fn rejects_duplicate_timestamps() {
        let bars = vec![
            make_bar("AAPL", at(2, 10), 100.0),
            make_bar("AAPL", at(2, 10), 101.0),
        ];
        assert!(InstrumentData::new("AAPL", bars).is_err());
    }

    #[test]
    fn rejects_non_positive_close() {
        let bars = vec![make_bar("AAPL", at(2, 10), 0.0)];
        assert!(InstrumentData::new("AAPL", bars).is_err());
    }

    #[test]
    fn unified_timeline_merges_and_sorts() {
        let aapl = InstrumentData::new(
            "AAPL",
            vec![
                make_bar("AAPL", at(2, 10), 100.0),
                make_bar("AAPL", at(2, 13), 101.0),
            ],
        )
        .unwrap();
        let msft = InstrumentData::new(
            "MSFT",
            vec![
                make_bar("MSFT", at(2, 9), 50.0),
                make_bar("MSFT", at(2, 10), 51.0),
                make_bar("MSFT", at(2, 11), 52.0),
            ],
        )
        .unwrap();

        let timeline = build_unified_timeline(&[aapl, msft]);

        assert_eq!(timeline, vec![at(2, 9), at(2, 10), at(2, 11), at(2, 13)]);
    }

    #[test]
    fn unified_timeline_empty() {
        assert!(build_unified_timeline(&[]).is_empty());
    }
}

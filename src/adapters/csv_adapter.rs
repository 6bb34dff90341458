//! CSV file data adapter. One `<CODE>.csv` file per instrument.

use crate::domain::error::TrendbreakError;
use crate::domain::ohlcv::OhlcvBar;
use crate::ports::data_port::DataPort;
use chrono::{NaiveDate, NaiveDateTime};
use std::fs;
use std::path::PathBuf;

const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const DATE_FORMAT: &str = "%Y-%m-%d";

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, code: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", code))
    }
}

fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    NaiveDateTime::parse_from_str(raw, DATETIME_FORMAT)
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(raw, DATE_FORMAT)
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

fn field<'a>(
    record: &'a csv::StringRecord,
    index: usize,
    name: &str,
    code: &str,
    line: u64,
) -> Result<&'a str, TrendbreakError> {
    record
        .get(index)
        .map(str::trim)
        .ok_or_else(|| TrendbreakError::Data {
            code: code.to_string(),
            reason: format!("line {}: missing {} column", line, name),
        })
}

fn price(
    record: &csv::StringRecord,
    index: usize,
    name: &str,
    code: &str,
    line: u64,
) -> Result<f64, TrendbreakError> {
    let raw = field(record, index, name, code, line)?;
    raw.parse().map_err(|e| TrendbreakError::Data {
        code: code.to_string(),
        reason: format!("line {}: invalid {} value {:?}: {}", line, name, raw, e),
    })
}

impl DataPort for CsvAdapter {
    fn fetch_ohlcv(&self, code: &str) -> Result<Vec<OhlcvBar>, TrendbreakError> {
        let path = self.csv_path(code);
        if !path.is_file() {
            return Err(TrendbreakError::NoData {
                code: code.to_string(),
            });
        }

        let mut rdr = csv::Reader::from_path(&path).map_err(|e| TrendbreakError::Data {
            code: code.to_string(),
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;
        let mut bars = Vec::new();

        for result in rdr.records() {
            let record = result.map_err(|e| TrendbreakError::Data {
                code: code.to_string(),
                reason: format!("CSV parse error: {}", e),
            })?;
            let line = record.position().map_or(0, |p| p.line());

            let raw_ts = field(&record, 0, "datetime", code, line)?;
            let timestamp = parse_timestamp(raw_ts).ok_or_else(|| TrendbreakError::Data {
                code: code.to_string(),
                reason: format!("line {}: invalid timestamp {:?}", line, raw_ts),
            })?;

            // Some exports write volume as a float.
            let raw_volume = field(&record, 5, "volume", code, line)?;
            let volume = raw_volume
                .parse::<i64>()
                .or_else(|_| raw_volume.parse::<f64>().map(|v| v as i64))
                .map_err(|e| TrendbreakError::Data {
                    code: code.to_string(),
                    reason: format!("line {}: invalid volume value {:?}: {}", line, raw_volume, e),
                })?;

            bars.push(OhlcvBar {
                code: code.to_string(),
                timestamp,
                open: price(&record, 1, "open", code, line)?,
                high: price(&record, 2, "high", code, line)?,
                low: price(&record, 3, "low", code, line)?,
                close: price(&record, 4, "close", code, line)?,
                volume,
            });
        }

        if bars.is_empty() {
            return Err(TrendbreakError::NoData {
                code: code.to_string(),
            });
        }
        Ok(bars)
    }

    fn list_symbols(&self) -> Result<Vec<String>, TrendbreakError> {
        let entries = fs::read_dir(&self.base_path)?;

        let mut symbols = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == "csv") {
                if let Some(stem) = path.file_stem() {
                    symbols.push(stem.to_string_lossy().into_owned());
                }
            }
        }

        symbols.sort();
        Ok(symbols)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup_test_data() -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().to_path_buf();

        let csv_content = "datetime,open,high,low,close,volume\n\
            2024-01-15 09:00:00,100.0,110.0,90.0,105.0,50000\n\
            2024-01-15 10:00:00,105.0,115.0,100.0,110.0,60000.0\n\
            2024-01-15 11:00:00,110.0,120.0,105.0,115.0,55000\n";

        fs::write(path.join("BHP.csv"), csv_content).unwrap();
        fs::write(
            path.join("CBA.csv"),
            "datetime,open,high,low,close,volume\n2024-01-15,1,2,0.5,1.5,10\n",
        )
        .unwrap();
        fs::write(path.join("EMPTY.csv"), "datetime,open,high,low,close,volume\n").unwrap();
        fs::write(path.join("notes.txt"), "not data").unwrap();

        (dir, path)
    }

    #[test]
    fn fetch_ohlcv_returns_correct_data() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);

        let bars = adapter.fetch_ohlcv("BHP").unwrap();

        assert_eq!(bars.len(), 3);
        assert_eq!(
            bars[0].timestamp,
            NaiveDate::from_ymd_opt(2024, 1, 15)
                .unwrap()
                .and_hms_opt(9, 0, 0)
                .unwrap()
        );
        assert_eq!(bars[0].code, "BHP");
        assert_eq!(bars[0].open, 100.0);
        assert_eq!(bars[0].high, 110.0);
        assert_eq!(bars[0].low, 90.0);
        assert_eq!(bars[0].close, 105.0);
        assert_eq!(bars[0].volume, 50000);
        assert_eq!(bars[1].volume, 60000);
    }

    #[test]
    fn date_only_rows_are_midnight() {
        let (_dir, path) = setup_test_data();
        let bars = CsvAdapter::new(path).fetch_ohlcv("CBA").unwrap();
        assert_eq!(
            bars[0].timestamp,
            NaiveDate::from_ymd_opt(2024, 1, 15)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap()
        );
    }

    #[test]
    fn missing_or_empty_file_is_no_data() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);

        assert!(matches!(
            adapter.fetch_ohlcv("XYZ"),
            Err(TrendbreakError::NoData { .. })
        ));
        assert!(matches!(
            adapter.fetch_ohlcv("EMPTY"),
            Err(TrendbreakError::NoData { .. })
        ));
    }

    #[test]
    fn malformed_row_is_data_error() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("BAD.csv"),
            "datetime,open,high,low,close,volume\n2024-01-15 09:00:00,abc,1,1,1,1\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("WHEN.csv"),
            "datetime,open,high,low,close,volume\n15/01/2024,1,1,1,1,1\n",
        )
        .unwrap();
        let adapter = CsvAdapter::new(dir.path().to_path_buf());

        let err = adapter.fetch_ohlcv("BAD").unwrap_err();
        assert!(err.to_string().contains("invalid open value"), "{err}");
        let err = adapter.fetch_ohlcv("WHEN").unwrap_err();
        assert!(err.to_string().contains("invalid timestamp"), "{err}");
    }

    #[test]
    fn list_symbols_returns_sorted_csv_stems() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);

        assert_eq!(adapter.list_symbols().unwrap(), vec!["BHP", "CBA", "EMPTY"]);
    }

    #[test]
    fn list_symbols_missing_dir_is_io_error() {
        let adapter = CsvAdapter::new(PathBuf::from("/nonexistent/bars"));
        assert!(matches!(
            adapter.list_symbols(),
            Err(TrendbreakError::Io(_))
        ));
    }
}

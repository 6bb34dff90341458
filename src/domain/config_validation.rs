//! Load and validate run configuration from a [`ConfigPort`].
//!
//! Missing keys fall back to defaults. Present but unparsable values are
//! errors, never silently defaulted.

use std::path::PathBuf;

use crate::domain::backtest::BacktestConfig;
use crate::domain::error::TrendbreakError;
use crate::domain::strategy::StrategyParams;
use crate::ports::config_port::ConfigPort;

const DEFAULT_INITIAL_CAPITAL: f64 = 100_000.0;
const DEFAULT_DATA_DIR: &str = "data";

pub fn load_strategy_params(config: &dyn ConfigPort) -> Result<StrategyParams, TrendbreakError> {
    let defaults = StrategyParams::default();
    let params = StrategyParams {
        trend_period: read_period(config, "trend_period", defaults.trend_period)?,
        band_period: read_period(config, "band_period", defaults.band_period)?,
        band_deviation: read_double(config, "strategy", "band_deviation", defaults.band_deviation)?,
        momentum_period: read_period(config, "momentum_period", defaults.momentum_period)?,
        momentum_ceiling: read_double(
            config,
            "strategy",
            "momentum_ceiling",
            defaults.momentum_ceiling,
        )?,
        volatility_period: read_period(config, "volatility_period", defaults.volatility_period)?,
        volatility_min: read_double(config, "strategy", "volatility_min", defaults.volatility_min)?,
        risk_multiplier: read_double(
            config,
            "strategy",
            "risk_multiplier",
            defaults.risk_multiplier,
        )?,
        profit_target_pct: read_double(
            config,
            "strategy",
            "profit_target_pct",
            defaults.profit_target_pct,
        )?,
        max_position_fraction: read_double(
            config,
            "strategy",
            "max_position_fraction",
            defaults.max_position_fraction,
        )?,
    };
    params.validate()?;
    Ok(params)
}

pub fn load_backtest_config(config: &dyn ConfigPort) -> Result<BacktestConfig, TrendbreakError> {
    let initial_capital = read_double(
        config,
        "backtest",
        "initial_capital",
        DEFAULT_INITIAL_CAPITAL,
    )?;
    if !(initial_capital > 0.0 && initial_capital.is_finite()) {
        return Err(TrendbreakError::ConfigInvalid {
            section: "backtest".to_string(),
            key: "initial_capital".to_string(),
            reason: "initial_capital must be positive".to_string(),
        });
    }

    let data_dir = config
        .get_string("backtest", "data_dir")
        .unwrap_or_else(|| DEFAULT_DATA_DIR.to_string());

    Ok(BacktestConfig {
        initial_capital,
        data_dir: PathBuf::from(data_dir),
        codes: config
            .get_string("backtest", "codes")
            .map(|s| parse_codes(&s))
            .unwrap_or_default(),
        trades_output: config.get_string("backtest", "trades_output").map(PathBuf::from),
    })
}

/// Split a comma-separated code list, dropping blanks. Codes are upper-cased.
pub fn parse_codes(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|c| c.trim().to_uppercase())
        .filter(|c| !c.is_empty())
        .collect()
}

fn read_double(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: f64,
) -> Result<f64, TrendbreakError> {
    match config.get_double(section, key) {
        Ok(value) => Ok(value.unwrap_or(default)),
        Err(reason) => Err(TrendbreakError::ConfigInvalid {
            section: section.to_string(),
            key: key.to_string(),
            reason,
        }),
    }
}

fn read_period(
    config: &dyn ConfigPort,
    key: &str,
    default: usize,
) -> Result<usize, TrendbreakError> {
    let invalid = |reason: String| TrendbreakError::ConfigInvalid {
        section: "strategy".to_string(),
        key: key.to_string(),
        reason,
    };
    match config.get_int("strategy", key).map_err(invalid)? {
        None => Ok(default),
        Some(v) => usize::try_from(v).map_err(|_| invalid(format!("{key} must be positive"))),
    }
}

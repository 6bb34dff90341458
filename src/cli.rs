//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::csv_report_adapter::CsvReportAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::backtest::{self as backtest_engine, BacktestConfig, BacktestResult};
use crate::domain::config_validation::{load_backtest_config, load_strategy_params, parse_codes};
use crate::domain::error::TrendbreakError;
use crate::domain::indicator::set::IndicatorSet;
use crate::domain::instrument::{build_unified_timeline, InstrumentData};
use crate::domain::metrics::Metrics;
use crate::domain::portfolio::Portfolio;
use crate::domain::strategy::StrategyParams;
use crate::ports::data_port::DataPort;
use crate::ports::report_port::ReportPort;

#[derive(Parser, Debug)]
#[command(name = "trendbreak", about = "Trend-breakout strategy backtester")]
pub struct Cli {
    /// Log level (trace, debug, info, warn, error). RUST_LOG takes precedence.
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a backtest
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        /// Directory holding one <CODE>.csv per instrument
        #[arg(long)]
        data_dir: Option<PathBuf>,
        /// Comma-separated instrument codes
        #[arg(long)]
        codes: Option<String>,
        /// Trade log destination
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// List instruments available in the data directory
    ListSymbols {
        #[arg(short, long)]
        config: Option<PathBuf>,
        #[arg(long)]
        data_dir: Option<PathBuf>,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    init_tracing(&cli.log_level);

    match execute(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

/// Dispatch a parsed subcommand.
pub fn execute(command: Command) -> Result<(), TrendbreakError> {
    match command {
        Command::Backtest {
            config,
            data_dir,
            codes,
            output,
        } => run_backtest(&config, data_dir, codes.as_deref(), output),
        Command::Validate { config } => run_validate(&config),
        Command::ListSymbols { config, data_dir } => {
            run_list_symbols(config.as_deref(), data_dir)
        }
    }
}

/// Install the fmt subscriber. A second call (as in tests) is a no-op.
pub fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

fn load_config(path: &Path) -> Result<(BacktestConfig, StrategyParams), TrendbreakError> {
    eprintln!("Loading config from {}", path.display());
    let adapter = FileConfigAdapter::from_file(path)?;
    let bt_config = load_backtest_config(&adapter)?;
    let params = load_strategy_params(&adapter)?;
    Ok((bt_config, params))
}

fn run_backtest(
    config_path: &Path,
    data_dir_override: Option<PathBuf>,
    codes_override: Option<&str>,
    output_override: Option<PathBuf>,
) -> Result<(), TrendbreakError> {
    let (mut bt_config, params) = load_config(config_path)?;

    if let Some(dir) = data_dir_override {
        bt_config.data_dir = dir;
    }
    if let Some(raw) = codes_override {
        bt_config.codes = parse_codes(raw);
    }
    if output_override.is_some() {
        bt_config.trades_output = output_override;
    }

    let data_port = CsvAdapter::new(bt_config.data_dir.clone());
    let result = run_backtest_pipeline(&data_port, &params, &bt_config)?;
    let metrics = Metrics::compute(&result);

    print_summary(&result, &metrics);

    if let Some(path) = &bt_config.trades_output {
        CsvReportAdapter::new().write(&result, path)?;
        eprintln!("\nTrade log written to: {}", path.display());
    }
    Ok(())
}

/// Load data for the configured instruments and run the strategy over it.
///
/// Instruments without data are skipped with a warning. Malformed data aborts
/// the run.
pub fn run_backtest_pipeline(
    data_port: &dyn DataPort,
    params: &StrategyParams,
    bt_config: &BacktestConfig,
) -> Result<BacktestResult, TrendbreakError> {
    let codes = if bt_config.codes.is_empty() {
        data_port.list_symbols()?
    } else {
        bt_config.codes.clone()
    };
    if codes.is_empty() {
        return Err(TrendbreakError::ConfigMissing {
            section: "backtest".to_string(),
            key: "codes".to_string(),
        });
    }

    let mut instruments = Vec::with_capacity(codes.len());
    for code in &codes {
        let bars = match data_port.fetch_ohlcv(code) {
            Ok(bars) => bars,
            Err(TrendbreakError::NoData { .. }) => {
                warn!(code = %code, "no data, skipping instrument");
                continue;
            }
            Err(e) => return Err(e),
        };
        instruments.push(InstrumentData::new(code.clone(), bars)?);
    }

    if instruments.is_empty() {
        return Err(TrendbreakError::NoData {
            code: codes.join(","),
        });
    }

    let indicators = IndicatorSet::compute(&instruments, params);
    let timeline = build_unified_timeline(&instruments);
    let warmup = IndicatorSet::warmup_bars(params);
    for inst in instruments.iter().filter(|i| i.bar_count() <= warmup) {
        warn!(
            code = %inst.code,
            bars = inst.bar_count(),
            warmup,
            "not enough bars for indicators to warm up"
        );
    }

    info!(
        instruments = instruments.len(),
        bars = timeline.len(),
        initial_capital = bt_config.initial_capital,
        "running backtest"
    );

    let mut portfolio = Portfolio::new(bt_config.initial_capital);
    backtest_engine::run_backtest(&instruments, &timeline, &indicators, params, &mut portfolio)
}

fn print_summary(result: &BacktestResult, metrics: &Metrics) {
    eprintln!("\n=== Results ===");
    eprintln!("Starting Value:   {:.2}", result.initial_capital);
    eprintln!("Final Value:      {:.2}", result.final_equity);
    eprintln!("Total Return:     {:.2}%", metrics.total_return * 100.0);
    eprintln!("Max Drawdown:     -{:.1}%", metrics.max_drawdown * 100.0);
    eprintln!("Total Trades:     {}", metrics.total_trades);
    eprintln!("Win Rate:         {:.1}%", metrics.win_rate * 100.0);
    eprintln!("Profit Factor:    {:.2}", metrics.profit_factor);
    eprintln!(
        "Exits:            {} stop, {} target",
        metrics.stop_exits, metrics.target_exits
    );
    eprintln!("Open Positions:   {}", metrics.open_positions);
    if result.rejected_orders > 0 {
        eprintln!("Rejected Orders:  {}", result.rejected_orders);
    }
}

fn run_validate(config_path: &Path) -> Result<(), TrendbreakError> {
    let (bt_config, params) = load_config(config_path)?;

    eprintln!("\nBacktest:");
    eprintln!("  initial_capital: {:.2}", bt_config.initial_capital);
    eprintln!("  data_dir:        {}", bt_config.data_dir.display());
    if bt_config.codes.is_empty() {
        eprintln!("  codes:           (all in data_dir)");
    } else {
        eprintln!("  codes:           {}", bt_config.codes.join(", "));
    }

    eprintln!("\nStrategy:");
    eprintln!("  trend EMA:       {}", params.trend_period);
    eprintln!(
        "  bands:           {} x {}",
        params.band_period, params.band_deviation
    );
    eprintln!(
        "  momentum RSI:    {} (ceiling {})",
        params.momentum_period, params.momentum_ceiling
    );
    eprintln!(
        "  volatility ATR:  {} (min {})",
        params.volatility_period, params.volatility_min
    );
    eprintln!("  risk_multiplier: {}", params.risk_multiplier);
    eprintln!("  profit_target:   {}", params.profit_target_pct);
    eprintln!("  max_position:    {}", params.max_position_fraction);
    eprintln!("  warmup bars:     {}", IndicatorSet::warmup_bars(&params));

    eprintln!("\nConfiguration is valid.");
    Ok(())
}

fn run_list_symbols(
    config_path: Option<&Path>,
    data_dir_override: Option<PathBuf>,
) -> Result<(), TrendbreakError> {
    let data_dir = match (data_dir_override, config_path) {
        (Some(dir), _) => dir,
        (None, Some(path)) => load_config(path)?.0.data_dir,
        (None, None) => {
            return Err(TrendbreakError::ConfigMissing {
                section: "backtest".to_string(),
                key: "data_dir".to_string(),
            });
        }
    };

    let symbols = CsvAdapter::new(data_dir.clone()).list_symbols()?;
    if symbols.is_empty() {
        eprintln!("No symbols found in {}", data_dir.display());
    } else {
        for symbol in &symbols {
            println!("{}", symbol);
        }
        eprintln!("{} symbols found", symbols.len());
    }
    Ok(())
}

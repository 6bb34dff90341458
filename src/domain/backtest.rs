//! Strategy loop: drives every instrument through the unified timeline.
//!
//! Each bar is processed in three phases. The ledger is moved to the bar's
//! timestamp and marked to every close available at that bar; equity is read
//! once; then instruments are stepped in input order, all sized against that
//! same equity. After the bar, engine state is cross-checked against the
//! ledger and any mismatch aborts the run.

use chrono::NaiveDateTime;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::{debug, info, warn};

use crate::domain::error::TrendbreakError;
use crate::domain::instrument::InstrumentData;
use crate::domain::position::{ClosedTrade, PositionState};
use crate::domain::strategy::{step, InstrumentState, Order, StrategyParams};
use crate::ports::indicator_port::IndicatorPort;
use crate::ports::ledger_port::LedgerPort;

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestConfig {
    pub initial_capital: f64,
    pub data_dir: PathBuf,
    /// Empty means every instrument the data source lists.
    pub codes: Vec<String>,
    pub trades_output: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EquityPoint {
    pub timestamp: NaiveDateTime,
    pub equity: f64,
}

#[derive(Debug, Clone)]
pub struct BacktestResult {
    pub initial_capital: f64,
    pub final_equity: f64,
    pub closed_trades: Vec<ClosedTrade>,
    pub equity_curve: Vec<EquityPoint>,
    pub final_states: BTreeMap<String, InstrumentState>,
    pub rejected_orders: usize,
}

impl BacktestResult {
    pub fn total_return(&self) -> f64 {
        if self.initial_capital > 0.0 {
            (self.final_equity - self.initial_capital) / self.initial_capital
        } else {
            0.0
        }
    }

    pub fn open_positions(&self) -> usize {
        self.final_states.values().filter(|s| !s.is_flat()).count()
    }
}

/// What happened on one bar.
#[derive(Debug, Default)]
pub struct BarReport {
    pub closed: Vec<ClosedTrade>,
    pub opened: usize,
    pub rejected: usize,
}

#[derive(Debug, Clone)]
pub struct StrategyEngine {
    params: StrategyParams,
    states: BTreeMap<String, InstrumentState>,
}

impl StrategyEngine {
    /// Fails on invalid parameters or duplicated instrument codes.
    pub fn new<I, S>(params: StrategyParams, codes: I) -> Result<Self, TrendbreakError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        params.validate()?;

        let mut states = BTreeMap::new();
        for code in codes {
            let code = code.into();
            if states.insert(code.clone(), InstrumentState::Flat).is_some() {
                return Err(TrendbreakError::Data {
                    code,
                    reason: "instrument listed more than once".to_string(),
                });
            }
        }
        Ok(StrategyEngine { params, states })
    }

    pub fn params(&self) -> &StrategyParams {
        &self.params
    }

    pub fn state(&self, code: &str) -> InstrumentState {
        self.states.get(code).copied().unwrap_or_default()
    }

    pub fn states(&self) -> &BTreeMap<String, InstrumentState> {
        &self.states
    }

    pub fn process_bar<L: LedgerPort + ?Sized>(
        &mut self,
        timestamp: NaiveDateTime,
        instruments: &[InstrumentData],
        indicators: &dyn IndicatorPort,
        ledger: &mut L,
    ) -> BarReport {
        let mut report = BarReport::default();
        ledger.advance_to(timestamp);

        let active: Vec<_> = instruments
            .iter()
            .filter_map(|inst| inst.bar_at(timestamp).map(|(i, bar)| (inst, i, bar)))
            .collect();
        for (inst, _, bar) in &active {
            ledger.mark(&inst.code, bar.close);
        }
        let equity = ledger.equity();

        for (inst, index, bar) in active {
            let code = inst.code.as_str();
            let Some(snapshot) = indicators.snapshot(code, index) else {
                debug!(code, %timestamp, "no indicator snapshot, skipping");
                continue;
            };

            let current = self.state(code);
            let decision = step(&self.params, bar.close, &snapshot, &current, equity);

            match decision.order {
                None => {
                    self.states.insert(code.to_string(), decision.state);
                }
                Some(Order::Open {
                    side,
                    quantity,
                    price,
                }) => match ledger.open(code, side, quantity, price) {
                    Ok(()) => {
                        let risk = decision.state.risk().copied();
                        info!(
                            code,
                            %timestamp,
                            %side,
                            quantity,
                            price,
                            stop = ?risk.and_then(|r| r.stop_price),
                            target = ?risk.and_then(|r| r.take_price),
                            "opened position"
                        );
                        self.states.insert(code.to_string(), decision.state);
                        report.opened += 1;
                    }
                    Err(rejection) => {
                        warn!(code, %timestamp, %rejection, "open order rejected");
                        report.rejected += 1;
                    }
                },
                Some(Order::Close { price, reason }) => match ledger.close(code, price, reason) {
                    Ok(trade) => {
                        info!(
                            code,
                            %timestamp,
                            side = %trade.side,
                            price,
                            %reason,
                            pnl = trade.pnl,
                            "closed position"
                        );
                        self.states.insert(code.to_string(), decision.state);
                        report.closed.push(trade);
                    }
                    Err(rejection) => {
                        warn!(code, %timestamp, %rejection, "close order rejected");
                        report.rejected += 1;
                    }
                },
            }
        }

        report
    }

    /// Engine state and ledger position must agree for every instrument.
    pub fn verify_invariants<L: LedgerPort + ?Sized>(
        &self,
        bar: usize,
        ledger: &L,
    ) -> Result<(), TrendbreakError> {
        for (code, state) in &self.states {
            let violation = |reason: String| TrendbreakError::InvariantViolation {
                code: code.clone(),
                bar,
                reason,
            };

            match (state, ledger.position(code)) {
                (InstrumentState::Flat, PositionState::Flat) => {}
                (InstrumentState::Open(open), PositionState::Open { side, quantity, .. }) => {
                    if open.side != side || open.quantity != quantity {
                        return Err(violation(format!(
                            "engine holds {} x{}, ledger holds {} x{}",
                            open.side, open.quantity, side, quantity
                        )));
                    }
                    if !open.risk.is_defined() {
                        return Err(violation("open position without risk state".into()));
                    }
                }
                (InstrumentState::Flat, PositionState::Open { side, .. }) => {
                    return Err(violation(format!("engine flat, ledger {side}")));
                }
                (InstrumentState::Open(open), PositionState::Flat) => {
                    return Err(violation(format!("engine {}, ledger flat", open.side)));
                }
            }
        }
        Ok(())
    }
}

/// Run the strategy over every timestamp of `timeline`.
pub fn run_backtest<L: LedgerPort + ?Sized>(
    instruments: &[InstrumentData],
    timeline: &[NaiveDateTime],
    indicators: &dyn IndicatorPort,
    params: &StrategyParams,
    ledger: &mut L,
) -> Result<BacktestResult, TrendbreakError> {
    let mut engine = StrategyEngine::new(
        params.clone(),
        instruments.iter().map(|inst| inst.code.clone()),
    )?;

    let initial_capital = ledger.equity();
    let mut closed_trades = Vec::new();
    let mut equity_curve = Vec::with_capacity(timeline.len());
    let mut rejected_orders = 0;

    for (bar, &timestamp) in timeline.iter().enumerate() {
        let report = engine.process_bar(timestamp, instruments, indicators, ledger);
        engine.verify_invariants(bar, ledger)?;

        rejected_orders += report.rejected;
        closed_trades.extend(report.closed);
        equity_curve.push(EquityPoint {
            timestamp,
            equity: ledger.equity(),
        });
    }

    let final_equity = ledger.equity();
    info!(
        bars = timeline.len(),
        trades = closed_trades.len(),
        rejected_orders,
        final_equity,
        "backtest complete"
    );

    Ok(BacktestResult {
        initial_capital,
        final_equity,
        closed_trades,
        equity_curve,
        final_states: engine.states,
        rejected_orders,
    })
}

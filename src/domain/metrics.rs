//! Run summary statistics.

use super::backtest::{BacktestResult, EquityPoint};
use super::position::ExitReason;

#[derive(Debug, Clone, PartialEq)]
pub struct Metrics {
    pub total_return: f64,
    pub max_drawdown: f64,
    pub total_trades: usize,
    pub trades_won: usize,
    pub trades_lost: usize,
    pub win_rate: f64,
    pub profit_factor: f64,
    pub stop_exits: usize,
    pub target_exits: usize,
    pub open_positions: usize,
}

impl Metrics {
    pub fn compute(result: &BacktestResult) -> Self {
        let mut trades_won = 0usize;
        let mut trades_lost = 0usize;
        let mut total_wins = 0.0_f64;
        let mut total_losses = 0.0_f64;
        let mut stop_exits = 0usize;
        let mut target_exits = 0usize;

        for trade in &result.closed_trades {
            if trade.pnl > 0.0 {
                trades_won += 1;
                total_wins += trade.pnl;
            } else if trade.pnl < 0.0 {
                trades_lost += 1;
                total_losses += trade.pnl.abs();
            }
            match trade.reason {
                ExitReason::StopLoss => stop_exits += 1,
                ExitReason::TakeProfit => target_exits += 1,
            }
        }

        let total_trades = result.closed_trades.len();
        let win_rate = if total_trades > 0 {
            trades_won as f64 / total_trades as f64
        } else {
            0.0
        };

        let profit_factor = if total_losses > 0.0 {
            total_wins / total_losses
        } else if total_wins > 0.0 {
            f64::INFINITY
        } else {
            0.0
        };

        Metrics {
            total_return: result.total_return(),
            max_drawdown: compute_drawdown(&result.equity_curve),
            total_trades,
            trades_won,
            trades_lost,
            win_rate,
            profit_factor,
            stop_exits,
            target_exits,
            open_positions: result.open_positions(),
        }
    }
}

/// Largest peak-to-trough decline as a fraction of the peak.
fn compute_drawdown(equity_curve: &[EquityPoint]) -> f64 {
    let Some(first) = equity_curve.first() else {
        return 0.0;
    };

    let mut peak = first.equity;
    let mut max_dd = 0.0_f64;
    for point in equity_curve {
        if point.equity > peak {
            peak = point.equity;
        } else if peak > 0.0 {
            max_dd = max_dd.max((peak - point.equity) / peak);
        }
    }
    max_dd
}

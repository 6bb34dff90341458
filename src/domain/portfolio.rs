//! Simulated portfolio ledger: cash, open positions and closed trades.
//!
//! Orders fill in full at the requested price. Both sides commit the entry
//! notional from cash; a short returns that escrow plus its price difference
//! when covered.

use chrono::NaiveDateTime;
use std::collections::HashMap;

use super::error::LedgerRejection;
use super::position::{ClosedTrade, ExitReason, Position, PositionState, Side};
use crate::ports::ledger_port::LedgerPort;

#[derive(Debug, Clone)]
pub struct Portfolio {
    pub cash: f64,
    pub initial_capital: f64,
    pub positions: HashMap<String, Position>,
    pub closed_trades: Vec<ClosedTrade>,
    marks: HashMap<String, f64>,
    clock: NaiveDateTime,
}

impl Portfolio {
    pub fn new(initial_capital: f64) -> Self {
        Portfolio {
            cash: initial_capital,
            initial_capital,
            positions: HashMap::new(),
            closed_trades: Vec::new(),
            marks: HashMap::new(),
            clock: NaiveDateTime::default(),
        }
    }

    pub fn get_position(&self, code: &str) -> Option<&Position> {
        self.positions.get(code)
    }

    pub fn position_count(&self) -> usize {
        self.positions.len()
    }

    fn mark_price(&self, position: &Position) -> f64 {
        self.marks
            .get(&position.code)
            .copied()
            .unwrap_or(position.entry_price)
    }
}

impl LedgerPort for Portfolio {
    fn advance_to(&mut self, timestamp: NaiveDateTime) {
        self.clock = timestamp;
    }

    fn mark(&mut self, code: &str, price: f64) {
        self.marks.insert(code.to_string(), price);
    }

    fn open(
        &mut self,
        code: &str,
        side: Side,
        quantity: u64,
        price: f64,
    ) -> Result<(), LedgerRejection> {
        if quantity == 0 || !(price.is_finite() && price > 0.0) {
            return Err(LedgerRejection::InvalidOrder {
                code: code.to_string(),
                quantity,
                price,
            });
        }
        if let Some(existing) = self.positions.get(code) {
            return Err(LedgerRejection::AlreadyOpen {
                code: code.to_string(),
                side: existing.side,
            });
        }

        let cost = quantity as f64 * price;
        if cost > self.cash {
            return Err(LedgerRejection::InsufficientCash {
                code: code.to_string(),
                required: cost,
                available: self.cash,
            });
        }

        self.cash -= cost;
        self.marks.insert(code.to_string(), price);
        self.positions.insert(
            code.to_string(),
            Position {
                code: code.to_string(),
                side,
                quantity,
                entry_price: price,
                entry_time: self.clock,
            },
        );
        Ok(())
    }

    fn close(
        &mut self,
        code: &str,
        price: f64,
        reason: ExitReason,
    ) -> Result<ClosedTrade, LedgerRejection> {
        let position = self
            .positions
            .remove(code)
            .ok_or_else(|| LedgerRejection::NoPosition {
                code: code.to_string(),
            })?;

        self.cash += position.market_value(price);
        self.marks.insert(code.to_string(), price);

        let trade = ClosedTrade {
            code: position.code.clone(),
            side: position.side,
            quantity: position.quantity,
            entry_price: position.entry_price,
            exit_price: price,
            entry_time: position.entry_time,
            exit_time: self.clock,
            pnl: position.unrealized_pnl(price),
            reason,
        };
        self.closed_trades.push(trade.clone());
        Ok(trade)
    }

    fn position(&self, code: &str) -> PositionState {
        self.positions
            .get(code)
            .map_or(PositionState::Flat, Position::state)
    }

    fn equity(&self) -> f64 {
        let position_value: f64 = self
            .positions
            .values()
            .map(|pos| pos.market_value(self.mark_price(pos)))
            .sum();
        self.cash + position_value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;

    fn at(hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 15)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    #[test]
    fn new_portfolio() {
        let portfolio = Portfolio::new(100_000.0);
        assert_relative_eq!(portfolio.cash, 100_000.0);
        assert_relative_eq!(portfolio.equity(), 100_000.0);
        assert_eq!(portfolio.position_count(), 0);
        assert!(portfolio.closed_trades.is_empty());
        assert!(portfolio.position("AAPL").is_flat());
    }

    #[test]
    fn open_long_debits_cash_and_tracks_position() {
        let mut portfolio = Portfolio::new(100_000.0);
        portfolio.advance_to(at(10));
        portfolio.open("AAPL", Side::Long, 100, 50.0).unwrap();

        assert_relative_eq!(portfolio.cash, 95_000.0);
        assert_eq!(
            portfolio.position("AAPL"),
            PositionState::Open {
                side: Side::Long,
                quantity: 100,
                entry_price: 50.0
            }
        );
        assert_eq!(portfolio.get_position("AAPL").unwrap().entry_time, at(10));
        assert_relative_eq!(portfolio.equity(), 100_000.0);
    }

    #[test]
    fn equity_uses_latest_mark() {
        let mut portfolio = Portfolio::new(100_000.0);
        portfolio.open("AAPL", Side::Long, 100, 50.0).unwrap();
        portfolio.open("MSFT", Side::Short, 10, 200.0).unwrap();

        portfolio.mark("AAPL", 55.0);
        portfolio.mark("MSFT", 190.0);

        // cash 93000 + long 5500 + short (2000 escrow + 100 pnl)
        assert_relative_eq!(portfolio.equity(), 100_600.0);
    }

    #[test]
    fn close_long_realizes_pnl() {
        let mut portfolio = Portfolio::new(100_000.0);
        portfolio.advance_to(at(10));
        portfolio.open("AAPL", Side::Long, 100, 50.0).unwrap();
        portfolio.advance_to(at(14));
        let trade = portfolio
            .close("AAPL", 60.0, ExitReason::TakeProfit)
            .unwrap();

        assert_relative_eq!(trade.pnl, 1_000.0);
        assert_eq!(trade.entry_time, at(10));
        assert_eq!(trade.exit_time, at(14));
        assert_eq!(trade.reason, ExitReason::TakeProfit);
        assert_relative_eq!(portfolio.cash, 101_000.0);
        assert!(portfolio.position("AAPL").is_flat());
        assert_eq!(portfolio.closed_trades.len(), 1);
    }

    #[test]
    fn close_short_returns_escrow_plus_difference() {
        let mut portfolio = Portfolio::new(10_000.0);
        portfolio.open("MSFT", Side::Short, 10, 100.0).unwrap();
        assert_relative_eq!(portfolio.cash, 9_000.0);

        let trade = portfolio.close("MSFT", 104.0, ExitReason::StopLoss).unwrap();
        assert_relative_eq!(trade.pnl, -40.0);
        assert_relative_eq!(portfolio.cash, 9_960.0);
    }

    #[test]
    fn rejects_order_larger_than_cash() {
        let mut portfolio = Portfolio::new(1_000.0);
        let err = portfolio.open("AAPL", Side::Long, 100, 50.0).unwrap_err();

        assert!(matches!(err, LedgerRejection::InsufficientCash { .. }));
        assert_relative_eq!(portfolio.cash, 1_000.0);
        assert!(portfolio.position("AAPL").is_flat());
    }

    #[test]
    fn rejects_second_open_and_unknown_close() {
        let mut portfolio = Portfolio::new(100_000.0);
        portfolio.open("AAPL", Side::Long, 10, 50.0).unwrap();

        assert_eq!(
            portfolio.open("AAPL", Side::Short, 10, 50.0),
            Err(LedgerRejection::AlreadyOpen {
                code: "AAPL".into(),
                side: Side::Long
            })
        );
        assert!(matches!(
            portfolio.close("MSFT", 10.0, ExitReason::StopLoss),
            Err(LedgerRejection::NoPosition { .. })
        ));
    }

    #[test]
    fn rejects_invalid_orders() {
        let mut portfolio = Portfolio::new(100_000.0);
        assert!(matches!(
            portfolio.open("AAPL", Side::Long, 0, 50.0),
            Err(LedgerRejection::InvalidOrder { .. })
        ));
        assert!(matches!(
            portfolio.open("AAPL", Side::Long, 1, f64::NAN),
            Err(LedgerRejection::InvalidOrder { .. })
        ));
    }
}

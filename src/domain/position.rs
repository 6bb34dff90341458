//! Position tracking: sides, ledger-held positions and closed trades.

use chrono::NaiveDateTime;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Long,
    Short,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Long => write!(f, "long"),
            Side::Short => write!(f, "short"),
        }
    }
}

/// What the ledger reports for one instrument.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PositionState {
    Flat,
    Open {
        side: Side,
        quantity: u64,
        entry_price: f64,
    },
}

impl PositionState {
    pub fn is_flat(&self) -> bool {
        matches!(self, PositionState::Flat)
    }

    pub fn side(&self) -> Option<Side> {
        match self {
            PositionState::Flat => None,
            PositionState::Open { side, .. } => Some(*side),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    StopLoss,
    TakeProfit,
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitReason::StopLoss => write!(f, "stop"),
            ExitReason::TakeProfit => write!(f, "target"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Position {
    pub code: String,
    pub side: Side,
    pub quantity: u64,
    pub entry_price: f64,
    pub entry_time: NaiveDateTime,
}

impl Position {
    pub fn is_long(&self) -> bool {
        self.side == Side::Long
    }

    pub fn is_short(&self) -> bool {
        self.side == Side::Short
    }

    /// Notional committed at entry.
    pub fn entry_notional(&self) -> f64 {
        self.quantity as f64 * self.entry_price
    }

    pub fn unrealized_pnl(&self, price: f64) -> f64 {
        let diff = match self.side {
            Side::Long => price - self.entry_price,
            Side::Short => self.entry_price - price,
        };
        self.quantity as f64 * diff
    }

    /// Cash that closing at `price` would return. Shorts escrow the entry
    /// notional, so they return it plus the price difference.
    pub fn market_value(&self, price: f64) -> f64 {
        match self.side {
            Side::Long => self.quantity as f64 * price,
            Side::Short => self.entry_notional() + self.unrealized_pnl(price),
        }
    }

    pub fn state(&self) -> PositionState {
        PositionState::Open {
            side: self.side,
            quantity: self.quantity,
            entry_price: self.entry_price,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClosedTrade {
    pub code: String,
    pub side: Side,
    pub quantity: u64,
    pub entry_price: f64,
    pub exit_price: f64,
    pub entry_time: NaiveDateTime,
    pub exit_time: NaiveDateTime,
    pub pnl: f64,
    pub reason: ExitReason,
}

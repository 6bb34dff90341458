//! Position ledger port trait.
//!
//! The strategy loop issues orders through this trait and reads back
//! positions and equity. Orders fill fully at the requested price.

use crate::domain::error::LedgerRejection;
use crate::domain::position::{ClosedTrade, ExitReason, PositionState, Side};
use chrono::NaiveDateTime;

pub trait LedgerPort {
    /// Set the timestamp stamped on subsequent fills.
    fn advance_to(&mut self, timestamp: NaiveDateTime);

    /// Update the mark-to-market price for an instrument.
    fn mark(&mut self, code: &str, price: f64);

    fn open(
        &mut self,
        code: &str,
        side: Side,
        quantity: u64,
        price: f64,
    ) -> Result<(), LedgerRejection>;

    fn close(
        &mut self,
        code: &str,
        price: f64,
        reason: ExitReason,
    ) -> Result<ClosedTrade, LedgerRejection>;

    fn position(&self, code: &str) -> PositionState;

    /// Cash plus mark-to-market value of every open position.
    fn equity(&self) -> f64;
}

//! Domain error types.

use crate::domain::position::Side;

/// Top-level error type for trendbreak.
#[derive(Debug, thiserror::Error)]
pub enum TrendbreakError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("malformed data for {code}: {reason}")]
    Data { code: String, reason: String },

    #[error("no data for {code}")]
    NoData { code: String },

    #[error("state invariant violated for {code} at bar {bar}: {reason}")]
    InvariantViolation {
        code: String,
        bar: usize,
        reason: String,
    },

    #[error("report error: {reason}")]
    Report { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&TrendbreakError> for std::process::ExitCode {
    fn from(err: &TrendbreakError) -> Self {
        let code: u8 = match err {
            TrendbreakError::Io(_) | TrendbreakError::Report { .. } => 1,
            TrendbreakError::ConfigParse { .. }
            | TrendbreakError::ConfigMissing { .. }
            | TrendbreakError::ConfigInvalid { .. } => 2,
            TrendbreakError::Data { .. } | TrendbreakError::NoData { .. } => 5,
            TrendbreakError::InvariantViolation { .. } => 6,
        };
        std::process::ExitCode::from(code)
    }
}

/// An order the ledger declined. Recoverable: the strategy loop leaves the
/// instrument untouched for the bar.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LedgerRejection {
    #[error("insufficient cash for {code}: need {required:.2}, have {available:.2}")]
    InsufficientCash {
        code: String,
        required: f64,
        available: f64,
    },

    #[error("{code} already has an open {side} position")]
    AlreadyOpen { code: String, side: Side },

    #[error("no open position for {code}")]
    NoPosition { code: String },

    #[error("invalid order for {code}: quantity {quantity} at price {price}")]
    InvalidOrder {
        code: String,
        quantity: u64,
        price: f64,
    },
}

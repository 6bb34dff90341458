//! Core domain types and logic.

pub mod backtest;
pub mod config_validation;
pub mod error;
pub mod indicator;
pub mod instrument;
pub mod metrics;
pub mod ohlcv;
pub mod portfolio;
pub mod position;
pub mod risk;
pub mod signal;
pub mod sizing;
pub mod strategy;

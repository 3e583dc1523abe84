//! Core domain types and logic.

pub mod price;
pub mod objective;
pub mod constraint;
pub mod solver;
pub mod optimizer;
pub mod portfolio;
pub mod trade;
pub mod execution;
pub mod backtest;
pub mod metrics;
pub mod config_validation;
pub mod cancel;
pub mod error;

//! qubotrader: walk-forward portfolio selection and backtesting.
//!
//! Each day a binary return/risk objective is built from asset scores and
//! trailing price history, solved under cardinality bounds, and the chosen
//! assets are replayed through an accounting engine with fees and slippage.
//!
//! Hexagonal architecture: domain logic in [`domain`], port traits in [`ports`],
//! concrete implementations in [`adapters`].

pub mod domain;
pub mod ports;
pub mod adapters;
pub mod cli;

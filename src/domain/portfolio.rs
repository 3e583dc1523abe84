//! Portfolio state and equity tracking.

use chrono::NaiveDate;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EquityPoint {
    pub date: NaiveDate,
    pub value: f64,
}

/// Long-only cash and holdings carried from day to day.
#[derive(Debug, Clone, PartialEq)]
pub struct PortfolioState {
    pub cash: f64,
    pub initial_capital: f64,
    pub positions: BTreeMap<String, f64>,
}

impl PortfolioState {
    pub fn new(initial_capital: f64) -> Self {
        PortfolioState {
            cash: initial_capital,
            initial_capital,
            positions: BTreeMap::new(),
        }
    }

    pub fn quantity(&self, asset: &str) -> f64 {
        self.positions.get(asset).copied().unwrap_or(0.0)
    }

    pub fn holds(&self, asset: &str) -> bool {
        self.quantity(asset) > 0.0
    }

    /// Assets with a strictly positive quantity.
    pub fn held_assets(&self) -> BTreeSet<String> {
        self.positions
            .iter()
            .filter(|(_, qty)| **qty > 0.0)
            .map(|(asset, _)| asset.clone())
            .collect()
    }

    pub fn set_position(&mut self, asset: &str, quantity: f64) {
        self.positions.insert(asset.to_string(), quantity);
    }

    pub fn clear_position(&mut self, asset: &str) -> f64 {
        self.positions.insert(asset.to_string(), 0.0).unwrap_or(0.0)
    }

    /// `cash + Σ qty × price`, valuing each holding with `price_of`.
    ///
    /// Holdings for which `price_of` returns `None` are skipped.
    pub fn total_value<F>(&self, mut price_of: F) -> f64
    where
        F: FnMut(&str) -> Option<f64>,
    {
        let holdings: f64 = self
            .positions
            .iter()
            .filter(|(_, qty)| **qty > 0.0)
            .filter_map(|(asset, qty)| price_of(asset).map(|p| qty * p))
            .sum();
        self.cash + holdings
    }
}

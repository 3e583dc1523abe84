//! Trade execution and fill simulation.
//!
//! Sells and buys are filled at the day's market price moved against the
//! trader by a fixed slippage fraction, and charged a proportional fee.

use chrono::NaiveDate;

use super::error::QubotraderError;
use super::portfolio::PortfolioState;
use super::trade::{Side, TradeRecord};

/// Proportional trading costs, both fractions in `[0, 1)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CostConfig {
    pub fee_pct: f64,
    pub slippage_pct: f64,
}

impl Default for CostConfig {
    fn default() -> Self {
        CostConfig {
            fee_pct: 0.001,
            slippage_pct: 0.0005,
        }
    }
}

impl CostConfig {
    pub fn validate(&self) -> Result<(), QubotraderError> {
        if !(0.0..1.0).contains(&self.fee_pct) {
            return Err(QubotraderError::invalid(
                "backtest",
                "transaction_fee_pct",
                "transaction_fee_pct must be in [0, 1)",
            ));
        }
        if !(0.0..1.0).contains(&self.slippage_pct) {
            return Err(QubotraderError::invalid(
                "backtest",
                "slippage_pct",
                "slippage_pct must be in [0, 1)",
            ));
        }
        Ok(())
    }
}

/// Buy fill: `market_price * (1 + slippage_pct)`
pub fn apply_slippage_buy(market_price: f64, slippage_pct: f64) -> f64 {
    market_price * (1.0 + slippage_pct)
}

/// Sell fill: `market_price * (1 - slippage_pct)`
pub fn apply_slippage_sell(market_price: f64, slippage_pct: f64) -> f64 {
    market_price * (1.0 - slippage_pct)
}

/// Liquidate the whole position in `asset`.
///
/// Steps:
/// 1. Apply slippage to the sell price
/// 2. proceeds = qty * sell_price, fee = proceeds * fee_pct
/// 3. Credit proceeds minus fee to cash
/// 4. Zero the position
///
/// Returns `None` when nothing is held.
pub fn execute_sell(
    portfolio: &mut PortfolioState,
    asset: &str,
    market_price: f64,
    date: NaiveDate,
    costs: &CostConfig,
) -> Option<TradeRecord> {
    let quantity = portfolio.quantity(asset);
    if quantity <= 0.0 {
        return None;
    }

    let sell_price = apply_slippage_sell(market_price, costs.slippage_pct);
    let proceeds = quantity * sell_price;
    let fee = proceeds * costs.fee_pct;
    let slippage_cost = quantity * (market_price - sell_price);

    portfolio.cash += proceeds - fee;
    portfolio.clear_position(asset);

    Some(TradeRecord {
        date,
        asset_id: asset.to_string(),
        side: Side::Sell,
        market_price,
        executed_price: sell_price,
        quantity,
        fee,
        slippage_cost,
    })
}

/// Open a position in `asset` with a fixed cash allocation.
///
/// Steps:
/// 1. Apply slippage to the buy price
/// 2. fee = allocation * fee_pct
/// 3. qty = (allocation - fee) / buy_price
/// 4. Debit the full allocation from cash
pub fn execute_buy(
    portfolio: &mut PortfolioState,
    asset: &str,
    market_price: f64,
    allocation: f64,
    date: NaiveDate,
    costs: &CostConfig,
) -> TradeRecord {
    let buy_price = apply_slippage_buy(market_price, costs.slippage_pct);
    let fee = allocation * costs.fee_pct;
    let quantity = (allocation - fee) / buy_price;
    debug_assert!(quantity >= 0.0, "negative quantity {quantity} for {asset}");
    let slippage_cost = allocation / buy_price * (buy_price - market_price);

    portfolio.cash -= allocation;
    portfolio.set_position(asset, quantity);

    TradeRecord {
        date,
        asset_id: asset.to_string(),
        side: Side::Buy,
        market_price,
        executed_price: buy_price,
        quantity,
        fee,
        slippage_cost,
    }
}

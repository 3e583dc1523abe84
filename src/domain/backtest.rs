//! Walk-forward backtest engine.
//!
//! For every date in ascending order the engine values the portfolio at the
//! day's prices (before trading), sells holdings that left the target set and
//! then buys target assets that are not yet held. State is mutated on one
//! thread only, in date order.

use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

use super::cancel::{CancelFlag, is_cancelled};
use super::error::QubotraderError;
use super::execution::{CostConfig, execute_buy, execute_sell};
use super::portfolio::{EquityPoint, PortfolioState};
use super::price::PriceTable;
use super::trade::{TradeRecord, TradeStats};

/// Target asset set per decision date.
pub type DailyChoices = BTreeMap<NaiveDate, BTreeSet<String>>;

pub fn validate_capital(initial_capital: f64) -> Result<(), QubotraderError> {
    if initial_capital.is_finite() && initial_capital > 0.0 {
        Ok(())
    } else {
        Err(QubotraderError::invalid(
            "backtest",
            "initial_capital",
            "initial_capital must be positive",
        ))
    }
}

/// Recoverable per-day condition; trading for that date was skipped.
#[derive(Debug, Clone, PartialEq)]
pub enum DayWarning {
    DataGap { date: NaiveDate, asset: String },
}

impl fmt::Display for DayWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DayWarning::DataGap { date, asset } => {
                write!(f, "{}: missing price for {}, trading skipped", date, asset)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestResult {
    pub equity_curve: Vec<EquityPoint>,
    pub trade_stats: TradeStats,
    pub trades: Vec<TradeRecord>,
    pub day_warnings: Vec<DayWarning>,
    pub final_state: PortfolioState,
    pub cancelled: bool,
}

/// Replay `choices` over `prices`.
///
/// Dates of `prices` without an entry in `choices` have an empty target set.
/// Fails only on invalid configuration, before any simulation starts.
pub fn run_backtest(
    prices: &PriceTable,
    choices: &DailyChoices,
    initial_capital: f64,
    costs: &CostConfig,
    cancel: Option<&CancelFlag>,
) -> Result<BacktestResult, QubotraderError> {
    validate_capital(initial_capital)?;
    costs.validate()?;

    let mut engine = Engine::new(initial_capital, costs);
    let empty = BTreeSet::new();

    for (row, &date) in prices.dates().iter().enumerate() {
        if is_cancelled(cancel) {
            tracing::info!(%date, "backtest cancelled");
            engine.cancelled = true;
            break;
        }
        let targets = choices.get(&date).unwrap_or(&empty);
        engine.step(prices, row, date, targets);
    }

    tracing::info!(
        days = engine.equity_curve.len(),
        trades = engine.stats.total_trades,
        "backtest finished"
    );

    Ok(engine.finish())
}

struct Engine<'a> {
    costs: &'a CostConfig,
    state: PortfolioState,
    last_price: HashMap<String, f64>,
    equity_curve: Vec<EquityPoint>,
    trades: Vec<TradeRecord>,
    stats: TradeStats,
    warnings: Vec<DayWarning>,
    cancelled: bool,
}

impl<'a> Engine<'a> {
    fn new(initial_capital: f64, costs: &'a CostConfig) -> Self {
        Engine {
            costs,
            state: PortfolioState::new(initial_capital),
            last_price: HashMap::new(),
            equity_curve: Vec::new(),
            trades: Vec::new(),
            stats: TradeStats::default(),
            warnings: Vec::new(),
            cancelled: false,
        }
    }

    fn step(&mut self, prices: &PriceTable, row: usize, date: NaiveDate, targets: &BTreeSet<String>) {
        for asset in prices.assets() {
            if let Some(p) = prices.price(asset, row) {
                self.last_price.insert(asset.clone(), p);
            }
        }

        // Value
        let held = self.state.held_assets();
        let mut gap = held
            .iter()
            .find(|a| prices.price(a, row).is_none())
            .cloned();
        let last_price = &self.last_price;
        let value = self.state.total_value(|a| last_price.get(a).copied());
        self.equity_curve.push(EquityPoint { date, value });

        if gap.is_none() {
            gap = targets
                .iter()
                .filter(|a| !held.contains(*a))
                .find(|a| prices.price(a, row).is_none())
                .cloned();
        }
        if let Some(asset) = gap {
            tracing::warn!(%date, %asset, "missing price, skipping trades for the day");
            self.warnings.push(DayWarning::DataGap { date, asset });
            return;
        }

        // Sell
        for asset in held.iter().filter(|a| !targets.contains(*a)) {
            let Some(price) = prices.price(asset, row) else {
                continue;
            };
            if let Some(trade) = execute_sell(&mut self.state, asset, price, date, self.costs) {
                self.record(trade);
            }
        }

        // Buy
        if targets.is_empty() {
            return;
        }
        let cash_per_asset = self.state.cash / targets.len() as f64;
        for asset in targets.iter().filter(|a| !held.contains(*a)) {
            let Some(price) = prices.price(asset, row) else {
                continue;
            };
            let trade = execute_buy(&mut self.state, asset, price, cash_per_asset, date, self.costs);
            self.record(trade);
        }
        debug_assert!(self.state.cash >= -1e-9 * self.state.initial_capital);
    }

    fn record(&mut self, trade: TradeRecord) {
        tracing::debug!(
            date = %trade.date,
            asset = %trade.asset_id,
            side = ?trade.side,
            quantity = trade.quantity,
            price = trade.executed_price,
            "trade"
        );
        self.stats.record(&trade);
        self.trades.push(trade);
    }

    fn finish(self) -> BacktestResult {
        BacktestResult {
            equity_curve: self.equity_curve,
            trade_stats: self.stats,
            trades: self.trades,
            day_warnings: self.warnings,
            final_state: self.state,
            cancelled: self.cancelled,
        }
    }
}

#![allow(dead_code)]

use chrono::NaiveDate;
use qubotrader::domain::config_validation::{RunConfig, ScoringConfig, ScoringMethod};
use qubotrader::domain::constraint::Constraint;
use qubotrader::domain::error::QubotraderError;
use qubotrader::domain::execution::CostConfig;
use qubotrader::domain::objective::{ObjectiveConfig, ScoreMap};
use qubotrader::domain::optimizer::OptimizerConfig;
use qubotrader::domain::price::PriceTable;
use qubotrader::domain::solver::SolverChoice;
use qubotrader::ports::price_port::PriceSource;
use qubotrader::ports::score_port::ScoreProvider;
use std::collections::{BTreeMap, HashMap};

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Consecutive calendar days starting 2024-01-01.
pub fn dates(n: usize) -> Vec<NaiveDate> {
    (0..n)
        .map(|i| date(2024, 1, 1) + chrono::Duration::days(i as i64))
        .collect()
}

/// Table with one fully priced column per asset.
pub fn make_table(columns: &[(&str, Vec<f64>)]) -> PriceTable {
    let len = columns.first().map(|(_, c)| c.len()).unwrap_or(0);
    let cols: BTreeMap<String, Vec<Option<f64>>> = columns
        .iter()
        .map(|(a, c)| (a.to_string(), c.iter().map(|p| Some(*p)).collect()))
        .collect();
    PriceTable::new(dates(len), cols).unwrap()
}

/// Three assets with distinct trends plus some noise.
pub fn trending_prices(n: usize) -> PriceTable {
    let wave = |i: usize| if i % 2 == 0 { 1.0 } else { -1.0 };
    make_table(&[
        ("AAA", (0..n).map(|i| 100.0 * 1.01_f64.powi(i as i32) + wave(i)).collect()),
        ("BBB", (0..n).map(|i| 50.0 * 1.004_f64.powi(i as i32) - wave(i) * 0.5).collect()),
        ("CCC", (0..n).map(|i| 80.0 * 0.99_f64.powi(i as i32) + wave(i) * 0.3).collect()),
        ("DDD", (0..n).map(|i| 20.0 + (i % 5) as f64).collect()),
    ])
}

pub fn sample_run_config() -> RunConfig {
    RunConfig {
        initial_capital: 10_000.0,
        costs: CostConfig {
            fee_pct: 0.001,
            slippage_pct: 0.0005,
        },
        risk_free_rate: 0.02,
        optimizer: OptimizerConfig {
            objective: ObjectiveConfig {
                q_factor: 0.5,
                candidate_limit: None,
            },
            constraint: Constraint::new(1, 2),
            lookback_days: 0,
            warmup_days: 3,
        },
        solver: SolverChoice::Exact,
        scoring: ScoringConfig {
            method: ScoringMethod::Momentum,
            window: 3,
        },
        forward_fill: false,
    }
}

pub struct MockPriceSource {
    pub table: Option<PriceTable>,
}

impl PriceSource for MockPriceSource {
    fn load_prices(&self) -> Result<PriceTable, QubotraderError> {
        self.table.clone().ok_or_else(|| QubotraderError::PriceData {
            reason: "no data".into(),
        })
    }
}

/// Returns preset scores keyed by the last date of the history window.
pub struct FixedScorer {
    pub by_date: HashMap<NaiveDate, ScoreMap>,
}

impl FixedScorer {
    pub fn new() -> Self {
        Self {
            by_date: HashMap::new(),
        }
    }

    pub fn with_scores(mut self, date: NaiveDate, scores: &[(&str, f64)]) -> Self {
        self.by_date.insert(
            date,
            scores.iter().map(|(a, s)| (a.to_string(), *s)).collect(),
        );
        self
    }
}

impl ScoreProvider for FixedScorer {
    fn name(&self) -> &'static str {
        "fixed"
    }

    fn scores(&self, history: &PriceTable) -> ScoreMap {
        history
            .dates()
            .last()
            .and_then(|d| self.by_date.get(d).cloned())
            .unwrap_or_default()
    }
}

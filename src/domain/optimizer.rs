//! Per-day portfolio selection and the walk-forward loop.

use chrono::NaiveDate;
use rayon::prelude::*;
use std::collections::BTreeMap;

use super::backtest::DailyChoices;
use super::cancel::{CancelFlag, is_cancelled};
use super::constraint::Constraint;
use super::error::QubotraderError;
use super::objective::{ObjectiveConfig, ScoreMap, build_objective};
use super::price::PriceTable;
use super::solver::{SelectionResult, SelectionWarning, Solver};
use crate::ports::score_port::ScoreProvider;

/// Choose today's assets from `scores` and the trailing `history`.
///
/// No asset with a positive score yields an empty selection with a
/// `NoPositiveScore` warning and the solver is not invoked.
pub fn optimize_day(
    scores: &ScoreMap,
    history: &PriceTable,
    objective_config: &ObjectiveConfig,
    constraint: &Constraint,
    solver: &dyn Solver,
    cancel: Option<&CancelFlag>,
) -> SelectionResult {
    match build_objective(scores, history, objective_config) {
        Ok(objective) => solver.solve(&objective, constraint, cancel),
        Err(QubotraderError::EmptyCandidateSet) => {
            SelectionResult::with_warning(SelectionWarning::NoPositiveScore)
        }
        Err(e) => {
            tracing::warn!(error = %e, "objective could not be built");
            SelectionResult::empty()
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OptimizerConfig {
    pub objective: ObjectiveConfig,
    pub constraint: Constraint,
    /// Rows of history per decision, decision row included. 0 = all rows so far.
    pub lookback_days: usize,
    /// Leading rows that never trade.
    pub warmup_days: usize,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        OptimizerConfig {
            objective: ObjectiveConfig::default(),
            constraint: Constraint::default(),
            lookback_days: 0,
            warmup_days: 10,
        }
    }
}

impl OptimizerConfig {
    /// History rows `start..=row` visible on decision row `row`.
    pub fn history_start(&self, row: usize) -> usize {
        if self.lookback_days == 0 {
            0
        } else {
            (row + 1).saturating_sub(self.lookback_days)
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DaySelection {
    pub date: NaiveDate,
    pub scores: ScoreMap,
    pub result: SelectionResult,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DailySelections {
    pub days: BTreeMap<NaiveDate, DaySelection>,
    pub cancelled: bool,
}

impl DailySelections {
    /// Target sets keyed by date, as consumed by the backtest engine.
    pub fn choices(&self) -> DailyChoices {
        self.days
            .iter()
            .map(|(date, day)| (*date, day.result.chosen_assets.clone()))
            .collect()
    }

    pub fn warning_count(&self) -> usize {
        self.days.values().map(|d| d.result.warnings.len()).sum()
    }
}

/// Walk forward over `prices`, solving every decision row independently.
///
/// Row `i` only sees rows up to and including `i`. Rows before
/// `warmup_days` get an empty selection. Days left unsolved after
/// cancellation are absent from the map.
pub fn compute_daily_selections(
    prices: &PriceTable,
    scorer: &dyn ScoreProvider,
    config: &OptimizerConfig,
    solver: &dyn Solver,
    cancel: Option<&CancelFlag>,
) -> DailySelections {
    tracing::info!(
        days = prices.len(),
        solver = solver.name(),
        scorer = scorer.name(),
        "computing daily selections"
    );

    let solved: Vec<Option<DaySelection>> = (0..prices.len())
        .into_par_iter()
        .map(|row| {
            if is_cancelled(cancel) {
                return None;
            }
            let date = prices.dates()[row];
            if row < config.warmup_days {
                return Some(DaySelection {
                    date,
                    scores: ScoreMap::new(),
                    result: SelectionResult::empty(),
                });
            }

            let history = prices.window(config.history_start(row), row);
            let scores = scorer.scores(&history);
            let result = optimize_day(
                &scores,
                &history,
                &config.objective,
                &config.constraint,
                solver,
                cancel,
            );
            if result.was_cancelled() {
                return None;
            }
            for warning in &result.warnings {
                tracing::warn!(%date, %warning, "selection warning");
            }
            tracing::debug!(
                %date,
                chosen = ?result.chosen_assets,
                objective = result.objective_value,
                "day solved"
            );
            Some(DaySelection {
                date,
                scores,
                result,
            })
        })
        .collect();

    let mut selections = DailySelections::default();
    for day in solved {
        match day {
            Some(day) => {
                selections.days.insert(day.date, day);
            }
            None => selections.cancelled = true,
        }
    }

    if selections.cancelled {
        tracing::info!(solved = selections.days.len(), "selection cancelled");
    }
    selections
}

//! Solver backends for the binary selection problem.
//!
//! Every backend maximizes [`Objective`] under a [`Constraint`] and must never
//! return a selection outside the cardinality bounds. Infeasible inputs yield
//! an empty selection carrying a warning instead of an error.

pub mod approximate;
pub mod exact;

use std::collections::BTreeSet;
use std::fmt;

use super::cancel::CancelFlag;
use super::constraint::Constraint;
use super::objective::Objective;

pub use approximate::ApproximateSolver;
pub use exact::ExactSolver;

/// Relative tolerance under which two objective values count as equal.
pub const TIE_TOLERANCE: f64 = 1e-12;

/// Recoverable conditions attached to a day's selection.
#[derive(Debug, Clone, PartialEq)]
pub enum SelectionWarning {
    NoPositiveScore,
    Infeasible {
        min_assets: usize,
        max_assets: usize,
        candidates: usize,
    },
    Cancelled,
}

impl fmt::Display for SelectionWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectionWarning::NoPositiveScore => write!(f, "no asset has a positive score"),
            SelectionWarning::Infeasible {
                min_assets,
                max_assets,
                candidates,
            } => write!(
                f,
                "infeasible constraint: need {}..={} assets, have {} candidates",
                min_assets, max_assets, candidates
            ),
            SelectionWarning::Cancelled => write!(f, "solve cancelled"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SelectionResult {
    pub chosen_assets: BTreeSet<String>,
    pub objective_value: f64,
    pub warnings: Vec<SelectionWarning>,
}

impl SelectionResult {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_warning(warning: SelectionWarning) -> Self {
        SelectionResult {
            warnings: vec![warning],
            ..Self::default()
        }
    }

    pub fn from_indices(objective: &Objective, chosen: &[usize], objective_value: f64) -> Self {
        SelectionResult {
            chosen_assets: chosen.iter().map(|&i| objective.assets[i].clone()).collect(),
            objective_value,
            warnings: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.chosen_assets.is_empty()
    }

    pub fn len(&self) -> usize {
        self.chosen_assets.len()
    }

    pub fn was_cancelled(&self) -> bool {
        self.warnings.contains(&SelectionWarning::Cancelled)
    }
}

pub trait Solver: Send + Sync {
    fn name(&self) -> &'static str;

    fn solve(
        &self,
        objective: &Objective,
        constraint: &Constraint,
        cancel: Option<&CancelFlag>,
    ) -> SelectionResult;
}

/// Which backend a run uses, as read from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolverChoice {
    Exact,
    Approximate { seed: u64, reads: usize, sweeps: usize },
}

impl SolverChoice {
    pub fn build(&self) -> Box<dyn Solver> {
        match *self {
            SolverChoice::Exact => Box::new(ExactSolver),
            SolverChoice::Approximate {
                seed,
                reads,
                sweeps,
            } => Box::new(ApproximateSolver {
                reads,
                sweeps,
                ..ApproximateSolver::new(seed)
            }),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SolverChoice::Exact => "exact",
            SolverChoice::Approximate { .. } => "approximate",
        }
    }
}

/// Cardinality bounds for `objective`, or the empty result to return when
/// the constraint cannot be met.
pub(crate) fn feasible_bounds(
    objective: &Objective,
    constraint: &Constraint,
) -> Result<(usize, usize), SelectionResult> {
    constraint.bounds_for(objective.len()).map_err(|_| {
        tracing::warn!(
            min_assets = constraint.min_assets,
            max_assets = constraint.max_assets,
            candidates = objective.len(),
            "infeasible cardinality constraint, returning empty selection"
        );
        SelectionResult::with_warning(SelectionWarning::Infeasible {
            min_assets: constraint.min_assets,
            max_assets: constraint.max_assets,
            candidates: objective.len(),
        })
    })
}

/// Whether `(value, chosen)` beats the incumbent: strictly higher objective,
/// or an equal objective with a lexicographically smaller index list.
pub(crate) fn improves(value: f64, chosen: &[usize], best: Option<(f64, &[usize])>) -> bool {
    match best {
        None => true,
        Some((best_value, best_chosen)) => {
            let tol = TIE_TOLERANCE * best_value.abs().max(1.0);
            if value > best_value + tol {
                true
            } else if value >= best_value - tol {
                chosen < best_chosen
            } else {
                false
            }
        }
    }
}

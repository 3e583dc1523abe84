//! Deterministic global optimum.
//!
//! Up to [`EXHAUSTIVE_LIMIT`] candidates every admissible combination is
//! scored. Above that a depth-first branch-and-bound search is used; its bound
//! never underestimates the best completion, so both paths return the same
//! optimum and the same tie-break winner. A node whose bound merely ties the
//! incumbent is cut unless its prefix can still sort before it.

use std::cmp::Ordering;

use super::{SelectionResult, SelectionWarning, Solver, TIE_TOLERANCE, feasible_bounds, improves};
use crate::domain::cancel::CancelFlag;
use crate::domain::constraint::Constraint;
use crate::domain::objective::Objective;

pub const EXHAUSTIVE_LIMIT: usize = 20;

const CANCEL_CHECK_INTERVAL: u64 = 4096;

#[derive(Debug, Clone, Copy, Default)]
pub struct ExactSolver;

impl Solver for ExactSolver {
    fn name(&self) -> &'static str {
        "exact"
    }

    fn solve(
        &self,
        objective: &Objective,
        constraint: &Constraint,
        cancel: Option<&CancelFlag>,
    ) -> SelectionResult {
        let (min, max) = match feasible_bounds(objective, constraint) {
            Ok(bounds) => bounds,
            Err(empty) => return empty,
        };

        let mut search = Search::new(objective, min, max, cancel);
        if objective.len() <= EXHAUSTIVE_LIMIT {
            search.enumerate();
        } else {
            search.branch_and_bound();
        }

        if search.cancelled {
            return SelectionResult::with_warning(SelectionWarning::Cancelled);
        }

        match search.best {
            Some((value, chosen)) => SelectionResult::from_indices(objective, &chosen, value),
            None => SelectionResult::empty(),
        }
    }
}

struct Search<'a> {
    objective: &'a Objective,
    min: usize,
    max: usize,
    cancel: Option<&'a CancelFlag>,
    steps: u64,
    cancelled: bool,
    best: Option<(f64, Vec<usize>)>,
}

impl<'a> Search<'a> {
    fn new(objective: &'a Objective, min: usize, max: usize, cancel: Option<&'a CancelFlag>) -> Self {
        Search {
            objective,
            min,
            max,
            cancel,
            steps: 0,
            cancelled: false,
            best: None,
        }
    }

    fn tick(&mut self) -> bool {
        self.steps += 1;
        if self.steps % CANCEL_CHECK_INTERVAL == 0
            && self.cancel.is_some_and(CancelFlag::is_cancelled)
        {
            self.cancelled = true;
        }
        self.cancelled
    }

    fn offer(&mut self, value: f64, chosen: &[usize]) {
        let incumbent = self.best.as_ref().map(|(v, c)| (*v, c.as_slice()));
        if improves(value, chosen, incumbent) {
            self.best = Some((value, chosen.to_vec()));
        }
    }

    /// Score every combination of size `min..=max` in lexicographic order.
    fn enumerate(&mut self) {
        let n = self.objective.len();
        for k in self.min..=self.max {
            let mut combo: Vec<usize> = (0..k).collect();
            loop {
                if self.tick() {
                    return;
                }
                let value = self.objective.evaluate(&combo);
                self.offer(value, &combo);

                // Advance to the next k-combination of 0..n.
                let Some(pos) = (0..k).rev().find(|&i| combo[i] < n - k + i) else {
                    break;
                };
                combo[pos] += 1;
                for i in pos + 1..k {
                    combo[i] = combo[i - 1] + 1;
                }
            }
        }
    }

    fn branch_and_bound(&mut self) {
        let n = self.objective.len();
        let q = &self.objective.quadratic;

        // half_gain[i][p]: Σ_{k ≥ p, k ≠ i} max(0, −(Q_ik + Q_ki)) / 2, the most
        // pairwise terms can add on top of the stand-alone contribution of i.
        let mut half_gain = vec![vec![0.0; n + 1]; n];
        for (i, row) in half_gain.iter_mut().enumerate() {
            for p in (0..n).rev() {
                let pair = if p == i {
                    0.0
                } else {
                    (-(q[(i, p)] + q[(p, i)])).max(0.0) / 2.0
                };
                row[p] = row[p + 1] + pair;
            }
        }

        let mut node = Node {
            chosen: Vec::with_capacity(self.max),
            value: 0.0,
            cross: vec![0.0; n],
        };
        self.descend(0, &mut node, &half_gain);
    }

    fn descend(&mut self, pos: usize, node: &mut Node, half_gain: &[Vec<f64>]) {
        if self.tick() {
            return;
        }
        let n = self.objective.len();

        if pos == n {
            if node.chosen.len() >= self.min && node.chosen.len() <= self.max {
                let value = node.value;
                let chosen = node.chosen.clone();
                self.offer(value, &chosen);
            }
            return;
        }

        let Some(bound) = self.upper_bound(pos, node, half_gain) else {
            return;
        };
        if let Some((best_value, best_chosen)) = &self.best {
            let tol = TIE_TOLERANCE * best_value.abs().max(1.0);
            if bound < best_value - tol {
                return;
            }
            // Within tolerance a completion can only win the tie-break.
            let stop_ties = node.chosen.len() >= self.min && node.value >= best_value - tol;
            if bound <= best_value + tol && !may_precede(&node.chosen, pos, best_chosen, stop_ties) {
                return;
            }
        }

        if node.chosen.len() < self.max {
            node.include(self.objective, pos);
            self.descend(pos + 1, node, half_gain);
            node.exclude_last(self.objective);
        }
        self.descend(pos + 1, node, half_gain);
    }

    /// Upper bound on any admissible completion of `node` over `pos..n`, or
    /// `None` when the minimum can no longer be reached.
    fn upper_bound(&self, pos: usize, node: &Node, half_gain: &[Vec<f64>]) -> Option<f64> {
        let n = self.objective.len();
        let size = node.chosen.len();
        let need = self.min.saturating_sub(size);
        let room = self.max - size;
        if need > n - pos {
            return None;
        }

        let mut gains: Vec<f64> = (pos..n)
            .map(|i| self.objective.contribution(i) - node.cross[i] + half_gain[i][pos])
            .collect();
        gains.sort_by(|a, b| b.partial_cmp(a).unwrap_or(Ordering::Equal));

        let extra: f64 = gains
            .iter()
            .take(room)
            .enumerate()
            .take_while(|(k, g)| *k < need || **g > 0.0)
            .map(|(_, g)| g)
            .sum();
        Some(node.value + extra)
    }
}

/// Whether some completion of `prefix` over `pos..n` can sort before `best`.
///
/// `stop_ties` says whether `prefix` on its own is admissible and ties the
/// incumbent; a proper prefix of `best` sorts first.
fn may_precede(prefix: &[usize], pos: usize, best: &[usize], stop_ties: bool) -> bool {
    for (a, b) in prefix.iter().zip(best) {
        match a.cmp(b) {
            Ordering::Less => return true,
            Ordering::Greater => return false,
            Ordering::Equal => {}
        }
    }
    match best.get(prefix.len()) {
        None => false,
        Some(&next) => stop_ties || pos <= next,
    }
}

struct Node {
    chosen: Vec<usize>,
    value: f64,
    /// cross[i] = Σ_{j ∈ chosen} (Q_ij + Q_ji)
    cross: Vec<f64>,
}

impl Node {
    fn include(&mut self, objective: &Objective, i: usize) {
        self.value += objective.contribution(i) - self.cross[i];
        for (k, c) in self.cross.iter_mut().enumerate() {
            *c += objective.quadratic[(i, k)] + objective.quadratic[(k, i)];
        }
        self.chosen.push(i);
    }

    fn exclude_last(&mut self, objective: &Objective) {
        if let Some(i) = self.chosen.pop() {
            for (k, c) in self.cross.iter_mut().enumerate() {
                *c -= objective.quadratic[(i, k)] + objective.quadratic[(k, i)];
            }
            self.value -= objective.contribution(i) - self.cross[i];
        }
    }
}

//! Seeded simulated-annealing heuristic.
//!
//! Each read starts from a uniformly drawn point of the unit cube, projects it
//! to a feasible binary vector and anneals with flip/swap moves that never
//! leave the cardinality bounds. The best state over all reads wins. No
//! optimality gap is promised, only feasibility and reproducibility for a
//! given seed.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::cmp::Ordering;

use super::{SelectionResult, SelectionWarning, Solver, feasible_bounds, improves};
use crate::domain::cancel::CancelFlag;
use crate::domain::constraint::Constraint;
use crate::domain::objective::Objective;

#[derive(Debug, Clone, PartialEq)]
pub struct ApproximateSolver {
    pub seed: u64,
    pub reads: usize,
    pub sweeps: usize,
    /// Start/end temperatures, relative to the objective's magnitude.
    pub initial_temperature: f64,
    pub final_temperature: f64,
}

impl ApproximateSolver {
    pub fn new(seed: u64) -> Self {
        ApproximateSolver {
            seed,
            reads: 16,
            sweeps: 200,
            initial_temperature: 1.0,
            final_temperature: 1e-3,
        }
    }

    fn temperature(&self, scale: f64, sweep: usize) -> f64 {
        let t0 = self.initial_temperature * scale;
        let t1 = self.final_temperature * scale;
        if self.sweeps <= 1 {
            return t1;
        }
        let frac = sweep as f64 / (self.sweeps - 1) as f64;
        t0 * (t1 / t0).powf(frac)
    }
}

impl Solver for ApproximateSolver {
    fn name(&self) -> &'static str {
        "approximate"
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
        let n = objective.len();
        if max == 0 {
            return SelectionResult::empty();
        }

        let scale = magnitude(objective);
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut best: Option<(f64, Vec<usize>)> = None;

        for _ in 0..self.reads.max(1) {
            let relaxed: Vec<f64> = (0..n).map(|_| rng.gen_range(0.0..1.0)).collect();
            let mut bits = project_to_feasible(&relaxed, objective, min, max);
            let mut count = bits.iter().filter(|&&b| b).count();
            let mut value = objective.evaluate_bits(&bits);
            offer(&mut best, value, &bits);

            for sweep in 0..self.sweeps {
                if cancel.is_some_and(CancelFlag::is_cancelled) {
                    return SelectionResult::with_warning(SelectionWarning::Cancelled);
                }
                let temperature = self.temperature(scale, sweep);

                for _ in 0..n {
                    let i = rng.gen_range(0..n);
                    let can_flip = if bits[i] { count > min } else { count < max };

                    let mut delta = flip_delta(objective, &bits, i);
                    bits[i] = !bits[i];
                    let mut partner = None;
                    if !can_flip {
                        // Swap with a coordinate in the opposite state.
                        let others: Vec<usize> =
                            (0..n).filter(|&j| j != i && bits[j] == bits[i]).collect();
                        if others.is_empty() {
                            bits[i] = !bits[i];
                            continue;
                        }
                        let j = others[rng.gen_range(0..others.len())];
                        delta += flip_delta(objective, &bits, j);
                        bits[j] = !bits[j];
                        partner = Some(j);
                    }

                    let accept = delta >= 0.0
                        || rng.gen_range(0.0..1.0) < (delta / temperature).exp();
                    if accept {
                        value += delta;
                        if partner.is_none() {
                            count = if bits[i] { count + 1 } else { count - 1 };
                        }
                        offer(&mut best, value, &bits);
                    } else {
                        bits[i] = !bits[i];
                        if let Some(j) = partner {
                            bits[j] = !bits[j];
                        }
                    }
                }
            }
        }

        match best {
            Some((_, chosen)) => {
                // Re-score from scratch so accumulated deltas carry no drift.
                let value = objective.evaluate(&chosen);
                SelectionResult::from_indices(objective, &chosen, value)
            }
            None => SelectionResult::empty(),
        }
    }
}

/// Round a relaxed point to binary and repair cardinality by stand-alone
/// contribution (`linear_i − quadratic_ii`, ties by index).
pub fn project_to_feasible(
    relaxed: &[f64],
    objective: &Objective,
    min: usize,
    max: usize,
) -> Vec<bool> {
    let mut bits: Vec<bool> = relaxed.iter().map(|v| v.round() >= 1.0).collect();

    let mut ranked: Vec<usize> = (0..bits.len()).collect();
    ranked.sort_by(|&a, &b| {
        objective
            .contribution(b)
            .partial_cmp(&objective.contribution(a))
            .unwrap_or(Ordering::Equal)
            .then(a.cmp(&b))
    });

    let count = bits.iter().filter(|&&b| b).count();
    if count > max {
        let mut kept = 0;
        for &i in &ranked {
            if bits[i] {
                if kept < max {
                    kept += 1;
                } else {
                    bits[i] = false;
                }
            }
        }
    } else if count < min {
        let mut added = count;
        for &i in &ranked {
            if added == min {
                break;
            }
            if !bits[i] {
                bits[i] = true;
                added += 1;
            }
        }
    }
    bits
}

/// Change in objective from flipping coordinate `i` of `bits`.
fn flip_delta(objective: &Objective, bits: &[bool], i: usize) -> f64 {
    let q = &objective.quadratic;
    let cross: f64 = bits
        .iter()
        .enumerate()
        .filter(|&(j, &b)| b && j != i)
        .map(|(j, _)| q[(i, j)] + q[(j, i)])
        .sum();
    let gain = objective.contribution(i) - cross;
    if bits[i] { -gain } else { gain }
}

fn magnitude(objective: &Objective) -> f64 {
    let linear = objective.linear.iter().fold(0.0_f64, |m, v| m.max(v.abs()));
    let quadratic = objective.quadratic.iter().fold(0.0_f64, |m, v| m.max(v.abs()));
    let scale = linear + quadratic;
    if scale > 0.0 { scale } else { 1.0 }
}

fn offer(best: &mut Option<(f64, Vec<usize>)>, value: f64, bits: &[bool]) {
    let chosen: Vec<usize> = bits
        .iter()
        .enumerate()
        .filter_map(|(i, &b)| b.then_some(i))
        .collect();
    let incumbent = best.as_ref().map(|(v, c)| (*v, c.as_slice()));
    if improves(value, &chosen, incumbent) {
        *best = Some((value, chosen));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::solver::ExactSolver;
    use approx::assert_relative_eq;
    use nalgebra::{DMatrix, DVector};

    fn objective(linear: &[f64], diag: f64) -> Objective {
        let n = linear.len();
        let mut q = DMatrix::zeros(n, n);
        for i in 0..n {
            q[(i, i)] = diag;
        }
        Objective {
            assets: (0..n).map(|i| format!("A{:02}", i)).collect(),
            mu: DVector::from_row_slice(linear),
            sigma: DMatrix::zeros(n, n),
            linear: DVector::from_row_slice(linear),
            quadratic: q,
        }
    }

    #[test]
    fn projection_rounds_coordinates() {
        let obj = objective(&[0.1, 0.2, 0.3], 0.0);
        let bits = project_to_feasible(&[0.9, 0.2, 0.6], &obj, 0, 3);
        assert_eq!(bits, vec![true, false, true]);
    }

    #[test]
    fn projection_trims_to_max_by_contribution() {
        let obj = objective(&[0.1, 0.3, 0.2], 0.0);
        let bits = project_to_feasible(&[1.0, 1.0, 1.0], &obj, 0, 2);
        assert_eq!(bits, vec![false, true, true]);
    }

    #[test]
    fn projection_fills_to_min_by_contribution() {
        let obj = objective(&[0.1, 0.3, 0.2], 0.0);
        let bits = project_to_feasible(&[0.0, 0.0, 0.0], &obj, 2, 3);
        assert_eq!(bits, vec![false, true, true]);
    }

    #[test]
    fn same_seed_same_result() {
        let obj = objective(&[0.12, 0.4, 0.05, 0.33, 0.21, 0.18], 0.02);
        let c = Constraint::new(1, 3);
        let a = ApproximateSolver::new(7).solve(&obj, &c, None);
        let b = ApproximateSolver::new(7).solve(&obj, &c, None);
        assert_eq!(a, b);
    }

    #[test]
    fn result_respects_cardinality() {
        let obj = objective(&[0.5, 0.4, 0.3, 0.2, 0.1], 0.0);
        for seed in 0..10 {
            let result = ApproximateSolver::new(seed).solve(&obj, &Constraint::new(2, 3), None);
            assert!(result.len() >= 2 && result.len() <= 3);
        }
    }

    #[test]
    fn finds_optimum_on_easy_problem() {
        let obj = objective(&[0.5, 0.1, 0.4, 0.05], 0.0);
        let c = Constraint::new(1, 2);
        let exact = ExactSolver.solve(&obj, &c, None);
        let approx = ApproximateSolver::new(3).solve(&obj, &c, None);
        assert_eq!(approx.chosen_assets, exact.chosen_assets);
        assert_relative_eq!(approx.objective_value, exact.objective_value, max_relative = 1e-9);
    }

    #[test]
    fn infeasible_returns_empty() {
        let obj = objective(&[0.5, 0.1], 0.0);
        let result = ApproximateSolver::new(1).solve(&obj, &Constraint::new(3, 3), None);
        assert!(result.is_empty());
        assert_eq!(result.warnings.len(), 1);
    }

    #[test]
    fn cancelled_before_first_sweep() {
        let obj = objective(&[0.5, 0.1, 0.2], 0.0);
        let flag = CancelFlag::new();
        flag.cancel();
        let result = ApproximateSolver::new(1).solve(&obj, &Constraint::new(1, 2), Some(&flag));
        assert!(result.was_cancelled());
    }

    #[test]
    fn flip_delta_matches_full_evaluation() {
        let mut obj = objective(&[0.3, 0.2, 0.1], 0.05);
        obj.quadratic[(0, 1)] = 0.02;
        obj.quadratic[(1, 0)] = 0.02;
        let bits = vec![true, false, true];
        let before = obj.evaluate_bits(&bits);
        let mut flipped = bits.clone();
        flipped[1] = true;
        let after = obj.evaluate_bits(&flipped);
        assert_relative_eq!(flip_delta(&obj, &bits, 1), after - before, epsilon = 1e-12);
    }
}

//! Return/risk objective over binary selection variables.
//!
//! The objective maximized by every solver is
//! `f(x) = linear·x − xᵀ·quadratic·x` with `x ∈ {0,1}ⁿ`, where
//! `linear = q·mu` (today's scores) and `quadratic = (1−q)·sigma`
//! (covariance of historical daily returns).

use nalgebra::{DMatrix, DVector};
use std::cmp::Ordering;
use std::collections::BTreeMap;

use super::error::QubotraderError;
use super::price::PriceTable;

/// Per-asset predicted scores for one day.
pub type ScoreMap = BTreeMap<String, f64>;

#[derive(Debug, Clone, PartialEq)]
pub struct ObjectiveConfig {
    /// Balance between return (`1.0`) and risk (`0.0`).
    pub q_factor: f64,
    /// Keep only the N highest-scoring candidates, if set.
    pub candidate_limit: Option<usize>,
}

impl Default for ObjectiveConfig {
    fn default() -> Self {
        ObjectiveConfig {
            q_factor: 0.5,
            candidate_limit: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Objective {
    /// Candidate asset ids, ascending.
    pub assets: Vec<String>,
    pub mu: DVector<f64>,
    pub sigma: DMatrix<f64>,
    pub linear: DVector<f64>,
    pub quadratic: DMatrix<f64>,
}

impl Objective {
    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    /// Objective value of the selection given by candidate indices.
    pub fn evaluate(&self, chosen: &[usize]) -> f64 {
        let gain: f64 = chosen.iter().map(|&i| self.linear[i]).sum();
        let risk: f64 = chosen
            .iter()
            .map(|&i| chosen.iter().map(|&j| self.quadratic[(i, j)]).sum::<f64>())
            .sum();
        gain - risk
    }

    /// Objective value of a binary vector.
    pub fn evaluate_bits(&self, bits: &[bool]) -> f64 {
        let chosen: Vec<usize> = bits
            .iter()
            .enumerate()
            .filter_map(|(i, &b)| b.then_some(i))
            .collect();
        self.evaluate(&chosen)
    }

    /// Stand-alone contribution of one coordinate: `linear_i − quadratic_ii`.
    pub fn contribution(&self, i: usize) -> f64 {
        self.linear[i] - self.quadratic[(i, i)]
    }
}

/// Build today's objective from scores and a price history window.
///
/// Only assets with a finite positive score (and a column in `history`)
/// become candidates. Fails with `EmptyCandidateSet` when none qualify.
pub fn build_objective(
    scores: &ScoreMap,
    history: &PriceTable,
    config: &ObjectiveConfig,
) -> Result<Objective, QubotraderError> {
    let mut candidates: Vec<(&String, f64)> = scores
        .iter()
        .filter(|(asset, score)| score.is_finite() && **score > 0.0 && history.series(asset).is_some())
        .map(|(asset, &score)| (asset, score))
        .collect();

    if let Some(limit) = config.candidate_limit {
        candidates.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.0.cmp(b.0))
        });
        candidates.truncate(limit);
        candidates.sort_by(|a, b| a.0.cmp(b.0));
    }

    if candidates.is_empty() {
        return Err(QubotraderError::EmptyCandidateSet);
    }

    let assets: Vec<String> = candidates.iter().map(|(a, _)| (*a).clone()).collect();
    let mu = DVector::from_iterator(candidates.len(), candidates.iter().map(|(_, s)| *s));
    let sigma = covariance(&history.joint_returns(&assets), assets.len());

    let q = config.q_factor;
    let linear = &mu * q;
    let quadratic = &sigma * (1.0 - q);

    Ok(Objective {
        assets,
        mu,
        sigma,
        linear,
        quadratic,
    })
}

/// Sample covariance (divisor `n − 1`) of return rows; zero matrix when fewer
/// than two observations exist.
pub fn covariance(rows: &[Vec<f64>], dim: usize) -> DMatrix<f64> {
    let n = rows.len();
    if n < 2 {
        return DMatrix::zeros(dim, dim);
    }

    let means: Vec<f64> = (0..dim)
        .map(|j| rows.iter().map(|r| r[j]).sum::<f64>() / n as f64)
        .collect();

    let mut cov = DMatrix::zeros(dim, dim);
    for i in 0..dim {
        for j in i..dim {
            let s: f64 = rows
                .iter()
                .map(|r| (r[i] - means[i]) * (r[j] - means[j]))
                .sum();
            let v = s / (n - 1) as f64;
            cov[(i, j)] = v;
            cov[(j, i)] = v;
        }
    }
    cov
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;

    fn table(cols: &[(&str, &[f64])]) -> PriceTable {
        let len = cols[0].1.len();
        let dates = (0..len)
            .map(|i| {
                NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + chrono::Duration::days(i as i64)
            })
            .collect();
        let columns = cols
            .iter()
            .map(|(a, p)| (a.to_string(), p.iter().map(|&v| Some(v)).collect()))
            .collect();
        PriceTable::new(dates, columns).unwrap()
    }

    fn scores(pairs: &[(&str, f64)]) -> ScoreMap {
        pairs.iter().map(|(a, s)| (a.to_string(), *s)).collect()
    }

    #[test]
    fn non_positive_scores_are_excluded() {
        let history = table(&[
            ("A", &[1.0, 1.1, 1.2]),
            ("B", &[1.0, 0.9, 0.8]),
            ("C", &[1.0, 1.0, 1.0]),
        ]);
        let obj = build_objective(
            &scores(&[("A", 0.3), ("B", -0.1), ("C", 0.0)]),
            &history,
            &ObjectiveConfig::default(),
        )
        .unwrap();
        assert_eq!(obj.assets, vec!["A".to_string()]);
    }

    #[test]
    fn empty_candidate_set() {
        let history = table(&[("A", &[1.0, 1.1])]);
        let result = build_objective(
            &scores(&[("A", -1.0)]),
            &history,
            &ObjectiveConfig::default(),
        );
        assert!(matches!(result, Err(QubotraderError::EmptyCandidateSet)));
    }

    #[test]
    fn nan_score_is_not_a_candidate() {
        let history = table(&[("A", &[1.0, 1.1])]);
        let result = build_objective(
            &scores(&[("A", f64::NAN)]),
            &history,
            &ObjectiveConfig::default(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn sigma_is_zero_with_short_history() {
        let history = table(&[("A", &[1.0, 1.1]), ("B", &[2.0, 2.5])]);
        let obj = build_objective(
            &scores(&[("A", 0.5), ("B", 0.2)]),
            &history,
            &ObjectiveConfig::default(),
        )
        .unwrap();
        assert_eq!(obj.sigma, DMatrix::zeros(2, 2));
    }

    #[test]
    fn linear_and_quadratic_are_scaled_by_q() {
        let history = table(&[("A", &[1.0, 1.1, 1.0, 1.2]), ("B", &[1.0, 1.0, 1.1, 1.0])]);
        let config = ObjectiveConfig {
            q_factor: 0.25,
            candidate_limit: None,
        };
        let obj = build_objective(&scores(&[("A", 0.4), ("B", 0.8)]), &history, &config).unwrap();
        assert_relative_eq!(obj.linear[0], 0.1, max_relative = 1e-12);
        assert_relative_eq!(obj.linear[1], 0.2, max_relative = 1e-12);
        assert_relative_eq!(obj.quadratic[(0, 1)], 0.75 * obj.sigma[(0, 1)], max_relative = 1e-12);
        assert_relative_eq!(obj.sigma[(0, 1)], obj.sigma[(1, 0)]);
    }

    #[test]
    fn covariance_matches_hand_computation() {
        let rows = vec![vec![0.1, 0.2], vec![0.3, 0.0], vec![0.2, 0.1]];
        let cov = covariance(&rows, 2);
        assert_relative_eq!(cov[(0, 0)], 0.01, epsilon = 1e-12);
        assert_relative_eq!(cov[(1, 1)], 0.01, epsilon = 1e-12);
        assert_relative_eq!(cov[(0, 1)], -0.01, epsilon = 1e-12);
    }

    #[test]
    fn candidate_limit_keeps_top_scores() {
        let history = table(&[("A", &[1.0, 1.0]), ("B", &[1.0, 1.0]), ("C", &[1.0, 1.0])]);
        let config = ObjectiveConfig {
            q_factor: 1.0,
            candidate_limit: Some(2),
        };
        let obj = build_objective(
            &scores(&[("A", 0.1), ("B", 0.9), ("C", 0.5)]),
            &history,
            &config,
        )
        .unwrap();
        assert_eq!(obj.assets, vec!["B".to_string(), "C".to_string()]);
    }

    #[test]
    fn evaluate_subtracts_risk() {
        let obj = Objective {
            assets: vec!["A".into(), "B".into()],
            mu: DVector::from_vec(vec![1.0, 2.0]),
            sigma: DMatrix::zeros(2, 2),
            linear: DVector::from_vec(vec![1.0, 2.0]),
            quadratic: DMatrix::from_row_slice(2, 2, &[0.5, 0.1, 0.1, 0.2]),
        };
        assert_relative_eq!(obj.evaluate(&[0, 1]), 3.0 - 0.9, max_relative = 1e-12);
        assert_relative_eq!(obj.evaluate_bits(&[false, true]), 1.8, max_relative = 1e-12);
        assert_relative_eq!(obj.contribution(0), 0.5, max_relative = 1e-12);
    }
}

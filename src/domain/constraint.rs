//! Cardinality bounds on the daily selection.

use super::error::QubotraderError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Constraint {
    pub min_assets: usize,
    pub max_assets: usize,
}

impl Constraint {
    pub fn new(min_assets: usize, max_assets: usize) -> Self {
        Constraint {
            min_assets,
            max_assets,
        }
    }

    /// Effective `(min, max)` cardinality over `candidates` assets, or an
    /// `InfeasibleConstraint` error when no selection size fits.
    pub fn bounds_for(&self, candidates: usize) -> Result<(usize, usize), QubotraderError> {
        let max = self.max_assets.min(candidates);
        if self.min_assets > self.max_assets || self.min_assets > candidates {
            return Err(QubotraderError::InfeasibleConstraint {
                min_assets: self.min_assets,
                max_assets: self.max_assets,
                candidates,
            });
        }
        Ok((self.min_assets, max))
    }
}

impl Default for Constraint {
    fn default() -> Self {
        Constraint {
            min_assets: 1,
            max_assets: 2,
        }
    }
}

//! Per-day asset scoring port.

use crate::domain::objective::ScoreMap;
use crate::domain::price::PriceTable;

/// Produces one score per asset for the last row of `history`.
///
/// `history` never extends past the decision date. Implementations are
/// called from several threads at once.
pub trait ScoreProvider: Send + Sync {
    fn name(&self) -> &'static str;

    fn scores(&self, history: &PriceTable) -> ScoreMap;
}

//! Price-derived score providers.

use crate::domain::objective::ScoreMap;
use crate::domain::price::{PriceTable, daily_returns};
use crate::ports::score_port::ScoreProvider;

/// Mean of the last `window` daily returns.
///
/// Assets without `window` consecutive priced returns at the end of the
/// history score 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MomentumScorer {
    pub window: usize,
}

impl ScoreProvider for MomentumScorer {
    fn name(&self) -> &'static str {
        "momentum"
    }

    fn scores(&self, history: &PriceTable) -> ScoreMap {
        history
            .assets()
            .iter()
            .filter_map(|asset| {
                let series = history.series(asset)?;
                let tail = &series[series.len().saturating_sub(self.window + 1)..];
                let returns = daily_returns(tail);
                let score = if self.window > 0 && returns.len() == self.window {
                    returns.iter().sum::<f64>() / self.window as f64
                } else {
                    0.0
                };
                Some((asset.clone(), score))
            })
            .collect()
    }
}

/// `+1` when the last price is above its moving average, `-1` when below,
/// `0` otherwise (including a missing last price).
///
/// The average covers the priced cells among the last `window` rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaSignalScorer {
    pub window: usize,
}

impl ScoreProvider for MaSignalScorer {
    fn name(&self) -> &'static str {
        "ma_signal"
    }

    fn scores(&self, history: &PriceTable) -> ScoreMap {
        history
            .assets()
            .iter()
            .filter_map(|asset| {
                let series = history.series(asset)?;
                let tail = &series[series.len().saturating_sub(self.window)..];
                let priced: Vec<f64> = tail.iter().flatten().copied().collect();
                let score = match (series.last().copied().flatten(), priced.is_empty()) {
                    (Some(last), false) => {
                        let ma = priced.iter().sum::<f64>() / priced.len() as f64;
                        if last > ma {
                            1.0
                        } else if last < ma {
                            -1.0
                        } else {
                            0.0
                        }
                    }
                    _ => 0.0,
                };
                Some((asset.clone(), score))
            })
            .collect()
    }
}

//! Date-indexed price table shared by the optimizer and the backtest engine.
//!
//! Columns are keyed by asset id and kept in ascending id order. A cell is
//! `None` when the asset has no price on that date (a column that starts later
//! than the table, or a gap in the input).

use chrono::NaiveDate;
use std::collections::{BTreeMap, HashMap};

use super::error::QubotraderError;

#[derive(Debug, Clone, PartialEq)]
pub struct PriceTable {
    dates: Vec<NaiveDate>,
    assets: Vec<String>,
    columns: Vec<Vec<Option<f64>>>,
    asset_index: HashMap<String, usize>,
}

impl PriceTable {
    /// Build a table from strictly ascending dates and one column per asset.
    ///
    /// NaN cells become `None`. Non-positive or infinite prices are rejected.
    pub fn new(
        dates: Vec<NaiveDate>,
        columns: BTreeMap<String, Vec<Option<f64>>>,
    ) -> Result<Self, QubotraderError> {
        if let Some(pair) = dates.windows(2).find(|w| w[0] >= w[1]) {
            return Err(QubotraderError::PriceData {
                reason: format!("dates not strictly ascending at {}", pair[1]),
            });
        }

        let mut assets = Vec::with_capacity(columns.len());
        let mut cols = Vec::with_capacity(columns.len());
        for (asset, column) in columns {
            if column.len() != dates.len() {
                return Err(QubotraderError::PriceData {
                    reason: format!(
                        "column {} has {} rows, expected {}",
                        asset,
                        column.len(),
                        dates.len()
                    ),
                });
            }
            let mut cleaned = Vec::with_capacity(column.len());
            for (row, cell) in column.into_iter().enumerate() {
                match cell {
                    Some(p) if p.is_nan() => cleaned.push(None),
                    Some(p) if !p.is_finite() || p <= 0.0 => {
                        return Err(QubotraderError::PriceData {
                            reason: format!("non-positive price {} for {} on {}", p, asset, dates[row]),
                        });
                    }
                    other => cleaned.push(other),
                }
            }
            assets.push(asset);
            cols.push(cleaned);
        }

        let asset_index = assets
            .iter()
            .enumerate()
            .map(|(i, a)| (a.clone(), i))
            .collect();

        Ok(PriceTable {
            dates,
            assets,
            columns: cols,
            asset_index,
        })
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn assets(&self) -> &[String] {
        &self.assets
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn series(&self, asset: &str) -> Option<&[Option<f64>]> {
        self.asset_index
            .get(asset)
            .map(|&i| self.columns[i].as_slice())
    }

    pub fn price(&self, asset: &str, row: usize) -> Option<f64> {
        self.series(asset).and_then(|s| s.get(row).copied().flatten())
    }

    /// Rows `start..=end` as a new table. Out-of-range bounds are clamped.
    pub fn window(&self, start: usize, end: usize) -> PriceTable {
        let end = end.min(self.dates.len().saturating_sub(1));
        if self.dates.is_empty() || start > end {
            return PriceTable {
                dates: Vec::new(),
                assets: self.assets.clone(),
                columns: vec![Vec::new(); self.assets.len()],
                asset_index: self.asset_index.clone(),
            };
        }
        let dates: Vec<NaiveDate> = self.dates[start..=end].to_vec();
        PriceTable {
            dates,
            assets: self.assets.clone(),
            columns: self
                .columns
                .iter()
                .map(|c| c[start..=end].to_vec())
                .collect(),
            asset_index: self.asset_index.clone(),
        }
    }

    /// Carry the last seen price forward over missing cells.
    ///
    /// Leading gaps (before an asset's first price) stay empty.
    pub fn forward_fill(&mut self) {
        for column in &mut self.columns {
            let mut last = None;
            for cell in column.iter_mut() {
                match cell {
                    Some(p) => last = Some(*p),
                    None => *cell = last,
                }
            }
        }
    }

    /// Daily percentage returns for the given assets, one row per date pair
    /// where every listed asset is priced on both days.
    pub fn joint_returns(&self, assets: &[String]) -> Vec<Vec<f64>> {
        let series: Vec<&[Option<f64>]> = match assets
            .iter()
            .map(|a| self.series(a))
            .collect::<Option<Vec<_>>>()
        {
            Some(s) => s,
            None => return Vec::new(),
        };

        (1..self.dates.len())
            .filter_map(|row| {
                series
                    .iter()
                    .map(|s| match (s[row - 1], s[row]) {
                        (Some(prev), Some(curr)) => Some(curr / prev - 1.0),
                        _ => None,
                    })
                    .collect::<Option<Vec<f64>>>()
            })
            .collect()
    }

    /// First priced date, last priced date and number of priced rows per asset.
    pub fn coverage(&self, asset: &str) -> Option<(NaiveDate, NaiveDate, usize)> {
        let series = self.series(asset)?;
        let priced: Vec<usize> = series
            .iter()
            .enumerate()
            .filter_map(|(i, p)| p.map(|_| i))
            .collect();
        let first = *priced.first()?;
        let last = *priced.last()?;
        Some((self.dates[first], self.dates[last], priced.len()))
    }
}

/// Percentage change between consecutive priced cells of one series.
pub fn daily_returns(series: &[Option<f64>]) -> Vec<f64> {
    series
        .windows(2)
        .filter_map(|w| match (w[0], w[1]) {
            (Some(prev), Some(curr)) => Some(curr / prev - 1.0),
            _ => None,
        })
        .collect()
}

//! Wide CSV price table adapter.
//!
//! Layout: a `date` column followed by one column per asset, one row per
//! date (`%Y-%m-%d`). An empty or `NaN` cell means no price for that day.

use crate::domain::error::QubotraderError;
use crate::domain::price::PriceTable;
use crate::ports::price_port::PriceSource;
use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

pub struct CsvPriceAdapter {
    path: PathBuf,
    forward_fill: bool,
}

impl CsvPriceAdapter {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            forward_fill: false,
        }
    }

    /// Carry prices forward over gaps after loading.
    pub fn with_forward_fill(mut self, forward_fill: bool) -> Self {
        self.forward_fill = forward_fill;
        self
    }

    /// Parse CSV text into a table. Rows are sorted by date; a repeated date
    /// keeps its first row.
    pub fn parse(content: &str) -> Result<PriceTable, QubotraderError> {
        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(content.as_bytes());

        let headers = rdr.headers().map_err(|e| QubotraderError::PriceData {
            reason: format!("CSV header error: {}", e),
        })?;
        if headers.get(0).map(|h| h.to_lowercase()) != Some("date".to_string()) {
            return Err(QubotraderError::PriceData {
                reason: "first column must be 'date'".into(),
            });
        }
        let assets: Vec<String> = headers.iter().skip(1).map(str::to_string).collect();
        if let Some(dup) = assets
            .iter()
            .enumerate()
            .find(|(i, a)| assets[..*i].contains(a))
            .map(|(_, a)| a)
        {
            return Err(QubotraderError::PriceData {
                reason: format!("duplicate asset column {}", dup),
            });
        }

        let mut rows: BTreeMap<NaiveDate, Vec<Option<f64>>> = BTreeMap::new();
        for (line, result) in rdr.records().enumerate() {
            let record = result.map_err(|e| QubotraderError::PriceData {
                reason: format!("CSV parse error: {}", e),
            })?;

            let date_str = record.get(0).ok_or_else(|| QubotraderError::PriceData {
                reason: "missing date column".into(),
            })?;
            let date = NaiveDate::parse_from_str(date_str, "%Y-%m-%d").map_err(|e| {
                QubotraderError::PriceData {
                    reason: format!("invalid date '{}' on row {}: {}", date_str, line + 1, e),
                }
            })?;

            let mut cells = Vec::with_capacity(assets.len());
            for (col, asset) in assets.iter().enumerate() {
                cells.push(parse_cell(record.get(col + 1).unwrap_or(""), asset, date)?);
            }

            if rows.contains_key(&date) {
                tracing::warn!(%date, "duplicate date in price file, keeping first row");
                continue;
            }
            rows.insert(date, cells);
        }

        let dates: Vec<NaiveDate> = rows.keys().copied().collect();
        let mut columns: BTreeMap<String, Vec<Option<f64>>> = assets
            .iter()
            .map(|a| (a.clone(), Vec::with_capacity(dates.len())))
            .collect();
        for cells in rows.into_values() {
            for (asset, cell) in assets.iter().zip(cells) {
                if let Some(column) = columns.get_mut(asset) {
                    column.push(cell);
                }
            }
        }

        PriceTable::new(dates, columns)
    }
}

fn parse_cell(raw: &str, asset: &str, date: NaiveDate) -> Result<Option<f64>, QubotraderError> {
    if raw.is_empty() || raw.eq_ignore_ascii_case("nan") {
        return Ok(None);
    }
    raw.parse::<f64>()
        .map(Some)
        .map_err(|e| QubotraderError::PriceData {
            reason: format!("invalid price '{}' for {} on {}: {}", raw, asset, date, e),
        })
}

impl PriceSource for CsvPriceAdapter {
    fn load_prices(&self) -> Result<PriceTable, QubotraderError> {
        let content = fs::read_to_string(&self.path).map_err(|e| QubotraderError::PriceData {
            reason: format!("failed to read {}: {}", self.path.display(), e),
        })?;
        let mut table = Self::parse(&content)?;
        if self.forward_fill {
            table.forward_fill();
        }
        tracing::info!(
            path = %self.path.display(),
            dates = table.len(),
            assets = table.assets().len(),
            "loaded price table"
        );
        Ok(table)
    }
}

//! Report generation port trait.

use crate::domain::backtest::BacktestResult;
use crate::domain::error::QubotraderError;
use crate::domain::metrics::Metrics;

/// Everything a report needs about one finished run.
pub struct RunReport<'a> {
    pub solver: &'a str,
    pub metrics: &'a Metrics,
    pub result: &'a BacktestResult,
}

/// Port for writing backtest results.
pub trait ReportPort {
    fn write(&self, report: &RunReport, output_path: &str) -> Result<(), QubotraderError>;
}

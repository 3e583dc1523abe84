//! JSON results file adapter implementing ReportPort.

use serde::Serialize;
use std::fs;
use std::path::Path;

use crate::domain::error::QubotraderError;
use crate::domain::metrics::Metrics;
use crate::domain::portfolio::EquityPoint;
use crate::domain::trade::TradeStats;
use crate::ports::report_port::{ReportPort, RunReport};

#[derive(Serialize)]
struct ResultsFile<'a> {
    metrics: &'a Metrics,
    trade_stats: &'a TradeStats,
    solver: &'a str,
    cancelled: bool,
    day_warnings: Vec<String>,
    equity_curve: &'a [EquityPoint],
}

#[derive(Debug, Default)]
pub struct JsonReportAdapter;

impl JsonReportAdapter {
    pub fn new() -> Self {
        Self
    }

    pub fn render(&self, report: &RunReport) -> Result<String, QubotraderError> {
        let file = ResultsFile {
            metrics: report.metrics,
            trade_stats: &report.result.trade_stats,
            solver: report.solver,
            cancelled: report.result.cancelled,
            day_warnings: report.result.day_warnings.iter().map(|w| w.to_string()).collect(),
            equity_curve: &report.result.equity_curve,
        };
        Ok(serde_json::to_string_pretty(&file)?)
    }
}

impl ReportPort for JsonReportAdapter {
    fn write(&self, report: &RunReport, output_path: &str) -> Result<(), QubotraderError> {
        let json = self.render(report)?;

        let path = Path::new(output_path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, json)?;

        tracing::info!(path = output_path, "results written");
        Ok(())
    }
}

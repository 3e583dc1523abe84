//! Performance metrics over an equity curve.

use serde::Serialize;

use super::portfolio::EquityPoint;

const TRADING_DAYS_PER_YEAR: f64 = 252.0;

pub const DEFAULT_RISK_FREE_RATE: f64 = 0.02;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Metrics {
    pub final_value: f64,
    pub total_return_pct: f64,
    pub sharpe_ratio: f64,
    pub max_drawdown_pct: f64,
}

/// Derive [`Metrics`] from an equity curve.
///
/// A curve with fewer than two points yields all-zero metrics.
pub fn calculate_metrics(equity_curve: &[EquityPoint], risk_free_rate: f64) -> Metrics {
    if equity_curve.len() < 2 {
        return Metrics::default();
    }

    let first = equity_curve[0].value;
    let last = equity_curve[equity_curve.len() - 1].value;
    let total_return_pct = if first > 0.0 {
        (last / first - 1.0) * 100.0
    } else {
        0.0
    };

    Metrics {
        final_value: last,
        total_return_pct,
        sharpe_ratio: sharpe_ratio(equity_curve, risk_free_rate),
        max_drawdown_pct: max_drawdown(equity_curve) * 100.0,
    }
}

/// Deepest drop from the running maximum, as a non-positive fraction.
pub fn max_drawdown(equity_curve: &[EquityPoint]) -> f64 {
    let mut peak = f64::NEG_INFINITY;
    let mut worst = 0.0_f64;
    for point in equity_curve {
        peak = peak.max(point.value);
        if peak > 0.0 {
            worst = worst.min((point.value - peak) / peak);
        }
    }
    worst
}

/// Annualised Sharpe ratio of daily returns in excess of `risk_free_rate / 252`.
///
/// Uses the sample standard deviation; 0 when it vanishes or fewer than two
/// returns exist.
pub fn sharpe_ratio(equity_curve: &[EquityPoint], risk_free_rate: f64) -> f64 {
    let daily_rf = risk_free_rate / TRADING_DAYS_PER_YEAR;
    let excess: Vec<f64> = equity_curve
        .windows(2)
        .map(|w| {
            let prev = w[0].value;
            if prev > 0.0 { w[1].value / prev - 1.0 } else { 0.0 }
        })
        .map(|r| r - daily_rf)
        .collect();

    if excess.len() < 2 {
        return 0.0;
    }

    let n = excess.len() as f64;
    let mean = excess.iter().sum::<f64>() / n;
    let variance = excess.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (n - 1.0);
    let stddev = variance.sqrt();

    if stddev > 0.0 {
        TRADING_DAYS_PER_YEAR.sqrt() * mean / stddev
    } else {
        0.0
    }
}

/// Drawdown fraction at every point of the curve.
pub fn drawdown_series(equity_curve: &[EquityPoint]) -> Vec<f64> {
    let mut peak = f64::NEG_INFINITY;
    equity_curve
        .iter()
        .map(|point| {
            peak = peak.max(point.value);
            if peak > 0.0 { (point.value - peak) / peak } else { 0.0 }
        })
        .collect()
}

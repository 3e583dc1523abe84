//! Configuration validation.
//!
//! Every key is checked before any simulation runs; the validated values are
//! then frozen into a [`RunConfig`].

use crate::domain::constraint::Constraint;
use crate::domain::error::QubotraderError;
use crate::domain::execution::CostConfig;
use crate::domain::metrics::DEFAULT_RISK_FREE_RATE;
use crate::domain::objective::ObjectiveConfig;
use crate::domain::optimizer::OptimizerConfig;
use crate::domain::solver::SolverChoice;
use crate::ports::config_port::ConfigPort;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoringMethod {
    Momentum,
    MaSignal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoringConfig {
    pub method: ScoringMethod,
    pub window: usize,
}

/// Immutable settings for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    pub initial_capital: f64,
    pub costs: CostConfig,
    pub risk_free_rate: f64,
    pub optimizer: OptimizerConfig,
    pub solver: SolverChoice,
    pub scoring: ScoringConfig,
    /// Carry the last known price over missing cells when loading.
    pub forward_fill: bool,
}

pub fn validate_run_config(config: &dyn ConfigPort) -> Result<(), QubotraderError> {
    build_run_config(config).map(|_| ())
}

pub fn build_run_config(config: &dyn ConfigPort) -> Result<RunConfig, QubotraderError> {
    let initial_capital = validate_initial_capital(config)?;
    let costs = validate_costs(config)?;
    let risk_free_rate = validate_risk_free_rate(config)?;
    let warmup_days = read_count(config, "backtest", "warmup_days", 10)?;

    let constraint = validate_constraint(config)?;
    let objective = validate_objective(config)?;
    let lookback_days = read_count(config, "optimizer", "lookback_days", 0)?;
    let solver = validate_solver(config)?;
    let scoring = validate_scoring(config)?;

    Ok(RunConfig {
        initial_capital,
        costs,
        risk_free_rate,
        optimizer: OptimizerConfig {
            objective,
            constraint,
            lookback_days,
            warmup_days,
        },
        solver,
        scoring,
        forward_fill: config.get_bool("data", "forward_fill", false),
    })
}

fn validate_initial_capital(config: &dyn ConfigPort) -> Result<f64, QubotraderError> {
    let value = match read_double(config, "backtest", "initial_capital")? {
        Some(v) => v,
        None => {
            return Err(QubotraderError::ConfigMissing {
                section: "backtest".to_string(),
                key: "initial_capital".to_string(),
            });
        }
    };
    if !(value.is_finite() && value > 0.0) {
        return Err(QubotraderError::invalid(
            "backtest",
            "initial_capital",
            "initial_capital must be positive",
        ));
    }
    Ok(value)
}

fn validate_costs(config: &dyn ConfigPort) -> Result<CostConfig, QubotraderError> {
    let defaults = CostConfig::default();
    let costs = CostConfig {
        fee_pct: read_double(config, "backtest", "transaction_fee_pct")?.unwrap_or(defaults.fee_pct),
        slippage_pct: read_double(config, "backtest", "slippage_pct")?
            .unwrap_or(defaults.slippage_pct),
    };
    costs.validate()?;
    Ok(costs)
}

fn validate_risk_free_rate(config: &dyn ConfigPort) -> Result<f64, QubotraderError> {
    let value = read_double(config, "backtest", "risk_free_rate")?.unwrap_or(DEFAULT_RISK_FREE_RATE);
    if !(0.0..1.0).contains(&value) {
        return Err(QubotraderError::invalid(
            "backtest",
            "risk_free_rate",
            "risk_free_rate must be between 0 and 1",
        ));
    }
    Ok(value)
}

fn validate_constraint(config: &dyn ConfigPort) -> Result<Constraint, QubotraderError> {
    let defaults = Constraint::default();
    let min_assets = read_count(config, "optimizer", "min_assets", defaults.min_assets)?;
    let max_assets = read_count(config, "optimizer", "max_assets", defaults.max_assets.max(min_assets))?;
    if max_assets < min_assets {
        return Err(QubotraderError::invalid(
            "optimizer",
            "max_assets",
            "max_assets must be at least min_assets",
        ));
    }
    Ok(Constraint::new(min_assets, max_assets))
}

fn validate_objective(config: &dyn ConfigPort) -> Result<ObjectiveConfig, QubotraderError> {
    let q_factor = read_double(config, "optimizer", "objective_q_factor")?
        .unwrap_or(ObjectiveConfig::default().q_factor);
    if !(0.0..=1.0).contains(&q_factor) {
        return Err(QubotraderError::invalid(
            "optimizer",
            "objective_q_factor",
            "objective_q_factor must be between 0 and 1",
        ));
    }

    let candidate_limit = match config.get_string("optimizer", "candidate_limit") {
        None => None,
        Some(_) => {
            let limit = read_count(config, "optimizer", "candidate_limit", 0)?;
            if limit == 0 {
                return Err(QubotraderError::invalid(
                    "optimizer",
                    "candidate_limit",
                    "candidate_limit must be at least 1",
                ));
            }
            Some(limit)
        }
    };

    Ok(ObjectiveConfig {
        q_factor,
        candidate_limit,
    })
}

fn validate_solver(config: &dyn ConfigPort) -> Result<SolverChoice, QubotraderError> {
    let name = config
        .get_string("optimizer", "solver")
        .unwrap_or_else(|| "exact".to_string());
    match name.trim().to_lowercase().as_str() {
        "exact" => Ok(SolverChoice::Exact),
        "approximate" => {
            let seed = read_count(config, "optimizer", "seed", 42)? as u64;
            let reads = read_count(config, "optimizer", "reads", 16)?;
            let sweeps = read_count(config, "optimizer", "sweeps", 200)?;
            if reads == 0 {
                return Err(QubotraderError::invalid("optimizer", "reads", "reads must be at least 1"));
            }
            if sweeps == 0 {
                return Err(QubotraderError::invalid(
                    "optimizer",
                    "sweeps",
                    "sweeps must be at least 1",
                ));
            }
            Ok(SolverChoice::Approximate {
                seed,
                reads,
                sweeps,
            })
        }
        other => Err(QubotraderError::invalid(
            "optimizer",
            "solver",
            format!("unknown solver '{}', expected exact or approximate", other),
        )),
    }
}

fn validate_scoring(config: &dyn ConfigPort) -> Result<ScoringConfig, QubotraderError> {
    let method = match config
        .get_string("scoring", "method")
        .unwrap_or_else(|| "momentum".to_string())
        .trim()
        .to_lowercase()
        .as_str()
    {
        "momentum" => ScoringMethod::Momentum,
        "ma_signal" => ScoringMethod::MaSignal,
        other => {
            return Err(QubotraderError::invalid(
                "scoring",
                "method",
                format!("unknown scoring method '{}', expected momentum or ma_signal", other),
            ));
        }
    };
    let window = read_count(config, "scoring", "window", 7)?;
    if window == 0 {
        return Err(QubotraderError::invalid("scoring", "window", "window must be at least 1"));
    }
    Ok(ScoringConfig { method, window })
}

/// Present-and-numeric check. Garbage is an error, never a silent default.
fn read_double(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<Option<f64>, QubotraderError> {
    match config.get_string(section, key) {
        None => Ok(None),
        Some(raw) => raw.trim().parse::<f64>().map(Some).map_err(|_| {
            QubotraderError::invalid(section, key, format!("{} must be a number, got '{}'", key, raw))
        }),
    }
}

fn read_count(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: usize,
) -> Result<usize, QubotraderError> {
    match config.get_string(section, key) {
        None => Ok(default),
        Some(raw) => raw.trim().parse::<usize>().map_err(|_| {
            QubotraderError::invalid(
                section,
                key,
                format!("{} must be a non-negative integer, got '{}'", key, raw),
            )
        }),
    }
}

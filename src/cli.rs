//! CLI definition and dispatch.

use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use crate::adapters::csv_adapter::CsvPriceAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::json_report_adapter::JsonReportAdapter;
use crate::adapters::score_adapter::{MaSignalScorer, MomentumScorer};
use crate::adapters::svg_chart::generate_equity_svg;
use crate::domain::backtest::{BacktestResult, run_backtest};
use crate::domain::cancel::CancelFlag;
use crate::domain::config_validation::{
    RunConfig, ScoringConfig, ScoringMethod, build_run_config, validate_run_config,
};
use crate::domain::error::QubotraderError;
use crate::domain::metrics::{Metrics, calculate_metrics};
use crate::domain::optimizer::{DailySelections, compute_daily_selections};
use crate::domain::price::PriceTable;
use crate::domain::solver::{Solver, SolverChoice};
use crate::ports::price_port::PriceSource;
use crate::ports::report_port::{ReportPort, RunReport};
use crate::ports::score_port::ScoreProvider;

#[derive(Parser, Debug)]
#[command(name = "qubotrader", about = "Walk-forward portfolio selection backtester")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a walk-forward backtest
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        prices: PathBuf,
        /// Results JSON path
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Equity curve SVG path
        #[arg(long)]
        chart: Option<PathBuf>,
        #[arg(long, value_enum)]
        solver: Option<SolverArg>,
        #[arg(long)]
        seed: Option<u64>,
        /// Carry prices forward over gaps
        #[arg(long)]
        forward_fill: bool,
    },
    /// Run the exact and approximate solvers on the same inputs
    Compare {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        prices: PathBuf,
        #[arg(long)]
        seed: Option<u64>,
        #[arg(long)]
        forward_fill: bool,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Show price coverage per asset
    Info {
        #[arg(short, long)]
        prices: PathBuf,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum SolverArg {
    Exact,
    Approximate,
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Backtest {
            config,
            prices,
            output,
            chart,
            solver,
            seed,
            forward_fill,
        } => run_backtest_command(
            &config,
            &prices,
            output.as_ref(),
            chart.as_ref(),
            solver,
            seed,
            forward_fill,
        ),
        Command::Compare {
            config,
            prices,
            seed,
            forward_fill,
        } => run_compare(&config, &prices, seed, forward_fill),
        Command::Validate { config } => run_validate(&config),
        Command::Info { prices } => run_info(&prices),
    }
}

pub fn load_config(path: &PathBuf) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|e| {
        let err = QubotraderError::ConfigParse {
            file: path.display().to_string(),
            reason: e.to_string(),
        };
        eprintln!("error: {err}");
        ExitCode::from(&err)
    })
}

fn load_run_config(path: &PathBuf) -> Result<RunConfig, ExitCode> {
    eprintln!("Loading config from {}", path.display());
    let adapter = load_config(path)?;
    build_run_config(&adapter).map_err(|e| {
        eprintln!("error: {e}");
        ExitCode::from(&e)
    })
}

fn load_prices(path: &PathBuf, forward_fill: bool) -> Result<PriceTable, ExitCode> {
    eprintln!("Loading prices from {}", path.display());
    CsvPriceAdapter::new(path.clone())
        .with_forward_fill(forward_fill)
        .load_prices()
        .map_err(|e| {
            eprintln!("error: {e}");
            ExitCode::from(&e)
        })
}

/// Apply `--solver` / `--seed` on top of the configured solver.
pub fn apply_solver_overrides(
    configured: SolverChoice,
    solver: Option<SolverArg>,
    seed: Option<u64>,
) -> SolverChoice {
    let (reads, sweeps, configured_seed) = match configured {
        SolverChoice::Approximate {
            seed,
            reads,
            sweeps,
        } => (reads, sweeps, seed),
        SolverChoice::Exact => (16, 200, 42),
    };
    let approximate = SolverChoice::Approximate {
        seed: seed.unwrap_or(configured_seed),
        reads,
        sweeps,
    };
    match (solver, configured) {
        (Some(SolverArg::Exact), _) => SolverChoice::Exact,
        (Some(SolverArg::Approximate), _) | (None, SolverChoice::Approximate { .. }) => approximate,
        (None, SolverChoice::Exact) => SolverChoice::Exact,
    }
}

pub fn build_scorer(scoring: &ScoringConfig) -> Box<dyn ScoreProvider> {
    match scoring.method {
        ScoringMethod::Momentum => Box::new(MomentumScorer {
            window: scoring.window,
        }),
        ScoringMethod::MaSignal => Box::new(MaSignalScorer {
            window: scoring.window,
        }),
    }
}

/// Outputs of one selection + accounting run.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub selections: DailySelections,
    pub result: BacktestResult,
    pub metrics: Metrics,
}

/// Phase 1 (parallel selection) followed by phase 2 (sequential accounting).
///
/// Accounting starts at the first decision row; warm-up rows are not part of
/// the equity curve.
pub fn run_pipeline(
    prices: &PriceTable,
    config: &RunConfig,
    scorer: &dyn ScoreProvider,
    solver: &dyn Solver,
    cancel: Option<&CancelFlag>,
) -> Result<RunOutcome, QubotraderError> {
    let selections = compute_daily_selections(prices, scorer, &config.optimizer, solver, cancel);
    let traded = prices.window(config.optimizer.warmup_days, prices.len().saturating_sub(1));
    let result = run_backtest(
        &traded,
        &selections.choices(),
        config.initial_capital,
        &config.costs,
        cancel,
    )?;
    let metrics = calculate_metrics(&result.equity_curve, config.risk_free_rate);
    Ok(RunOutcome {
        selections,
        result,
        metrics,
    })
}

fn run_backtest_command(
    config_path: &PathBuf,
    prices_path: &PathBuf,
    output_path: Option<&PathBuf>,
    chart_path: Option<&PathBuf>,
    solver_arg: Option<SolverArg>,
    seed: Option<u64>,
    forward_fill: bool,
) -> ExitCode {
    // Stage 1: Load and validate config
    let mut config = match load_run_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };
    config.solver = apply_solver_overrides(config.solver, solver_arg, seed);

    // Stage 2: Load prices
    let prices = match load_prices(prices_path, forward_fill || config.forward_fill) {
        Ok(p) => p,
        Err(code) => return code,
    };
    if prices.is_empty() {
        eprintln!("error: price file has no rows");
        return ExitCode::from(4);
    }

    // Stage 3: Select and simulate
    let scorer = build_scorer(&config.scoring);
    let solver = config.solver.build();
    eprintln!(
        "Running backtest: {} assets, {} to {}, solver {}",
        prices.assets().len(),
        prices.dates()[0],
        prices.dates()[prices.len() - 1],
        config.solver.label()
    );
    let outcome = match run_pipeline(&prices, &config, scorer.as_ref(), solver.as_ref(), None) {
        Ok(o) => o,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    // Stage 4: Console summary
    print_summary(config.solver.label(), &outcome);

    // Stage 5: Results file and chart
    let output = output_path
        .cloned()
        .unwrap_or_else(|| PathBuf::from("results.json"));
    let report = RunReport {
        solver: config.solver.label(),
        metrics: &outcome.metrics,
        result: &outcome.result,
    };
    if let Err(e) = JsonReportAdapter::new().write(&report, &output.to_string_lossy()) {
        eprintln!("error: failed to write results: {e}");
        return (&e).into();
    }
    eprintln!("\nResults written to: {}", output.display());

    if let Some(chart) = chart_path {
        let svg = generate_equity_svg(&outcome.result.equity_curve);
        if let Err(e) = fs::write(chart, svg) {
            eprintln!("error: failed to write chart: {e}");
            return ExitCode::from(1);
        }
        eprintln!("Chart written to: {}", chart.display());
    }

    ExitCode::SUCCESS
}

fn print_summary(label: &str, outcome: &RunOutcome) {
    let metrics = &outcome.metrics;
    let stats = &outcome.result.trade_stats;
    eprintln!("\n=== Results ({label}) ===");
    eprintln!("Final Value:      {:.2}", metrics.final_value);
    eprintln!("Total Return:     {:.2}%", metrics.total_return_pct);
    eprintln!("Sharpe Ratio:     {:.2}", metrics.sharpe_ratio);
    eprintln!("Max Drawdown:     {:.2}%", metrics.max_drawdown_pct);
    eprintln!("Total Trades:     {}", stats.total_trades);
    eprintln!("Fees Paid:        {:.2}", stats.total_fees_paid);
    eprintln!("Slippage Cost:    {:.2}", stats.total_slippage_cost);
    let warnings = outcome.selections.warning_count() + outcome.result.day_warnings.len();
    if warnings > 0 {
        eprintln!("Warnings:         {}", warnings);
    }
    if outcome.selections.cancelled || outcome.result.cancelled {
        eprintln!("Run was cancelled; results are partial.");
    }
}

fn run_compare(
    config_path: &PathBuf,
    prices_path: &PathBuf,
    seed: Option<u64>,
    forward_fill: bool,
) -> ExitCode {
    let config = match load_run_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };
    let prices = match load_prices(prices_path, forward_fill || config.forward_fill) {
        Ok(p) => p,
        Err(code) => return code,
    };

    let scorer = build_scorer(&config.scoring);
    let choices = [
        SolverChoice::Exact,
        apply_solver_overrides(config.solver, Some(SolverArg::Approximate), seed),
    ];

    let mut outcomes = Vec::with_capacity(choices.len());
    for choice in &choices {
        let solver = choice.build();
        match run_pipeline(&prices, &config, scorer.as_ref(), solver.as_ref(), None) {
            Ok(o) => outcomes.push(o),
            Err(e) => {
                eprintln!("error: {e}");
                return (&e).into();
            }
        }
    }

    eprintln!("\n=== Solver Comparison ===");
    eprintln!("{:<18}{:>14}{:>14}", "", choices[0].label(), choices[1].label());
    let rows: [(&str, fn(&RunOutcome) -> f64); 6] = [
        ("Final Value", |o| o.metrics.final_value),
        ("Total Return %", |o| o.metrics.total_return_pct),
        ("Sharpe Ratio", |o| o.metrics.sharpe_ratio),
        ("Max Drawdown %", |o| o.metrics.max_drawdown_pct),
        ("Total Trades", |o| o.result.trade_stats.total_trades as f64),
        ("Fees Paid", |o| o.result.trade_stats.total_fees_paid),
    ];
    for (name, value) in rows {
        eprintln!("{:<18}{:>14.2}{:>14.2}", name, value(&outcomes[0]), value(&outcomes[1]));
    }

    let exact = outcomes[0].selections.choices();
    let approx = outcomes[1].selections.choices();
    let agree = exact
        .iter()
        .filter(|(date, chosen)| approx.get(*date) == Some(*chosen))
        .count();
    eprintln!("\nSelections agree on {} of {} days", agree, exact.len());

    ExitCode::SUCCESS
}

fn run_validate(config_path: &PathBuf) -> ExitCode {
    eprintln!("Validating config: {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    if let Err(e) = validate_run_config(&adapter) {
        eprintln!("error: {e}");
        return (&e).into();
    }

    eprintln!("Configuration is valid.");
    ExitCode::SUCCESS
}

fn run_info(prices_path: &PathBuf) -> ExitCode {
    let prices = match load_prices(prices_path, false) {
        Ok(p) => p,
        Err(code) => return code,
    };

    for asset in prices.assets() {
        match prices.coverage(asset) {
            Some((first, last, count)) => {
                println!("{}: {} prices, {} to {}", asset, count, first, last);
            }
            None => {
                eprintln!("{}: no data found", asset);
            }
        }
    }
    eprintln!("{} assets, {} dates", prices.assets().len(), prices.len());
    ExitCode::SUCCESS
}

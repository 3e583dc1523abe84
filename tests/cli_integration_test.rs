//! CLI integration tests for command orchestration.
//!
//! Tests cover:
//! - Config parsing from real INI files on disk
//! - validate / info / backtest / compare dispatch through `cli::run`
//! - Results file and chart output
//! - Exit codes for config and price data failures

use clap::Parser;
use qubotrader::adapters::file_config_adapter::FileConfigAdapter;
use qubotrader::cli::{self, Cli};
use qubotrader::domain::config_validation::{ScoringMethod, build_run_config};
use qubotrader::domain::error::QubotraderError;
use qubotrader::domain::solver::SolverChoice;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

fn write_temp_file(content: &str, suffix: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

const VALID_INI: &str = r#"
[backtest]
initial_capital = 10000
transaction_fee_pct = 0.001
slippage_pct = 0.0005
risk_free_rate = 0.02
warmup_days = 3

[optimizer]
min_assets = 1
max_assets = 2
objective_q_factor = 0.6
solver = exact

[scoring]
method = momentum
window = 3
"#;

/// Twelve days, three assets, one rising steadily.
fn prices_csv() -> String {
    let mut csv = String::from("date,AAA,BBB,CCC\n");
    for i in 0..12 {
        let aaa = 100.0 + 2.0 * i as f64;
        let bbb = 50.0 + if i % 2 == 0 { 1.0 } else { -1.0 };
        let ccc = 80.0 - i as f64;
        csv.push_str(&format!("2024-03-{:02},{},{},{}\n", i + 1, aaa, bbb, ccc));
    }
    csv
}

fn run_args(args: &[&str]) -> ExitCode {
    let mut argv = vec!["qubotrader"];
    argv.extend_from_slice(args);
    cli::run(Cli::try_parse_from(argv).unwrap())
}

fn assert_exit(code: ExitCode, expected: u8) {
    assert_eq!(format!("{:?}", code), format!("{:?}", ExitCode::from(expected)));
}

fn path_str(path: &Path) -> &str {
    path.to_str().unwrap()
}

mod config_loading {
    use super::*;

    #[test]
    fn valid_file_builds_run_config() {
        let ini = write_temp_file(VALID_INI, ".ini");
        let adapter = FileConfigAdapter::from_file(ini.path()).unwrap();
        let config = build_run_config(&adapter).unwrap();

        assert_eq!(config.initial_capital, 10_000.0);
        assert_eq!(config.optimizer.warmup_days, 3);
        assert_eq!(config.optimizer.objective.q_factor, 0.6);
        assert_eq!(config.solver, SolverChoice::Exact);
        assert_eq!(config.scoring.method, ScoringMethod::Momentum);
        assert!(!config.forward_fill);
    }

    #[test]
    fn missing_capital_is_reported() {
        let ini = write_temp_file("[optimizer]\nsolver = exact\n", ".ini");
        let adapter = FileConfigAdapter::from_file(ini.path()).unwrap();
        let err = build_run_config(&adapter).unwrap_err();
        assert!(matches!(err, QubotraderError::ConfigMissing { .. }));
    }

    #[test]
    fn approximate_solver_reads_tuning() {
        let content = VALID_INI.replace(
            "solver = exact",
            "solver = approximate\nseed = 11\nreads = 4\nsweeps = 50",
        );
        let adapter = FileConfigAdapter::from_string(&content).unwrap();
        let config = build_run_config(&adapter).unwrap();
        assert_eq!(
            config.solver,
            SolverChoice::Approximate {
                seed: 11,
                reads: 4,
                sweeps: 50
            }
        );
    }

    #[test]
    fn data_section_enables_forward_fill() {
        let content = format!("{}\n[data]\nforward_fill = true\n", VALID_INI);
        let adapter = FileConfigAdapter::from_string(&content).unwrap();
        assert!(build_run_config(&adapter).unwrap().forward_fill);
    }
}

mod commands {
    use super::*;

    #[test]
    fn validate_accepts_valid_config() {
        let ini = write_temp_file(VALID_INI, ".ini");
        assert_exit(run_args(&["validate", "--config", path_str(ini.path())]), 0);
    }

    #[test]
    fn validate_rejects_bad_bounds() {
        let content = VALID_INI.replace("max_assets = 2", "max_assets = 0");
        let ini = write_temp_file(&content, ".ini");
        assert_exit(run_args(&["validate", "--config", path_str(ini.path())]), 2);
    }

    #[test]
    fn validate_missing_file_is_config_error() {
        assert_exit(
            run_args(&["validate", "--config", "/nonexistent/run.ini"]),
            2,
        );
    }

    #[test]
    fn info_lists_coverage() {
        let csv = write_temp_file(&prices_csv(), ".csv");
        assert_exit(run_args(&["info", "--prices", path_str(csv.path())]), 0);
    }

    #[test]
    fn info_with_bad_price_file_is_data_error() {
        let csv = write_temp_file("date,AAA\n2024-01-01,abc\n", ".csv");
        assert_exit(run_args(&["info", "--prices", path_str(csv.path())]), 4);
    }

    #[test]
    fn backtest_writes_results_and_chart() {
        let ini = write_temp_file(VALID_INI, ".ini");
        let csv = write_temp_file(&prices_csv(), ".csv");
        let dir = tempfile::tempdir().unwrap();
        let output: PathBuf = dir.path().join("out/results.json");
        let chart: PathBuf = dir.path().join("equity.svg");

        let code = run_args(&[
            "backtest",
            "--config",
            path_str(ini.path()),
            "--prices",
            path_str(csv.path()),
            "--output",
            path_str(&output),
            "--chart",
            path_str(&chart),
        ]);
        assert_exit(code, 0);

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&output).unwrap()).unwrap();
        assert_eq!(json["solver"], "exact");
        assert_eq!(json["cancelled"], false);
        // 12 rows minus 3 warm-up rows
        let curve = json["equity_curve"].as_array().unwrap();
        assert_eq!(curve.len(), 9);
        assert_eq!(curve[0]["date"], "2024-03-04");
        assert!(json["trade_stats"]["total_trades"].as_u64().unwrap() > 0);

        let svg = std::fs::read_to_string(&chart).unwrap();
        assert!(svg.starts_with("<svg"));
    }

    #[test]
    fn solver_flag_overrides_config() {
        let ini = write_temp_file(VALID_INI, ".ini");
        let csv = write_temp_file(&prices_csv(), ".csv");
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("results.json");

        let code = run_args(&[
            "backtest",
            "--config",
            path_str(ini.path()),
            "--prices",
            path_str(csv.path()),
            "--output",
            path_str(&output),
            "--solver",
            "approximate",
            "--seed",
            "3",
        ]);
        assert_exit(code, 0);

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&output).unwrap()).unwrap();
        assert_eq!(json["solver"], "approximate");
    }

    #[test]
    fn forward_fill_from_config_clears_gaps() {
        let content = format!("{}\n[data]\nforward_fill = true\n", VALID_INI);
        let ini = write_temp_file(&content, ".ini");
        let csv_text = prices_csv().replace("2024-03-07,112,51,74", "2024-03-07,,51,74");
        let csv = write_temp_file(&csv_text, ".csv");
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("results.json");

        let code = run_args(&[
            "backtest",
            "--config",
            path_str(ini.path()),
            "--prices",
            path_str(csv.path()),
            "--output",
            path_str(&output),
        ]);
        assert_exit(code, 0);

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&output).unwrap()).unwrap();
        assert!(json["day_warnings"].as_array().unwrap().is_empty());
    }

    #[test]
    fn backtest_with_invalid_config_writes_nothing() {
        let content = VALID_INI.replace("initial_capital = 10000", "initial_capital = -5");
        let ini = write_temp_file(&content, ".ini");
        let csv = write_temp_file(&prices_csv(), ".csv");
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("results.json");

        let code = run_args(&[
            "backtest",
            "--config",
            path_str(ini.path()),
            "--prices",
            path_str(csv.path()),
            "--output",
            path_str(&output),
        ]);
        assert_exit(code, 2);
        assert!(!output.exists());
    }

    #[test]
    fn compare_runs_both_solvers() {
        let ini = write_temp_file(VALID_INI, ".ini");
        let csv = write_temp_file(&prices_csv(), ".csv");
        let code = run_args(&[
            "compare",
            "--config",
            path_str(ini.path()),
            "--prices",
            path_str(csv.path()),
            "--seed",
            "1",
        ]);
        assert_exit(code, 0);
    }
}

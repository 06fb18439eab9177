//! Integration tests for the cadence binary.
//!
//! Every test runs against its own temporary workspace.

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Helper to create a cadence Command bound to `workspace`
fn cadence(workspace: &Path) -> Command {
    let mut cmd = cargo_bin_cmd!("cadence");
    cmd.current_dir(workspace)
        .env_remove("CADENCE_WORKSPACE")
        .env_remove("CADENCE_TICK_SECS")
        .env_remove("RUST_LOG")
        .arg("--workspace")
        .arg(workspace);
    cmd
}

fn create_workspace() -> TempDir {
    TempDir::new().unwrap()
}

fn report_names(workspace: &Path) -> Vec<String> {
    match fs::read_dir(workspace.join("reports")) {
        Ok(entries) => entries
            .flatten()
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect(),
        Err(_) => Vec::new(),
    }
}

fn run_daily(workspace: &Path) {
    cadence(workspace)
        .args(["run", "--cadence", "daily"])
        .assert()
        .success();
}

// =============================================================================
// Basic CLI Tests
// =============================================================================

mod cli_basics {
    use super::*;

    #[test]
    fn test_cadence_help() {
        cargo_bin_cmd!("cadence")
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("daemon"));
    }

    #[test]
    fn test_cadence_version() {
        cargo_bin_cmd!("cadence").arg("--version").assert().success();
    }

    #[test]
    fn test_invalid_cadence_is_rejected() {
        let dir = create_workspace();
        cadence(dir.path())
            .args(["run", "--cadence", "hourly"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("hourly"));
    }

    #[test]
    fn test_workspace_from_env() {
        let dir = create_workspace();
        cargo_bin_cmd!("cadence")
            .current_dir(dir.path())
            .env("CADENCE_WORKSPACE", dir.path())
            .env_remove("CADENCE_TICK_SECS")
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains(dir.path().to_string_lossy().as_ref()));
    }

    #[test]
    fn test_invalid_tick_env_fails() {
        let dir = create_workspace();
        cadence(dir.path())
            .env("CADENCE_TICK_SECS", "soon")
            .arg("status")
            .assert()
            .failure()
            .stderr(predicate::str::contains("CADENCE_TICK_SECS"));
    }
}

// =============================================================================
// Configuration Tests
// =============================================================================

mod configuration {
    use super::*;

    #[test]
    fn test_config_show_defaults() {
        let dir = create_workspace();
        cadence(dir.path())
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("daily_at = \"08:00\""))
            .stdout(predicate::str::contains("weekly_day = \"Mon\""))
            .stdout(predicate::str::contains("sequential_failure = \"abort\""))
            .stdout(predicate::str::contains("cadence config init"));
    }

    #[test]
    fn test_config_init_creates_toml() {
        let dir = create_workspace();
        cadence(dir.path())
            .args(["config", "init"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Created cadence.toml"));

        let content = fs::read_to_string(dir.path().join("cadence.toml")).unwrap();
        assert!(content.contains("[schedule]"));
        assert!(content.contains("[[headlines]]"));

        cadence(dir.path())
            .args(["config", "init"])
            .assert()
            .success()
            .stdout(predicate::str::contains("already exists"));

        cadence(dir.path())
            .args(["config", "init", "--force"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Created cadence.toml"));
    }

    #[test]
    fn test_config_validate_no_config() {
        let dir = create_workspace();
        cadence(dir.path())
            .args(["config", "validate"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Using defaults"));
    }

    #[test]
    fn test_config_validate_reports_warnings() {
        let dir = create_workspace();
        fs::write(
            dir.path().join("cadence.toml"),
            "[schedule]\nmonthly_day = 31\nweekly_at = \"9am\"\n",
        )
        .unwrap();

        cadence(dir.path())
            .args(["config", "validate"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Configuration warnings:"))
            .stdout(predicate::str::contains("every month"))
            .stdout(predicate::str::contains("weekly_at"));
    }

    #[test]
    fn test_config_shows_file_values() {
        let dir = create_workspace();
        fs::write(
            dir.path().join("cadence.toml"),
            "[schedule]\ndaily_at = \"06:15\"\n\n[orchestrator]\nsequential_failure = \"continue\"\n",
        )
        .unwrap();

        cadence(dir.path())
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("daily_at = \"06:15\""))
            .stdout(predicate::str::contains("sequential_failure = \"continue\""));
    }

    #[test]
    fn test_malformed_config_fails() {
        let dir = create_workspace();
        fs::write(dir.path().join("cadence.toml"), "[schedule\n").unwrap();

        cadence(dir.path())
            .args(["config", "show"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("cadence.toml"));
    }
}

// =============================================================================
// Batch Execution Tests
// =============================================================================

mod batches {
    use super::*;

    #[test]
    fn test_run_daily_writes_report_and_metrics() {
        let dir = create_workspace();
        cadence(dir.path())
            .args(["run", "--cadence", "daily"])
            .assert()
            .success()
            .stdout(predicate::str::contains("DAILY batch (6 workers)"))
            .stdout(predicate::str::contains("6 succeeded, 0 failed"))
            .stdout(predicate::str::contains("Report:"));

        let reports = report_names(dir.path());
        assert_eq!(reports.len(), 1);
        assert!(reports[0].starts_with("daily_report_"));
        assert!(reports[0].ends_with(".txt"));

        assert!(dir.path().join("logs/metrics.jsonl").exists());
        assert!(dir.path().join("logs/orchestrator.log").exists());
        assert!(dir.path().join("cache/sales_dev").is_dir());
    }

    #[test]
    fn test_run_without_cadence_runs_daily_and_weekly() {
        let dir = create_workspace();
        cadence(dir.path())
            .arg("run")
            .assert()
            .success()
            .stdout(predicate::str::contains("DAILY batch"))
            .stdout(predicate::str::contains("WEEKLY batch (4 workers)"));

        let reports = report_names(dir.path());
        assert!(reports.iter().any(|r| r.starts_with("daily_report_")));
        assert!(reports.iter().any(|r| r.starts_with("weekly_report_")));
        assert!(!reports.iter().any(|r| r.starts_with("monthly_report_")));
    }

    #[test]
    fn test_run_monthly() {
        let dir = create_workspace();
        cadence(dir.path())
            .args(["run", "--cadence", "monthly"])
            .assert()
            .success()
            .stdout(predicate::str::contains("MONTHLY batch (2 workers)"));

        let reports = report_names(dir.path());
        assert_eq!(reports.len(), 1);
        assert!(reports[0].starts_with("monthly_report_"));
    }

    #[test]
    fn test_run_all_cadences() {
        let dir = create_workspace();
        cadence(dir.path())
            .args(["run", "--cadence", "all"])
            .assert()
            .success();
        assert_eq!(report_names(dir.path()).len(), 3);
    }

    #[test]
    fn test_single_worker() {
        let dir = create_workspace();
        cadence(dir.path())
            .args(["worker", "devops"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Worker Execution Report"))
            .stdout(predicate::str::contains("Worker: devops"))
            .stdout(predicate::str::contains("Status: ✅ Complete"));

        assert!(report_names(dir.path()).is_empty());
    }

    #[test]
    fn test_unknown_worker_fails() {
        let dir = create_workspace();
        cadence(dir.path())
            .args(["worker", "nobody"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Unknown worker 'nobody'"));
    }
}

// =============================================================================
// Inspection Tests
// =============================================================================

mod inspection {
    use super::*;

    #[test]
    fn test_status_before_any_run() {
        let dir = create_workspace();
        cadence(dir.path())
            .arg("status")
            .assert()
            .success()
            .stdout(predicate::str::contains("sales_dev"))
            .stdout(predicate::str::contains("not_started"))
            .stdout(predicate::str::contains("Next runs:"));
    }

    #[test]
    fn test_status_after_daily_run() {
        let dir = create_workspace();
        run_daily(dir.path());

        cadence(dir.path())
            .arg("status")
            .assert()
            .success()
            .stdout(predicate::str::contains("active"))
            .stdout(predicate::str::contains("Recent reports:"))
            .stdout(predicate::str::contains("daily_report_"));
    }

    #[test]
    fn test_metrics_empty() {
        let dir = create_workspace();
        cadence(dir.path())
            .arg("metrics")
            .assert()
            .success()
            .stdout(predicate::str::contains("No metrics recorded yet"));
    }

    #[test]
    fn test_metrics_after_daily_run() {
        let dir = create_workspace();
        run_daily(dir.path());

        cadence(dir.path())
            .args(["metrics", "--recent", "5"])
            .assert()
            .success()
            .stdout(predicate::str::contains("leads_generated_today"))
            .stdout(predicate::str::contains("daily_workers"))
            .stdout(predicate::str::contains("Recent samples:"));
    }

    #[test]
    fn test_reports_empty() {
        let dir = create_workspace();
        cadence(dir.path())
            .arg("reports")
            .assert()
            .success()
            .stdout(predicate::str::contains("No reports in"));
    }

    #[test]
    fn test_reports_list_and_show() {
        let dir = create_workspace();
        run_daily(dir.path());
        let name = report_names(dir.path()).pop().unwrap();

        cadence(dir.path())
            .arg("reports")
            .assert()
            .success()
            .stdout(predicate::str::contains(name.as_str()))
            .stdout(predicate::str::contains("daily"));

        cadence(dir.path())
            .args(["reports", "show", name.as_str()])
            .assert()
            .success()
            .stdout(predicate::str::contains("DAILY WORKER REPORT"))
            .stdout(predicate::str::contains("Workers: 6 run, 6 succeeded, 0 failed"))
            .stdout(predicate::str::contains("HEADLINE METRICS"));
    }

    #[test]
    fn test_reports_show_missing() {
        let dir = create_workspace();
        cadence(dir.path())
            .args(["reports", "show", "daily_report_19990101.txt"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("not found"));
    }

    #[test]
    fn test_reports_show_rejects_paths() {
        let dir = create_workspace();
        cadence(dir.path())
            .args(["reports", "show", "../cadence.toml"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid report name"));
    }
}

//! Immediate execution: `cadence run` and `cadence worker <name>`.

use anyhow::Result;
use chrono::Local;

use cadence::config::Config;
use cadence::errors::OrchestratorError;
use cadence::orchestrator::{BatchOutcome, Orchestrator};
use cadence::report::{format_metric, render_task_result, report_filename};
use cadence::roster::Roster;
use cadence::worker::{Cadence, TaskResult};

use super::super::CadenceArg;

/// Cadences run when `--cadence` is omitted.
const DEFAULT_CADENCES: [Cadence; 2] = [Cadence::Daily, Cadence::Weekly];

pub async fn cmd_run(config: &Config, selection: Option<CadenceArg>) -> Result<()> {
    config.ensure_directories()?;
    let cadences = match selection {
        Some(arg) => arg.cadences(),
        None => DEFAULT_CADENCES.to_vec(),
    };
    let orchestrator = Orchestrator::from_config(config, Roster::builtin());

    let mut incomplete = Vec::new();
    for cadence in cadences {
        let batch_time = Local::now();
        println!();
        println!(
            "{} batch ({} workers)",
            console::style(cadence.as_str().to_uppercase()).bold(),
            orchestrator.roster().members(cadence).len()
        );

        match orchestrator.run_batch(cadence, batch_time).await {
            Ok(outcome) => print_outcome(&outcome),
            Err(e) => {
                println!("  {} {}", console::style("error:").red().bold(), e);
                if matches!(e, OrchestratorError::SequentialAborted { .. }) {
                    let partial = config.reports_dir.join(report_filename(cadence, batch_time));
                    if partial.exists() {
                        println!("  Partial report: {}", partial.display());
                    }
                }
                incomplete.push(cadence.to_string());
            }
        }
    }
    println!();

    if !incomplete.is_empty() {
        anyhow::bail!("Batch did not complete: {}", incomplete.join(", "));
    }
    Ok(())
}

fn print_outcome(outcome: &BatchOutcome) {
    let summary = &outcome.summary;
    println!();
    println!("  {:<28} {:<8} {:>9}", "Worker", "Status", "Duration");
    println!("  {:<28} {:<8} {:>9}", "-".repeat(28), "------", "---------");
    for result in &summary.results {
        println!(
            "  {:<28} {:<8} {:>8.2}s",
            result.worker.name,
            status_label(result),
            result.duration.as_secs_f64()
        );
        if !result.success {
            println!("    {}", console::style(result.error_message()).dim());
        }
    }
    println!();
    println!(
        "  {} succeeded, {} failed",
        summary.succeeded(),
        summary.failed()
    );
    for headline in &summary.headlines {
        println!("  {} = {}", headline.name, format_metric(headline.value));
    }
    println!("  Report: {}", outcome.report_path.display());
}

fn status_label(result: &TaskResult) -> console::StyledObject<&'static str> {
    if result.success {
        console::style("ok").green()
    } else {
        console::style("failed").red()
    }
}

pub async fn cmd_worker(config: &Config, name: &str) -> Result<()> {
    config.ensure_directories()?;
    let orchestrator = Orchestrator::from_config(config, Roster::builtin());
    let result = orchestrator.run_single(name, Local::now()).await?;

    println!("{}", render_task_result(&result));
    if !result.success {
        anyhow::bail!("Worker '{}' failed: {}", name, result.error_message());
    }
    Ok(())
}

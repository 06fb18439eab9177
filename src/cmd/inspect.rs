//! Read-only views of the workspace: `cadence status`, `metrics` and `reports`.

use anyhow::Result;
use chrono::{DateTime, Local};

use cadence::config::Config;
use cadence::report::{ReportStore, format_metric};
use cadence::roster::Roster;
use cadence::scheduler::Scheduler;
use cadence::store::{ContextStore, MetricsSink, WorkerStatus, latest_values};

use super::super::ReportsCommands;

fn format_time(at: Option<DateTime<Local>>) -> String {
    at.map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".to_string())
}

pub fn cmd_status(config: &Config) -> Result<()> {
    let contexts = ContextStore::new(&config.cache_dir);
    let now = Local::now();

    println!();
    println!("Cadence Status");
    println!("==============");
    println!();
    println!("Workspace: {}", config.workspace.display());
    println!();
    println!(
        "{:<28} {:<8} {:<12} {:<17} Snapshots",
        "Worker", "Cadence", "Status", "Last write"
    );
    println!(
        "{:<28} {:<8} {:<12} {:<17} ---------",
        "-".repeat(28),
        "-------",
        "------",
        "----------"
    );

    let roster = Roster::builtin();
    for identity in roster.identities() {
        let status = contexts.owner_status(&identity.name, now, config.freshness())?;
        let label = format!("{:<12}", status.status.to_string());
        let label = match status.status {
            WorkerStatus::Active => console::style(label).green(),
            WorkerStatus::Idle => console::style(label).yellow(),
            WorkerStatus::NotStarted => console::style(label).dim(),
        };
        println!(
            "{:<28} {:<8} {} {:<17} {}",
            identity.name,
            identity.cadence.as_str(),
            label,
            format_time(status.last_write),
            status.snapshots
        );
    }
    println!();

    match Scheduler::from_settings(&config.settings.schedule) {
        Ok(scheduler) => {
            println!("Next runs:");
            let naive_now = now.naive_local();
            for entry in scheduler.entries() {
                let next = entry
                    .trigger
                    .next_after(naive_now)
                    .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                    .unwrap_or_else(|| "-".to_string());
                println!("  {:<8} {} ({})", entry.cadence.as_str(), next, entry.trigger);
            }
        }
        Err(e) => println!("Schedule: {}", console::style(e).red()),
    }
    println!();

    let recent = ReportStore::new(&config.reports_dir).list_recent(3)?;
    if !recent.is_empty() {
        println!("Recent reports:");
        for entry in recent {
            println!("  {}  {}", format_time(entry.modified), entry.name);
        }
        println!();
    }
    Ok(())
}

pub fn cmd_metrics(config: &Config, recent: usize) -> Result<()> {
    let sink = MetricsSink::new(&config.metrics_file);
    let samples = sink.samples()?;

    println!();
    if samples.is_empty() {
        println!("No metrics recorded yet. Run 'cadence run' first.");
        println!();
        return Ok(());
    }

    println!("Latest values ({} samples in {})", samples.len(), sink.path().display());
    println!();
    println!("{:<32} {:>14}", "Metric", "Value");
    println!("{:<32} {:>14}", "-".repeat(32), "-".repeat(14));
    for (name, value) in latest_values(&samples) {
        println!("{:<32} {:>14}", name, format_metric(value));
    }
    println!();

    if recent > 0 {
        let skip = samples.len().saturating_sub(recent);
        println!("Recent samples:");
        for sample in &samples[skip..] {
            println!(
                "  {}  {:<26} {:<28} {}",
                sample.timestamp.format("%Y-%m-%d %H:%M:%S"),
                sample.owner,
                sample.metric_name,
                format_metric(sample.value)
            );
        }
        println!();
    }
    Ok(())
}

pub fn cmd_reports(config: &Config, command: Option<ReportsCommands>, limit: usize) -> Result<()> {
    let store = ReportStore::new(&config.reports_dir);

    match command {
        Some(ReportsCommands::Show { name }) => match store.read(&name)? {
            Some(text) => print!("{}", text),
            None => anyhow::bail!("Report '{}' not found in {}", name, store.dir().display()),
        },
        None => {
            let entries = store.list_recent(limit)?;
            println!();
            if entries.is_empty() {
                println!("No reports in {}", store.dir().display());
                println!();
                return Ok(());
            }
            println!("{:<32} {:<8} {:<17} {:>8}", "Report", "Cadence", "Modified", "Bytes");
            println!(
                "{:<32} {:<8} {:<17} {:>8}",
                "-".repeat(32),
                "-------",
                "--------",
                "-----"
            );
            for entry in entries {
                println!(
                    "{:<32} {:<8} {:<17} {:>8}",
                    entry.name,
                    entry.cadence.map_or("-", |c| c.as_str()),
                    format_time(entry.modified),
                    entry.size
                );
            }
            println!();
        }
    }
    Ok(())
}

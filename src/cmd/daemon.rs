//! Long-running scheduler: `cadence daemon`.

use anyhow::Result;
use chrono::Local;

use cadence::config::Config;
use cadence::orchestrator::Orchestrator;
use cadence::roster::Roster;
use cadence::scheduler::{Scheduler, SystemClock};

pub async fn cmd_daemon(config: &Config) -> Result<()> {
    config.ensure_directories()?;
    for warning in config.settings.validate() {
        tracing::warn!("{}", warning);
    }
    if config.settings.schedule.tick_secs == 0 {
        anyhow::bail!("schedule.tick_secs must be greater than zero");
    }

    let mut scheduler = Scheduler::from_settings(&config.settings.schedule)?;
    let orchestrator = Orchestrator::from_config(config, Roster::builtin());

    println!();
    println!("Cadence daemon");
    println!("==============");
    println!();
    println!("Workspace: {}", config.workspace.display());
    println!("Roster:    {} workers", orchestrator.roster().len());
    println!();
    let now = Local::now().naive_local();
    for entry in scheduler.entries() {
        let next = entry
            .trigger
            .next_after(now)
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "-".to_string());
        println!("  {:<8} {:<32} next: {}", entry.cadence.as_str(), entry.trigger.to_string(), next);
    }
    println!();
    println!("{}", console::style("Press Ctrl-C to stop.").dim());

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };
    scheduler.run_until(&orchestrator, &SystemClock, shutdown).await;

    Ok(())
}

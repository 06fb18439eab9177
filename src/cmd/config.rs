//! Configuration view and validation commands: `cadence config`.

use anyhow::{Context, Result};

use cadence::cadence_config::CadenceToml;
use cadence::config::{Config, TICK_SECS_ENV};

use super::super::ConfigCommands;

pub fn cmd_config(config: &Config, command: Option<ConfigCommands>) -> Result<()> {
    let config_path = &config.config_file;

    match command {
        None | Some(ConfigCommands::Show) => {
            println!();
            println!("Cadence Configuration");
            println!("=====================");
            println!();
            println!("Workspace:   {}", config.workspace.display());
            if config_path.exists() {
                println!("Config file: {}", config_path.display());
            } else {
                println!("Config file: none (using defaults)");
            }
            println!();

            let settings = &config.settings;
            println!("[schedule]");
            println!("  tick_secs = {}", settings.schedule.tick_secs);
            println!("  daily_at = \"{}\"", settings.schedule.daily_at);
            println!("  weekly_day = \"{}\"", settings.schedule.weekly_day);
            println!("  weekly_at = \"{}\"", settings.schedule.weekly_at);
            println!("  monthly_day = {}", settings.schedule.monthly_day);
            println!("  monthly_at = \"{}\"", settings.schedule.monthly_at);
            println!();
            println!("[orchestrator]");
            println!(
                "  sequential_failure = \"{}\"",
                settings.orchestrator.sequential_failure
            );
            match settings.orchestrator.worker_timeout_secs {
                Some(secs) => println!("  worker_timeout_secs = {}", secs),
                None => println!("  worker_timeout_secs = (none)"),
            }
            println!();
            println!("[dashboard]");
            println!("  freshness_secs = {}", settings.dashboard.freshness_secs);
            println!();

            let rules = settings.headline_rules();
            let source = if settings.headlines.is_empty() { "built-in" } else { "configured" };
            println!("Headline rules ({}, {}):", rules.len(), source);
            for rule in &rules {
                println!(
                    "  {:<8} {:<24} <- {} {} ({:?})",
                    rule.cadence.as_str(),
                    rule.metric,
                    rule.worker,
                    rule.pointer,
                    rule.reduce
                );
            }
            println!();

            if std::env::var(TICK_SECS_ENV).is_ok() {
                println!("tick_secs overridden by {}", TICK_SECS_ENV);
                println!();
            }
            if !config_path.exists() {
                println!("Run 'cadence config init' to create a cadence.toml file.");
                println!();
            }
        }
        Some(ConfigCommands::Validate) => {
            println!();
            println!("Validating configuration...");
            println!();

            if !config_path.exists() {
                println!("No cadence.toml found. Using defaults (valid).");
                println!();
                return Ok(());
            }

            let warnings = config.settings.validate();
            if warnings.is_empty() {
                println!("Configuration is valid.");
            } else {
                println!("Configuration warnings:");
                for warning in warnings {
                    println!("  - {}", warning);
                }
            }
            println!();
        }
        Some(ConfigCommands::Init { force }) => {
            if config_path.exists() && !force {
                println!("cadence.toml already exists at {}", config_path.display());
                println!("Pass --force to overwrite it.");
                return Ok(());
            }

            std::fs::create_dir_all(&config.workspace).with_context(|| {
                format!("Failed to create workspace {}", config.workspace.display())
            })?;
            CadenceToml::template().save(config_path)?;

            println!("Created cadence.toml at {}", config_path.display());
            println!();
            println!("You can now customize:");
            println!("  - [schedule] run times and the daemon tick");
            println!("  - [orchestrator] sequential_failure, worker_timeout_secs");
            println!("  - [[headlines]] metrics derived from each batch");
            println!();
        }
    }

    Ok(())
}

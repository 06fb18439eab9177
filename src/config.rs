use anyhow::{Context, Result};
use std::path::PathBuf;
use std::time::Duration;

use crate::cadence_config::{CONFIG_FILE_NAME, CadenceToml};
use crate::orchestrator::RunSettings;

/// Environment variable naming the workspace directory.
pub const WORKSPACE_ENV: &str = "CADENCE_WORKSPACE";
/// Environment variable overriding `schedule.tick_secs`.
pub const TICK_SECS_ENV: &str = "CADENCE_TICK_SECS";

/// Runtime configuration.
///
/// Resolves the workspace layout and merges `cadence.toml` with
/// environment overrides. CLI flags are applied by the caller.
#[derive(Debug, Clone)]
pub struct Config {
    pub workspace: PathBuf,
    pub cache_dir: PathBuf,
    pub log_dir: PathBuf,
    pub metrics_file: PathBuf,
    pub reports_dir: PathBuf,
    pub config_file: PathBuf,
    pub verbose: bool,
    pub settings: CadenceToml,
}

impl Config {
    /// Resolve the workspace (explicit path, then `CADENCE_WORKSPACE`, then
    /// `~/.cadence`) and load its configuration.
    pub fn new(workspace: Option<PathBuf>, verbose: bool) -> Result<Self> {
        let workspace = match workspace {
            Some(path) => path,
            None => default_workspace()?,
        };
        Self::from_workspace(workspace, verbose)
    }

    pub fn from_workspace(workspace: PathBuf, verbose: bool) -> Result<Self> {
        let mut settings = CadenceToml::load_or_default(&workspace)?;

        if let Ok(value) = std::env::var(TICK_SECS_ENV) {
            settings.schedule.tick_secs = value
                .trim()
                .parse()
                .with_context(|| format!("Invalid {}: '{}'", TICK_SECS_ENV, value))?;
        }

        let log_dir = workspace.join("logs");
        Ok(Self {
            cache_dir: workspace.join("cache"),
            metrics_file: log_dir.join("metrics.jsonl"),
            reports_dir: workspace.join("reports"),
            config_file: workspace.join(CONFIG_FILE_NAME),
            log_dir,
            workspace,
            verbose,
            settings,
        })
    }

    pub fn ensure_directories(&self) -> Result<()> {
        std::fs::create_dir_all(&self.cache_dir).context("Failed to create cache directory")?;
        std::fs::create_dir_all(&self.log_dir).context("Failed to create log directory")?;
        std::fs::create_dir_all(&self.reports_dir).context("Failed to create reports directory")?;
        Ok(())
    }

    /// Age below which a worker counts as active.
    pub fn freshness(&self) -> Duration {
        Duration::from_secs(self.settings.dashboard.freshness_secs)
    }

    pub fn run_settings(&self) -> RunSettings {
        RunSettings {
            sequential_failure: self.settings.orchestrator.sequential_failure,
            worker_timeout: self.settings.orchestrator.worker_timeout_secs.map(Duration::from_secs),
            headline_rules: self.settings.headline_rules(),
        }
    }
}

fn default_workspace() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(WORKSPACE_ENV)
        && !dir.trim().is_empty()
    {
        return Ok(PathBuf::from(dir));
    }
    let home = dirs::home_dir().context("Could not determine home directory; pass --workspace")?;
    Ok(home.join(".cadence"))
}

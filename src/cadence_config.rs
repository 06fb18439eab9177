//! File configuration read from `<workspace>/cadence.toml`.
//!
//! Every field has a default, so a missing file or an empty one both
//! produce the stock schedule.
//!
//! # Configuration File Format
//!
//! ```toml
//! [schedule]
//! tick_secs = 60
//! daily_at = "08:00"
//! weekly_day = "Mon"
//! weekly_at = "09:00"
//! monthly_day = 1
//! monthly_at = "10:00"
//!
//! [orchestrator]
//! sequential_failure = "abort"   # or "continue"
//! worker_timeout_secs = 300
//!
//! [dashboard]
//! freshness_secs = 3600
//!
//! [[headlines]]
//! cadence = "weekly"
//! metric = "current_arr"
//! worker = "financial"
//! pointer = "/metrics/current_arr"
//! reduce = "value"
//! ```
//!
//! Declaring any `[[headlines]]` replaces the built-in rule set.

use anyhow::{Context, Result};
use chrono::Weekday;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::orchestrator::{HeadlineRule, SequentialFailurePolicy, default_rules};
use crate::scheduler::parse_time;

pub const CONFIG_FILE_NAME: &str = "cadence.toml";

/// When each cadence fires and how often the daemon wakes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleSettings {
    #[serde(default = "default_tick_secs")]
    pub tick_secs: u64,
    #[serde(default = "default_daily_at")]
    pub daily_at: String,
    #[serde(default = "default_weekly_day")]
    pub weekly_day: Weekday,
    #[serde(default = "default_weekly_at")]
    pub weekly_at: String,
    #[serde(default = "default_monthly_day")]
    pub monthly_day: u32,
    #[serde(default = "default_monthly_at")]
    pub monthly_at: String,
}

fn default_tick_secs() -> u64 {
    60
}

fn default_daily_at() -> String {
    "08:00".to_string()
}

fn default_weekly_day() -> Weekday {
    Weekday::Mon
}

fn default_weekly_at() -> String {
    "09:00".to_string()
}

fn default_monthly_day() -> u32 {
    1
}

fn default_monthly_at() -> String {
    "10:00".to_string()
}

impl Default for ScheduleSettings {
    fn default() -> Self {
        Self {
            tick_secs: default_tick_secs(),
            daily_at: default_daily_at(),
            weekly_day: default_weekly_day(),
            weekly_at: default_weekly_at(),
            monthly_day: default_monthly_day(),
            monthly_at: default_monthly_at(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrchestratorSettings {
    /// What a weekly or monthly chain does after a panic or timeout
    #[serde(default)]
    pub sequential_failure: SequentialFailurePolicy,
    /// Per-worker time limit; unset means no limit
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub worker_timeout_secs: Option<u64>,
}

/// Read-side projections used by `cadence status`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardSettings {
    /// A worker whose last context write is younger than this is `active`
    #[serde(default = "default_freshness_secs")]
    pub freshness_secs: u64,
}

fn default_freshness_secs() -> u64 {
    3600
}

impl Default for DashboardSettings {
    fn default() -> Self {
        Self {
            freshness_secs: default_freshness_secs(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CadenceToml {
    #[serde(default)]
    pub schedule: ScheduleSettings,
    #[serde(default)]
    pub orchestrator: OrchestratorSettings,
    #[serde(default)]
    pub dashboard: DashboardSettings,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub headlines: Vec<HeadlineRule>,
}

impl CadenceToml {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse cadence.toml")
    }

    /// Load `<workspace>/cadence.toml`, or defaults if it does not exist.
    pub fn load_or_default(workspace: &Path) -> Result<Self> {
        let path = workspace.join(CONFIG_FILE_NAME);
        if path.exists() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Defaults with the built-in headline rules written out, for `config init`.
    pub fn template() -> Self {
        Self {
            headlines: default_rules(),
            ..Self::default()
        }
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize cadence.toml")
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_toml_string()?)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    /// Headline rules in effect: the declared ones, or the built-in set.
    pub fn headline_rules(&self) -> Vec<HeadlineRule> {
        if self.headlines.is_empty() {
            default_rules()
        } else {
            self.headlines.clone()
        }
    }

    /// Validate the configuration and return any warnings.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        let schedule = &self.schedule;

        if schedule.tick_secs == 0 {
            warnings.push("schedule.tick_secs must be greater than zero".to_string());
        }
        for (field, value) in [
            ("daily_at", &schedule.daily_at),
            ("weekly_at", &schedule.weekly_at),
            ("monthly_at", &schedule.monthly_at),
        ] {
            if parse_time(value).is_err() {
                warnings.push(format!("Invalid schedule.{} '{}': expected HH:MM", field, value));
            }
        }
        if !(1..=31).contains(&schedule.monthly_day) {
            warnings.push(format!(
                "Invalid schedule.monthly_day {}: must be between 1 and 31",
                schedule.monthly_day
            ));
        } else if schedule.monthly_day > 28 {
            warnings.push(format!(
                "schedule.monthly_day {} does not occur in every month; those months are skipped",
                schedule.monthly_day
            ));
        }
        if self.orchestrator.worker_timeout_secs == Some(0) {
            warnings.push("orchestrator.worker_timeout_secs must be greater than zero".to_string());
        }
        for rule in &self.headlines {
            if !rule.pointer.is_empty() && !rule.pointer.starts_with('/') {
                warnings.push(format!(
                    "Headline '{}' pointer '{}' must be empty or start with '/'",
                    rule.metric, rule.pointer
                ));
            }
        }

        warnings
    }
}

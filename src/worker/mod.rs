//! Worker contract: identity, task results and the `Worker` trait.
//!
//! A worker is one unit of the roster. The orchestrator only ever calls
//! [`Worker::run`]; `run` is expected to drive one or more [`Worker::execute`]
//! calls and to persist its own context through the [`WorkerContext`] before
//! returning. Every failure a worker can see must come back as a
//! `TaskResult` with `success == false`.

mod context;

pub use context::WorkerContext;

use async_trait::async_trait;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::future::Future;
use std::time::{Duration, Instant};

use crate::errors::WorkerError;

/// Recurrence group a worker belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Cadence {
    Daily,
    Weekly,
    Monthly,
}

impl Cadence {
    pub const ALL: [Cadence; 3] = [Cadence::Daily, Cadence::Weekly, Cadence::Monthly];

    pub fn as_str(&self) -> &'static str {
        match self {
            Cadence::Daily => "daily",
            Cadence::Weekly => "weekly",
            Cadence::Monthly => "monthly",
        }
    }
}

impl std::fmt::Display for Cadence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Cadence {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "daily" => Ok(Cadence::Daily),
            "weekly" => Ok(Cadence::Weekly),
            "monthly" => Ok(Cadence::Monthly),
            _ => anyhow::bail!("Invalid cadence '{}'. Valid values: daily, weekly, monthly", s),
        }
    }
}

/// Immutable identity of a worker. Names are unique within a roster.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkerIdentity {
    pub name: String,
    pub cadence: Cadence,
}

impl WorkerIdentity {
    pub fn new(name: &str, cadence: Cadence) -> Self {
        Self {
            name: name.to_string(),
            cadence,
        }
    }

    /// Section title used in rendered reports, e.g. `sales_dev` -> `SALES DEV`.
    pub fn title(&self) -> String {
        self.name.replace(['_', '-'], " ").to_uppercase()
    }
}

/// A single unit of work handed to [`Worker::execute`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Task {
    pub name: String,
    #[serde(default)]
    pub params: Value,
}

impl Task {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            params: Value::Null,
        }
    }

    pub fn with_params(mut self, params: Value) -> Self {
        self.params = params;
        self
    }
}

/// Outcome of one worker invocation. Created once, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskResult {
    pub worker: WorkerIdentity,
    pub success: bool,
    #[serde(default)]
    pub payload: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(with = "duration_serde")]
    pub duration: Duration,
    pub finished_at: DateTime<Local>,
}

impl TaskResult {
    /// Create a successful result.
    pub fn success(worker: WorkerIdentity, payload: Value, duration: Duration) -> Self {
        Self {
            worker,
            success: true,
            payload,
            error: None,
            duration,
            finished_at: Local::now(),
        }
    }

    /// Create a failed result.
    pub fn failure(worker: WorkerIdentity, error: &str, duration: Duration) -> Self {
        Self {
            worker,
            success: false,
            payload: Value::Null,
            error: Some(error.to_string()),
            duration,
            finished_at: Local::now(),
        }
    }

    /// Fold a fallible worker outcome into a result.
    pub fn from_outcome(
        worker: WorkerIdentity,
        outcome: Result<Value, WorkerError>,
        duration: Duration,
    ) -> Self {
        match outcome {
            Ok(payload) => Self::success(worker, payload, duration),
            Err(e) => Self::failure(worker, &e.to_string(), duration),
        }
    }

    /// Error message for display, `"Unknown"` when a failure carried none.
    pub fn error_message(&self) -> &str {
        self.error.as_deref().unwrap_or("Unknown")
    }
}

/// A unit of the roster.
///
/// Both operations are required; there are no default bodies, so a worker
/// that forgets one does not compile.
#[async_trait]
pub trait Worker: Send + Sync {
    fn identity(&self) -> &WorkerIdentity;

    /// Execute a single task.
    async fn execute(&self, task: &Task, ctx: &WorkerContext) -> TaskResult;

    /// Self-contained entry point called by the orchestrator.
    async fn run(&self, ctx: &WorkerContext) -> TaskResult;
}

/// Run a fallible worker body and fold it into a `TaskResult`, timing it.
///
/// Built-in workers implement `execute` with this so their bodies can use `?`.
pub async fn execute_guarded<F>(identity: &WorkerIdentity, task: &Task, body: F) -> TaskResult
where
    F: Future<Output = Result<Value, WorkerError>>,
{
    let start = Instant::now();
    let outcome = body.await;
    if let Err(e) = &outcome {
        tracing::warn!(worker = %identity.name, task = %task.name, "Task failed: {}", e);
    }
    TaskResult::from_outcome(identity.clone(), outcome, start.elapsed())
}

/// Serde helpers for Duration serialization.
pub(crate) mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        (duration.as_millis() as u64).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_cadence_parse_and_display() {
        assert_eq!("daily".parse::<Cadence>().unwrap(), Cadence::Daily);
        assert_eq!("WEEKLY".parse::<Cadence>().unwrap(), Cadence::Weekly);
        assert_eq!(Cadence::Monthly.to_string(), "monthly");
        assert!("hourly".parse::<Cadence>().is_err());
    }

    #[test]
    fn test_identity_title() {
        let id = WorkerIdentity::new("customer_success", Cadence::Daily);
        assert_eq!(id.title(), "CUSTOMER SUCCESS");
    }

    #[test]
    fn test_from_outcome_success_and_failure() {
        let id = WorkerIdentity::new("devops", Cadence::Daily);
        let ok = TaskResult::from_outcome(
            id.clone(),
            Ok(json!({"healthy_services": 5})),
            Duration::from_millis(12),
        );
        assert!(ok.success);
        assert!(ok.error.is_none());
        assert_eq!(ok.payload["healthy_services"], 5);

        let failed = TaskResult::from_outcome(
            id,
            Err(WorkerError::Failed("scan unavailable".into())),
            Duration::ZERO,
        );
        assert!(!failed.success);
        assert_eq!(failed.error_message(), "scan unavailable");
        assert_eq!(failed.payload, Value::Null);
    }

    #[test]
    fn test_task_result_serializes_duration_as_millis() {
        let result = TaskResult::success(
            WorkerIdentity::new("qa_testing", Cadence::Daily),
            json!({}),
            Duration::from_millis(1500),
        );
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["duration"], 1500);
        assert_eq!(json["worker"]["cadence"], "daily");
        assert!(json.get("error").is_none());

        let back: TaskResult = serde_json::from_value(json).unwrap();
        assert_eq!(back.duration, Duration::from_millis(1500));
    }

    #[tokio::test]
    async fn test_execute_guarded_captures_error() {
        let id = WorkerIdentity::new("operations", Cadence::Daily);
        let result = execute_guarded(&id, &Task::new("check"), async {
            Err(WorkerError::Failed("no data source".into()))
        })
        .await;
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("no data source"));
        assert_eq!(result.worker, id);
    }
}

//! Batch state machine and the aggregate a batch produces.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::worker::{Cadence, TaskResult};

/// Lifecycle of one cadence batch.
///
/// `Idle -> Dispatching -> Awaiting -> Aggregated -> Reported -> Idle`.
/// A batch whose report cannot be persisted drops straight back to `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BatchState {
    #[default]
    Idle,
    Dispatching,
    Awaiting,
    Aggregated,
    Reported,
}

impl BatchState {
    pub fn can_transition_to(&self, next: BatchState) -> bool {
        use BatchState::*;
        matches!(
            (self, next),
            (Idle, Dispatching)
                | (Dispatching, Awaiting)
                | (Awaiting, Aggregated)
                | (Aggregated, Reported)
                | (Reported, Idle)
                | (_, Idle)
        )
    }

    pub fn is_running(&self) -> bool {
        !matches!(self, Self::Idle)
    }
}

/// A named scalar derived from a batch for trend tracking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Headline {
    pub name: String,
    pub value: f64,
}

/// Record of a sequential batch that stopped early.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbortRecord {
    /// Worker whose unhandled failure stopped the chain.
    pub worker: String,
    pub message: String,
    /// Workers that were never dispatched, in roster order.
    pub skipped: Vec<String>,
}

/// Aggregate of one batch.
///
/// `results` is in invocation order, one entry per dispatched worker;
/// `errors` is the subsequence of `results` that failed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchSummary {
    pub batch_id: Uuid,
    pub cadence: Cadence,
    pub timestamp: DateTime<Local>,
    pub results: Vec<TaskResult>,
    pub errors: Vec<TaskResult>,
    #[serde(default)]
    pub headlines: Vec<Headline>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aborted: Option<AbortRecord>,
}

impl BatchSummary {
    pub fn new(cadence: Cadence, timestamp: DateTime<Local>, results: Vec<TaskResult>) -> Self {
        let errors = results.iter().filter(|r| !r.success).cloned().collect();
        Self {
            batch_id: Uuid::new_v4(),
            cadence,
            timestamp,
            results,
            errors,
            headlines: Vec::new(),
            aborted: None,
        }
    }

    pub fn with_headlines(mut self, headlines: Vec<Headline>) -> Self {
        self.headlines = headlines;
        self
    }

    pub fn with_abort(mut self, aborted: Option<AbortRecord>) -> Self {
        self.aborted = aborted;
        self
    }

    pub fn succeeded(&self) -> usize {
        self.results.len() - self.errors.len()
    }

    pub fn failed(&self) -> usize {
        self.errors.len()
    }

    pub fn all_success(&self) -> bool {
        self.errors.is_empty() && self.aborted.is_none()
    }

    pub fn result_for(&self, worker: &str) -> Option<&TaskResult> {
        self.results.iter().find(|r| r.worker.name == worker)
    }

    pub fn headline(&self, name: &str) -> Option<f64> {
        self.headlines.iter().find(|h| h.name == name).map(|h| h.value)
    }
}

use chrono::{DateTime, Local};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::errors::PersistenceError;
use crate::store::{ContextStore, MetricsSink, latest_values};

/// Owner-bound handle a worker uses for its side effects.
///
/// Writes always go to the worker's own namespace. Reads may reach into
/// another owner's namespace so later workers in a sequential batch can use
/// what earlier ones saved.
#[derive(Debug, Clone)]
pub struct WorkerContext {
    owner: String,
    batch_time: DateTime<Local>,
    contexts: ContextStore,
    metrics: MetricsSink,
}

impl WorkerContext {
    pub fn new(
        owner: &str,
        batch_time: DateTime<Local>,
        contexts: ContextStore,
        metrics: MetricsSink,
    ) -> Self {
        Self {
            owner: owner.to_string(),
            batch_time,
            contexts,
            metrics,
        }
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Time the enclosing batch started.
    pub fn batch_time(&self) -> DateTime<Local> {
        self.batch_time
    }

    /// Date stamp for date-qualified context ids, e.g. `20251108`.
    pub fn date_stamp(&self) -> String {
        self.batch_time.format("%Y%m%d").to_string()
    }

    /// Month stamp for monthly context ids, e.g. `202511`.
    pub fn month_stamp(&self) -> String {
        self.batch_time.format("%Y%m").to_string()
    }

    pub fn save(&self, context_id: &str, data: &Value) -> Result<(), PersistenceError> {
        self.contexts.save(&self.owner, context_id, data)
    }

    pub fn load_from(&self, owner: &str, context_id: &str) -> Result<Option<Value>, PersistenceError> {
        self.contexts.load(owner, context_id)
    }

    pub fn metric(&self, metric_name: &str, value: f64) -> Result<(), PersistenceError> {
        self.metrics.append(&self.owner, metric_name, value)
    }

    /// Latest recorded value of every metric, across all owners.
    pub fn latest_metrics(&self) -> Result<BTreeMap<String, f64>, PersistenceError> {
        Ok(latest_values(&self.metrics.samples()?))
    }
}

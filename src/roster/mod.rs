//! The fixed, ordered set of workers owned by the process.
//!
//! Roster order is dispatch order: daily results are aggregated in this
//! order and weekly/monthly chains run in it.

mod daily;
mod monthly;
mod weekly;

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;

use crate::errors::{OrchestratorError, WorkerError};
use crate::worker::{Cadence, Task, TaskResult, Worker, WorkerContext, WorkerIdentity, execute_guarded};

/// Synchronous body of a built-in worker.
type Body = fn(&WorkerContext, &Task) -> Result<Value, WorkerError>;

/// A worker whose single task is a plain function over its context.
pub struct BuiltinWorker {
    identity: WorkerIdentity,
    task: &'static str,
    body: Body,
}

impl BuiltinWorker {
    pub fn new(name: &str, cadence: Cadence, task: &'static str, body: Body) -> Self {
        Self {
            identity: WorkerIdentity::new(name, cadence),
            task,
            body,
        }
    }
}

#[async_trait]
impl Worker for BuiltinWorker {
    fn identity(&self) -> &WorkerIdentity {
        &self.identity
    }

    async fn execute(&self, task: &Task, ctx: &WorkerContext) -> TaskResult {
        execute_guarded(&self.identity, task, async { (self.body)(ctx, task) }).await
    }

    async fn run(&self, ctx: &WorkerContext) -> TaskResult {
        tracing::info!(worker = %self.identity.name, task = self.task, "Worker starting");
        self.execute(&Task::new(self.task), ctx).await
    }
}

#[derive(Clone)]
pub struct Roster {
    workers: Vec<Arc<dyn Worker>>,
}

impl std::fmt::Debug for Roster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

impl Roster {
    /// Build a roster, rejecting duplicate worker names.
    pub fn new(workers: Vec<Arc<dyn Worker>>) -> Result<Self, OrchestratorError> {
        let mut seen = HashSet::new();
        for worker in &workers {
            let name = &worker.identity().name;
            if !seen.insert(name.clone()) {
                return Err(OrchestratorError::DuplicateWorker(name.clone()));
            }
        }
        Ok(Self { workers })
    }

    /// The twelve built-in workers, daily first.
    pub fn builtin() -> Self {
        let workers = daily::workers()
            .into_iter()
            .chain(weekly::workers())
            .chain(monthly::workers())
            .map(|w| Arc::new(w) as Arc<dyn Worker>)
            .collect();
        Self { workers }
    }

    /// Members of `cadence` in roster order.
    pub fn members(&self, cadence: Cadence) -> Vec<Arc<dyn Worker>> {
        self.workers
            .iter()
            .filter(|w| w.identity().cadence == cadence)
            .cloned()
            .collect()
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Worker>> {
        self.workers.iter().find(|w| w.identity().name == name).cloned()
    }

    pub fn names(&self) -> Vec<&str> {
        self.workers.iter().map(|w| w.identity().name.as_str()).collect()
    }

    pub fn identities(&self) -> impl Iterator<Item = &WorkerIdentity> {
        self.workers.iter().map(|w| w.identity())
    }

    pub fn len(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{ContextStore, MetricsSink};
    use chrono::{Local, TimeZone};
    use serde_json::json;
    use tempfile::TempDir;

    fn ctx(dir: &TempDir, owner: &str) -> WorkerContext {
        WorkerContext::new(
            owner,
            Local.with_ymd_and_hms(2025, 11, 10, 9, 0, 0).unwrap(),
            ContextStore::new(dir.path().join("cache")),
            MetricsSink::new(dir.path().join("logs/metrics.jsonl")),
        )
    }

    #[test]
    fn test_builtin_roster_order() {
        let roster = Roster::builtin();
        assert_eq!(roster.len(), 12);
        let daily: Vec<_> = roster
            .members(Cadence::Daily)
            .iter()
            .map(|w| w.identity().name.clone())
            .collect();
        assert_eq!(
            daily,
            vec!["sales_dev", "market_intel", "customer_success", "devops", "qa_testing", "operations"]
        );
        let weekly: Vec<_> = roster
            .members(Cadence::Weekly)
            .iter()
            .map(|w| w.identity().name.clone())
            .collect();
        assert_eq!(
            weekly,
            vec!["financial", "content_marketing", "product_manager", "customer_intel"]
        );
        assert_eq!(roster.members(Cadence::Monthly).len(), 2);
    }

    #[test]
    fn test_builtin_names_are_unique() {
        let roster = Roster::builtin();
        let rebuilt = Roster::new(roster.workers.clone());
        assert!(rebuilt.is_ok());
    }

    #[test]
    fn test_duplicate_names_rejected() {
        fn noop(_: &WorkerContext, _: &Task) -> Result<Value, WorkerError> {
            Ok(Value::Null)
        }
        let a: Arc<dyn Worker> = Arc::new(BuiltinWorker::new("dup", Cadence::Daily, "x", noop));
        let b: Arc<dyn Worker> = Arc::new(BuiltinWorker::new("dup", Cadence::Weekly, "y", noop));
        assert!(matches!(
            Roster::new(vec![a, b]),
            Err(OrchestratorError::DuplicateWorker(name)) if name == "dup"
        ));
    }

    #[test]
    fn test_get_by_name() {
        let roster = Roster::builtin();
        assert_eq!(roster.get("devops").unwrap().identity().cadence, Cadence::Daily);
        assert!(roster.get("nobody").is_none());
    }

    #[tokio::test]
    async fn test_builtin_body_error_becomes_failed_result() {
        fn broken(_: &WorkerContext, _: &Task) -> Result<Value, WorkerError> {
            Err(WorkerError::Failed("source offline".into()))
        }
        let dir = TempDir::new().unwrap();
        let worker = BuiltinWorker::new("broken", Cadence::Daily, "x", broken);
        let result = worker.run(&ctx(&dir, "broken")).await;
        assert!(!result.success);
        assert_eq!(result.error_message(), "source offline");
    }

    #[tokio::test]
    async fn test_every_builtin_worker_succeeds_and_saves_context() {
        let dir = TempDir::new().unwrap();
        let roster = Roster::builtin();
        for worker in roster.workers.iter() {
            let name = worker.identity().name.clone();
            let result = worker.run(&ctx(&dir, &name)).await;
            assert!(result.success, "{} failed: {:?}", name, result.error);
            let store = ContextStore::new(dir.path().join("cache"));
            assert!(!store.list(&name).unwrap().is_empty(), "{} saved nothing", name);
        }
    }

    #[tokio::test]
    async fn test_devops_snapshot_round_trip() {
        let dir = TempDir::new().unwrap();
        let ctx = WorkerContext::new(
            "devops",
            Local.with_ymd_and_hms(2025, 11, 8, 8, 0, 0).unwrap(),
            ContextStore::new(dir.path().join("cache")),
            MetricsSink::new(dir.path().join("logs/metrics.jsonl")),
        );
        let result = Roster::builtin().get("devops").unwrap().run(&ctx).await;
        assert!(result.success);

        let store = ContextStore::new(dir.path().join("cache"));
        let saved = store.load("devops", "infra_report_20251108").unwrap().unwrap();
        assert_eq!(saved, result.payload["infra_report"]);
        assert_eq!(saved["service_health"].as_array().unwrap().len(), 5);
    }

    #[tokio::test]
    async fn test_payloads_feed_default_headlines() {
        let dir = TempDir::new().unwrap();
        let roster = Roster::builtin();
        let financial = roster.get("financial").unwrap().run(&ctx(&dir, "financial")).await;
        assert!(financial.payload.pointer("/metrics/current_arr").is_some());
        assert!(financial.payload.pointer("/metrics/runway_months").is_some());

        let cs = roster
            .get("customer_success")
            .unwrap()
            .run(&ctx(&dir, "customer_success"))
            .await;
        assert!(cs.payload.pointer("/report/at_risk_customers").unwrap().is_array());

        let sales = roster.get("sales_dev").unwrap().run(&ctx(&dir, "sales_dev")).await;
        assert!(sales.payload["leads_generated"].as_u64().unwrap() > 0);
        assert_ne!(sales.payload, json!(null));
    }
}

use async_trait::async_trait;
use chrono::{DateTime, Local};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::task::{JoinError, JoinHandle};

use super::headline::{HeadlineRule, default_rules, derive_headlines};
use super::notify::{LogNotifier, Notifier};
use super::state::{AbortRecord, BatchState, BatchSummary, Headline};
use crate::config::Config;
use crate::errors::{OrchestratorError, WorkerError};
use crate::report::{Report, ReportGenerator};
use crate::roster::Roster;
use crate::scheduler::BatchRunner;
use crate::store::{ContextStore, MetricsSink};
use crate::worker::{Cadence, TaskResult, Worker, WorkerContext, WorkerIdentity};

/// Owner name used for metrics the orchestrator records itself.
pub const ORCHESTRATOR_OWNER: &str = "orchestrator";

/// What a sequential batch does when a worker panics or times out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SequentialFailurePolicy {
    /// Stop the chain; remaining workers are not run.
    #[default]
    Abort,
    /// Record the failure and keep going.
    Continue,
}

impl std::fmt::Display for SequentialFailurePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SequentialFailurePolicy::Abort => write!(f, "abort"),
            SequentialFailurePolicy::Continue => write!(f, "continue"),
        }
    }
}

/// Knobs that change how batches are executed.
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub sequential_failure: SequentialFailurePolicy,
    pub worker_timeout: Option<Duration>,
    pub headline_rules: Vec<HeadlineRule>,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            sequential_failure: SequentialFailurePolicy::Abort,
            worker_timeout: None,
            headline_rules: default_rules(),
        }
    }
}

/// Everything a completed batch produced.
#[derive(Debug, Clone)]
pub struct BatchOutcome {
    pub summary: BatchSummary,
    pub report: Report,
    pub report_path: PathBuf,
}

/// Runs cadence batches over a fixed roster.
pub struct Orchestrator {
    roster: Roster,
    contexts: ContextStore,
    metrics: MetricsSink,
    reports: ReportGenerator,
    notifier: Arc<dyn Notifier>,
    settings: RunSettings,
    states: Mutex<HashMap<Cadence, BatchState>>,
}

impl Orchestrator {
    pub fn new(
        roster: Roster,
        contexts: ContextStore,
        metrics: MetricsSink,
        reports: ReportGenerator,
        settings: RunSettings,
    ) -> Self {
        Self {
            roster,
            contexts,
            metrics,
            reports,
            notifier: Arc::new(LogNotifier),
            settings,
            states: Mutex::new(HashMap::new()),
        }
    }

    /// Wire an orchestrator to the workspace layout described by `config`.
    pub fn from_config(config: &Config, roster: Roster) -> Self {
        Self::new(
            roster,
            ContextStore::new(&config.cache_dir),
            MetricsSink::new(&config.metrics_file),
            ReportGenerator::new(&config.reports_dir),
            config.run_settings(),
        )
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn settings(&self) -> &RunSettings {
        &self.settings
    }

    /// Current lifecycle state of the batch for `cadence`.
    pub fn state(&self, cadence: Cadence) -> BatchState {
        let states = self.states.lock().unwrap_or_else(|p| p.into_inner());
        states.get(&cadence).copied().unwrap_or_default()
    }

    /// Claim the `cadence` slot, refusing a second batch of the same cadence.
    fn begin(&self, cadence: Cadence) -> Result<(), OrchestratorError> {
        let mut states = self.states.lock().unwrap_or_else(|p| p.into_inner());
        let current = states.entry(cadence).or_default();
        if current.is_running() {
            tracing::warn!(%cadence, "Batch already {:?}, not starting another", current);
            return Err(OrchestratorError::BatchInProgress(cadence));
        }
        tracing::debug!(%cadence, "Batch state {:?} -> {:?}", current, BatchState::Dispatching);
        *current = BatchState::Dispatching;
        Ok(())
    }

    fn transition(&self, cadence: Cadence, next: BatchState) {
        let mut states = self.states.lock().unwrap_or_else(|p| p.into_inner());
        let current = states.entry(cadence).or_default();
        if !current.can_transition_to(next) {
            tracing::warn!(%cadence, "Unexpected batch transition {:?} -> {:?}", current, next);
        }
        tracing::debug!(%cadence, "Batch state {:?} -> {:?}", current, next);
        *current = next;
    }

    fn context_for(&self, identity: &WorkerIdentity, batch_time: DateTime<Local>) -> WorkerContext {
        WorkerContext::new(
            &identity.name,
            batch_time,
            self.contexts.clone(),
            self.metrics.clone(),
        )
    }

    /// Run `worker.run` on its own task so panics stay contained.
    fn spawn_worker(
        &self,
        worker: Arc<dyn Worker>,
        batch_time: DateTime<Local>,
    ) -> JoinHandle<Result<TaskResult, WorkerError>> {
        let ctx = self.context_for(worker.identity(), batch_time);
        let limit = self.settings.worker_timeout;
        tokio::spawn(async move {
            match limit {
                Some(limit) => tokio::time::timeout(limit, worker.run(&ctx))
                    .await
                    .map_err(|_| WorkerError::TimedOut {
                        secs: limit.as_secs(),
                    }),
                None => Ok(worker.run(&ctx).await),
            }
        })
    }

    /// Run one batch for `cadence` stamped with `batch_time`.
    ///
    /// Daily workers run concurrently and every failure is captured in its
    /// result. Weekly and monthly workers run one after another; under
    /// [`SequentialFailurePolicy::Abort`] a panic or timeout stops the chain,
    /// the partial report is still written and `SequentialAborted` is
    /// returned.
    pub async fn run_batch(
        &self,
        cadence: Cadence,
        batch_time: DateTime<Local>,
    ) -> Result<BatchOutcome, OrchestratorError> {
        self.begin(cadence)?;
        let members = self.roster.members(cadence);
        tracing::info!(%cadence, workers = members.len(), "Starting {} batch", cadence);

        let (results, aborted) = match cadence {
            Cadence::Daily => (self.fan_out(&members, batch_time).await, None),
            Cadence::Weekly | Cadence::Monthly => {
                self.run_sequential(cadence, &members, batch_time).await
            }
        };
        self.transition(cadence, BatchState::Aggregated);

        let summary = BatchSummary::new(cadence, batch_time, results).with_abort(aborted);
        let headlines = derive_headlines(&summary, &self.settings.headline_rules);
        self.record_headlines(&headlines);
        let summary = summary.with_headlines(headlines);

        let report = self.reports.render(&summary);
        let report_path = match self.reports.persist(&report) {
            Ok(path) => path,
            Err(source) => {
                tracing::error!(%cadence, "Failed to persist report: {}", source);
                self.transition(cadence, BatchState::Idle);
                return Err(OrchestratorError::Report { cadence, source });
            }
        };
        self.transition(cadence, BatchState::Reported);

        if let Err(e) = self.notifier.notify(&report, &report_path).await {
            tracing::warn!(%cadence, "Notification failed: {:#}", e);
        }
        self.transition(cadence, BatchState::Idle);

        if let Some(aborted) = &summary.aborted {
            tracing::error!(
                %cadence,
                worker = %aborted.worker,
                skipped = aborted.skipped.len(),
                "Batch aborted: {}",
                aborted.message
            );
            return Err(OrchestratorError::SequentialAborted {
                cadence,
                worker: aborted.worker.clone(),
                message: aborted.message.clone(),
                skipped: aborted.skipped.len(),
            });
        }

        tracing::info!(
            %cadence,
            succeeded = summary.succeeded(),
            failed = summary.failed(),
            "Finished {} batch",
            cadence
        );
        Ok(BatchOutcome {
            summary,
            report,
            report_path,
        })
    }

    async fn fan_out(&self, members: &[Arc<dyn Worker>], batch_time: DateTime<Local>) -> Vec<TaskResult> {
        let start = Instant::now();
        let handles: Vec<_> = members
            .iter()
            .map(|worker| self.spawn_worker(Arc::clone(worker), batch_time))
            .collect();
        self.transition(Cadence::Daily, BatchState::Awaiting);

        let joined = join_all(handles).await;
        members
            .iter()
            .zip(joined)
            .map(|(worker, joined)| match settle(joined) {
                Ok(result) => log_result(result),
                Err(e) => captured_failure(worker.identity(), &e, start.elapsed()),
            })
            .collect()
    }

    async fn run_sequential(
        &self,
        cadence: Cadence,
        members: &[Arc<dyn Worker>],
        batch_time: DateTime<Local>,
    ) -> (Vec<TaskResult>, Option<AbortRecord>) {
        self.transition(cadence, BatchState::Awaiting);
        let mut results = Vec::with_capacity(members.len());

        for (idx, worker) in members.iter().enumerate() {
            let start = Instant::now();
            let joined = self.spawn_worker(Arc::clone(worker), batch_time).await;
            match settle(joined) {
                Ok(result) => results.push(log_result(result)),
                Err(e) => {
                    let identity = worker.identity();
                    results.push(captured_failure(identity, &e, start.elapsed()));
                    if e.is_unhandled() && self.settings.sequential_failure == SequentialFailurePolicy::Abort {
                        let skipped = members[idx + 1..]
                            .iter()
                            .map(|w| w.identity().name.clone())
                            .collect();
                        return (
                            results,
                            Some(AbortRecord {
                                worker: identity.name.clone(),
                                message: e.to_string(),
                                skipped,
                            }),
                        );
                    }
                }
            }
        }

        (results, None)
    }

    fn record_headlines(&self, headlines: &[Headline]) {
        for headline in headlines {
            if let Err(e) = self.metrics.append(ORCHESTRATOR_OWNER, &headline.name, headline.value) {
                tracing::warn!(metric = %headline.name, "Failed to record headline metric: {}", e);
            }
        }
    }

    /// Run a single named worker outside any batch.
    pub async fn run_single(&self, name: &str, batch_time: DateTime<Local>) -> Result<TaskResult, OrchestratorError> {
        let worker = self
            .roster
            .get(name)
            .ok_or_else(|| OrchestratorError::UnknownWorker(name.to_string()))?;
        tracing::info!(worker = %name, "Running single worker");

        let start = Instant::now();
        let identity = worker.identity().clone();
        let result = match settle(self.spawn_worker(worker, batch_time).await) {
            Ok(result) => log_result(result),
            Err(e) => captured_failure(&identity, &e, start.elapsed()),
        };
        Ok(result)
    }
}

#[async_trait]
impl BatchRunner for Orchestrator {
    async fn dispatch(&self, cadence: Cadence, batch_time: DateTime<Local>) -> Result<(), OrchestratorError> {
        self.run_batch(cadence, batch_time).await.map(|_| ())
    }
}

fn settle(joined: Result<Result<TaskResult, WorkerError>, JoinError>) -> Result<TaskResult, WorkerError> {
    match joined {
        Ok(outcome) => outcome,
        Err(e) if e.is_panic() => Err(WorkerError::Panicked(panic_message(e.into_panic()))),
        Err(e) => Err(WorkerError::Panicked(e.to_string())),
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

fn log_result(result: TaskResult) -> TaskResult {
    if !result.success {
        tracing::warn!(worker = %result.worker.name, "Worker failed: {}", result.error_message());
    }
    result
}

fn captured_failure(identity: &WorkerIdentity, error: &WorkerError, elapsed: Duration) -> TaskResult {
    tracing::warn!(worker = %identity.name, "Worker failed: {}", error);
    TaskResult::failure(identity.clone(), &error.to_string(), elapsed)
}

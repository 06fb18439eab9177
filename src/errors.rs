//! Typed error hierarchy for the cadence orchestrator.
//!
//! Four enums cover the four seams:
//! - `PersistenceError`: context store, metrics log and report files
//! - `WorkerError`: a worker's own logic failed
//! - `OrchestratorError`: a batch could not be completed as a whole
//! - `SchedulerError`: a scheduler tick failed to dispatch

use std::path::PathBuf;

use thiserror::Error;

use crate::worker::Cadence;

/// Failures of the underlying storage medium.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("Failed to create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Corrupt record at {path}: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to encode record: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("Invalid {kind} '{value}': must be a non-empty name without path separators")]
    InvalidKey { kind: &'static str, value: String },
}

/// A worker's internal logic failed.
#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("{0}")]
    Failed(String),

    #[error("Worker panicked: {0}")]
    Panicked(String),

    #[error("Worker timed out after {secs}s")]
    TimedOut { secs: u64 },

    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl WorkerError {
    /// Failures the worker could not turn into a result on its own.
    ///
    /// These are the ones that abort a sequential batch.
    pub fn is_unhandled(&self) -> bool {
        matches!(self, Self::Panicked(_) | Self::TimedOut { .. })
    }
}

/// Errors from running a batch as a whole.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("{cadence} batch aborted at worker '{worker}': {message} ({skipped} worker(s) not run)")]
    SequentialAborted {
        cadence: Cadence,
        worker: String,
        message: String,
        skipped: usize,
    },

    #[error("Failed to persist {cadence} report: {source}")]
    Report {
        cadence: Cadence,
        #[source]
        source: PersistenceError,
    },

    #[error("Duplicate worker name '{0}' in roster")]
    DuplicateWorker(String),

    #[error("Unknown worker '{0}'")]
    UnknownWorker(String),

    #[error("A {0} batch is already running")]
    BatchInProgress(Cadence),
}

/// Errors raised while evaluating triggers or dispatching a batch from a tick.
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("Dispatch of {cadence} batch failed: {source}")]
    Dispatch {
        cadence: Cadence,
        #[source]
        source: OrchestratorError,
    },

    #[error("Invalid trigger time '{0}': expected HH:MM")]
    InvalidTime(String),
}

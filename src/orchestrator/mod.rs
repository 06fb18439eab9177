//! Batch execution over the roster.
//!
//! | Module     | Contents                                                   |
//! |------------|------------------------------------------------------------|
//! | `runner`   | `Orchestrator`: daily fan-out, weekly/monthly sequential   |
//! | `state`    | `BatchState` lifecycle, `BatchSummary` aggregate           |
//! | `headline` | Headline rules evaluated against worker payloads           |
//! | `notify`   | `Notifier` seam invoked after a report is persisted        |
//!
//! Daily batches isolate failures: every member runs and every failure is
//! recorded in place. Weekly and monthly batches are ordered chains where a
//! panic or timeout can stop the remainder.

pub mod headline;
pub mod notify;
pub mod runner;
pub mod state;

pub use headline::{HeadlineRule, Reduce, default_rules, derive_headlines};
pub use notify::{LogNotifier, Notifier};
pub use runner::{BatchOutcome, ORCHESTRATOR_OWNER, Orchestrator, RunSettings, SequentialFailurePolicy};
pub use state::{AbortRecord, BatchState, BatchSummary, Headline};

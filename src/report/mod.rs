//! Rendering batch summaries into plain-text reports.
//!
//! Rendering never fails: failed workers become an explicit
//! `failed: <message>` line and payloads of any shape are summarised.
//! File names are derived from cadence and batch date only, so two batches
//! in the same period write the same report file.

mod store;

pub use store::{ReportEntry, ReportStore};

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt::Write as _;
use std::path::PathBuf;

use crate::errors::PersistenceError;
use crate::orchestrator::{AbortRecord, BatchSummary, Headline};
use crate::worker::{Cadence, TaskResult};

const RULE_WIDTH: usize = 70;

/// A rendered report. Derived from one batch and written once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub cadence: Cadence,
    pub timestamp: DateTime<Local>,
    pub rendered_text: String,
    pub filename: String,
}

/// Deterministic report file name for a cadence and batch time.
pub fn report_filename(cadence: Cadence, timestamp: DateTime<Local>) -> String {
    match cadence {
        Cadence::Daily => format!("daily_report_{}.txt", timestamp.format("%Y%m%d")),
        Cadence::Weekly => format!("weekly_report_{}.txt", timestamp.format("%Y%m%d")),
        Cadence::Monthly => format!("monthly_report_{}.txt", timestamp.format("%Y%m")),
    }
}

/// Renders summaries and persists the result under the reports directory.
#[derive(Debug, Clone)]
pub struct ReportGenerator {
    store: ReportStore,
}

impl ReportGenerator {
    pub fn new(reports_dir: impl Into<PathBuf>) -> Self {
        Self {
            store: ReportStore::new(reports_dir),
        }
    }

    pub fn store(&self) -> &ReportStore {
        &self.store
    }

    /// Pure rendering of a summary.
    pub fn render(&self, summary: &BatchSummary) -> Report {
        Report {
            cadence: summary.cadence,
            timestamp: summary.timestamp,
            rendered_text: render_summary(summary),
            filename: report_filename(summary.cadence, summary.timestamp),
        }
    }

    pub fn persist(&self, report: &Report) -> Result<PathBuf, PersistenceError> {
        self.store.save(report)
    }
}

fn rule() -> String {
    "=".repeat(RULE_WIDTH)
}

fn header(summary: &BatchSummary) -> String {
    let ts = summary.timestamp;
    let (title, period) = match summary.cadence {
        Cadence::Daily => ("DAILY WORKER REPORT", format!("Date: {}", ts.format("%Y-%m-%d"))),
        Cadence::Weekly => ("WEEKLY WORKER REPORT", format!("Week Ending: {}", ts.format("%Y-%m-%d"))),
        Cadence::Monthly => ("MONTHLY EXECUTIVE BRIEFING", format!("Month: {}", ts.format("%B %Y"))),
    };

    let mut out = String::new();
    let _ = writeln!(out, "{}", rule());
    let _ = writeln!(out, "{}", title);
    let _ = writeln!(out, "{}", rule());
    let _ = writeln!(out, "{}", period);
    let _ = writeln!(out, "Execution Time: {}", ts.format("%H:%M:%S"));
    let _ = writeln!(out, "Batch: {}", summary.batch_id);
    let _ = writeln!(
        out,
        "Workers: {} run, {} succeeded, {} failed",
        summary.results.len(),
        summary.succeeded(),
        summary.failed()
    );
    out
}

fn render_scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "-".to_string(),
        Value::Array(items) => format!("{} item(s)", items.len()),
        Value::Object(fields) => format!("{} field(s)", fields.len()),
        other => other.to_string(),
    }
}

fn render_section(out: &mut String, result: &TaskResult) {
    let _ = writeln!(out, "\n▸ {}", result.worker.title());
    if !result.success {
        let _ = writeln!(out, "  ❌ failed: {}", result.error_message());
        return;
    }

    let _ = writeln!(out, "  ✅ Complete ({:.2}s)", result.duration.as_secs_f64());
    match &result.payload {
        Value::Object(fields) => {
            for (key, value) in fields {
                let _ = writeln!(out, "  {}: {}", key, render_scalar(value));
            }
        }
        Value::Null => {}
        other => {
            let _ = writeln!(out, "  result: {}", render_scalar(other));
        }
    }
}

/// Whole numbers without a fraction, everything else to two places.
pub fn format_metric(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{:.2}", value)
    }
}

fn render_headlines(out: &mut String, headlines: &[Headline]) {
    if headlines.is_empty() {
        return;
    }
    let _ = writeln!(out, "\nHEADLINE METRICS");
    for headline in headlines {
        let _ = writeln!(out, "  {}: {}", headline.name, format_metric(headline.value));
    }
}

fn render_abort(out: &mut String, aborted: &AbortRecord) {
    let _ = writeln!(out, "\n⛔ BATCH ABORTED");
    let _ = writeln!(out, "  at worker: {}", aborted.worker);
    let _ = writeln!(out, "  reason: {}", aborted.message);
    if aborted.skipped.is_empty() {
        let _ = writeln!(out, "  not run: -");
    } else {
        let _ = writeln!(out, "  not run: {}", aborted.skipped.join(", "));
    }
}

/// Full report text for a batch summary.
pub fn render_summary(summary: &BatchSummary) -> String {
    let mut out = header(summary);

    if summary.results.is_empty() {
        let _ = writeln!(out, "\n(no workers dispatched)");
    }
    for result in &summary.results {
        render_section(&mut out, result);
    }
    render_headlines(&mut out, &summary.headlines);
    if let Some(aborted) = &summary.aborted {
        render_abort(&mut out, aborted);
    }

    let _ = writeln!(out, "\n{}", rule());
    out
}

/// Execution report for a single worker result.
pub fn render_task_result(result: &TaskResult) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", rule());
    let _ = writeln!(out, "Worker Execution Report");
    let _ = writeln!(out, "{}", rule());
    let _ = writeln!(out, "Worker: {}", result.worker.name);
    let _ = writeln!(out, "Cadence: {}", result.worker.cadence);
    let _ = writeln!(out, "Finished: {}", result.finished_at.format("%Y-%m-%d %H:%M:%S"));
    let _ = writeln!(out, "Duration: {:.2} seconds", result.duration.as_secs_f64());
    let status = if result.success { "✅ Complete" } else { "❌ Failed" };
    let _ = writeln!(out, "Status: {}", status);
    let _ = writeln!(out, "{}", rule());
    let _ = writeln!(out);
    let _ = writeln!(out, "Results:");
    let body = serde_json::to_string_pretty(result).unwrap_or_else(|e| format!("<unrenderable: {}>", e));
    let _ = writeln!(out, "{}", body);
    out
}

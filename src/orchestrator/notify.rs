//! Notification seam. Delivery (email, chat) lives outside this crate; the
//! orchestrator only records that a notification was requested.

use anyhow::Result;
use async_trait::async_trait;
use std::path::Path;

use crate::report::Report;

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, report: &Report, path: &Path) -> Result<()>;
}

/// Records the request in the log and nothing else.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, report: &Report, path: &Path) -> Result<()> {
        tracing::info!(
            cadence = %report.cadence,
            report = %path.display(),
            "Notification requested for {} report",
            report.cadence
        );
        Ok(())
    }
}

//! File-backed persistence shared by workers and the orchestrator.
//!
//! Layout under the workspace:
//!
//! ```text
//! cache/<owner>/<context_id>.json   one record per context id, last write wins
//! logs/metrics.jsonl                append-only metric samples, one per line
//! ```
//!
//! Owners never share a namespace, so no cross-owner locking is needed.

mod context;
mod metrics;

pub use context::{ContextRecord, ContextStore, OwnerStatus, WorkerStatus};
pub use metrics::{MetricSample, MetricsSink, latest_values};

use crate::errors::PersistenceError;

/// Reject keys that would escape their namespace on disk.
pub(crate) fn validate_key(kind: &'static str, value: &str) -> Result<(), PersistenceError> {
    let bad = value.is_empty()
        || value == "."
        || value == ".."
        || value.contains(['/', '\\', '\0']);
    if bad {
        return Err(PersistenceError::InvalidKey {
            kind,
            value: value.to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_key() {
        assert!(validate_key("owner", "devops").is_ok());
        assert!(validate_key("context id", "infra_report_20251108").is_ok());
        assert!(validate_key("owner", "").is_err());
        assert!(validate_key("owner", "..").is_err());
        assert!(validate_key("owner", "a/b").is_err());
        assert!(validate_key("owner", "a\\b").is_err());
    }
}

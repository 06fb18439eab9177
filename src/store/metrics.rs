use chrono::{DateTime, Local};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use super::validate_key;
use crate::errors::PersistenceError;

/// One scalar sample. Serialized as a single JSON line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSample {
    pub timestamp: DateTime<Local>,
    pub owner: String,
    pub metric_name: String,
    pub value: f64,
}

/// Append-only metric log shared by every owner.
#[derive(Debug, Clone)]
pub struct MetricsSink {
    path: PathBuf,
}

impl MetricsSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append a sample stamped with the current time.
    pub fn append(&self, owner: &str, metric_name: &str, value: f64) -> Result<(), PersistenceError> {
        validate_key("owner", owner)?;
        self.append_sample(&MetricSample {
            timestamp: Local::now(),
            owner: owner.to_string(),
            metric_name: metric_name.to_string(),
            value,
        })
    }

    /// Append a fully-formed sample.
    ///
    /// The line is written with one `write_all` while holding an exclusive
    /// lock on the file, so concurrent appenders never interleave.
    pub fn append_sample(&self, sample: &MetricSample) -> Result<(), PersistenceError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|source| PersistenceError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let mut line = serde_json::to_string(sample).map_err(PersistenceError::Encode)?;
        line.push('\n');

        let write_err = |source| PersistenceError::Write {
            path: self.path.clone(),
            source,
        };
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(write_err)?;
        file.lock_exclusive().map_err(write_err)?;
        let written = file.write_all(line.as_bytes()).map_err(write_err);
        let _ = FileExt::unlock(&file);
        written
    }

    /// All samples in append order. Malformed lines are skipped.
    pub fn samples(&self) -> Result<Vec<MetricSample>, PersistenceError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(PersistenceError::Read {
                    path: self.path.clone(),
                    source,
                });
            }
        };

        Ok(content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| match serde_json::from_str::<MetricSample>(line) {
                Ok(sample) => Some(sample),
                Err(e) => {
                    tracing::debug!("Skipping malformed metric line: {}", e);
                    None
                }
            })
            .collect())
    }

    /// The last `limit` samples, oldest first.
    pub fn recent(&self, limit: usize) -> Result<Vec<MetricSample>, PersistenceError> {
        let mut samples = self.samples()?;
        let skip = samples.len().saturating_sub(limit);
        Ok(samples.split_off(skip))
    }
}

/// Latest value per metric name.
///
/// Scans newest to oldest and keeps the first occurrence of each name.
pub fn latest_values(samples: &[MetricSample]) -> BTreeMap<String, f64> {
    let mut latest = BTreeMap::new();
    for sample in samples.iter().rev() {
        latest
            .entry(sample.metric_name.clone())
            .or_insert(sample.value);
    }
    latest
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn setup_sink() -> (MetricsSink, TempDir) {
        let dir = TempDir::new().expect("failed to create temp dir");
        let sink = MetricsSink::new(dir.path().join("logs/metrics.jsonl"));
        (sink, dir)
    }

    fn sample(minute: u32, name: &str, value: f64) -> MetricSample {
        MetricSample {
            timestamp: Local.with_ymd_and_hms(2025, 11, 8, 8, minute, 0).unwrap(),
            owner: "test".to_string(),
            metric_name: name.to_string(),
            value,
        }
    }

    #[test]
    fn test_latest_values_keeps_newest_per_name() {
        let samples = vec![sample(1, "x", 1.0), sample(2, "x", 2.0), sample(3, "y", 5.0)];
        let latest = latest_values(&samples);
        assert_eq!(latest.len(), 2);
        assert_eq!(latest["x"], 2.0);
        assert_eq!(latest["y"], 5.0);
    }

    #[test]
    fn test_latest_values_empty() {
        assert!(latest_values(&[]).is_empty());
    }

    #[test]
    fn test_append_never_overwrites() {
        let (sink, _dir) = setup_sink();
        sink.append("devops", "healthy_services", 5.0).unwrap();
        sink.append("devops", "healthy_services", 4.0).unwrap();
        sink.append("qa_testing", "tests_passed", 120.0).unwrap();

        let samples = sink.samples().unwrap();
        assert_eq!(samples.len(), 3);
        assert_eq!(samples[0].value, 5.0);
        assert_eq!(samples[1].value, 4.0);
        assert_eq!(latest_values(&samples)["healthy_services"], 4.0);
    }

    #[test]
    fn test_line_format_is_self_contained_json() {
        let (sink, _dir) = setup_sink();
        sink.append("devops", "healthy_services", 5.0).unwrap();
        let raw = fs::read_to_string(sink.path()).unwrap();
        assert_eq!(raw.lines().count(), 1);
        let value: serde_json::Value = serde_json::from_str(raw.lines().next().unwrap()).unwrap();
        assert_eq!(value["owner"], "devops");
        assert_eq!(value["metric_name"], "healthy_services");
        assert_eq!(value["value"], 5.0);
        assert!(value["timestamp"].is_string());
    }

    #[test]
    fn test_malformed_lines_are_skipped() {
        let (sink, _dir) = setup_sink();
        sink.append("devops", "a", 1.0).unwrap();
        let mut file = fs::OpenOptions::new().append(true).open(sink.path()).unwrap();
        writeln!(file, "{{\"truncated\":").unwrap();
        drop(file);
        sink.append("devops", "b", 2.0).unwrap();

        let samples = sink.samples().unwrap();
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[1].metric_name, "b");
    }

    #[test]
    fn test_missing_log_reads_as_empty() {
        let (sink, _dir) = setup_sink();
        assert!(sink.samples().unwrap().is_empty());
        assert!(sink.recent(10).unwrap().is_empty());
    }

    #[test]
    fn test_recent_returns_tail() {
        let (sink, _dir) = setup_sink();
        for i in 0..5 {
            sink.append("ops", "n", i as f64).unwrap();
        }
        let recent = sink.recent(2).unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].value, 3.0);
        assert_eq!(recent[1].value, 4.0);
    }

    #[test]
    fn test_concurrent_appends_do_not_interleave() {
        let (sink, _dir) = setup_sink();
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let sink = sink.clone();
                std::thread::spawn(move || {
                    for i in 0..25 {
                        sink.append(&format!("owner{}", t), "tick", i as f64).unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(sink.samples().unwrap().len(), 200);
    }
}

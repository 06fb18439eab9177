use chrono::{DateTime, Local};
use serde::Serialize;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use super::Report;
use crate::errors::PersistenceError;
use crate::store::validate_key;
use crate::worker::Cadence;

/// A report file found on disk.
#[derive(Debug, Clone, Serialize)]
pub struct ReportEntry {
    pub name: String,
    /// Cadence inferred from the file name prefix.
    pub cadence: Option<Cadence>,
    pub modified: Option<DateTime<Local>>,
    pub size: u64,
}

/// Directory of rendered report files.
#[derive(Debug, Clone)]
pub struct ReportStore {
    dir: PathBuf,
}

impl ReportStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write a report, replacing any earlier report for the same period.
    pub fn save(&self, report: &Report) -> Result<PathBuf, PersistenceError> {
        validate_key("report name", &report.filename)?;
        fs::create_dir_all(&self.dir).map_err(|source| PersistenceError::CreateDir {
            path: self.dir.clone(),
            source,
        })?;

        let path = self.dir.join(&report.filename);
        fs::write(&path, &report.rendered_text).map_err(|source| PersistenceError::Write {
            path: path.clone(),
            source,
        })?;
        tracing::info!(cadence = %report.cadence, "Report saved to {}", path.display());
        Ok(path)
    }

    /// Most recently modified reports first.
    pub fn list_recent(&self, limit: usize) -> Result<Vec<ReportEntry>, PersistenceError> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(PersistenceError::Read {
                    path: self.dir.clone(),
                    source,
                });
            }
        };

        let mut reports: Vec<ReportEntry> = entries
            .flatten()
            .filter(|e| e.path().extension().is_some_and(|ext| ext == "txt"))
            .filter_map(|e| {
                let meta = e.metadata().ok()?;
                let name = e.file_name().to_string_lossy().into_owned();
                Some(ReportEntry {
                    cadence: cadence_of(&name),
                    modified: meta.modified().ok().map(DateTime::<Local>::from),
                    size: meta.len(),
                    name,
                })
            })
            .collect();

        reports.sort_by(|a, b| b.modified.cmp(&a.modified).then_with(|| b.name.cmp(&a.name)));
        reports.truncate(limit);
        Ok(reports)
    }

    /// Contents of a named report, `None` if absent.
    pub fn read(&self, name: &str) -> Result<Option<String>, PersistenceError> {
        validate_key("report name", name)?;
        let path = self.dir.join(name);
        match fs::read_to_string(&path) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(source) => Err(PersistenceError::Read { path, source }),
        }
    }
}

fn cadence_of(name: &str) -> Option<Cadence> {
    Cadence::ALL
        .into_iter()
        .find(|c| name.starts_with(&format!("{}_report_", c)))
}

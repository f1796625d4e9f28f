use std::{
    fs::OpenOptions,
    io::Write,
    path::{Path, PathBuf},
};

use serde::Serialize;

use super::traits::AuditSink;
use super::{AuditSummary, ProgressEntry};
use crate::error::CleanerError;

pub const SUMMARY_FILE: &str = "cleanup_summary.json";
pub const PROGRESS_FILE: &str = "repoCleaner_progress.json";

/// Audit trail kept as two newline-delimited JSON files
pub struct JsonLinesAuditSink {
    summary_path: PathBuf,
    progress_path: PathBuf,
}

impl JsonLinesAuditSink {
    /// Write both files inside `dir`
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        let dir = dir.as_ref();
        JsonLinesAuditSink {
            summary_path: dir.join(SUMMARY_FILE),
            progress_path: dir.join(PROGRESS_FILE),
        }
    }

    pub fn summary_path(&self) -> &Path {
        &self.summary_path
    }

    pub fn progress_path(&self) -> &Path {
        &self.progress_path
    }

    /// Append one record as a single line. The file is reopened for every
    /// record so nothing is buffered across repositories.
    fn append_line<T: Serialize>(path: &Path, record: &T) -> Result<(), CleanerError> {
        let mut line = serde_json::to_string(record)?;
        line.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(CleanerError::Audit)?;
        file.write_all(line.as_bytes()).map_err(CleanerError::Audit)?;
        file.flush().map_err(CleanerError::Audit)?;
        Ok(())
    }
}

impl AuditSink for JsonLinesAuditSink {
    fn append_summary(&self, summary: &AuditSummary) -> Result<(), CleanerError> {
        Self::append_line(&self.summary_path, summary)?;
        tracing::info!(
            "Summary saved for {} in {:?}",
            summary.repository,
            self.summary_path
        );
        Ok(())
    }

    fn append_progress(&self, entry: &ProgressEntry) -> Result<(), CleanerError> {
        Self::append_line(&self.progress_path, entry)?;
        tracing::info!("Progress saved for {} in {:?}", entry.repo, self.progress_path);
        Ok(())
    }
}

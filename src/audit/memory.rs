use std::cell::RefCell;

use super::traits::AuditSink;
use super::{AuditSummary, ProgressEntry};
use crate::error::CleanerError;

/// Audit trail held in memory
#[derive(Default)]
pub struct MemoryAuditSink {
    summaries: RefCell<Vec<AuditSummary>>,
    progress: RefCell<Vec<ProgressEntry>>,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn summaries(&self) -> Vec<AuditSummary> {
        self.summaries.borrow().clone()
    }

    pub fn progress(&self) -> Vec<ProgressEntry> {
        self.progress.borrow().clone()
    }
}

impl AuditSink for MemoryAuditSink {
    fn append_summary(&self, summary: &AuditSummary) -> Result<(), CleanerError> {
        self.summaries.borrow_mut().push(summary.clone());
        Ok(())
    }

    fn append_progress(&self, entry: &ProgressEntry) -> Result<(), CleanerError> {
        self.progress.borrow_mut().push(entry.clone());
        Ok(())
    }
}

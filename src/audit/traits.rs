use super::{AuditSummary, ProgressEntry};
use crate::error::CleanerError;

/// Append-only destination for the audit trail.
///
/// Records are never rewritten once appended; a record that was appended
/// stays valid even if a later repository fails.
pub trait AuditSink {
    /// Append the executive summary of one repository pass.
    fn append_summary(&self, summary: &AuditSummary) -> Result<(), CleanerError>;

    /// Append the progress checkpoint of one repository pass.
    fn append_progress(&self, entry: &ProgressEntry) -> Result<(), CleanerError>;
}

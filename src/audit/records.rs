use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{auditor::StaleRecord, inventory::RepositoryId};

/// Executive summary of one repository pass (`cleanup_summary.json`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditSummary {
    pub repository: String,
    pub total_branches: usize,
    pub stale_branches: usize,
    pub deleted_branches: Vec<String>,
    /// Every branch in the repository is stale
    pub recommend_repo_deletion: bool,
}

impl AuditSummary {
    /// Callers skip repositories without stale branches, so `total_branches`
    /// is never zero here.
    pub fn new(
        repo: &RepositoryId,
        total_branches: usize,
        stale_branches: usize,
        deleted_branches: Vec<String>,
    ) -> Self {
        debug_assert!(total_branches > 0, "empty repositories have no summary");
        Self {
            repository: repo.to_string(),
            total_branches,
            stale_branches,
            deleted_branches,
            recommend_repo_deletion: stale_branches == total_branches,
        }
    }
}

/// A stale branch as checkpointed; the date keeps day precision only
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaleBranchEntry {
    pub branch: String,
    pub last_commit: NaiveDate,
}

/// Durability checkpoint of one repository pass (`repoCleaner_progress.json`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressEntry {
    pub repo: String,
    pub stale_branches: Vec<StaleBranchEntry>,
    pub deleted_branches: Vec<String>,
}

impl ProgressEntry {
    pub fn new(repo: &RepositoryId, stale: &[StaleRecord], deleted_branches: Vec<String>) -> Self {
        Self {
            repo: repo.to_string(),
            stale_branches: stale
                .iter()
                .map(|record| StaleBranchEntry {
                    branch: record.branch_name.clone(),
                    last_commit: record.last_commit_time.date_naive(),
                })
                .collect(),
            deleted_branches,
        }
    }
}

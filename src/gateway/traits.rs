use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::error::CleanerError;
use crate::inventory::RepositoryId;

/// A branch as returned by the listing endpoint
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BranchRef {
    pub name: String,
    #[serde(default)]
    pub commit: Option<CommitPointer>,
}

/// Head commit of a listed branch
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CommitPointer {
    pub sha: String,
}

/// Result of a single delete call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletionOutcome {
    pub branch_name: String,
    pub succeeded: bool,
    /// Status code of the response, or the transport error
    pub status_detail: String,
}

/// Authenticated access to the branch resources of a hosting API.
///
/// Implementations never retry. Listing returns `Err` for every failure so the
/// caller can tell an empty repository from one it could not read; only
/// [`CleanerError::Unauthorized`] is meant to halt the run.
pub trait BranchGateway {
    /// List every branch of `repo`, in the order the API returns them.
    fn list_branches(&self, repo: &RepositoryId) -> Result<Vec<BranchRef>, CleanerError>;

    /// Committer date of the branch head, or `None` if it cannot be resolved.
    fn last_commit_timestamp(&self, repo: &RepositoryId, branch: &str) -> Option<DateTime<Utc>>;

    /// Delete `refs/heads/<branch>`.
    fn delete_branch(&self, repo: &RepositoryId, branch: &str) -> DeletionOutcome;
}

use std::{
    cell::RefCell,
    collections::{HashMap, HashSet},
};

use chrono::{DateTime, Utc};

use super::traits::{BranchGateway, BranchRef, CommitPointer, DeletionOutcome};
use crate::{error::CleanerError, inventory::RepositoryId};

/// In-memory hosting API for exercising the pipeline without a network.
///
/// Successful deletes remove the branch, so a second pass observes the result.
#[derive(Default)]
pub struct FakeGateway {
    repos: RefCell<HashMap<String, Vec<(String, Option<DateTime<Utc>>)>>>,
    listing_status: HashMap<String, u16>,
    failing_deletes: HashSet<String>,
    delete_calls: RefCell<Vec<String>>,
}

impl FakeGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_repo(self, repo: &str, branches: &[(&str, Option<DateTime<Utc>>)]) -> Self {
        self.repos.borrow_mut().insert(
            repo.to_string(),
            branches
                .iter()
                .map(|(name, date)| (name.to_string(), *date))
                .collect(),
        );
        self
    }

    /// Make listing `repo` answer with an HTTP error status
    pub fn with_listing_status(mut self, repo: &str, status: u16) -> Self {
        self.listing_status.insert(repo.to_string(), status);
        self
    }

    pub fn with_failing_delete(mut self, branch: &str) -> Self {
        self.failing_deletes.insert(branch.to_string());
        self
    }

    /// Branch names passed to `delete_branch`, in call order
    pub fn delete_calls(&self) -> Vec<String> {
        self.delete_calls.borrow().clone()
    }
}

impl BranchGateway for FakeGateway {
    fn list_branches(&self, repo: &RepositoryId) -> Result<Vec<BranchRef>, CleanerError> {
        match self.listing_status.get(repo.as_str()) {
            Some(401) => return Err(CleanerError::Unauthorized),
            Some(404) => {
                return Err(CleanerError::RepositoryNotFound {
                    repo: repo.to_string(),
                })
            }
            Some(status) => {
                return Err(CleanerError::TransientFetchFailure {
                    repo: repo.to_string(),
                    detail: status.to_string(),
                })
            }
            None => {}
        }

        let repos = self.repos.borrow();
        let branches = repos.get(repo.as_str()).ok_or_else(|| {
            CleanerError::RepositoryNotFound {
                repo: repo.to_string(),
            }
        })?;

        Ok(branches
            .iter()
            .enumerate()
            .map(|(i, (name, _))| BranchRef {
                name: name.clone(),
                commit: Some(CommitPointer {
                    sha: format!("{:040x}", i),
                }),
            })
            .collect())
    }

    fn last_commit_timestamp(&self, repo: &RepositoryId, branch: &str) -> Option<DateTime<Utc>> {
        self.repos
            .borrow()
            .get(repo.as_str())?
            .iter()
            .find(|(name, _)| name == branch)
            .and_then(|(_, date)| *date)
    }

    fn delete_branch(&self, repo: &RepositoryId, branch: &str) -> DeletionOutcome {
        self.delete_calls.borrow_mut().push(branch.to_string());

        if self.failing_deletes.contains(branch) {
            return DeletionOutcome {
                branch_name: branch.to_string(),
                succeeded: false,
                status_detail: "422".to_string(),
            };
        }

        let mut repos = self.repos.borrow_mut();
        let removed = repos
            .get_mut(repo.as_str())
            .and_then(|branches| {
                let index = branches.iter().position(|(name, _)| name == branch)?;
                Some(branches.remove(index))
            })
            .is_some();

        DeletionOutcome {
            branch_name: branch.to_string(),
            succeeded: removed,
            status_detail: if removed { "204" } else { "422" }.to_string(),
        }
    }
}

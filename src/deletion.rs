use std::io::Write;

use crate::{
    error::CleanerError,
    gateway::{BranchGateway, DeletionOutcome},
    inventory::RepositoryId,
};

/// Per-branch results of one deletion batch, in request order
#[derive(Debug, Default)]
pub struct DeletionReport {
    pub outcomes: Vec<DeletionOutcome>,
}

impl DeletionReport {
    /// Every name a delete was issued for, whether or not it succeeded.
    pub fn attempted(&self) -> Vec<String> {
        self.outcomes.iter().map(|o| o.branch_name.clone()).collect()
    }

    pub fn failures(&self) -> impl Iterator<Item = &DeletionOutcome> {
        self.outcomes.iter().filter(|o| !o.succeeded)
    }

    pub fn succeeded_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.succeeded).count()
    }
}

/// Delete `branches` one by one. A failed delete never stops the batch.
pub fn delete_branches<G, W>(
    gateway: &G,
    repo: &RepositoryId,
    branches: &[String],
    out: &mut W,
) -> Result<DeletionReport, CleanerError>
where
    G: BranchGateway + ?Sized,
    W: Write,
{
    let mut report = DeletionReport::default();

    for branch in branches {
        let outcome = gateway.delete_branch(repo, branch);
        if outcome.succeeded {
            tracing::info!("Deleted {}@{}", repo, branch);
            writeln!(out, " Deleted branch: {}", branch).map_err(CleanerError::Console)?;
        } else {
            let err = CleanerError::DeletionFailure {
                branch: branch.clone(),
                detail: outcome.status_detail.clone(),
            };
            tracing::warn!("{}: {}", repo, err);
            writeln!(out, " Failed to delete {}: {}", branch, outcome.status_detail)
                .map_err(CleanerError::Console)?;
        }
        report.outcomes.push(outcome);
    }

    Ok(report)
}

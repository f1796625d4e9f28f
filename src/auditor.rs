use std::collections::HashSet;

use chrono::{DateTime, Utc};
use indicatif::{ProgressBar, ProgressStyle};

use crate::{
    error::CleanerError,
    gateway::BranchGateway,
    inventory::RepositoryId,
    staleness::{is_stale, Cutoff},
};

/// A branch seen during one audit pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Branch {
    pub name: String,
    pub last_commit_time: Option<DateTime<Utc>>,
}

/// A branch whose last commit is older than the cutoff
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaleRecord {
    pub branch_name: String,
    pub last_commit_time: DateTime<Utc>,
}

/// Everything learned about one repository.
///
/// `stale` keeps listing order; operator selections index into it.
#[derive(Debug, Default)]
pub struct RepositoryAudit {
    pub branches: Vec<Branch>,
    pub stale: Vec<StaleRecord>,
}

/// Lists a repository's branches and classifies them against the cutoff
pub struct RepositoryAuditor<'a, G: BranchGateway> {
    gateway: &'a G,
    cutoff: Cutoff,
}

impl<'a, G: BranchGateway> RepositoryAuditor<'a, G> {
    pub fn new(gateway: &'a G, cutoff: Cutoff) -> Self {
        Self { gateway, cutoff }
    }

    /// Audit `repo`. Only an authorization failure is returned as an error;
    /// unreadable repositories come back as an empty audit.
    pub fn audit(&self, repo: &RepositoryId) -> Result<RepositoryAudit, CleanerError> {
        let listing = match self.gateway.list_branches(repo) {
            Ok(listing) => listing,
            Err(err) if err.is_fatal() => return Err(err),
            Err(err) => {
                tracing::warn!("{}", err);
                return Ok(RepositoryAudit::default());
            }
        };

        if listing.is_empty() {
            return Ok(RepositoryAudit::default());
        }

        let bar = ProgressBar::new(listing.len() as u64);
        bar.set_style(
            ProgressStyle::with_template("  {spinner} [{bar:30}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=> "),
        );

        let mut audit = RepositoryAudit::default();
        let mut seen = HashSet::new();

        for branch_ref in listing {
            bar.inc(1);
            if !seen.insert(branch_ref.name.clone()) {
                tracing::debug!("Ignoring repeated listing entry {}", branch_ref.name);
                continue;
            }
            bar.set_message(branch_ref.name.clone());

            let last_commit_time = self.gateway.last_commit_timestamp(repo, &branch_ref.name);
            tracing::debug!(
                "{}@{} ({}) last commit {:?}",
                repo,
                branch_ref.name,
                branch_ref
                    .commit
                    .as_ref()
                    .map(|c| c.sha.as_str())
                    .unwrap_or("unknown"),
                last_commit_time
            );

            match last_commit_time {
                Some(time) if is_stale(last_commit_time, &self.cutoff) => {
                    audit.stale.push(StaleRecord {
                        branch_name: branch_ref.name.clone(),
                        last_commit_time: time,
                    });
                }
                _ => {}
            }

            audit.branches.push(Branch {
                name: branch_ref.name,
                last_commit_time,
            });
        }

        bar.finish_and_clear();
        Ok(audit)
    }
}

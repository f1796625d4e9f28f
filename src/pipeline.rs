use std::{fmt, io::Write};

use crate::{
    audit::{AuditSink, AuditSummary, ProgressEntry},
    auditor::RepositoryAuditor,
    decision::{collect_selection, DecisionSource},
    deletion::{delete_branches, DeletionReport},
    error::CleanerError,
    gateway::BranchGateway,
    inventory::RepositoryId,
    staleness::Cutoff,
};

/// How a single repository pass ended
#[derive(Debug)]
pub enum RepositoryOutcome {
    /// Nothing stale (or nothing readable); no audit record written
    Skipped,
    Recorded {
        summary: AuditSummary,
        failed_deletions: usize,
    },
}

/// Totals for a whole run
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub recorded: usize,
    pub skipped: usize,
    pub failed: usize,
    pub deletions_attempted: usize,
    pub deletion_failures: usize,
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} repositories recorded, {} skipped, {} failed; {} deletion(s) attempted, {} failed",
            self.recorded,
            self.skipped,
            self.failed,
            self.deletions_attempted,
            self.deletion_failures
        )
    }
}

/// Audit → decide → delete → record, one repository at a time
pub struct Pipeline<'a, G: BranchGateway, A: AuditSink> {
    gateway: &'a G,
    sink: &'a A,
    auditor: RepositoryAuditor<'a, G>,
    cutoff: Cutoff,
}

impl<'a, G: BranchGateway, A: AuditSink> Pipeline<'a, G, A> {
    pub fn new(gateway: &'a G, sink: &'a A, cutoff: Cutoff) -> Self {
        Self {
            gateway,
            sink,
            auditor: RepositoryAuditor::new(gateway, cutoff),
            cutoff,
        }
    }

    /// Run one repository through the whole pipeline.
    pub fn process_repository<D, W>(
        &self,
        repo: &RepositoryId,
        decisions: &mut D,
        out: &mut W,
    ) -> Result<RepositoryOutcome, CleanerError>
    where
        D: DecisionSource + ?Sized,
        W: Write,
    {
        writeln!(out, "\n Processing: {}", repo).map_err(CleanerError::Console)?;

        let audit = self.auditor.audit(repo)?;
        writeln!(out, " Total branches in {}: {}", repo, audit.branches.len())
            .map_err(CleanerError::Console)?;
        writeln!(
            out,
            " Stale branches (last commit before {}): {}",
            self.cutoff.timestamp().format("%Y-%m-%d"),
            audit.stale.len()
        )
        .map_err(CleanerError::Console)?;

        let undated: Vec<&str> = audit
            .branches
            .iter()
            .filter(|b| b.last_commit_time.is_none())
            .map(|b| b.name.as_str())
            .collect();
        if !undated.is_empty() {
            writeln!(
                out,
                " Branches with unknown last commit (kept): {}",
                undated.join(", ")
            )
            .map_err(CleanerError::Console)?;
        }

        if audit.stale.is_empty() {
            writeln!(out, "No stale branches found in {}. Skipping...", repo)
                .map_err(CleanerError::Console)?;
            return Ok(RepositoryOutcome::Skipped);
        }

        let selected = collect_selection(decisions, &audit.stale, out)?;
        let report = if selected.is_empty() {
            DeletionReport::default()
        } else {
            let report = delete_branches(self.gateway, repo, &selected, out)?;
            writeln!(
                out,
                " Deleted {} of {} selected branch(es)",
                report.succeeded_count(),
                selected.len()
            )
            .map_err(CleanerError::Console)?;
            report
        };

        // The trail records what was attempted; failures only show in the log.
        let deleted = report.attempted();
        let summary = AuditSummary::new(
            repo,
            audit.branches.len(),
            audit.stale.len(),
            deleted.clone(),
        );

        self.sink.append_summary(&summary)?;
        self.sink
            .append_progress(&ProgressEntry::new(repo, &audit.stale, deleted))?;
        writeln!(out, " Audit records saved for {}", repo).map_err(CleanerError::Console)?;

        Ok(RepositoryOutcome::Recorded {
            summary,
            failed_deletions: report.failures().count(),
        })
    }

    /// Process every repository in order. Only an authorization failure stops
    /// the batch; anything else is logged and the next repository runs.
    pub fn run<D, W>(
        &self,
        repos: &[RepositoryId],
        decisions: &mut D,
        out: &mut W,
    ) -> Result<RunReport, CleanerError>
    where
        D: DecisionSource + ?Sized,
        W: Write,
    {
        let mut report = RunReport::default();

        for repo in repos {
            match self.process_repository(repo, decisions, out) {
                Ok(RepositoryOutcome::Skipped) => report.skipped += 1,
                Ok(RepositoryOutcome::Recorded {
                    summary,
                    failed_deletions,
                }) => {
                    report.recorded += 1;
                    report.deletions_attempted += summary.deleted_branches.len();
                    report.deletion_failures += failed_deletions;
                }
                Err(err) if err.is_fatal() => return Err(err),
                Err(err) => {
                    tracing::warn!("Giving up on {}: {}", repo, err);
                    report.failed += 1;
                }
            }
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Duration, Utc};
    use tempfile::TempDir;

    use super::*;
    use crate::{
        audit::{JsonLinesAuditSink, MemoryAuditSink},
        decision::ScriptedDecision,
        gateway::FakeGateway,
    };

    fn days_ago(now: DateTime<Utc>, days: i64) -> Option<DateTime<Utc>> {
        Some(now - Duration::days(days))
    }

    fn org_repo(now: DateTime<Utc>) -> FakeGateway {
        FakeGateway::new().with_repo(
            "org/repo",
            &[
                ("main", Some(now)),
                ("old1", days_ago(now, 400)),
                ("old2", days_ago(now, 800)),
            ],
        )
    }

    fn repos(ids: &[&str]) -> Vec<RepositoryId> {
        ids.iter().map(|id| RepositoryId::new(*id)).collect()
    }

    #[test]
    fn test_end_to_end_delete_all() {
        let now = Utc::now();
        let gateway = org_repo(now);
        let sink = MemoryAuditSink::new();
        let pipeline = Pipeline::new(&gateway, &sink, Cutoff::new(now, 365).unwrap());
        let mut out = Vec::<u8>::new();

        let report = pipeline
            .run(&repos(&["org/repo"]), &mut ScriptedDecision::new("all"), &mut out)
            .unwrap();

        assert_eq!(gateway.delete_calls(), vec!["old1", "old2"]);
        assert_eq!(
            sink.summaries(),
            vec![AuditSummary {
                repository: "org/repo".to_string(),
                total_branches: 3,
                stale_branches: 2,
                deleted_branches: vec!["old1".to_string(), "old2".to_string()],
                recommend_repo_deletion: false,
            }]
        );

        let progress = sink.progress();
        assert_eq!(progress.len(), 1);
        let stale: Vec<_> = progress[0]
            .stale_branches
            .iter()
            .map(|s| s.branch.as_str())
            .collect();
        assert_eq!(stale, vec!["old1", "old2"]);
        assert_eq!(progress[0].deleted_branches, vec!["old1", "old2"]);

        assert_eq!(report.recorded, 1);
        assert_eq!(report.deletions_attempted, 2);
        assert_eq!(report.deletion_failures, 0);
    }

    #[test]
    fn test_rerun_after_cleanup_writes_nothing() {
        let now = Utc::now();
        let gateway = org_repo(now);
        let sink = MemoryAuditSink::new();
        let pipeline = Pipeline::new(&gateway, &sink, Cutoff::new(now, 365).unwrap());
        let ids = repos(&["org/repo"]);

        pipeline
            .run(&ids, &mut ScriptedDecision::new("all"), &mut Vec::<u8>::new())
            .unwrap();

        let mut out = Vec::new();
        let report = pipeline
            .run(&ids, &mut ScriptedDecision::new("all"), &mut out)
            .unwrap();

        assert_eq!(report.skipped, 1);
        assert_eq!(sink.summaries().len(), 1);
        assert_eq!(sink.progress().len(), 1);
        assert!(String::from_utf8(out)
            .unwrap()
            .contains("No stale branches found in org/repo. Skipping..."));
    }

    #[test]
    fn test_invalid_selection_still_recorded() {
        let now = Utc::now();
        let gateway = org_repo(now);
        let sink = MemoryAuditSink::new();
        let pipeline = Pipeline::new(&gateway, &sink, Cutoff::new(now, 365).unwrap());

        pipeline
            .run(&repos(&["org/repo"]), &mut ScriptedDecision::new("abc"), &mut Vec::<u8>::new())
            .unwrap();

        assert!(gateway.delete_calls().is_empty());
        let summaries = sink.summaries();
        assert_eq!(summaries.len(), 1);
        assert!(summaries[0].deleted_branches.is_empty());
        assert_eq!(summaries[0].stale_branches, 2);
    }

    #[test]
    fn test_failed_delete_is_still_listed() {
        let now = Utc::now();
        let gateway = org_repo(now).with_failing_delete("old2");
        let sink = MemoryAuditSink::new();
        let pipeline = Pipeline::new(&gateway, &sink, Cutoff::new(now, 365).unwrap());

        let report = pipeline
            .run(&repos(&["org/repo"]), &mut ScriptedDecision::new("0,1"), &mut Vec::<u8>::new())
            .unwrap();

        assert_eq!(sink.summaries()[0].deleted_branches, vec!["old1", "old2"]);
        assert_eq!(report.deletion_failures, 1);
    }

    #[test]
    fn test_all_stale_recommends_repo_deletion() {
        let now = Utc::now();
        let gateway = FakeGateway::new().with_repo(
            "org/abandoned",
            &[("main", days_ago(now, 900)), ("dev", days_ago(now, 700))],
        );
        let sink = MemoryAuditSink::new();
        let pipeline = Pipeline::new(&gateway, &sink, Cutoff::new(now, 365).unwrap());

        pipeline
            .run(&repos(&["org/abandoned"]), &mut ScriptedDecision::new(""), &mut Vec::<u8>::new())
            .unwrap();

        let summary = &sink.summaries()[0];
        assert!(summary.recommend_repo_deletion);
        assert!(summary.deleted_branches.is_empty());
    }

    #[test]
    fn test_unreadable_repositories_do_not_stop_batch() {
        let now = Utc::now();
        let gateway = org_repo(now)
            .with_listing_status("org/gone", 404)
            .with_listing_status("org/flaky", 503);
        let sink = MemoryAuditSink::new();
        let pipeline = Pipeline::new(&gateway, &sink, Cutoff::new(now, 365).unwrap());

        let report = pipeline
            .run(
                &repos(&["org/gone", "org/flaky", "org/repo"]),
                &mut ScriptedDecision::new("all"),
                &mut Vec::<u8>::new(),
            )
            .unwrap();

        assert_eq!(report.skipped, 2);
        assert_eq!(report.recorded, 1);
        assert_eq!(sink.summaries()[0].repository, "org/repo");
    }

    #[test]
    fn test_unauthorized_halts_batch_and_keeps_earlier_records() {
        let now = Utc::now();
        let gateway = org_repo(now)
            .with_repo("org/later", &[("old", days_ago(now, 999))])
            .with_listing_status("org/locked", 401);
        let sink = MemoryAuditSink::new();
        let pipeline = Pipeline::new(&gateway, &sink, Cutoff::new(now, 365).unwrap());

        let result = pipeline.run(
            &repos(&["org/repo", "org/locked", "org/later"]),
            &mut ScriptedDecision::new("all"),
            &mut Vec::<u8>::new(),
        );

        assert!(matches!(result, Err(CleanerError::Unauthorized)));
        let summaries = sink.summaries();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].repository, "org/repo");
        assert_eq!(gateway.delete_calls(), vec!["old1", "old2"]);
    }

    #[test]
    fn test_audit_write_failure_moves_on() {
        let now = Utc::now();
        let gateway = org_repo(now).with_repo("org/other", &[("old", days_ago(now, 999))]);
        let temp_dir = TempDir::new().unwrap();
        let sink = JsonLinesAuditSink::new(temp_dir.path().join("missing"));
        let pipeline = Pipeline::new(&gateway, &sink, Cutoff::new(now, 365).unwrap());

        let report = pipeline
            .run(
                &repos(&["org/repo", "org/other"]),
                &mut ScriptedDecision::new("all"),
                &mut Vec::<u8>::new(),
            )
            .unwrap();

        assert_eq!(report.failed, 2);
        assert_eq!(gateway.delete_calls(), vec!["old1", "old2", "old"]);
    }

    #[test]
    fn test_undated_branches_are_reported_not_deleted() {
        let now = Utc::now();
        let gateway = FakeGateway::new().with_repo(
            "org/repo",
            &[("mystery", None), ("old", days_ago(now, 999))],
        );
        let sink = MemoryAuditSink::new();
        let pipeline = Pipeline::new(&gateway, &sink, Cutoff::new(now, 365).unwrap());
        let mut out = Vec::new();

        pipeline
            .run(&repos(&["org/repo"]), &mut ScriptedDecision::new("all"), &mut out)
            .unwrap();

        assert_eq!(gateway.delete_calls(), vec!["old"]);
        assert!(!sink.summaries()[0].recommend_repo_deletion);
        assert!(String::from_utf8(out)
            .unwrap()
            .contains("Branches with unknown last commit (kept): mystery"));
    }
}

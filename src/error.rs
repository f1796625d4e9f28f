use thiserror::Error;

/// Conditions raised while auditing and pruning a repository.
///
/// Only [`CleanerError::Unauthorized`] escapes the repository loop; every
/// other variant is absorbed where it occurs and surfaces as a log line.
#[derive(Debug, Error)]
pub enum CleanerError {
    #[error("unauthorized: check the permissions of GITHUB_TOKEN")]
    Unauthorized,

    #[error("GITHUB_TOKEN is not set; export GITHUB_TOKEN=<token> and retry")]
    MissingToken,

    #[error("repository {repo} not found")]
    RepositoryNotFound { repo: String },

    #[error("failed to fetch branches for {repo}: {detail}")]
    TransientFetchFailure { repo: String, detail: String },

    #[error("could not resolve last commit of {repo}@{branch}: {detail}")]
    CommitResolutionFailure {
        repo: String,
        branch: String,
        detail: String,
    },

    #[error("failed to delete {branch}: {detail}")]
    DeletionFailure { branch: String, detail: String },

    #[error("invalid selection: {input:?}")]
    InvalidSelection { input: String },

    #[error("audit trail write failed: {0}")]
    Audit(#[source] std::io::Error),

    #[error("console I/O failed: {0}")]
    Console(#[source] std::io::Error),

    #[error("audit record serialization failed: {0}")]
    AuditEncoding(#[from] serde_json::Error),
}

impl CleanerError {
    /// Whether this condition must halt the whole run.
    pub fn is_fatal(&self) -> bool {
        matches!(self, CleanerError::Unauthorized | CleanerError::MissingToken)
    }
}

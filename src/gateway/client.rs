use std::{collections::HashSet, time::Duration};

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use reqwest::{header::ACCEPT, Method, StatusCode, Url};
use serde::Deserialize;

use super::traits::{BranchGateway, BranchRef, DeletionOutcome};
use crate::{config::CleanerConfig, error::CleanerError, inventory::RepositoryId};

/// Versioned media type requested from the API
const ACCEPT_HEADER: &str = "application/vnd.github.v3+json";

/// Largest page the branches endpoint will serve
const MAX_PER_PAGE: u32 = 100;

/// Committer date format used by the commits endpoint
const COMMIT_DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

#[derive(Debug, Deserialize)]
struct CommitResponse {
    commit: CommitDetail,
}

#[derive(Debug, Deserialize)]
struct CommitDetail {
    committer: Option<Signature>,
}

#[derive(Debug, Deserialize)]
struct Signature {
    date: String,
}

/// Blocking GitHub REST client for the branch list/inspect/delete workflow.
///
/// Requests run on a private current-thread runtime, so every call blocks the
/// caller until the response arrives or the request times out.
pub struct GithubClient {
    http: reqwest::Client,
    base_url: Url,
    token: String,
    per_page: u32,
    runtime: tokio::runtime::Runtime,
}

impl GithubClient {
    pub fn new(config: &CleanerConfig, token: &str) -> Result<Self> {
        let base_url = Url::parse(&config.api_url)
            .with_context(|| format!("Invalid API URL: {}", config.api_url))?;
        if base_url.cannot_be_a_base() {
            anyhow::bail!("API URL cannot be used as a base: {}", config.api_url);
        }

        let http = reqwest::Client::builder()
            .user_agent(concat!("repo-cleaner/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .context("Failed to create tokio runtime")?;

        Ok(Self {
            http,
            base_url,
            token: token.to_string(),
            per_page: config.per_page.clamp(1, MAX_PER_PAGE),
            runtime,
        })
    }

    /// `{base}/repos/{owner}/{name}/{tail...}`; slashes inside tail parts
    /// become path separators, everything else is percent-encoded.
    fn repo_url(&self, repo: &RepositoryId, tail: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .push("repos")
                .extend(repo.as_str().split('/'))
                .extend(tail.iter().flat_map(|part| part.split('/')));
        }
        url
    }

    fn request(&self, method: Method, url: Url) -> reqwest::RequestBuilder {
        tracing::debug!("{} {}", method, url);
        self.http
            .request(method, url)
            .bearer_auth(&self.token)
            .header(ACCEPT, ACCEPT_HEADER)
    }

    async fn fetch_branch_page(
        &self,
        repo: &RepositoryId,
        page: u32,
    ) -> Result<Vec<BranchRef>, CleanerError> {
        let mut url = self.repo_url(repo, &["branches"]);
        url.query_pairs_mut()
            .append_pair("per_page", &self.per_page.to_string())
            .append_pair("page", &page.to_string());

        let transient = |detail: String| CleanerError::TransientFetchFailure {
            repo: repo.to_string(),
            detail,
        };

        let response = self
            .request(Method::GET, url)
            .send()
            .await
            .map_err(|e| transient(e.to_string()))?;

        match response.status() {
            StatusCode::OK => response
                .json::<Vec<BranchRef>>()
                .await
                .map_err(|e| transient(format!("undecodable branch listing: {}", e))),
            StatusCode::UNAUTHORIZED => Err(CleanerError::Unauthorized),
            StatusCode::NOT_FOUND => Err(CleanerError::RepositoryNotFound {
                repo: repo.to_string(),
            }),
            status => Err(transient(status.to_string())),
        }
    }

    async fn fetch_commit_date(&self, url: Url) -> Result<DateTime<Utc>, String> {
        let response = self
            .request(Method::GET, url)
            .send()
            .await
            .map_err(|e| e.to_string())?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(status.to_string());
        }

        let body: CommitResponse = response.json().await.map_err(|e| e.to_string())?;
        let committer = body
            .commit
            .committer
            .ok_or_else(|| "commit has no committer".to_string())?;

        parse_commit_date(&committer.date)
            .map_err(|e| format!("unparseable committer date {:?}: {}", committer.date, e))
    }
}

impl BranchGateway for GithubClient {
    fn list_branches(&self, repo: &RepositoryId) -> Result<Vec<BranchRef>, CleanerError> {
        let mut branches = Vec::new();
        let mut seen = HashSet::new();
        let mut page = 1;

        loop {
            let batch = self.runtime.block_on(self.fetch_branch_page(repo, page))?;
            let fetched = batch.len();
            let before = branches.len();
            branches.extend(batch.into_iter().filter(|b| seen.insert(b.name.clone())));

            if fetched < self.per_page as usize {
                break;
            }
            // A server that ignores `page` keeps answering with the same names.
            if branches.len() == before {
                tracing::warn!(
                    "Page {} of {}'s branch listing repeated earlier entries; stopping",
                    page,
                    repo
                );
                break;
            }
            page += 1;
        }

        tracing::debug!("Listed {} branch(es) of {} in {} page(s)", branches.len(), repo, page);
        Ok(branches)
    }

    fn last_commit_timestamp(&self, repo: &RepositoryId, branch: &str) -> Option<DateTime<Utc>> {
        let url = self.repo_url(repo, &["commits", branch]);

        match self.runtime.block_on(self.fetch_commit_date(url)) {
            Ok(date) => Some(date),
            Err(detail) => {
                let err = CleanerError::CommitResolutionFailure {
                    repo: repo.to_string(),
                    branch: branch.to_string(),
                    detail,
                };
                tracing::warn!("{}", err);
                None
            }
        }
    }

    fn delete_branch(&self, repo: &RepositoryId, branch: &str) -> DeletionOutcome {
        let url = self.repo_url(repo, &["git", "refs", "heads", branch]);
        // The request must be built and sent inside the runtime; reqwest arms its
        // timeout when `send` is called.
        let result = self
            .runtime
            .block_on(async { self.request(Method::DELETE, url).send().await });

        let (succeeded, status_detail) = match result {
            Ok(response) => {
                let status = response.status();
                (status == StatusCode::NO_CONTENT, status.as_u16().to_string())
            }
            Err(e) => (false, e.to_string()),
        };

        DeletionOutcome {
            branch_name: branch.to_string(),
            succeeded,
            status_detail,
        }
    }
}

/// Parse a `YYYY-MM-DDTHH:MM:SSZ` committer date as UTC
pub fn parse_commit_date(date: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    NaiveDateTime::parse_from_str(date, COMMIT_DATE_FORMAT).map(|naive| naive.and_utc())
}

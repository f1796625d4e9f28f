use std::{
    env,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::CleanerError;

/// Environment variable holding the API bearer token
pub const TOKEN_ENV: &str = "GITHUB_TOKEN";

/// Expand tilde (~) in path to user's home directory
fn expand_tilde(path: &Path) -> PathBuf {
    if let Some(s) = path.to_str() {
        if let Some(stripped) = s.strip_prefix("~/") {
            if let Some(home) = dirs::home_dir() {
                return home.join(stripped);
            }
        } else if s == "~" {
            if let Some(home) = dirs::home_dir() {
                return home;
            }
        }
    }
    path.to_path_buf()
}

/// Configuration for repo-cleaner
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct CleanerConfig {
    /// Base URL of the REST API (GitHub Enterprise hosts end in /api/v3)
    #[serde(default = "defaults::api_url")]
    pub api_url: String,
    /// Branches whose last commit is older than this many days are stale
    #[serde(default = "defaults::retention_days")]
    pub retention_days: u32,
    /// File listing one `owner/name` per line
    #[serde(default = "defaults::repo_list")]
    pub repo_list: PathBuf,
    /// Directory receiving the audit trail files
    #[serde(default = "defaults::output_dir")]
    pub output_dir: PathBuf,
    /// Per-request timeout
    #[serde(default = "defaults::request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Page size used when listing branches
    #[serde(default = "defaults::per_page")]
    pub per_page: u32,
}

impl Default for CleanerConfig {
    fn default() -> Self {
        Self {
            api_url: defaults::api_url(),
            retention_days: defaults::retention_days(),
            repo_list: defaults::repo_list(),
            output_dir: defaults::output_dir(),
            request_timeout_secs: defaults::request_timeout_secs(),
            per_page: defaults::per_page(),
        }
    }
}

impl CleanerConfig {
    /// Load configuration from the config file (if any) and environment variables.
    ///
    /// An explicit `path` must exist; the default location is optional.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::load_from_file(path)?,
            None => {
                let default_path = Self::config_file_path()?;
                tracing::debug!("loading repo-cleaner config from {:?}", default_path);
                if default_path.exists() {
                    Self::load_from_file(&default_path)?
                } else {
                    Self::default()
                }
            }
        };

        config.apply_env_overrides(|key| env::var(key).ok())?;
        Ok(config)
    }

    /// Apply overrides from a variable lookup (the process environment in production)
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("GITHUB_API_URL") {
            self.api_url = url;
        }

        if let Some(days) = lookup("REPO_CLEANER_RETENTION_DAYS") {
            self.retention_days = days
                .parse()
                .context("Failed to parse REPO_CLEANER_RETENTION_DAYS as u32")?;
        }

        if let Some(path) = lookup("REPO_CLEANER_REPO_LIST") {
            self.repo_list = expand_tilde(&PathBuf::from(path));
        }

        if let Some(path) = lookup("REPO_CLEANER_OUTPUT_DIR") {
            self.output_dir = expand_tilde(&PathBuf::from(path));
        }

        if let Some(secs) = lookup("REPO_CLEANER_TIMEOUT_SECS") {
            self.request_timeout_secs = secs
                .parse()
                .context("Failed to parse REPO_CLEANER_TIMEOUT_SECS as u64")?;
        }

        Ok(())
    }

    /// Load configuration from a file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        let mut config: CleanerConfig = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;

        config.repo_list = expand_tilde(&config.repo_list);
        config.output_dir = expand_tilde(&config.output_dir);

        Ok(config)
    }

    /// Get default config file path
    pub fn config_file_path() -> Result<PathBuf> {
        dirs::home_dir()
            .map(|home| home.join(".config/repo-cleaner/config.yaml"))
            .context("Could not determine home directory for config file")
    }

    /// Create the output directory if necessary
    pub fn ensure_output_dir(&self) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.output_dir).with_context(|| {
            format!("Failed to create output directory: {:?}", self.output_dir)
        })?;
        Ok(self.output_dir.clone())
    }
}

/// Read the bearer token. A missing or blank value is fatal.
pub fn load_token<F>(lookup: F) -> Result<String, CleanerError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(TOKEN_ENV) {
        Some(token) if !token.trim().is_empty() => Ok(token.trim().to_string()),
        _ => Err(CleanerError::MissingToken),
    }
}

mod defaults {
    use std::path::PathBuf;

    pub(crate) fn api_url() -> String {
        "https://api.github.com".to_string()
    }

    pub(crate) fn retention_days() -> u32 {
        365
    }

    pub(crate) fn repo_list() -> PathBuf {
        PathBuf::from("masterRepoList.txt")
    }

    pub(crate) fn output_dir() -> PathBuf {
        PathBuf::from(".")
    }

    pub(crate) fn request_timeout_secs() -> u64 {
        30
    }

    pub(crate) fn per_page() -> u32 {
        100
    }
}

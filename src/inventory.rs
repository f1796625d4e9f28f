use std::{fmt, fs, io, path::Path};

use anyhow::{Context, Result};

/// Repository identifier in `owner/name` form
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepositoryId(String);

impl RepositoryId {
    pub fn new(id: impl Into<String>) -> Self {
        RepositoryId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RepositoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Read the repository list: one identifier per line, blank lines ignored.
///
/// A missing file yields an empty list rather than an error.
pub fn load_repositories(path: &Path) -> Result<Vec<RepositoryId>> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            tracing::warn!(
                "{:?} not found. Ensure the file exists with the repository list.",
                path
            );
            return Ok(Vec::new());
        }
        Err(e) => {
            return Err(e).with_context(|| format!("Failed to read repository list {:?}", path))
        }
    };

    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(RepositoryId::new)
        .collect())
}

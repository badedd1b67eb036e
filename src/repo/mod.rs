//! Repository hosting: naming, the `RepoHost` seam, and the push protocol.
//!
//! `github` holds the REST implementation. Everything above this module talks
//! to `dyn RepoHost`, so the orchestrator can be driven by a test double.

pub mod github;

use async_trait::async_trait;

use crate::errors::RepoError;
use crate::format::format_file_content;
use crate::models::{FileSet, RepoHandle, Snapshot};

pub use github::GitHubClient;

/// Repository name for a nonce. Pure: every round recomputes it.
pub fn repo_name(nonce: &str) -> String {
    format!("project-1-{}", nonce)
}

/// Browse URL of a repository.
pub fn repo_url(owner: &str, name: &str) -> String {
    format!("https://github.com/{}/{}", owner, name)
}

/// Public GitHub Pages URL of a repository.
pub fn pages_url(owner: &str, name: &str) -> String {
    format!("https://{}.github.io/{}/", owner, name)
}

/// Operations against the source-hosting service.
/// Real implementation: `GitHubClient`. Test double: `testing::MockRepoHost`.
#[async_trait]
pub trait RepoHost: Send + Sync {
    /// Account that owns every repository this host creates.
    fn owner(&self) -> &str;

    /// Create the public repository for `nonce`.
    async fn create_repository(&self, nonce: &str) -> Result<RepoHandle, RepoError>;

    /// Read every blob on the default branch with its revision.
    /// An unlisted tree (e.g. an empty repository) yields an empty snapshot.
    async fn fetch_all_files(&self, name: &str) -> Result<Snapshot, RepoError>;

    /// Current revision of a single path, `None` if it does not exist.
    async fn file_revision(&self, name: &str, path: &str) -> Result<Option<String>, RepoError>;

    /// Create or update one file on the default branch.
    async fn upsert_file(
        &self,
        name: &str,
        path: &str,
        content: &str,
        revision: Option<&str>,
    ) -> Result<(), RepoError>;

    /// SHA at the tip of the default branch.
    async fn latest_commit(&self, name: &str) -> Result<String, RepoError>;

    /// Turn on static hosting. Already-enabled counts as success.
    async fn enable_static_hosting(&self, name: &str) -> Result<(), RepoError>;

    /// Handle for `nonce` without touching the remote.
    fn handle_for(&self, nonce: &str) -> RepoHandle {
        let name = repo_name(nonce);
        RepoHandle {
            url: repo_url(self.owner(), &name),
            name,
        }
    }
}

/// Write every file of `files` to repository `name` and return the resulting commit.
///
/// On rounds after the first, each path's current revision is looked up first
/// so the write becomes an update. Files go out in path order; the first
/// failure aborts the push and files already written stay committed.
pub async fn push_all(
    host: &dyn RepoHost,
    name: &str,
    files: &FileSet,
    round: u32,
) -> Result<String, RepoError> {
    let mut revisions = std::collections::HashMap::new();
    if round > 1 {
        for path in files.keys() {
            if let Some(revision) = host.file_revision(name, path).await? {
                revisions.insert(path.as_str(), revision);
            }
        }
        tracing::debug!(repo = name, known = revisions.len(), "Resolved existing revisions");
    }

    for (path, content) in files {
        let formatted = format_file_content(path, content);
        let revision = revisions.get(path.as_str()).map(String::as_str);
        host.upsert_file(name, path, &formatted, revision)
            .await
            .inspect_err(|e| {
                tracing::error!(repo = name, path = %path, error = %e, "Push failed")
            })?;
        tracing::debug!(repo = name, path = %path, update = revision.is_some(), "Pushed file");
    }

    match host.latest_commit(name).await {
        Ok(sha) => Ok(sha),
        Err(e) => {
            tracing::warn!(repo = name, error = %e, "Could not read latest commit after push");
            Ok(String::new())
        }
    }
}

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Generated files for one round, keyed by relative path.
///
/// A `BTreeMap` so every walk over the set is lexicographic by path.
pub type FileSet = BTreeMap<String, String>;

/// Current repository contents read before a round > 1, keyed by path.
pub type Snapshot = BTreeMap<String, ExistingFile>;

/// Inbound task request for one round.
#[derive(Clone, Serialize, Deserialize)]
pub struct TaskRequest {
    pub email: String,
    pub secret: String,
    pub task: String,
    pub round: u32,
    pub nonce: String,
    pub brief: String,
    #[serde(default)]
    pub checks: Vec<String>,
    pub evaluation_url: String,
    #[serde(default)]
    pub attachments: Vec<serde_json::Value>,
}

impl TaskRequest {
    pub fn is_initial_round(&self) -> bool {
        self.round == 1
    }

    /// Reject requests no round can be run for.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.round == 0 {
            return Err("round must be at least 1");
        }
        if self.nonce.trim().is_empty() {
            return Err("nonce must not be empty");
        }
        Ok(())
    }
}

impl fmt::Debug for TaskRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskRequest")
            .field("email", &self.email)
            .field("secret", &"[REDACTED]")
            .field("task", &self.task)
            .field("round", &self.round)
            .field("nonce", &self.nonce)
            .field("brief", &self.brief)
            .field("checks", &self.checks)
            .field("evaluation_url", &self.evaluation_url)
            .field("attachments", &self.attachments.len())
            .finish()
    }
}

/// Name and browse URL of the repository backing a nonce.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoHandle {
    pub name: String,
    pub url: String,
}

/// A file already present in the repository, with the blob SHA needed to update it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExistingFile {
    pub content: String,
    pub revision: String,
}

/// Body POSTed to the evaluation callback once a round has been published.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationPayload {
    pub email: String,
    pub task: String,
    pub round: u32,
    pub nonce: String,
    pub repo_url: String,
    pub commit_sha: String,
    pub pages_url: String,
}

/// Stages of a round, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    FetchExisting,
    Generate,
    ResolveRepo,
    Push,
    EnableHosting,
    AwaitPropagation,
    Notify,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FetchExisting => "fetch_existing",
            Self::Generate => "generate",
            Self::ResolveRepo => "resolve_repo",
            Self::Push => "push",
            Self::EnableHosting => "enable_hosting",
            Self::AwaitPropagation => "await_propagation",
            Self::Notify => "notify",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a completed round produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoundReport {
    pub repo: RepoHandle,
    pub commit_sha: String,
    pub pages_url: String,
    pub files_pushed: usize,
    /// Whether the evaluation callback acknowledged with HTTP 200.
    pub notified: bool,
}

/// Result of a spawned round. Failures never propagate past the runner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RoundOutcome {
    Completed(RoundReport),
    Failed { stage: Stage, error: String },
}

impl RoundOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, RoundOutcome::Completed(_))
    }
}

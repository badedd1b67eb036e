//! In-memory doubles for the `RepoHost`, `ChatModel` and `Callback` seams.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::errors::{GenerationError, RepoError};
use crate::generator::ChatModel;
use crate::models::{ExistingFile, NotificationPayload, RepoHandle, Snapshot, TaskRequest};
use crate::notify::Callback;
use crate::repo::{RepoHost, repo_name, repo_url};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upsert {
    pub repo: String,
    pub path: String,
    pub content: String,
    pub revision: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepoCall {
    Create { nonce: String },
    FetchAll { name: String },
    FileRevision { name: String, path: String },
    Upsert(Upsert),
    LatestCommit { name: String },
    EnableHosting { name: String },
}

#[derive(Default)]
struct RepoState {
    /// (repo, path) → (content, sha)
    files: HashMap<(String, String), (String, String)>,
    heads: HashMap<String, String>,
    calls: Vec<RepoCall>,
    failing_upserts: HashSet<String>,
    fail_fetch: bool,
    fail_create: bool,
    fail_hosting: bool,
    writes: u32,
}

/// Records every call and keeps files in memory. Does not enforce revisions.
pub struct MockRepoHost {
    owner: String,
    state: Mutex<RepoState>,
}

impl MockRepoHost {
    pub fn new(owner: &str) -> Self {
        Self {
            owner: owner.to_string(),
            state: Mutex::new(RepoState::default()),
        }
    }

    pub fn seed_file(&self, repo: &str, path: &str, content: &str, sha: &str) {
        let mut state = self.state.lock().unwrap();
        state.files.insert(
            (repo.to_string(), path.to_string()),
            (content.to_string(), sha.to_string()),
        );
    }

    pub fn fail_upsert_of(&self, path: &str) {
        self.state
            .lock()
            .unwrap()
            .failing_upserts
            .insert(path.to_string());
    }

    pub fn fail_fetch(&self) {
        self.state.lock().unwrap().fail_fetch = true;
    }

    pub fn fail_create(&self) {
        self.state.lock().unwrap().fail_create = true;
    }

    pub fn fail_hosting(&self) {
        self.state.lock().unwrap().fail_hosting = true;
    }

    pub fn calls(&self) -> Vec<RepoCall> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn upserts(&self) -> Vec<Upsert> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                RepoCall::Upsert(u) => Some(u),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, pred: impl Fn(&RepoCall) -> bool) -> usize {
        self.calls().iter().filter(|c| pred(c)).count()
    }

    pub fn head(&self, repo: &str) -> String {
        self.state
            .lock()
            .unwrap()
            .heads
            .get(repo)
            .cloned()
            .unwrap_or_default()
    }

    fn record(&self, call: RepoCall) {
        self.state.lock().unwrap().calls.push(call);
    }
}

#[async_trait]
impl RepoHost for MockRepoHost {
    fn owner(&self) -> &str {
        &self.owner
    }

    async fn create_repository(&self, nonce: &str) -> Result<RepoHandle, RepoError> {
        self.record(RepoCall::Create {
            nonce: nonce.to_string(),
        });
        let name = repo_name(nonce);
        if self.state.lock().unwrap().fail_create {
            return Err(RepoError::CreateFailed {
                name,
                status: 401,
                body: "Bad credentials".into(),
            });
        }
        Ok(RepoHandle {
            url: repo_url(&self.owner, &name),
            name,
        })
    }

    async fn fetch_all_files(&self, name: &str) -> Result<Snapshot, RepoError> {
        self.record(RepoCall::FetchAll {
            name: name.to_string(),
        });
        let state = self.state.lock().unwrap();
        if state.fail_fetch {
            return Err(RepoError::Decode {
                path: "index.html".into(),
                message: "simulated failure".into(),
            });
        }
        Ok(state
            .files
            .iter()
            .filter(|((repo, _), _)| repo == name)
            .map(|((_, path), (content, sha))| {
                (
                    path.clone(),
                    ExistingFile {
                        content: content.clone(),
                        revision: sha.clone(),
                    },
                )
            })
            .collect())
    }

    async fn file_revision(&self, name: &str, path: &str) -> Result<Option<String>, RepoError> {
        self.record(RepoCall::FileRevision {
            name: name.to_string(),
            path: path.to_string(),
        });
        let state = self.state.lock().unwrap();
        Ok(state
            .files
            .get(&(name.to_string(), path.to_string()))
            .map(|(_, sha)| sha.clone()))
    }

    async fn upsert_file(
        &self,
        name: &str,
        path: &str,
        content: &str,
        revision: Option<&str>,
    ) -> Result<(), RepoError> {
        self.record(RepoCall::Upsert(Upsert {
            repo: name.to_string(),
            path: path.to_string(),
            content: content.to_string(),
            revision: revision.map(str::to_string),
        }));
        let mut state = self.state.lock().unwrap();
        if state.failing_upserts.contains(path) {
            return Err(RepoError::UpsertFailed {
                path: path.to_string(),
                status: 409,
                body: "simulated conflict".into(),
            });
        }
        state.writes += 1;
        let n = state.writes;
        state.files.insert(
            (name.to_string(), path.to_string()),
            (content.to_string(), format!("sha-{}", n)),
        );
        state.heads.insert(name.to_string(), format!("commit-{}", n));
        Ok(())
    }

    async fn latest_commit(&self, name: &str) -> Result<String, RepoError> {
        self.record(RepoCall::LatestCommit {
            name: name.to_string(),
        });
        Ok(self.head(name))
    }

    async fn enable_static_hosting(&self, name: &str) -> Result<(), RepoError> {
        self.record(RepoCall::EnableHosting {
            name: name.to_string(),
        });
        if self.state.lock().unwrap().fail_hosting {
            return Err(RepoError::HostingFailed {
                name: name.to_string(),
                status: 500,
                body: "simulated".into(),
            });
        }
        Ok(())
    }
}

enum Script {
    Reply(String),
    Status(u16),
}

/// Returns the same scripted answer to every prompt and keeps the prompts.
pub struct ScriptedModel {
    script: Script,
    prompts: Mutex<Vec<(String, String)>>,
}

impl ScriptedModel {
    pub fn replying(text: &str) -> Self {
        Self {
            script: Script::Reply(text.to_string()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing_with_status(status: u16) -> Self {
        Self {
            script: Script::Status(status),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// (system, user) pairs in call order.
    pub fn prompts(&self) -> Vec<(String, String)> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatModel for ScriptedModel {
    async fn complete(&self, system: &str, user: &str) -> Result<String, GenerationError> {
        self.prompts
            .lock()
            .unwrap()
            .push((system.to_string(), user.to_string()));
        match &self.script {
            Script::Reply(text) => Ok(text.clone()),
            Script::Status(status) => Err(GenerationError::Status {
                status: *status,
                body: "scripted failure".into(),
            }),
        }
    }
}

/// Answers each POST with the next scripted status or error.
pub struct RecordingCallback {
    responses: Mutex<VecDeque<Result<u16, &'static str>>>,
    sent: Mutex<Vec<(String, NotificationPayload)>>,
}

impl RecordingCallback {
    pub fn with_statuses(responses: Vec<Result<u16, &'static str>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn attempts(&self) -> usize {
        self.sent.lock().unwrap().len()
    }

    pub fn sent(&self) -> Vec<(String, NotificationPayload)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Callback for RecordingCallback {
    async fn post_json(&self, url: &str, payload: &NotificationPayload) -> anyhow::Result<u16> {
        self.sent
            .lock()
            .unwrap()
            .push((url.to_string(), payload.clone()));
        let next = self.responses.lock().unwrap().pop_front();
        match next {
            Some(Ok(status)) => Ok(status),
            Some(Err(msg)) => Err(anyhow::anyhow!(msg)),
            None => Err(anyhow::anyhow!("no scripted response")),
        }
    }
}

pub fn sample_payload() -> NotificationPayload {
    NotificationPayload {
        email: "student@example.com".into(),
        task: "task-1".into(),
        round: 1,
        nonce: "abc123".into(),
        repo_url: "https://github.com/octo/project-1-abc123".into(),
        commit_sha: "commit-5".into(),
        pages_url: "https://octo.github.io/project-1-abc123/".into(),
    }
}

pub fn sample_request(round: u32, nonce: &str) -> TaskRequest {
    TaskRequest {
        email: "student@example.com".into(),
        secret: "s3cret".into(),
        task: "task-1".into(),
        round,
        nonce: nonce.into(),
        brief: "todo app".into(),
        checks: vec!["has a button".into()],
        evaluation_url: "http://eval.test/cb".into(),
        attachments: vec![],
    }
}

//! Round orchestration.
//!
//! A round walks these stages strictly in order:
//!
//! ```text
//! START → FETCH_EXISTING (round > 1) → GENERATE → RESOLVE_REPO → PUSH
//!       → ENABLE_HOSTING (round 1) → AWAIT_PROPAGATION → NOTIFY → DONE
//! ```
//!
//! GENERATE, RESOLVE_REPO and PUSH are fatal: the round stops and nobody is
//! notified. FETCH_EXISTING, ENABLE_HOSTING and NOTIFY degrade: their
//! failures are logged and the round carries on.
//!
//! Rounds for the same nonce are serialized through `NonceLocks`; rounds for
//! different nonces run concurrently.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use tokio::task::JoinHandle;
use tracing::Instrument;

use crate::config::{Config, PipelineConfig};
use crate::errors::PipelineError;
use crate::generator::{CodeGenerator, OpenAiClient, prompts};
use crate::models::{NotificationPayload, RoundOutcome, RoundReport, Stage, TaskRequest};
use crate::notify::{Callback, HttpCallback, RetryPolicy, notify_with_retry};
use crate::repo::{GitHubClient, RepoHost, pages_url, push_all, repo_name};

/// One async mutex per nonce with a round in flight.
#[derive(Clone, Default)]
pub struct NonceLocks {
    inner: Arc<Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>>,
}

impl NonceLocks {
    /// Register interest in `nonce`. The slot is released when the lease drops,
    /// including on panic or when the holding future is cancelled.
    fn lease(&self, nonce: &str) -> NonceLease<'_> {
        let mut map = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let lock = Arc::clone(map.entry(nonce.to_string()).or_default());
        NonceLease {
            locks: self,
            nonce: nonce.to_string(),
            lock,
        }
    }

    /// Number of nonces currently tracked.
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A nonce's entry in `NonceLocks`, held for the duration of one round.
struct NonceLease<'a> {
    locks: &'a NonceLocks,
    nonce: String,
    lock: Arc<tokio::sync::Mutex<()>>,
}

impl Drop for NonceLease<'_> {
    fn drop(&mut self) {
        let mut map = self.locks.inner.lock().unwrap_or_else(|e| e.into_inner());
        // The map and this lease are the last two holders.
        if map.get(&self.nonce).is_some_and(|l| Arc::strong_count(l) == 2) {
            map.remove(&self.nonce);
        }
    }
}

/// Runs task rounds against the repository host, generator and callback.
pub struct TaskRunner {
    repo: Arc<dyn RepoHost>,
    generator: CodeGenerator,
    callback: Arc<dyn Callback>,
    settings: PipelineConfig,
    locks: NonceLocks,
}

impl TaskRunner {
    pub fn new(
        repo: Arc<dyn RepoHost>,
        generator: CodeGenerator,
        callback: Arc<dyn Callback>,
        settings: PipelineConfig,
    ) -> Self {
        Self {
            repo,
            generator,
            callback,
            settings,
            locks: NonceLocks::default(),
        }
    }

    /// Wire the production GitHub, OpenAI and HTTP callback clients.
    pub fn from_config(config: &Config) -> Result<Self> {
        let repo = Arc::new(GitHubClient::new(&config.github)?);
        let model = Arc::new(OpenAiClient::new(&config.llm)?);
        let callback = Arc::new(HttpCallback::new()?);
        Ok(Self::new(
            repo,
            CodeGenerator::new(model),
            callback,
            config.pipeline.clone(),
        ))
    }

    pub fn locks(&self) -> &NonceLocks {
        &self.locks
    }

    /// Run `request` in the background. The handle resolves once the round ends.
    pub fn spawn(self: &Arc<Self>, request: TaskRequest) -> JoinHandle<RoundOutcome> {
        let runner = Arc::clone(self);
        tokio::spawn(async move { runner.run_round(request).await })
    }

    /// Run one round to completion. Never fails: fatal errors become `RoundOutcome::Failed`.
    pub async fn run_round(&self, request: TaskRequest) -> RoundOutcome {
        let span = tracing::info_span!(
            "round",
            run_id = %uuid::Uuid::new_v4(),
            nonce = %request.nonce,
            round = request.round,
            task = %request.task,
        );

        async {
            let lease = self.locks.lease(&request.nonce);
            let _guard = lease.lock.lock().await;
            tracing::info!("Processing task");
            match self.execute(&request).await {
                Ok(report) => {
                    tracing::info!(
                        repo = %report.repo.name,
                        commit = %report.commit_sha,
                        notified = report.notified,
                        "Task processing completed"
                    );
                    RoundOutcome::Completed(report)
                }
                Err(e) => {
                    let stage = e.stage();
                    let error = e.to_string();
                    tracing::error!(%stage, error = %error, "Background processing failed");
                    RoundOutcome::Failed { stage, error }
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn execute(&self, request: &TaskRequest) -> Result<RoundReport, PipelineError> {
        let initial = request.is_initial_round();

        let existing_code = if initial {
            String::new()
        } else {
            self.existing_code(&request.nonce).await
        };

        tracing::info!(stage = %Stage::Generate, "Generating code");
        let files = self
            .generator
            .generate(
                &request.brief,
                &request.checks,
                &request.attachments,
                &existing_code,
            )
            .await
            .map_err(|source| PipelineError::Generation {
                stage: Stage::Generate,
                source,
            })?;

        let repo = if initial {
            tracing::info!(stage = %Stage::ResolveRepo, "Creating repository");
            self.repo
                .create_repository(&request.nonce)
                .await
                .map_err(|source| PipelineError::Repository {
                    stage: Stage::ResolveRepo,
                    source,
                })?
        } else {
            let handle = self.repo.handle_for(&request.nonce);
            tracing::info!(
                stage = %Stage::ResolveRepo,
                repo = %handle.name,
                "Updating existing repository"
            );
            handle
        };

        tracing::info!(
            stage = %Stage::Push,
            repo = %repo.name,
            files = files.len(),
            "Pushing files"
        );
        let commit_sha = push_all(self.repo.as_ref(), &repo.name, &files, request.round)
            .await
            .map_err(|source| PipelineError::Repository {
                stage: Stage::Push,
                source,
            })?;
        tracing::info!(commit = %commit_sha, "Pushed");

        if initial {
            tracing::info!(stage = %Stage::EnableHosting, "Enabling GitHub Pages");
            if let Err(e) = self.repo.enable_static_hosting(&repo.name).await {
                tracing::warn!(error = %e, "Could not enable GitHub Pages");
            }
        }

        tracing::debug!(
            stage = %Stage::AwaitPropagation,
            delay = ?self.settings.propagation_delay,
            "Waiting for Pages"
        );
        tokio::time::sleep(self.settings.propagation_delay).await;
        let pages_url = pages_url(self.repo.owner(), &repo.name);

        tracing::info!(stage = %Stage::Notify, %pages_url, "Notifying evaluation endpoint");
        let payload = NotificationPayload {
            email: request.email.clone(),
            task: request.task.clone(),
            round: request.round,
            nonce: request.nonce.clone(),
            repo_url: repo.url.clone(),
            commit_sha: commit_sha.clone(),
            pages_url: pages_url.clone(),
        };
        let notified = notify_with_retry(
            self.callback.as_ref(),
            &request.evaluation_url,
            &payload,
            &RetryPolicy::from(&self.settings),
        )
        .await;

        Ok(RoundReport {
            repo,
            commit_sha,
            pages_url,
            files_pushed: files.len(),
            notified,
        })
    }

    /// Current repository contents rendered for the modification prompt.
    /// Any failure degrades to an empty string, i.e. an initial-style prompt.
    async fn existing_code(&self, nonce: &str) -> String {
        let name = repo_name(nonce);
        tracing::info!(stage = %Stage::FetchExisting, repo = %name, "Fetching existing code");
        match self.repo.fetch_all_files(&name).await {
            Ok(snapshot) if snapshot.is_empty() => {
                tracing::warn!(
                    repo = %name,
                    "Repository has no readable files, generating from scratch"
                );
                String::new()
            }
            Ok(snapshot) => {
                tracing::info!(repo = %name, files = snapshot.len(), "Fetched existing code");
                prompts::render_existing_code(&snapshot)
            }
            Err(e) => {
                tracing::warn!(repo = %name, error = %e, "Could not fetch existing files");
                String::new()
            }
        }
    }
}

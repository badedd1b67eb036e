//! Best-effort delivery of the round result to the evaluation callback.
//!
//! Only HTTP 200 counts as delivered. Any other status, a transport error, or
//! an attempt that outlives its timeout is retried with exponential backoff
//! until the attempt budget runs out. Exhaustion is logged, never raised.

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;

use crate::config::PipelineConfig;
use crate::models::NotificationPayload;

/// Sends a payload to a caller-supplied URL and reports the HTTP status.
/// Real implementation: `HttpCallback`. Test double: `testing::RecordingCallback`.
#[async_trait]
pub trait Callback: Send + Sync {
    async fn post_json(&self, url: &str, payload: &NotificationPayload) -> anyhow::Result<u16>;
}

/// POSTs the payload as JSON with reqwest.
pub struct HttpCallback {
    http: reqwest::Client,
}

impl HttpCallback {
    pub fn new() -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .build()
            .context("Failed to build callback HTTP client")?;
        Ok(Self { http })
    }
}

#[async_trait]
impl Callback for HttpCallback {
    async fn post_json(&self, url: &str, payload: &NotificationPayload) -> anyhow::Result<u16> {
        let resp = self
            .http
            .post(url)
            .json(payload)
            .send()
            .await
            .with_context(|| format!("Failed to POST to {}", url))?;
        Ok(resp.status().as_u16())
    }
}

/// How many times to try and how long to wait in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub attempt_timeout: Duration,
}

impl RetryPolicy {
    /// Pause after failed attempt `attempt` (1-based): base, 2×base, 4×base, …
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.base_delay.saturating_mul(1u32 << exponent)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&PipelineConfig::default())
    }
}

impl From<&PipelineConfig> for RetryPolicy {
    fn from(config: &PipelineConfig) -> Self {
        Self {
            max_attempts: config.notify_max_attempts,
            base_delay: config.notify_base_delay,
            attempt_timeout: config.notify_timeout,
        }
    }
}

/// Deliver `payload` to `url`, retrying per `policy`. Returns whether it was acknowledged.
pub async fn notify_with_retry(
    callback: &dyn Callback,
    url: &str,
    payload: &NotificationPayload,
    policy: &RetryPolicy,
) -> bool {
    for attempt in 1..=policy.max_attempts {
        match tokio::time::timeout(policy.attempt_timeout, callback.post_json(url, payload)).await {
            Ok(Ok(200)) => {
                tracing::info!(attempt, "Evaluation endpoint notified");
                return true;
            }
            Ok(Ok(status)) => {
                tracing::warn!(attempt, status, "Evaluation endpoint rejected notification");
            }
            Ok(Err(e)) => {
                tracing::warn!(
                    attempt,
                    error = %format!("{:#}", e),
                    "Error notifying evaluation endpoint"
                );
            }
            Err(_) => {
                tracing::warn!(
                    attempt,
                    timeout = ?policy.attempt_timeout,
                    "Notification attempt timed out"
                );
            }
        }

        if attempt < policy.max_attempts {
            tokio::time::sleep(policy.delay_after(attempt)).await;
        }
    }

    tracing::warn!(
        attempts = policy.max_attempts,
        "Could not notify evaluation endpoint, giving up"
    );
    false
}

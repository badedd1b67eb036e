//! Process configuration, read once at startup.
//!
//! Every collaborator receives the piece of `Config` it needs at
//! construction; nothing reads the environment after `Config::from_env`.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::errors::ConfigError;

pub const DEFAULT_OPENAI_BASE_URL: &str = "https://aipipe.org/openai/v1";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_GITHUB_API_URL: &str = "https://api.github.com";
pub const DEFAULT_BRANCH: &str = "main";

/// GitHub identity and endpoint settings.
#[derive(Clone)]
pub struct GitHubConfig {
    pub token: String,
    pub owner: String,
    pub api_url: String,
    pub branch: String,
    pub request_timeout: Duration,
}

impl fmt::Debug for GitHubConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GitHubConfig")
            .field("token", &"[REDACTED]")
            .field("owner", &self.owner)
            .field("api_url", &self.api_url)
            .field("branch", &self.branch)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

/// Chat-completion endpoint settings.
#[derive(Clone)]
pub struct LlmConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub request_timeout: Duration,
}

impl fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LlmConfig")
            .field("api_key", &"[REDACTED]")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

/// Timing of the post-push part of a round.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Pause between enabling Pages and reporting the Pages URL.
    pub propagation_delay: Duration,
    pub notify_max_attempts: u32,
    /// First backoff step; doubles after each failed attempt.
    pub notify_base_delay: Duration,
    pub notify_timeout: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            propagation_delay: Duration::from_secs(2),
            notify_max_attempts: 5,
            notify_base_delay: Duration::from_secs(1),
            notify_timeout: Duration::from_secs(30),
        }
    }
}

/// Complete runtime configuration.
#[derive(Clone)]
pub struct Config {
    pub github: GitHubConfig,
    pub llm: LlmConfig,
    /// Shared secret every inbound request must present.
    pub shared_secret: String,
    pub pipeline: PipelineConfig,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("github", &self.github)
            .field("llm", &self.llm)
            .field("shared_secret", &"[REDACTED]")
            .field("pipeline", &self.pipeline)
            .finish()
    }
}

impl Config {
    /// Build configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &'static str| {
            lookup(name)
                .filter(|v| !v.trim().is_empty())
                .ok_or(ConfigError::Missing { name })
        };
        let optional = |name: &'static str, default: &str| {
            lookup(name)
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        let defaults = PipelineConfig::default();
        let propagation_secs: u64 = parse_optional(&lookup, "PAGES_PROPAGATION_SECS")?
            .unwrap_or(defaults.propagation_delay.as_secs());
        let notify_max_attempts: u32 = parse_optional(&lookup, "NOTIFY_MAX_ATTEMPTS")?
            .unwrap_or(defaults.notify_max_attempts);
        if notify_max_attempts == 0 {
            return Err(ConfigError::Invalid {
                name: "NOTIFY_MAX_ATTEMPTS",
                value: "0".into(),
                message: "at least one attempt is required".into(),
            });
        }

        Ok(Self {
            github: GitHubConfig {
                token: required("GITHUB_TOKEN")?,
                owner: required("GITHUB_USERNAME")?,
                api_url: optional("GITHUB_API_URL", DEFAULT_GITHUB_API_URL)
                    .trim_end_matches('/')
                    .to_string(),
                branch: optional("GITHUB_BRANCH", DEFAULT_BRANCH),
                request_timeout: Duration::from_secs(30),
            },
            llm: LlmConfig {
                api_key: required("OPENAI_API_KEY")?,
                base_url: optional("OPENAI_BASE_URL", DEFAULT_OPENAI_BASE_URL)
                    .trim_end_matches('/')
                    .to_string(),
                model: optional("OPENAI_MODEL", DEFAULT_OPENAI_MODEL),
                temperature: 0.3,
                request_timeout: Duration::from_secs(120),
            },
            shared_secret: required("SECRET_KEY")?,
            pipeline: PipelineConfig {
                propagation_delay: Duration::from_secs(propagation_secs),
                notify_max_attempts,
                ..defaults
            },
        })
    }
}

fn parse_optional<F, T>(lookup: &F, name: &'static str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: fmt::Display,
{
    match lookup(name) {
        Some(raw) if !raw.trim().is_empty() => {
            raw.trim()
                .parse::<T>()
                .map(Some)
                .map_err(|e| ConfigError::Invalid {
                    name,
                    value: raw.clone(),
                    message: e.to_string(),
                })
        }
        _ => Ok(None),
    }
}

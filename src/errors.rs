//! Typed error hierarchy for pagecraft.
//!
//! Four enums cover the subsystems:
//! - `ConfigError`: startup configuration failures
//! - `GenerationError`: completion API and response-parsing failures
//! - `RepoError`: GitHub REST failures
//! - `PipelineError`: a failed round, tagged with the stage that failed

use thiserror::Error;

use crate::models::Stage;

/// Errors raised while reading configuration from the environment.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable {name}")]
    Missing { name: &'static str },

    #[error("Invalid value {value:?} for {name}: {message}")]
    Invalid {
        name: &'static str,
        value: String,
        message: String,
    },
}

/// Errors from the code-generation API and from parsing its reply.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("Generation API returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Generation API request failed: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("Generation API reply had no message content")]
    EmptyReply,

    #[error("Could not parse a JSON object from the generated response")]
    Unparseable,

    #[error("Generated response is JSON but not an object mapping filenames to contents")]
    NotAnObject,
}

/// Errors from the GitHub REST API.
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("Failed to create repository {name}: status {status}: {body}")]
    CreateFailed {
        name: String,
        status: u16,
        body: String,
    },

    #[error("Failed to push {path}: status {status}: {body}")]
    UpsertFailed {
        path: String,
        status: u16,
        body: String,
    },

    #[error("Failed to enable GitHub Pages for {name}: status {status}: {body}")]
    HostingFailed {
        name: String,
        status: u16,
        body: String,
    },

    #[error("Failed to read latest commit of {name}: status {status}")]
    CommitLookupFailed { name: String, status: u16 },

    #[error("Failed to decode contents of {path}: {message}")]
    Decode { path: String, message: String },

    #[error("GitHub request failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// A round that stopped at a fatal stage.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("{stage} failed: {source}")]
    Generation {
        stage: Stage,
        #[source]
        source: GenerationError,
    },

    #[error("{stage} failed: {source}")]
    Repository {
        stage: Stage,
        #[source]
        source: RepoError,
    },
}

impl PipelineError {
    /// The stage at which the round stopped.
    pub fn stage(&self) -> Stage {
        match self {
            PipelineError::Generation { stage, .. } | PipelineError::Repository { stage, .. } => {
                *stage
            }
        }
    }
}

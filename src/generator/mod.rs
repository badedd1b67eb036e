//! Code generation: prompt the model, parse its file map, fill in required files.
//!
//! The model call sits behind `ChatModel` so the orchestrator can run against
//! a scripted model in tests. `openai::OpenAiClient` is the production
//! implementation.

pub mod openai;
pub mod parse;
pub mod prompts;

use std::sync::Arc;

use async_trait::async_trait;

use crate::errors::GenerationError;
use crate::models::FileSet;

pub use openai::OpenAiClient;

/// A chat-completion model taking a system and a user prompt.
/// Real implementation: `OpenAiClient`. Test double: `testing::ScriptedModel`.
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn complete(&self, system: &str, user: &str) -> Result<String, GenerationError>;
}

/// Produces the complete file set for one round.
#[derive(Clone)]
pub struct CodeGenerator {
    model: Arc<dyn ChatModel>,
}

impl CodeGenerator {
    pub fn new(model: Arc<dyn ChatModel>) -> Self {
        Self { model }
    }

    /// Generate files for `brief`.
    ///
    /// An empty `existing_code` selects the initial prompt; anything else
    /// asks the model to rework that code. Missing `LICENSE` or `README.md`
    /// never fails the call, they are synthesized.
    pub async fn generate(
        &self,
        brief: &str,
        checks: &[String],
        attachments: &[serde_json::Value],
        existing_code: &str,
    ) -> Result<FileSet, GenerationError> {
        let user_prompt = if existing_code.trim().is_empty() {
            prompts::build_initial_prompt(brief, checks, attachments)
        } else {
            prompts::build_modification_prompt(existing_code, brief, checks)
        };

        let reply = self
            .model
            .complete(prompts::SYSTEM_PROMPT, &user_prompt)
            .await?;
        let mut files = parse::parse_file_map(&reply)?;
        parse::backfill_required(&mut files, brief);

        tracing::info!(files = files.len(), "Generated file set");
        Ok(files)
    }
}

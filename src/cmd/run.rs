//! `pagecraft run <request.json>`: one round in the foreground.

use std::path::Path;

use anyhow::{Context, Result, bail};

use pagecraft::config::Config;
use pagecraft::models::{RoundOutcome, TaskRequest};
use pagecraft::pipeline::TaskRunner;

/// Run one round from a request file and print the outcome as JSON.
/// The shared secret is not checked.
pub async fn cmd_run(path: &Path) -> Result<()> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read request file {}", path.display()))?;
    let request: TaskRequest = serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse request file {}", path.display()))?;
    if let Err(msg) = request.validate() {
        bail!("Invalid request: {}", msg);
    }

    let config = Config::from_env().context("Invalid configuration")?;
    let runner = TaskRunner::from_config(&config)?;
    let outcome = runner.run_round(request).await;

    println!("{}", serde_json::to_string_pretty(&outcome)?);

    if let RoundOutcome::Failed { stage, error } = outcome {
        bail!("Round failed at {}: {}", stage, error);
    }
    Ok(())
}

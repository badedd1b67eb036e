//! Prompt templates for the code-generation model.
//!
//! Two user prompts exist:
//!
//! - **Initial prompt**: round 1 (or a later round whose existing code could
//!   not be read). Names the required files.
//! - **Modification prompt**: a later round. Carries the current repository
//!   contents and asks for the complete updated file set.

use crate::models::Snapshot;

/// Files every generated application must contain.
pub const REQUIRED_FILES: &[(&str, &str)] = &[
    ("index.html", "main application file with all HTML"),
    ("style.css", "complete styling with modern design"),
    ("script.js", "JavaScript if functionality needed"),
    (
        "README.md",
        "comprehensive documentation including installation, features, usage",
    ),
    ("LICENSE", "MIT License text"),
];

/// System prompt shared by both rounds.
pub const SYSTEM_PROMPT: &str = r##"You are an expert professional web developer.
Generate production-ready, well-structured code that follows best practices.
Always include comprehensive documentation and error handling.
IMPORTANT: Return ONLY a valid JSON object mapping filenames to file contents.
Example format:
{
  "index.html": "<!DOCTYPE html>...",
  "style.css": "body { ... }",
  "script.js": "function main() { ... }",
  "README.md": "# Project Title...",
  "LICENSE": "MIT License..."
}
Ensure all strings are properly escaped for valid JSON.
Do not include markdown code fences or any text outside the JSON."##;

fn checks_section(checks: &[String]) -> String {
    if checks.is_empty() {
        return "- (none provided)\n".to_string();
    }
    checks.iter().map(|c| format!("- {}\n", c)).collect()
}

fn attachments_section(attachments: &[serde_json::Value]) -> String {
    if attachments.is_empty() {
        return "No sample files provided".to_string();
    }
    serde_json::to_string_pretty(attachments).unwrap_or_else(|_| format!("{:?}", attachments))
}

/// Build the round-1 user prompt.
pub fn build_initial_prompt(
    brief: &str,
    checks: &[String],
    attachments: &[serde_json::Value],
) -> String {
    let mut prompt = String::new();

    prompt.push_str("Generate a complete web application.\n");
    prompt.push_str(&format!("TASK DESCRIPTION:\n{}\n", brief));
    prompt.push_str(&format!("EVALUATION CRITERIA:\n{}", checks_section(checks)));
    prompt.push_str(&format!(
        "SAMPLE DATA/REFERENCE:\n{}\n",
        attachments_section(attachments)
    ));

    prompt.push_str(
        "REQUIREMENTS:\n\
         1. Generate a complete, production-ready web application\n\
         2. Include all necessary files (HTML, CSS, JavaScript, etc.)\n\
         3. The code must pass all evaluation criteria\n\
         4. Follow best practices and industry standards\n\
         5. Include proper error handling and validation\n\
         6. Write clean, well-documented code\n",
    );

    prompt.push_str("REQUIRED FILES:\n");
    for (name, purpose) in REQUIRED_FILES {
        prompt.push_str(&format!("- {} ({})\n", name, purpose));
    }
    prompt.push_str("Add any other files the application needs.\n");

    prompt.push_str(
        "Important: Return ONLY the JSON object with all files. \
         Make sure each file is complete and functional.",
    );
    prompt
}

/// Build the user prompt for a round that modifies existing code.
pub fn build_modification_prompt(existing_code: &str, brief: &str, checks: &[String]) -> String {
    let mut prompt = String::new();

    prompt.push_str("Modify the existing web application code.\n");
    prompt.push_str(&format!("EXISTING CODE:\n{}\n", existing_code));
    prompt.push_str(&format!("NEW REQUIREMENTS/MODIFICATIONS:\n{}\n", brief));
    prompt.push_str(&format!("EVALUATION CRITERIA:\n{}", checks_section(checks)));
    prompt.push_str(
        "TASK:\n\
         1. Modify the existing code to meet the new requirements\n\
         2. Ensure all evaluation criteria are met\n\
         3. Return ALL files (modified and unmodified)\n\
         4. Keep files the new requirements do not affect unchanged\n\
         5. Code must be production-ready\n",
    );
    prompt.push_str("Important: Return ONLY the JSON object with all files.");
    prompt
}

/// Render repository contents as prompt context, one block per file in path order.
pub fn render_existing_code(snapshot: &Snapshot) -> String {
    snapshot
        .iter()
        .map(|(path, file)| format!("=== {} ===\n{}\n", path, file.content))
        .collect::<Vec<_>>()
        .join("\n")
}

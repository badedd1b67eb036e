//! Turning a model reply into a `FileSet`.
//!
//! Models are told to answer with bare JSON but often wrap it in a fenced
//! block or surround it with prose. Candidates are tried in order:
//!
//! 1. the whole reply
//! 2. the body of the first fenced block (any language tag)
//! 3. the slice from the first `{` to the last `}`

use std::sync::LazyLock;

use chrono::Datelike;
use regex::Regex;

use crate::errors::GenerationError;
use crate::models::FileSet;

static FENCED_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"```[A-Za-z0-9_+-]*[ \t]*\r?\n?([\s\S]*?)\r?\n?```").expect("static regex")
});

/// Characters of the brief quoted in a synthesized README.
const README_BRIEF_CHARS: usize = 100;

fn fenced_body(text: &str) -> Option<&str> {
    FENCED_BLOCK
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

fn brace_slice(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

/// Parse the filename → content object out of a model reply.
///
/// Non-string values are kept as their JSON text.
pub fn parse_file_map(text: &str) -> Result<FileSet, GenerationError> {
    let text = text.trim();
    let candidates = [Some(text), fenced_body(text), brace_slice(text)];

    let mut saw_json = false;
    for candidate in candidates.into_iter().flatten() {
        match serde_json::from_str::<serde_json::Value>(candidate) {
            Ok(serde_json::Value::Object(map)) => {
                return Ok(map
                    .into_iter()
                    .map(|(path, value)| {
                        let content = match value {
                            serde_json::Value::String(s) => s,
                            other => other.to_string(),
                        };
                        (path, content)
                    })
                    .collect());
            }
            Ok(_) => saw_json = true,
            Err(_) => {}
        }
    }

    if saw_json {
        Err(GenerationError::NotAnObject)
    } else {
        Err(GenerationError::Unparseable)
    }
}

/// MIT license text with the given copyright year.
pub fn license_text(year: i32) -> String {
    format!(
        r#"MIT License

Copyright (c) {year}

Permission is hereby granted, free of charge, to any person obtaining a copy
of this software and associated documentation files (the "Software"), to deal
in the Software without restriction, including without limitation the rights
to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
copies of the Software, and to permit persons to whom the Software is
furnished to do so, subject to the following conditions:

The above copyright notice and this permission notice shall be included in all
copies or substantial portions of the Software.

THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
SOFTWARE.
"#
    )
}

/// Minimal README quoting the start of the brief.
pub fn readme_text(brief: &str) -> String {
    let overview: String = brief.chars().take(README_BRIEF_CHARS).collect();
    format!(
        "# Generated Web Application\n\n\
         ## Overview\n\n\
         {overview}...\n\n\
         ## Installation\n\n\
         1. Clone the repository\n\
         2. Open `index.html` in your web browser\n\
         3. No additional setup required\n\n\
         ## License\n\n\
         This project is licensed under the MIT License - see the LICENSE file for details.\n"
    )
}

/// Add `LICENSE` and `README.md` when the model left them out.
pub fn backfill_required(files: &mut FileSet, brief: &str) {
    if !files.contains_key("LICENSE") {
        tracing::debug!("Model omitted LICENSE, adding MIT license");
        files.insert(
            "LICENSE".to_string(),
            license_text(chrono::Utc::now().year()),
        );
    }
    if !files.contains_key("README.md") {
        tracing::debug!("Model omitted README.md, adding a minimal one");
        files.insert("README.md".to_string(), readme_text(brief));
    }
}

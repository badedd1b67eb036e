//! Normalization applied to every generated file right before upload.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

/// Extensions whose runs of blank lines are collapsed.
const CODE_EXTENSIONS: &[&str] = &[
    "js", "jsx", "mjs", "ts", "tsx", "py", "css", "scss", "html", "htm", "svg", "xml",
];

/// Extensions treated as prose.
const TEXT_EXTENSIONS: &[&str] = &["md", "txt"];

/// A newline followed by two or more whitespace-only lines.
static BLANK_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n[ \t]*\n(?:[ \t]*\n)+").expect("static regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FileKind {
    Json,
    Code,
    Text,
    Other,
}

fn classify(path: &str) -> FileKind {
    let ext = Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("json") => FileKind::Json,
        Some(e) if CODE_EXTENSIONS.contains(&e) => FileKind::Code,
        Some(e) if TEXT_EXTENSIONS.contains(&e) => FileKind::Text,
        _ => FileKind::Other,
    }
}

/// Normalize `content` for the file at `path`.
///
/// Never fails: JSON that does not parse is treated like any other file.
pub fn format_file_content(path: &str, content: &str) -> String {
    let content = normalize_line_endings(content);

    match classify(path) {
        FileKind::Json => match serde_json::from_str::<serde_json::Value>(content.trim()) {
            Ok(value) => match serde_json::to_string_pretty(&value) {
                Ok(pretty) => with_final_newline(&pretty),
                Err(e) => {
                    tracing::warn!(path, error = %e, "Failed to re-serialize JSON, leaving as is");
                    with_final_newline(&content)
                }
            },
            Err(e) => {
                tracing::warn!(path, error = %e, "Invalid JSON, formatting as plain text");
                with_final_newline(&content)
            }
        },
        FileKind::Code => with_final_newline(&BLANK_RUN.replace_all(&content, "\n\n")),
        FileKind::Text | FileKind::Other => with_final_newline(&content),
    }
}

/// CRLF → LF until none remain, so `\r\r\n` cannot survive as a fresh `\r\n`.
fn normalize_line_endings(content: &str) -> String {
    let mut out = content.replace("\r\n", "\n");
    while out.contains("\r\n") {
        out = out.replace("\r\n", "\n");
    }
    out
}

fn with_final_newline(content: &str) -> String {
    let mut out = content.trim_end().to_string();
    out.push('\n');
    out
}

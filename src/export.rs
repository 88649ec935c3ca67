use std::fmt::Write;
use std::path::Path;

use ammonia::clean_text;
use anyhow::{Context, Result};
use chrono::{Local, TimeZone};
use tracing::info;

use crate::llm::{ChatMessage, Role};
use crate::markdown::MarkdownFormatter;

const PAGE_STYLE: &str = "body{font-family:sans-serif;max-width:48rem;margin:2rem auto;padding:0 1rem;}\
.message{border-radius:0.75rem;padding:1rem;margin:1rem 0;}\
.user{background:#1e3a8a;color:#f8fafc;margin-left:10%;white-space:pre-wrap;}\
.model{background:#f1f5f9;color:#0f172a;margin-right:10%;}\
.meta{font-size:0.75rem;opacity:0.7;margin-bottom:0.25rem;}\
pre{background:#0f172a;color:#e2e8f0;padding:0.75rem;border-radius:0.5rem;overflow-x:auto;}";

/// Renders the conversation as a standalone HTML page.
///
/// User text is shown verbatim; model replies go through the formatter.
pub fn render_transcript(formatter: &MarkdownFormatter, messages: &[ChatMessage]) -> String {
    let mut page = String::new();
    page.push_str("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>Gemini Chat</title>\n");
    let _ = writeln!(page, "<style>{PAGE_STYLE}</style>");
    page.push_str("</head>\n<body>\n<h1>Gemini Chat</h1>\n");

    for message in messages {
        let (class, label, body) = match message.role {
            Role::User => ("user", "You", clean_text(&message.content)),
            Role::Model => ("model", "Gemini AI", formatter.format(&message.content)),
        };
        let _ = writeln!(
            page,
            "<div class=\"message {class}\">\n<div class=\"meta\">{label} &middot; {}</div>\n{body}\n</div>",
            format_timestamp(message.timestamp)
        );
    }

    page.push_str("</body>\n</html>\n");
    page
}

/// Writes the rendered transcript to `path`.
pub fn write_transcript(path: &Path, formatter: &MarkdownFormatter, messages: &[ChatMessage]) -> Result<()> {
    let page = render_transcript(formatter, messages);
    std::fs::write(path, page)
        .with_context(|| format!("Failed to write transcript to {}", path.display()))?;
    info!(path = %path.display(), messages = messages.len(), "transcript exported");
    Ok(())
}

fn format_timestamp(millis: i64) -> String {
    Local
        .timestamp_millis_opt(millis)
        .single()
        .map(|time| time.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_transcript_escapes_user_and_formats_model() -> anyhow::Result<()> {
        let formatter = MarkdownFormatter::default();
        let messages = vec![
            ChatMessage::user("<script>alert('hi')</script> **not bold**".to_string()),
            ChatMessage::model("**bold** reply\n```rust\nlet x = 1;\n```".to_string()),
        ];

        let page = render_transcript(&formatter, &messages);

        assert!(page.starts_with("<!DOCTYPE html>"));
        assert!(!page.contains("<script>"));
        assert!(page.contains("&lt;script&gt;"));
        assert!(page.contains("**not bold**"));
        assert!(page.contains("<strong>bold</strong>"));
        assert!(page.contains("language-rust"));
        assert!(page.contains("Gemini AI"));
        Ok(())
    }

    #[test]
    fn test_write_transcript() -> anyhow::Result<()> {
        let formatter = MarkdownFormatter::default();
        let messages = vec![
            ChatMessage::user("hi".to_string()),
            ChatMessage::model("*hello*".to_string()),
        ];

        // Store tempdir in a variable that lives for the entire test
        let dir = tempdir()?;
        let path = dir.path().join("transcript.html");
        write_transcript(&path, &formatter, &messages)?;

        let written = std::fs::read_to_string(&path)?;
        assert_eq!(written, render_transcript(&formatter, &messages));
        assert!(written.contains("<em>hello</em>"));

        let missing = dir.path().join("no-such-dir").join("transcript.html");
        assert!(write_transcript(&missing, &formatter, &messages).is_err());
        Ok(())
    }

    #[test]
    fn test_empty_transcript() {
        let page = render_transcript(&MarkdownFormatter::default(), &[]);
        assert!(!page.contains("class=\"message"));
        assert!(page.ends_with("</html>\n"));
    }
}

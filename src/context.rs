//! Builds the judge context from retrieved documents.
//!
//! The clean variant is what the judge sees. Its markup is neutralized so
//! image references cannot leak into the judge's prompt as images. The
//! debug variant labels each chunk for people reading the results.

use crate::retrieval::RetrievedDocument;

/// Separator placed between documents.
pub const DOCUMENT_SEPARATOR: &str = "\n\n";

/// Characters of the clean context kept in a record preview.
pub const PREVIEW_CHARS: usize = 200;

/// Literal replacements applied in order to the clean context.
const SANITIZE_RULES: &[(&str, &str)] = &[
    ("cs-1.png", "cs-1_png_placeholder"),
    (".png", "_png"),
    (".jpg", "_jpg"),
    ("![", "["),
];

/// Which variant of the context to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextMode {
    /// Document bodies only, sanitized.
    Clean,
    /// Bodies labelled with their index and title.
    Debug,
}

/// Join documents into a single context string.
pub fn assemble(docs: &[RetrievedDocument], mode: ContextMode) -> String {
    match mode {
        ContextMode::Clean => {
            let joined = docs
                .iter()
                .map(|d| d.content.as_str())
                .collect::<Vec<_>>()
                .join(DOCUMENT_SEPARATOR);
            sanitize(&joined)
        }
        ContextMode::Debug => docs
            .iter()
            .enumerate()
            .map(|(i, d)| {
                format!(
                    "[Doc {}] {}\n{}",
                    i + 1,
                    d.title.as_deref().unwrap_or("Untitled"),
                    d.content
                )
            })
            .collect::<Vec<_>>()
            .join(DOCUMENT_SEPARATOR),
    }
}

/// Apply the literal replacement rules, in order.
pub fn sanitize(text: &str) -> String {
    SANITIZE_RULES
        .iter()
        .fold(text.to_string(), |acc, (from, to)| acc.replace(from, to))
}

/// True when the context has nothing worth judging.
pub fn is_blank(context: &str) -> bool {
    context.trim().is_empty()
}

/// The first [`PREVIEW_CHARS`] characters followed by an ellipsis.
pub fn preview(context: &str) -> String {
    let mut preview: String = context.chars().take(PREVIEW_CHARS).collect();
    preview.push_str("...");
    preview
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    fn doc(content: &str, title: Option<&str>) -> RetrievedDocument {
        let mut fields = json!({ "content": content });
        if let (Some(t), Value::Object(map)) = (title, &mut fields) {
            map.insert("title".to_string(), json!(t));
        }
        match fields {
            Value::Object(map) => RetrievedDocument::from_fields(map),
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_clean_joins_with_blank_line() {
        let docs = vec![doc("alpha", None), doc("beta", None)];
        assert_eq!(assemble(&docs, ContextMode::Clean), "alpha\n\nbeta");
    }

    #[test]
    fn test_debug_labels_documents() {
        let docs = vec![doc("alpha", Some("Intro")), doc("beta", None)];
        assert_eq!(
            assemble(&docs, ContextMode::Debug),
            "[Doc 1] Intro\nalpha\n\n[Doc 2] Untitled\nbeta"
        );
    }

    #[test]
    fn test_sanitize_named_image() {
        let out = sanitize("see cs-1.png and logo.png");
        assert!(out.contains("cs-1_png_placeholder"));
        assert!(out.contains("logo_png"));
        assert!(!out.contains(".png"));
    }

    #[test]
    fn test_sanitize_markdown_image() {
        assert_eq!(sanitize("![alt](pic.jpg)"), "[alt](pic_jpg)");
        assert_eq!(sanitize("a ![x] b ![y]"), "a [x] b [y]");
    }

    #[test]
    fn test_sanitize_is_case_sensitive() {
        assert_eq!(sanitize("photo.PNG"), "photo.PNG");
    }

    #[test]
    fn test_clean_mode_sanitizes_but_debug_does_not() {
        let docs = vec![doc("![img](a.png)", None)];
        assert_eq!(assemble(&docs, ContextMode::Clean), "[img](a_png)");
        assert!(assemble(&docs, ContextMode::Debug).contains("![img](a.png)"));
    }

    #[test]
    fn test_blank_context() {
        assert!(is_blank(""));
        assert!(is_blank(" \n\n\t"));
        assert!(!is_blank(" x "));
        assert!(is_blank(&assemble(&[], ContextMode::Clean)));
    }

    #[test]
    fn test_preview_counts_characters() {
        let text = "é".repeat(300);
        let p = preview(&text);
        assert_eq!(p.chars().count(), PREVIEW_CHARS + 3);
        assert!(p.ends_with("..."));

        assert_eq!(preview("short"), "short...");
    }
}

//! Translation text cleanup: footnote markers out, raw markup stripped.

use once_cell::sync::Lazy;
use regex::Regex;

static FOOTNOTE_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)<sup[^>]*?foot_?note\s*=\s*["']?([A-Za-z0-9_-]+)["']?[^>]*>(.*?)</sup>"#)
        .expect("footnote marker pattern compiles")
});
static ANY_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<[^>]*>").expect("tag pattern compiles"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranslationSegment {
    Text(String),
    Footnote { id: String, label: String },
}

pub fn parse_translation(raw: &str) -> Vec<TranslationSegment> {
    let mut segments = Vec::new();
    let mut cursor = 0;
    for captures in FOOTNOTE_MARKER.captures_iter(raw) {
        let Some(whole) = captures.get(0) else {
            continue;
        };
        push_text(&mut segments, &raw[cursor..whole.start()]);
        let id = captures
            .get(1)
            .map(|m| m.as_str().to_string())
            .unwrap_or_default();
        let label = captures
            .get(2)
            .map(|m| clean_text(m.as_str()))
            .filter(|label| !label.is_empty())
            .unwrap_or_else(|| "*".to_string());
        segments.push(TranslationSegment::Footnote { id, label });
        cursor = whole.end();
    }
    push_text(&mut segments, &raw[cursor..]);
    segments
}

/// Plain text with every tag removed; footnote bodies are shown this way.
pub fn plain_text(raw: &str) -> String {
    let without_markers = FOOTNOTE_MARKER.replace_all(raw, "");
    clean_text(&without_markers).trim().to_string()
}

fn push_text(segments: &mut Vec<TranslationSegment>, raw: &str) {
    let text = clean_text(raw);
    if text.is_empty() {
        return;
    }
    if let Some(TranslationSegment::Text(previous)) = segments.last_mut() {
        previous.push_str(&text);
    } else {
        segments.push(TranslationSegment::Text(text));
    }
}

fn clean_text(raw: &str) -> String {
    let stripped = ANY_TAG.replace_all(raw, "");
    stripped
        .replace("&nbsp;", " ")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

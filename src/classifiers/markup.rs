// src/classifiers/markup.rs
//! Node text on this app sometimes carries inline HTML, e.g.
//! `<font size="48" color="#000000">老王花店</font>` for the detail-page title or
//! `<font size="32px" color="#1A66FF">18685488479</font>` in the phone dialog.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};

static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").expect("Failed to compile TAG_RE"));

static FONT_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("font").expect("Failed to compile FONT_SELECTOR"));

/// A `<font>` run found in node text.
#[derive(Debug, Clone, PartialEq)]
pub struct FontRun {
    pub size: Option<u32>,
    pub text: String,
}

/// Removes tags and trims.
pub fn strip_tags(raw: &str) -> String {
    if !raw.contains('<') {
        return raw.trim().to_string();
    }
    TAG_RE.replace_all(raw, "").trim().to_string()
}

/// All `<font>` runs in document order. Plain text yields nothing.
pub fn font_runs(raw: &str) -> Vec<FontRun> {
    if !raw.contains("<font") {
        return Vec::new();
    }
    let fragment = Html::parse_fragment(raw);
    fragment
        .select(&FONT_SELECTOR)
        .map(|el| FontRun {
            size: el.value().attr("size").and_then(parse_font_size),
            text: el.text().collect::<String>().trim().to_string(),
        })
        .collect()
}

// Only bare integers count as a size (`size="48"`); `"32px"` is a styling hint.
fn parse_font_size(raw: &str) -> Option<u32> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    raw.parse().ok()
}

/// Text plus the font size of the first sized, non-empty `<font>` run.
/// Without such a run the size is 0 and the text is the tag-stripped input.
pub fn sized_text(raw: &str) -> (String, u32) {
    font_runs(raw)
        .into_iter()
        .find_map(|run| match run.size {
            Some(size) if !run.text.is_empty() => Some((run.text, size)),
            _ => None,
        })
        .unwrap_or_else(|| (strip_tags(raw), 0))
}

/// Contents of `<font>` runs that are purely digits.
pub fn digit_runs(raw: &str) -> Vec<String> {
    font_runs(raw)
        .into_iter()
        .filter(|run| !run.text.is_empty() && run.text.chars().all(|c| c.is_ascii_digit()))
        .map(|run| run.text)
        .collect()
}

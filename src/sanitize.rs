//! Response text cleanup for speech synthesis
//!
//! Model answers arrive with markdown, citations, URLs and other artifacts
//! that sound terrible when read aloud. [`sanitize`] strips them in a fixed
//! order (later rules assume earlier ones already ran) and collapses the
//! leftover whitespace. The pipeline is idempotent.

use std::sync::LazyLock;

use regex::Regex;

/// Appended when a long answer is cut off mid-thought
const CLOSING_REMARK: &str = "... that's the main point.";

static MARKUP_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<[^>]*>").expect("valid markup tag pattern")
});

static LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[([^\]]+)\]\([^)]*\)").expect("valid link pattern")
});

static CITATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[\d+\]").expect("valid citation pattern")
});

static URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"https?://\S+").expect("valid url pattern")
});

static HASH_HEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"#[0-9a-fA-F]+").expect("valid hash hex pattern")
});

static HEX_LITERAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"0x[0-9a-fA-F]+").expect("valid hex literal pattern")
});

static SOURCE_PAREN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\(Source:[^)]*\)").expect("valid source fragment pattern")
});

// `.` stops at line breaks, so a Source: line is dropped without eating
// the rest of the answer; a References: block is dropped to the end.
static SOURCE_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Source:.*").expect("valid source line pattern")
});

static REFERENCES_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)References?:.*").expect("valid references pattern")
});

static WHITESPACE_RUN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\s+").expect("valid whitespace pattern")
});

/// Prepare raw model output for speech synthesis
///
/// Returns a cleaned copy; a blank result means there is nothing worth
/// speaking and the caller must skip synthesis entirely.
#[must_use]
pub fn sanitize(raw: &str) -> String {
    let text = raw.replace('*', "");
    let text = MARKUP_TAG.replace_all(&text, "");
    let text = LINK.replace_all(&text, "$1");
    let text = CITATION.replace_all(&text, "");
    let text = URL.replace_all(&text, "");
    let text = HASH_HEX.replace_all(&text, "");
    let text = HEX_LITERAL.replace_all(&text, "");
    let text = SOURCE_PAREN.replace_all(&text, "");
    let text = SOURCE_LINE.replace_all(&text, "");
    let text = REFERENCES_BLOCK.replace_all(&text, "");

    let text = text
        .replace("&amp;", "and")
        .replace("&lt;", "less than")
        .replace("&gt;", "greater than")
        .replace("&quot;", "\"")
        .replace("&nbsp;", " ");

    WHITESPACE_RUN.replace_all(&text, " ").trim().to_string()
}

/// Bound how much text is handed to synthesis
///
/// Text at or under `cap` characters passes through unchanged. Longer text
/// is cut back to `truncate_to` characters at a word boundary and closed
/// with a fixed remark so synthesis never reads an unbounded wall of text.
#[must_use]
pub fn cap_for_speech(text: &str, cap: usize, truncate_to: usize) -> String {
    if text.chars().count() <= cap {
        return text.to_string();
    }

    let cut = text
        .char_indices()
        .nth(truncate_to)
        .map_or(text.len(), |(i, _)| i);
    let head = &text[..cut];
    let head = head.rfind(char::is_whitespace).map_or(head, |i| &head[..i]);
    let head = head.trim_end_matches(|c: char| c.is_whitespace() || c == ',' || c == ';');

    format!("{head}{CLOSING_REMARK}")
}

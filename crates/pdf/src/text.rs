//! Cleanup for text decoded from PDF content streams.

use regex::Regex;
use std::sync::LazyLock;
use unicode_normalization::UnicodeNormalization;

/// Regex to collapse runs of whitespace into one space.
static WHITESPACE_COLLAPSE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Latin ligatures (U+FB00..U+FB06) that fonts commonly map to one glyph.
fn is_latin_ligature(c: char) -> bool {
    ('\u{FB00}'..='\u{FB06}').contains(&c)
}

/// Normalize text decoded from a PDF.
///
/// - Composes to NFC (decomposed kana voicing marks are common in PDFs)
/// - Expands Latin ligatures such as `ﬁ`
/// - Drops control characters
/// - Collapses whitespace runs and trims
pub fn clean_text(text: &str) -> String {
    let mut expanded = String::with_capacity(text.len());
    for c in text.nfc() {
        if is_latin_ligature(c) {
            expanded.extend(std::iter::once(c).nfkc());
        } else if c.is_control() && !c.is_whitespace() {
            continue;
        } else {
            expanded.push(c);
        }
    }

    WHITESPACE_COLLAPSE_REGEX
        .replace_all(&expanded, " ")
        .trim()
        .to_string()
}

/// Whether a character is drawn roughly one em wide.
pub fn is_wide(c: char) -> bool {
    matches!(c as u32,
        0x1100..=0x115F
        | 0x2E80..=0xA4CF
        | 0xAC00..=0xD7A3
        | 0xF900..=0xFAFF
        | 0xFE30..=0xFE4F
        | 0xFF00..=0xFF60
        | 0xFFE0..=0xFFE6
        | 0x20000..=0x3FFFD)
}

/// Estimated advance of `text` in ems.
pub fn estimate_advance(text: &str) -> f64 {
    text.chars()
        .map(|c| if is_wide(c) { 1.0 } else { 0.5 })
        .sum()
}

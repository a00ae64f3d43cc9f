//! Text normalization for similarity comparison

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref NON_WORD: Regex = Regex::new(r"[^\w\s]").unwrap();
    static ref WHITESPACE_RUN: Regex = Regex::new(r"\s+").unwrap();
}

/// Normalize free text for comparison
///
/// - Converts to lowercase
/// - Replaces every character that is neither a word character nor
///   whitespace with a space
/// - Collapses whitespace runs to a single space
/// - Trims both ends
///
/// Total and idempotent.
pub fn normalize_text(text: &str) -> String {
    let lowered = text.to_lowercase();
    let stripped = NON_WORD.replace_all(&lowered, " ");
    let collapsed = WHITESPACE_RUN.replace_all(&stripped, " ");
    collapsed.trim().to_string()
}

/// Split normalized text into whitespace-delimited tokens
pub(crate) fn tokenize(normalized: &str) -> impl Iterator<Item = &str> {
    normalized.split_whitespace()
}

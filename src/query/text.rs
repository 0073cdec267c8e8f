//! Free-text folding and matching.

use regex::Regex;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Strip diacritics and lower-case.
pub fn fold(text: &str) -> String {
    text.nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .to_lowercase()
}

/// Matches a folded phrase at the start of a word.
#[derive(Debug, Clone)]
pub struct TextMatcher {
    pattern: Regex,
}

impl TextMatcher {
    /// `None` when the folded query is blank.
    pub fn new(query: &str) -> Option<Self> {
        let folded = fold(query.trim());
        if folded.is_empty() {
            return None;
        }
        let pattern = Regex::new(&format!(
            r"(?:^|[^\p{{L}}\p{{N}}]){}",
            regex::escape(&folded)
        ))
        .ok()?;
        Some(Self { pattern })
    }

    /// `blob` must already be folded.
    pub fn matches(&self, blob: &str) -> bool {
        self.pattern.is_match(blob)
    }
}

use std::sync::LazyLock;

use regex::Regex;

/// Default cap on title length, in characters
pub const DEFAULT_MAX_TITLE_CHARS: usize = 200;

static WHITESPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace pattern is valid"));

/// Collapses whitespace runs and caps title length.
#[derive(Debug, Clone, Copy)]
pub struct TitleNormalizer {
    max_chars: usize,
}

impl TitleNormalizer {
    pub fn new(max_chars: usize) -> Self {
        Self { max_chars }
    }

    /// Collapse every whitespace run to one space, trim, then keep at most
    /// `max_chars` characters. Truncation never leaves a trailing space.
    pub fn normalize(&self, raw: &str) -> String {
        let collapsed = WHITESPACE_RUN.replace_all(raw, " ");
        let truncated: String = collapsed.trim().chars().take(self.max_chars).collect();
        truncated.trim_end().to_string()
    }
}

impl Default for TitleNormalizer {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_TITLE_CHARS)
    }
}

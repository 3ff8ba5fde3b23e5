//! Fence parity correction for content that is still streaming.

use std::borrow::Cow;

pub const FENCE_DELIMITER: &str = "```";

/// Number of non-overlapping fence delimiters in `text`.
pub fn fence_count(text: &str) -> usize {
    text.matches(FENCE_DELIMITER).count()
}

/// Returns `text` unchanged when its fences are balanced, otherwise a copy
/// with a synthetic closing fence appended.
pub fn balance_fences(text: &str) -> Cow<'_, str> {
    if fence_count(text) % 2 == 0 {
        return Cow::Borrowed(text);
    }
    let mut closed = String::with_capacity(text.len() + FENCE_DELIMITER.len() + 1);
    closed.push_str(text);
    closed.push('\n');
    closed.push_str(FENCE_DELIMITER);
    Cow::Owned(closed)
}

#[cfg(test)]
mod tests {
    use super::{balance_fences, fence_count};
    use std::borrow::Cow;

    #[test]
    fn counts_non_overlapping_delimiters() {
        assert_eq!(fence_count("no code"), 0);
        assert_eq!(fence_count("```rust\nfn main() {}\n```"), 2);
        assert_eq!(fence_count("``````"), 2);
        assert_eq!(fence_count("````"), 1);
    }

    #[test]
    fn balanced_text_is_borrowed() {
        let text = "```\ncode\n```";
        assert!(matches!(balance_fences(text), Cow::Borrowed(_)));
    }

    #[test]
    fn odd_fence_count_gets_closing_fence() {
        let text = "Intro\n```bbj\nPRINT \"hi\"";
        let balanced = balance_fences(text);
        assert_eq!(balanced, "Intro\n```bbj\nPRINT \"hi\"\n```");
        assert_eq!(fence_count(&balanced) % 2, 0);
        assert_eq!(text, "Intro\n```bbj\nPRINT \"hi\"");
    }
}

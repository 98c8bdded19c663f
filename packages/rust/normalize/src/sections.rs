//! Keyword-based section extraction from free announcement text.
//!
//! Announcement bodies rarely have structure; the best available signal is
//! a sentence mentioning a field-specific keyword. Text is split into
//! sentence-like units on a small delimiter set and the first unit
//! containing any keyword wins.

/// Keywords marking an eligibility sentence.
pub const ELIGIBILITY_KEYWORDS: &[&str] =
    &["eligibility", "who can apply", "who is eligible", "applicants"];

/// Keywords marking a benefits sentence.
pub const BENEFITS_KEYWORDS: &[&str] = &["benefit", "benefits", "what you get", "amount"];

/// Keywords marking an application-procedure sentence.
pub const HOW_TO_APPLY_KEYWORDS: &[&str] = &["how to apply", "application", "apply"];

/// Return the first sentence-like unit of `text` containing any of
/// `keywords` (case-insensitive), or `None` when nothing matches.
/// Never fails on malformed input; empty text simply yields `None`.
pub fn extract_field(text: &str, keywords: &[&str]) -> Option<String> {
    if text.is_empty() {
        return None;
    }

    for sentence in text.split(is_sentence_delimiter) {
        let sentence = sentence.trim();
        if sentence.is_empty() {
            continue;
        }
        let lower = sentence.to_lowercase();
        if keywords.iter().any(|k| lower.contains(k)) {
            return Some(sentence.to_string());
        }
    }
    None
}

fn is_sentence_delimiter(c: char) -> bool {
    matches!(c, '.' | '\n' | ';' | '\r')
}

/// Substrings that make a question unacceptable.
pub const DENYLIST: [&str; 6] = ["'", "\"", ";", "--", "/*", "*/"];

/// Returns `false` when `text` contains any denylisted substring.
///
/// Questions are never spliced into SQL (the translation engine writes the
/// statement), so this only screens input that looks like SQL syntax.
pub fn validate(text: &str) -> bool {
    !DENYLIST.iter().any(|pattern| text.contains(pattern))
}

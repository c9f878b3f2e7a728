/// Cut `s` to at most `max_chars` characters and mark the cut with `...`.
///
/// Counts chars, not bytes, so multi-byte titles are never split mid-char.
/// Trailing whitespace before the marker is dropped.
#[must_use]
pub fn truncate_with_ellipsis(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", s[..idx].trim_end()),
        None => s.to_string(),
    }
}

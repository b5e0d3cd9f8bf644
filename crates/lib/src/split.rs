//! Splitting message bodies into provider-sized segments.

/// Split `text` into segments of at most `max_len` characters.
///
/// Prefers to break after the last whitespace in each window; falls back to a hard cut when
/// a window has none. Whitespace is kept at the end of the earlier segment, so joining the
/// segments gives back `text` exactly. Lengths are counted in `char`s. Always returns at
/// least one segment.
pub fn split_msg(text: &str, max_len: usize) -> Vec<String> {
    let max_len = max_len.max(1);
    if text.chars().count() <= max_len {
        return vec![text.to_string()];
    }

    let mut parts = Vec::new();
    let mut remaining = text;
    while !remaining.is_empty() {
        // byte offset just past the first `max_len` chars, or None when everything fits
        let window_end = match remaining.char_indices().nth(max_len) {
            Some((i, _)) => i,
            None => {
                parts.push(remaining.to_string());
                break;
            }
        };

        let window = &remaining[..window_end];
        let split_at = window
            .char_indices()
            .rev()
            .find(|(i, c)| *i > 0 && c.is_whitespace())
            .map(|(i, c)| i + c.len_utf8())
            .unwrap_or(window_end);

        parts.push(remaining[..split_at].to_string());
        remaining = &remaining[split_at..];
    }
    parts
}

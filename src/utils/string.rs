//! String helpers.

/// Truncate `s` to at most `max_chars` characters, never splitting a char.
pub fn truncate_str(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Truncate `s` to at most `max_units` UTF-16 code units, never splitting a
/// char. Characters outside the BMP count as two units.
pub fn truncate_utf16(s: &str, max_units: usize) -> &str {
    let mut units = 0;
    for (idx, ch) in s.char_indices() {
        units += ch.len_utf16();
        if units > max_units {
            return &s[..idx];
        }
    }
    s
}

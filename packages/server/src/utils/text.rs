/// Render bytes as text and keep at most `limit` characters.
///
/// Invalid UTF-8 is replaced, never rejected. The cut is on a character
/// boundary, so the result has exactly `min(limit, chars)` characters.
pub fn truncate_chars(bytes: &[u8], limit: usize) -> String {
    let text = String::from_utf8_lossy(bytes);
    match text.char_indices().nth(limit) {
        Some((cut, _)) => text[..cut].to_string(),
        None => text.into_owned(),
    }
}

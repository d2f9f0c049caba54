//! Message chunking for Telegram.
//!
//! Telegram limits text messages to 4096 characters. Long replies are split
//! at paragraph boundaries first, then line boundaries, then hard-cut on a
//! character boundary.

/// Default split threshold, below Telegram's 4096 hard limit.
pub const DEFAULT_MAX_CHUNK_CHARS: usize = 4000;

/// Split `text` into chunks of at most `max_chars` characters.
///
/// Returns an empty vector for empty input. Leading newlines of each
/// continuation chunk are dropped.
pub fn chunk_text(text: &str, max_chars: Option<usize>) -> Vec<String> {
    let limit = max_chars.unwrap_or(DEFAULT_MAX_CHUNK_CHARS).max(1);

    if text.is_empty() {
        return Vec::new();
    }

    let mut chunks = Vec::new();
    let mut remaining = text;

    while !remaining.is_empty() {
        if remaining.chars().count() <= limit {
            chunks.push(remaining.to_string());
            break;
        }

        // Byte offset just past `limit` characters
        let window_end = remaining
            .char_indices()
            .nth(limit)
            .map(|(i, _)| i)
            .unwrap_or(remaining.len());
        let window = &remaining[..window_end];
        let split_at = find_split_point(window);

        chunks.push(remaining[..split_at].to_string());
        remaining = remaining[split_at..].trim_start_matches('\n');
    }

    chunks
}

/// Best byte offset to split `window`; always a char boundary and > 0.
fn find_split_point(window: &str) -> usize {
    if let Some(pos) = window.rfind("\n\n")
        && pos > 0
    {
        return pos;
    }

    if let Some(pos) = window.rfind('\n')
        && pos > 0
    {
        return pos;
    }

    window.len()
}

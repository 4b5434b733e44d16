//! Reply delivery.
//!
//! Telegram caps a message at 4096 characters. Replies are normally far
//! shorter, but an inline provider error can embed a long response body, so
//! text is split on character boundaries before sending.

use std::time::Duration;

use teloxide::prelude::*;
use tracing::warn;

/// Maximum characters per Telegram message.
const CHUNK_MAX: usize = 4096;

/// Split `text` into pieces of at most `max` characters, preferring to break
/// after a newline, then after a space.
pub fn split_message(text: &str, max: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut rest = text;

    while rest.chars().count() > max {
        // Byte offset just past the `max`-th character.
        let hard = rest
            .char_indices()
            .nth(max)
            .map(|(i, _)| i)
            .unwrap_or(rest.len());
        let head = &rest[..hard];
        let cut = head
            .rfind('\n')
            .or_else(|| head.rfind(' '))
            .filter(|&i| i > 0)
            .map(|i| i + 1)
            .unwrap_or(hard);

        let piece = rest[..cut].trim_end();
        if !piece.is_empty() {
            chunks.push(piece.to_string());
        }
        rest = rest[cut..].trim_start();
    }

    if !rest.is_empty() {
        chunks.push(rest.to_string());
    }
    chunks
}

/// Send `text` to `chat_id` as plain text, chunked when needed.
///
/// Failures are logged and swallowed; the dispatcher keeps running.
pub async fn send_text(bot: &Bot, chat_id: ChatId, text: &str) {
    let chunks = split_message(text, CHUNK_MAX);
    if chunks.is_empty() {
        warn!(chat_id = chat_id.0, "Telegram: empty reply, nothing sent");
        return;
    }

    for (i, chunk) in chunks.iter().enumerate() {
        if let Err(e) = bot.send_message(chat_id, chunk).await {
            warn!(error = %e, chunk_index = i, "Telegram: failed to send reply");
        }
        if i + 1 < chunks.len() {
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }
}

//! Delivery of generated replies.
//!
//! Replies longer than the platform limit are split on word boundaries and
//! posted as several messages, each one a reply to the original message (a
//! flat thread rather than a reply chain). Once every part is posted the full
//! reply is recorded as a single assistant turn.

use anyhow::Context;
use tracing::{debug, instrument};

use crate::{
    base::types::{ReplyTarget, Res, SentMessage},
    service::{chat::ChatClient, history::HistoryStore},
};

/// Maximum message length on Discord, in characters.
pub const MAX_MESSAGE_LEN: usize = 2000;

/// Split `text` into chunks of at most `max_len` characters.
///
/// Text that already fits is returned unchanged (so `""` gives `[""]`).
/// Otherwise each chunk ends at the last space within the first `max_len + 1`
/// characters, or is hard cut at `max_len` when there is none. Chunks are
/// trimmed, and chunks that trim down to nothing are dropped.
pub fn split_text(text: &str, max_len: usize) -> Vec<String> {
    let max_len = max_len.max(1);

    if text.chars().count() <= max_len {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut rest = text;

    loop {
        let window_end = byte_offset(rest, max_len + 1);

        // A space at offset 0 would yield an empty chunk and never advance.
        let cut = match rest[..window_end].rfind(' ') {
            Some(i) if i > 0 => i,
            _ => byte_offset(rest, max_len),
        };

        push_trimmed(&mut chunks, &rest[..cut]);
        rest = &rest[cut..];

        if rest.chars().count() <= max_len {
            push_trimmed(&mut chunks, rest);
            return chunks;
        }
    }
}

/// Byte offset of the `n`th character, or the end of the string.
fn byte_offset(s: &str, n: usize) -> usize {
    s.char_indices().nth(n).map(|(i, _)| i).unwrap_or(s.len())
}

fn push_trimmed(chunks: &mut Vec<String>, chunk: &str) {
    let chunk = chunk.trim();

    if !chunk.is_empty() {
        chunks.push(chunk.to_string());
    }
}

/// Posts replies and folds them back into the channel history.
#[derive(Clone)]
pub struct ResponseDispatcher {
    chat: ChatClient,
    history: HistoryStore,
    size_limit: usize,
}

impl ResponseDispatcher {
    pub fn new(chat: ChatClient, history: HistoryStore) -> Self {
        Self::with_size_limit(chat, history, MAX_MESSAGE_LEN)
    }

    pub fn with_size_limit(chat: ChatClient, history: HistoryStore, size_limit: usize) -> Self {
        Self { chat, history, size_limit }
    }

    /// Send `response` as one or more replies to `target`, then record it in `channel_id`'s history.
    ///
    /// A failed send aborts delivery: parts already posted stay posted and
    /// nothing is recorded. A response with nothing to post (blank text) is
    /// neither sent nor recorded.
    #[instrument(skip(self, response), fields(len = response.chars().count()))]
    pub async fn deliver(&self, target: &ReplyTarget, channel_id: u64, response: &str) -> Res<Vec<SentMessage>> {
        let chunks = split_text(response, self.size_limit);

        if chunks.iter().all(|c| c.trim().is_empty()) {
            debug!("Nothing to send.");
            return Ok(Vec::new());
        }

        debug!("Sending response in {} part(s).", chunks.len());

        let mut sent = Vec::with_capacity(chunks.len());

        for (index, chunk) in chunks.iter().enumerate() {
            let message = self
                .chat
                .reply_to_message(target, chunk)
                .await
                .with_context(|| format!("Failed to send message part {} of {}", index + 1, chunks.len()))?;

            sent.push(message);
        }

        // The original text, not the re-joined chunks, so split whitespace is preserved.
        self.history.append_assistant_turn(channel_id, response);

        Ok(sent)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    };

    use async_trait::async_trait;
    use mockall::mock;

    use super::*;
    use crate::{
        base::types::{Role, Void},
        service::chat::GenericChatClient,
    };

    mock! {
        pub Chat {}

        #[async_trait]
        impl GenericChatClient for Chat {
            fn bot_user_id(&self) -> u64;
            async fn start(&self) -> Void;
            async fn reply_to_message(&self, target: &ReplyTarget, text: &str) -> Res<SentMessage>;
            async fn start_typing(&self, channel_id: u64) -> Void;
            async fn stop_typing(&self, channel_id: u64) -> Void;
        }
    }

    fn echo_chat() -> MockChat {
        let next_id = AtomicU64::new(100);
        let mut mock = MockChat::new();

        mock.expect_reply_to_message().returning(move |_, text| {
            Ok(SentMessage {
                id: next_id.fetch_add(1, Ordering::SeqCst),
                content: text.to_string(),
            })
        });

        mock
    }

    const TARGET: ReplyTarget = ReplyTarget { channel_id: 1, message_id: 55 };

    // Splitting.

    #[test]
    fn test_short_text_is_untouched() {
        assert_eq!(split_text("", MAX_MESSAGE_LEN), vec![""]);
        assert_eq!(split_text("  hello  ", MAX_MESSAGE_LEN), vec!["  hello  "]);

        let exact = "x".repeat(MAX_MESSAGE_LEN);
        assert_eq!(split_text(&exact, MAX_MESSAGE_LEN), vec![exact.clone()]);
    }

    #[test]
    fn test_splits_on_spaces() {
        let text = "a ".repeat(1001);
        let chunks = split_text(&text, MAX_MESSAGE_LEN);

        assert!(chunks.len() >= 2);
        assert!(chunks.iter().all(|c| c.chars().count() <= MAX_MESSAGE_LEN));
        assert!(chunks.iter().all(|c| c.split(' ').all(|token| token == "a")));
        assert_eq!(chunks.join(" "), text.trim());
    }

    #[test]
    fn test_hard_cut_without_spaces() {
        let text = "x".repeat(2001);
        let chunks = split_text(&text, MAX_MESSAGE_LEN);

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].len(), 2000);
        assert_eq!(chunks[1], "x");
    }

    #[test]
    fn test_repeated_hard_cuts() {
        let text = "y".repeat(4500);
        let chunks = split_text(&text, MAX_MESSAGE_LEN);

        assert_eq!(chunks.iter().map(String::len).collect::<Vec<_>>(), vec![2000, 2000, 500]);
    }

    #[test]
    fn test_space_at_chunk_start_does_not_stall() {
        let text = format!("word {}", "z".repeat(30));
        let chunks = split_text(&text, 10);

        assert_eq!(chunks, vec!["word".to_string(), "z".repeat(9), "z".repeat(10), "z".repeat(10), "z".to_string()]);
    }

    #[test]
    fn test_counts_characters_not_bytes() {
        let text = "é".repeat(15);
        let chunks = split_text(&text, 10);

        assert_eq!(chunks, vec!["é".repeat(10), "é".repeat(5)]);
    }

    #[test]
    fn test_blank_chunks_are_dropped() {
        let text = format!("abc{}def", " ".repeat(25));
        let chunks = split_text(&text, 10);

        assert_eq!(chunks, vec!["abc", "def"]);
    }

    #[test]
    fn test_chunks_respect_limit_for_mixed_text() {
        let text = "The quick brown fox jumps over the lazy dog, again and again. ".repeat(120);
        let chunks = split_text(&text, MAX_MESSAGE_LEN);

        assert!(chunks.iter().all(|c| !c.is_empty() && c.chars().count() <= MAX_MESSAGE_LEN));
        assert_eq!(chunks.join(" ").split_whitespace().collect::<Vec<_>>(), text.split_whitespace().collect::<Vec<_>>());
    }

    // Delivery.

    #[tokio::test]
    async fn test_short_response_is_one_reply() {
        let history = HistoryStore::new(10);
        let dispatcher = ResponseDispatcher::new(ChatClient::new(Arc::new(echo_chat())), history.clone());

        let sent = dispatcher.deliver(&TARGET, 1, "hello there").await.unwrap();

        assert_eq!(sent, vec![SentMessage { id: 100, content: "hello there".to_string() }]);

        let turns = history.snapshot(1);
        assert_eq!(turns.len(), 1);
        assert_eq!(turns[0].role(), Role::Assistant);
        assert_eq!(turns[0].content(), "hello there");
    }

    #[tokio::test]
    async fn test_long_response_is_folded_into_one_turn() {
        let mut mock = MockChat::new();
        mock.expect_reply_to_message()
            .withf(|target, text| *target == TARGET && text.chars().count() <= MAX_MESSAGE_LEN)
            .returning(|_, text| Ok(SentMessage { id: 1, content: text.to_string() }));

        let history = HistoryStore::new(10);
        let dispatcher = ResponseDispatcher::new(ChatClient::new(Arc::new(mock)), history.clone());

        let response = "lorem ipsum ".repeat(417);
        let response = &response[..5000];

        let sent = dispatcher.deliver(&TARGET, 1, response).await.unwrap();

        assert!(sent.len() >= 3);
        assert!(sent.iter().all(|m| m.content.chars().count() <= MAX_MESSAGE_LEN));

        let turns = history.snapshot(1);
        assert_eq!(turns.len(), 1);
        assert_eq!(turns[0].content(), response);
    }

    #[tokio::test]
    async fn test_failed_send_records_nothing() {
        let mut mock = MockChat::new();
        let mut calls = 0;
        mock.expect_reply_to_message().times(2).returning(move |_, text| {
            calls += 1;
            if calls == 1 {
                Ok(SentMessage { id: 1, content: text.to_string() })
            } else {
                Err(anyhow::anyhow!("connection reset"))
            }
        });

        let history = HistoryStore::new(10);
        let dispatcher = ResponseDispatcher::with_size_limit(ChatClient::new(Arc::new(mock)), history.clone(), 10);

        let result = dispatcher.deliver(&TARGET, 1, "first part second part third part").await;

        assert!(result.is_err());
        assert!(history.snapshot(1).is_empty());
    }

    #[tokio::test]
    async fn test_blank_response_is_neither_sent_nor_recorded() {
        let mut mock = MockChat::new();
        mock.expect_reply_to_message().never();

        let history = HistoryStore::new(10);
        let dispatcher = ResponseDispatcher::with_size_limit(ChatClient::new(Arc::new(mock)), history.clone(), 10);

        for response in ["", "   ", " ".repeat(25).as_str()] {
            let sent = dispatcher.deliver(&TARGET, 1, response).await.unwrap();
            assert!(sent.is_empty());
        }

        assert!(history.snapshot(1).is_empty());
    }
}

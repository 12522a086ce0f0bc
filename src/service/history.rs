//! Per-channel conversation history.
//!
//! Each channel keeps a bounded, ordered log of [`Turn`]s that is sent to the
//! LLM as context. Channels are independent: an append only locks the entry
//! of its own channel, and no lock is held across an `.await`.

use std::{collections::VecDeque, sync::Arc};

use dashmap::DashMap;
use tracing::trace;

use crate::base::types::Turn;

/// Bounded per-channel history store.
///
/// It is trivially cloneable; clones share the same underlying map.
#[derive(Clone, Debug)]
pub struct HistoryStore {
    channels: Arc<DashMap<u64, VecDeque<Turn>>>,
    history_length: usize,
}

impl HistoryStore {
    /// Create a store that keeps at most `history_length` turns per channel.
    ///
    /// A length of zero disables history: every append is truncated away.
    pub fn new(history_length: usize) -> Self {
        Self {
            channels: Arc::new(DashMap::new()),
            history_length,
        }
    }

    pub fn history_length(&self) -> usize {
        self.history_length
    }

    /// Record a message from a user.
    pub fn append_user_turn(&self, channel_id: u64, author_display_name: &str, author_mention: &str, text: &str) {
        self.append(channel_id, Turn::user(author_display_name, author_mention, text));
    }

    /// Record a reply from the bot; multi-part replies must be joined by the caller first.
    pub fn append_assistant_turn(&self, channel_id: u64, text: &str) {
        self.append(channel_id, Turn::assistant(text));
    }

    /// Copy of the channel's history, oldest first.
    pub fn snapshot(&self, channel_id: u64) -> Vec<Turn> {
        self.channels.get(&channel_id).map(|turns| turns.iter().cloned().collect()).unwrap_or_default()
    }

    fn append(&self, channel_id: u64, turn: Turn) {
        let mut turns = self.channels.entry(channel_id).or_default();

        turns.push_back(turn);

        while turns.len() > self.history_length {
            turns.pop_front();
        }

        trace!(channel_id, len = turns.len(), "Appended turn to history.");
    }
}

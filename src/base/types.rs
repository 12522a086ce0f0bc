use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type Err = anyhow::Error;
pub type Res<T> = Result<T, Err>;
pub type Void = Res<()>;

/// The speaker of a [`Turn`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One role-tagged message in a channel's history.
///
/// Serializes to the `{ "role", "content" }` shape the chat endpoint expects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    role: Role,
    content: String,
}

impl Turn {
    /// A user turn, prefixed with `(<display_name> <mention>) `.
    pub fn user(display_name: &str, mention: &str, text: &str) -> Self {
        Self {
            role: Role::User,
            content: format!("({display_name} {mention}) {text}"),
        }
    }

    /// An assistant turn, stored verbatim.
    pub fn assistant(text: &str) -> Self {
        Self {
            role: Role::Assistant,
            content: text.to_string(),
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn content(&self) -> &str {
        &self.content
    }
}

/// A message the bot received from the chat platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingMessage {
    pub channel_id: u64,
    pub message_id: u64,
    /// `None` for direct messages.
    pub guild_id: Option<u64>,
    pub author_id: u64,
    pub author_display_name: String,
    /// The platform token that mentions the author, e.g. `<@123>`.
    pub author_mention: String,
    pub text: String,
    pub mentioned_user_ids: Vec<u64>,
}

impl IncomingMessage {
    /// Where replies to this message should go.
    pub fn reply_target(&self) -> ReplyTarget {
        ReplyTarget {
            channel_id: self.channel_id,
            message_id: self.message_id,
        }
    }

    pub fn mentions(&self, user_id: u64) -> bool {
        self.mentioned_user_ids.contains(&user_id)
    }
}

/// The message a reply is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplyTarget {
    pub channel_id: u64,
    pub message_id: u64,
}

/// A message the bot posted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub id: u64,
    pub content: String,
}

/// Result of handling one inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatOutcome {
    /// Nothing to do (wrong guild, own message, no mention, ...).
    Ignored,
    /// The bot posted one or more replies.
    Replied(Vec<SentMessage>),
    /// The bot was asked but the inference endpoint produced nothing.
    NoResponse,
}

/// Failures talking to the inference endpoint.
#[derive(Debug, Error)]
pub enum LlmError {
    /// Network failure, bad status, or a body that is not the expected JSON.
    #[error("transport error: {0}")]
    Transport(String),
    /// The endpoint answered with an explicit `error` field.
    #[error("upstream error: {0}")]
    Upstream(String),
}

impl From<reqwest::Error> for LlmError {
    fn from(e: reqwest::Error) -> Self {
        Self::Transport(e.to_string())
    }
}

impl From<serde_json::Error> for LlmError {
    fn from(e: serde_json::Error) -> Self {
        Self::Transport(e.to_string())
    }
}

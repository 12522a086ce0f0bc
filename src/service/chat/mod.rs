pub mod discord;

use std::{ops::Deref, sync::Arc};

use async_trait::async_trait;

use crate::base::types::{ReplyTarget, Res, SentMessage, Void};

// Traits.

/// Generic "chat" trait that clients must implement.
///
/// This trait defines the core functionality for interacting with chat platforms
/// like Discord. Implementing this trait allows different chat services to be used
/// with the bot.
#[async_trait]
pub trait GenericChatClient: Send + Sync + 'static {
    /// Get the bot user ID.
    ///
    /// Returns the unique identifier for the bot in the chat platform,
    /// which is used to detect when the bot is mentioned.
    fn bot_user_id(&self) -> u64;

    /// Start the chat client listener.
    ///
    /// Connects to the platform and processes events until shutdown.
    async fn start(&self) -> Void;

    /// Reply to a message.
    ///
    /// Returns the message that was posted.
    async fn reply_to_message(&self, target: &ReplyTarget, text: &str) -> Res<SentMessage>;

    /// Show the "typing" indicator in a channel until [`GenericChatClient::stop_typing`] is called.
    ///
    /// The indicator is refreshed for as long as it is held. Nested calls for
    /// the same channel are counted, and each needs its own `stop_typing`.
    async fn start_typing(&self, channel_id: u64) -> Void;

    /// Release one [`GenericChatClient::start_typing`] for a channel.
    ///
    /// Stopping a channel that isn't typing is a no-op.
    async fn stop_typing(&self, channel_id: u64) -> Void;
}

// Structs.

/// Chat client for the application.
///
/// It is designed to be trivially cloneable, allowing it to be passed around
/// without the need for `Arc` or `Mutex`.
#[derive(Clone)]
pub struct ChatClient {
    inner: Arc<dyn GenericChatClient>,
}

impl Deref for ChatClient {
    type Target = dyn GenericChatClient;

    fn deref(&self) -> &Self::Target {
        &*self.inner
    }
}

impl ChatClient {
    pub fn new(inner: Arc<dyn GenericChatClient>) -> Self {
        Self { inner }
    }
}
